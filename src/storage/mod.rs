//! Storage backends for uploaded images.

pub mod filesystem;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Storage backend trait. Keys are slash-separated relative paths such
/// as `temples/<id>.jpg`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content under the given key, replacing any existing blob
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;

    /// Retrieve content by key
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete content by key
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Accepted upload content types and their storage extensions.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Content type served for a stored key, derived from its extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_image_types_map_to_extensions() {
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("application/pdf"), None);
    }

    #[test]
    fn content_type_follows_key_extension() {
        assert_eq!(content_type_for_key("temples/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for_key("artifacts/b.webp"), "image/webp");
        assert_eq!(content_type_for_key("noext"), "application/octet-stream");
    }
}
