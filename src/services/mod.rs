//! Business logic services.

pub mod artifact_service;
pub mod auth_service;
pub mod ml_service;
pub mod owned_ticket_service;
pub mod temple_service;
pub mod ticket_service;
pub mod transaction_service;

use bytes::Bytes;

/// An image file received through a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: String,
}
