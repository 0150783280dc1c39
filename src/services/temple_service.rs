//! Temple catalog service.
//!
//! Handles temple CRUD and the image store/replace/delete sequences
//! around row writes.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::temple::Temple;
use crate::services::UploadedImage;
use crate::storage::{extension_for_content_type, StorageBackend};

const TEMPLE_COLUMNS: &str = "id, title, description, image_url, funfact_title, \
     funfact_description, location_url, created_at, updated_at";

/// New temple payload. Field validation happens at the handler.
#[derive(Debug)]
pub struct NewTemple {
    pub title: String,
    pub description: String,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
}

/// Presence-aware temple patch: absent fields leave columns untouched.
#[derive(Debug, Default)]
pub struct TemplePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub funfact_title: Option<String>,
    pub funfact_description: Option<String>,
    pub location_url: Option<String>,
}

/// Temple service
pub struct TempleService {
    db: PgPool,
    storage: Arc<dyn StorageBackend>,
    config: Arc<Config>,
}

impl TempleService {
    /// Create a new temple service
    pub fn new(db: PgPool, storage: Arc<dyn StorageBackend>, config: Arc<Config>) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// List all temples, newest first
    pub async fn list(&self) -> Result<Vec<Temple>> {
        sqlx::query_as::<_, Temple>(&format!(
            "SELECT {TEMPLE_COLUMNS} FROM temples ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one temple
    pub async fn get(&self, id: Uuid) -> Result<Temple> {
        sqlx::query_as::<_, Temple>(&format!(
            "SELECT {TEMPLE_COLUMNS} FROM temples WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Temple not found".to_string()))
    }

    /// Create a temple, then store its image and persist the URL. An
    /// upload failure removes the fresh row again.
    pub async fn create(&self, new: NewTemple, image: Option<UploadedImage>) -> Result<Temple> {
        let temple = sqlx::query_as::<_, Temple>(&format!(
            "INSERT INTO temples (title, description, funfact_title, funfact_description, location_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TEMPLE_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.funfact_title)
        .bind(&new.funfact_description)
        .bind(&new.location_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(image) = image else {
            return Ok(temple);
        };

        let image_url = match self.store_image(temple.id, &image).await {
            Ok(url) => url,
            Err(e) => {
                if let Err(cleanup) = sqlx::query("DELETE FROM temples WHERE id = $1")
                    .bind(temple.id)
                    .execute(&self.db)
                    .await
                {
                    warn!(temple_id = %temple.id, error = %cleanup, "failed to remove temple after upload failure");
                }
                return Err(e);
            }
        };

        self.persist_image_url(temple.id, &image_url).await
    }

    /// Apply a partial update, replacing the stored image when a new one
    /// is supplied.
    pub async fn update(
        &self,
        id: Uuid,
        patch: TemplePatch,
        image: Option<UploadedImage>,
    ) -> Result<Temple> {
        let existing = self.get(id).await?;

        // Store the replacement before discarding the old blob, so a failed
        // upload leaves the current image intact. A same-extension upload
        // reuses the storage key and has already overwritten the old blob.
        let mut new_image_url = None;
        if let Some(image) = image {
            let url = self.store_image(id, &image).await?;
            if existing.image_url.as_deref() != Some(url.as_str()) {
                self.discard_blob(existing.image_url.as_deref()).await;
            }
            new_image_url = Some(url);
        }

        sqlx::query_as::<_, Temple>(&format!(
            "UPDATE temples SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 funfact_title = COALESCE($4, funfact_title), \
                 funfact_description = COALESCE($5, funfact_description), \
                 location_url = COALESCE($6, location_url), \
                 image_url = COALESCE($7, image_url), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {TEMPLE_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.funfact_title)
        .bind(patch.funfact_description)
        .bind(patch.location_url)
        .bind(new_image_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a temple and its stored image. Temples still referenced by
    /// artifacts or tickets are not deletable.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let existing = self.get(id).await?;

        sqlx::query("DELETE FROM temples WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if e.to_string().contains("foreign key") {
                    AppError::Conflict("Temple still has artifacts or tickets".to_string())
                } else {
                    AppError::Database(e.to_string())
                }
            })?;

        self.discard_blob(existing.image_url.as_deref()).await;
        Ok(())
    }

    async fn store_image(&self, id: Uuid, image: &UploadedImage) -> Result<String> {
        let ext = extension_for_content_type(&image.content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {}", image.content_type))
        })?;
        let key = format!("temples/{id}.{ext}");
        self.storage.put(&key, image.bytes.clone()).await?;
        Ok(self.config.upload_url(&key))
    }

    async fn persist_image_url(&self, id: Uuid, image_url: &str) -> Result<Temple> {
        sqlx::query_as::<_, Temple>(&format!(
            "UPDATE temples SET image_url = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {TEMPLE_COLUMNS}"
        ))
        .bind(id)
        .bind(image_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Best-effort removal of a stored blob; placeholder and external
    /// URLs are left alone.
    async fn discard_blob(&self, image_url: Option<&str>) {
        let Some(key) = image_url.and_then(|url| self.config.upload_key(url)) else {
            return;
        };
        if let Err(e) = self.storage.delete(&key).await {
            warn!(key = %key, error = %e, "failed to delete stored image");
        }
    }
}
