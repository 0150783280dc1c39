//! Artifact service.
//!
//! Handles artifact CRUD, per-caller bookmark/read flags, and the image
//! sequences shared with the temple catalog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, FieldError, Result};
use crate::services::UploadedImage;
use crate::storage::{extension_for_content_type, StorageBackend};

const FLAGGED_COLUMNS: &str = "a.id, a.temple_id, a.title, a.description, a.image_url, \
     a.detail_period, a.detail_material, a.detail_size, a.detail_style, \
     a.funfact_title, a.funfact_description, a.location_url, a.created_at, a.updated_at, \
     COALESCE(b.is_bookmark, FALSE) AS is_bookmarked, \
     COALESCE(r.is_read, FALSE) AS is_read";

const FLAG_JOINS: &str = "FROM artifacts a \
     LEFT JOIN bookmarks b ON b.artifact_id = a.id AND b.user_id = $1 \
     LEFT JOIN artifact_reads r ON r.artifact_id = a.id AND r.user_id = $1";

/// Artifact row joined with the caller's bookmark/read flags.
#[derive(Debug, Clone, FromRow)]
pub struct ArtifactWithFlags {
    pub id: Uuid,
    pub temple_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub detail_period: String,
    pub detail_material: String,
    pub detail_size: String,
    pub detail_style: String,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_bookmarked: bool,
    pub is_read: bool,
}

/// New artifact payload. Field validation happens at the handler.
#[derive(Debug)]
pub struct NewArtifact {
    pub temple_id: Uuid,
    pub title: String,
    pub description: String,
    pub detail_period: String,
    pub detail_material: String,
    pub detail_size: String,
    pub detail_style: String,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
}

/// Presence-aware artifact patch.
#[derive(Debug, Default)]
pub struct ArtifactPatch {
    pub temple_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub detail_period: Option<String>,
    pub detail_material: Option<String>,
    pub detail_size: Option<String>,
    pub detail_style: Option<String>,
    pub funfact_title: Option<String>,
    pub funfact_description: Option<String>,
    pub location_url: Option<String>,
}

/// Artifact service
pub struct ArtifactService {
    db: PgPool,
    storage: Arc<dyn StorageBackend>,
    config: Arc<Config>,
}

impl ArtifactService {
    /// Create a new artifact service
    pub fn new(db: PgPool, storage: Arc<dyn StorageBackend>, config: Arc<Config>) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }

    /// List artifacts with the caller's flags, optionally filtered by
    /// temple, newest first.
    pub async fn list(
        &self,
        caller_id: Uuid,
        temple_id: Option<Uuid>,
    ) -> Result<Vec<ArtifactWithFlags>> {
        sqlx::query_as::<_, ArtifactWithFlags>(&format!(
            "SELECT {FLAGGED_COLUMNS} {FLAG_JOINS} \
             WHERE ($2::uuid IS NULL OR a.temple_id = $2) \
             ORDER BY a.created_at DESC"
        ))
        .bind(caller_id)
        .bind(temple_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one artifact with the caller's flags
    pub async fn get(&self, id: Uuid, caller_id: Uuid) -> Result<ArtifactWithFlags> {
        sqlx::query_as::<_, ArtifactWithFlags>(&format!(
            "SELECT {FLAGGED_COLUMNS} {FLAG_JOINS} WHERE a.id = $2"
        ))
        .bind(caller_id)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Artifact not found".to_string()))
    }

    /// Create an artifact under an existing temple, then store its image
    /// and persist the URL. An upload failure removes the fresh row.
    pub async fn create(
        &self,
        caller_id: Uuid,
        new: NewArtifact,
        image: Option<UploadedImage>,
    ) -> Result<ArtifactWithFlags> {
        self.ensure_temple(new.temple_id).await?;

        let artifact_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO artifacts (temple_id, title, description, detail_period, \
                 detail_material, detail_size, detail_style, funfact_title, \
                 funfact_description, location_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(new.temple_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.detail_period)
        .bind(&new.detail_material)
        .bind(&new.detail_size)
        .bind(&new.detail_style)
        .bind(&new.funfact_title)
        .bind(&new.funfact_description)
        .bind(&new.location_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(image) = image {
            let image_url = match self.store_image(artifact_id, &image).await {
                Ok(url) => url,
                Err(e) => {
                    if let Err(cleanup) = sqlx::query("DELETE FROM artifacts WHERE id = $1")
                        .bind(artifact_id)
                        .execute(&self.db)
                        .await
                    {
                        warn!(artifact_id = %artifact_id, error = %cleanup, "failed to remove artifact after upload failure");
                    }
                    return Err(e);
                }
            };
            self.persist_image_url(artifact_id, &image_url).await?;
        }

        self.get(artifact_id, caller_id).await
    }

    /// Apply a partial update, replacing the stored image when a new one
    /// is supplied.
    pub async fn update(
        &self,
        id: Uuid,
        caller_id: Uuid,
        patch: ArtifactPatch,
        image: Option<UploadedImage>,
    ) -> Result<ArtifactWithFlags> {
        let existing = self.get(id, caller_id).await?;

        if let Some(temple_id) = patch.temple_id {
            self.ensure_temple(temple_id).await?;
        }

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

        sqlx::query(
            "UPDATE artifacts SET \
                 temple_id = COALESCE($2, temple_id), \
                 title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 detail_period = COALESCE($5, detail_period), \
                 detail_material = COALESCE($6, detail_material), \
                 detail_size = COALESCE($7, detail_size), \
                 detail_style = COALESCE($8, detail_style), \
                 funfact_title = COALESCE($9, funfact_title), \
                 funfact_description = COALESCE($10, funfact_description), \
                 location_url = COALESCE($11, location_url), \
                 image_url = COALESCE($12, image_url), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.temple_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.detail_period)
        .bind(patch.detail_material)
        .bind(patch.detail_size)
        .bind(patch.detail_style)
        .bind(patch.funfact_title)
        .bind(patch.funfact_description)
        .bind(patch.location_url)
        .bind(new_image_url)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.get(id, caller_id).await
    }

    /// Delete an artifact and its stored image; flag rows cascade.
    pub async fn delete(&self, id: Uuid, caller_id: Uuid) -> Result<()> {
        let existing = self.get(id, caller_id).await?;

        sqlx::query("DELETE FROM artifacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.discard_blob(existing.image_url.as_deref()).await;
        Ok(())
    }

    /// Flip the caller's bookmark flag in one statement and return the
    /// resulting value.
    pub async fn toggle_bookmark(&self, artifact_id: Uuid, caller_id: Uuid) -> Result<bool> {
        self.ensure_artifact(artifact_id).await?;

        sqlx::query_scalar::<_, bool>(
            "INSERT INTO bookmarks (user_id, artifact_id, is_bookmark) \
             VALUES ($1, $2, TRUE) \
             ON CONFLICT (user_id, artifact_id) \
             DO UPDATE SET is_bookmark = NOT bookmarks.is_bookmark \
             RETURNING is_bookmark",
        )
        .bind(caller_id)
        .bind(artifact_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the caller's read flag. Once true it stays true.
    pub async fn mark_read(&self, artifact_id: Uuid, caller_id: Uuid) -> Result<bool> {
        self.ensure_artifact(artifact_id).await?;

        sqlx::query_scalar::<_, bool>(
            "INSERT INTO artifact_reads (user_id, artifact_id, is_read) \
             VALUES ($1, $2, TRUE) \
             ON CONFLICT (user_id, artifact_id) \
             DO UPDATE SET is_read = TRUE \
             RETURNING is_read",
        )
        .bind(caller_id)
        .bind(artifact_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn ensure_temple(&self, temple_id: Uuid) -> Result<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM temples WHERE id = $1)")
                .bind(temple_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        if exists {
            Ok(())
        } else {
            Err(AppError::Invalid(vec![FieldError::new(
                "templeID",
                "Temple does not exist",
            )]))
        }
    }

    async fn ensure_artifact(&self, artifact_id: Uuid) -> Result<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM artifacts WHERE id = $1)")
                .bind(artifact_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Artifact not found".to_string()))
        }
    }

    async fn store_image(&self, id: Uuid, image: &UploadedImage) -> Result<String> {
        let ext = extension_for_content_type(&image.content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {}", image.content_type))
        })?;
        let key = format!("artifacts/{id}.{ext}");
        self.storage.put(&key, image.bytes.clone()).await?;
        Ok(self.config.upload_url(&key))
    }

    async fn persist_image_url(&self, id: Uuid, image_url: &str) -> Result<()> {
        sqlx::query("UPDATE artifacts SET image_url = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(image_url)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn discard_blob(&self, image_url: Option<&str>) {
        let Some(key) = image_url.and_then(|url| self.config.upload_key(url)) else {
            return;
        };
        if let Err(e) = self.storage.delete(&key).await {
            warn!(key = %key, error = %e, "failed to delete stored image");
        }
    }
}
