//! Temple model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Temple entity. `image_url` is nullable in the database; reads
/// substitute the configured placeholder URL.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Temple {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
