//! Artifact handlers.
//!
//! Every artifact read is decorated with the caller's bookmark and read
//! flags. Writes are admin-only multipart; the bookmark toggle and
//! read-mark are available to any authenticated user.

use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::handlers::forms;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::config::Config;
use crate::error::Result;
use crate::services::artifact_service::{
    ArtifactPatch, ArtifactService, ArtifactWithFlags, NewArtifact,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        list_artifacts,
        get_artifact,
        create_artifact,
        update_artifact,
        delete_artifact,
        toggle_bookmark,
        mark_read,
    ),
    components(schemas(
        ArtifactResponse,
        ArtifactData,
        ArtifactListData,
        BookmarkData,
        ReadData,
    ))
)]
pub struct ArtifactsApiDoc;

/// Routes available to any authenticated user.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_artifacts))
        .route("/:id", get(get_artifact))
        .route("/:id/bookmark", post(toggle_bookmark))
        .route("/:id/read", post(mark_read))
}

/// Admin-only routes.
pub fn admin_router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_artifact))
        .route("/:id", put(update_artifact))
        .route("/:id", delete(delete_artifact))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ArtifactListQuery {
    /// Restrict the listing to one temple.
    #[serde(rename = "templeID")]
    pub temple_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResponse {
    #[serde(rename = "artifactID")]
    pub artifact_id: Uuid,
    #[serde(rename = "templeID")]
    pub temple_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub detail_period: String,
    pub detail_material: String,
    pub detail_size: String,
    pub detail_style: String,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
    pub is_bookmarked: bool,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArtifactData {
    pub artifact: ArtifactResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArtifactListData {
    pub artifacts: Vec<ArtifactResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkData {
    #[serde(rename = "isBookmarked")]
    pub is_bookmarked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadData {
    #[serde(rename = "isRead")]
    pub is_read: bool,
}

fn artifact_response(artifact: ArtifactWithFlags, config: &Config) -> ArtifactResponse {
    ArtifactResponse {
        artifact_id: artifact.id,
        temple_id: artifact.temple_id,
        title: artifact.title,
        description: artifact.description,
        image_url: artifact
            .image_url
            .unwrap_or_else(|| config.placeholder_image_url.clone()),
        detail_period: artifact.detail_period,
        detail_material: artifact.detail_material,
        detail_size: artifact.detail_size,
        detail_style: artifact.detail_style,
        funfact_title: artifact.funfact_title,
        funfact_description: artifact.funfact_description,
        location_url: artifact.location_url,
        is_bookmarked: artifact.is_bookmarked,
        is_read: artifact.is_read,
        created_at: artifact.created_at,
        updated_at: artifact.updated_at,
    }
}

fn artifact_service(state: &SharedState) -> ArtifactService {
    ArtifactService::new(
        state.db.clone(),
        state.storage.clone(),
        Arc::new(state.config.clone()),
    )
}

/// GET /api/artifacts
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(ArtifactListQuery),
    responses(
        (status = 200, description = "All artifacts with the caller's flags", body = ArtifactListData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_artifacts(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ArtifactListQuery>,
) -> Result<Json<ApiResponse<ArtifactListData>>> {
    let artifacts = artifact_service(&state)
        .list(auth.user_id, query.temple_id)
        .await?;
    let artifacts = artifacts
        .into_iter()
        .map(|a| artifact_response(a, &state.config))
        .collect();
    Ok(Json(ApiResponse::ok(ArtifactListData { artifacts })))
}

/// GET /api/artifacts/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(("id" = Uuid, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Artifact detail", body = ArtifactData),
        (status = 404, description = "Artifact not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_artifact(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ArtifactData>>> {
    let artifact = artifact_service(&state).get(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ArtifactData {
        artifact: artifact_response(artifact, &state.config),
    })))
}

/// POST /api/artifacts (admin, multipart)
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/artifacts",
    tag = "artifacts",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Artifact created", body = ArtifactData),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin access required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_artifact(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ArtifactData>>)> {
    let mut form = forms::collect(multipart).await?;

    let mut errors = Vec::new();
    let temple_id = forms::require_uuid(form.text("templeID"), "templeID", &mut errors);
    let title = forms::require_str(form.text("title"), "title", 3, &mut errors);
    let description = forms::require_str(form.text("description"), "description", 10, &mut errors);
    let detail_period =
        forms::require_str(form.text("detailPeriod"), "detailPeriod", 1, &mut errors);
    let detail_material =
        forms::require_str(form.text("detailMaterial"), "detailMaterial", 1, &mut errors);
    let detail_size = forms::require_str(form.text("detailSize"), "detailSize", 1, &mut errors);
    let detail_style = forms::require_str(form.text("detailStyle"), "detailStyle", 1, &mut errors);
    let funfact_title =
        forms::require_str(form.text("funfactTitle"), "funfactTitle", 3, &mut errors);
    let funfact_description = forms::require_str(
        form.text("funfactDescription"),
        "funfactDescription",
        10,
        &mut errors,
    );
    let location_url = forms::require_url(form.text("locationUrl"), "locationUrl", &mut errors);
    forms::finish(errors)?;

    let new = NewArtifact {
        temple_id: temple_id.unwrap_or_default(),
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        detail_period: detail_period.unwrap_or_default(),
        detail_material: detail_material.unwrap_or_default(),
        detail_size: detail_size.unwrap_or_default(),
        detail_style: detail_style.unwrap_or_default(),
        funfact_title: funfact_title.unwrap_or_default(),
        funfact_description: funfact_description.unwrap_or_default(),
        location_url: location_url.unwrap_or_default(),
    };

    let artifact = artifact_service(&state)
        .create(auth.user_id, new, form.take_file("image"))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Artifact created successfully",
            ArtifactData {
                artifact: artifact_response(artifact, &state.config),
            },
        )),
    ))
}

/// PUT /api/artifacts/:id (admin, multipart, presence-aware)
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(("id" = Uuid, Path, description = "Artifact id")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Artifact updated", body = ArtifactData),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Artifact not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_artifact(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ArtifactData>>> {
    let mut form = forms::collect(multipart).await?;

    let mut errors = Vec::new();
    let patch = ArtifactPatch {
        temple_id: forms::optional_uuid(form.text("templeID"), "templeID", &mut errors),
        title: forms::optional_str(form.text("title"), "title", 3, &mut errors),
        description: forms::optional_str(form.text("description"), "description", 10, &mut errors),
        detail_period: forms::optional_str(form.text("detailPeriod"), "detailPeriod", 1, &mut errors),
        detail_material: forms::optional_str(
            form.text("detailMaterial"),
            "detailMaterial",
            1,
            &mut errors,
        ),
        detail_size: forms::optional_str(form.text("detailSize"), "detailSize", 1, &mut errors),
        detail_style: forms::optional_str(form.text("detailStyle"), "detailStyle", 1, &mut errors),
        funfact_title: forms::optional_str(form.text("funfactTitle"), "funfactTitle", 3, &mut errors),
        funfact_description: forms::optional_str(
            form.text("funfactDescription"),
            "funfactDescription",
            10,
            &mut errors,
        ),
        location_url: forms::optional_url(form.text("locationUrl"), "locationUrl", &mut errors),
    };
    forms::finish(errors)?;

    let artifact = artifact_service(&state)
        .update(id, auth.user_id, patch, form.take_file("image"))
        .await?;

    Ok(Json(ApiResponse::with_message(
        "Artifact updated successfully",
        ArtifactData {
            artifact: artifact_response(artifact, &state.config),
        },
    )))
}

/// DELETE /api/artifacts/:id (admin)
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(("id" = Uuid, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Artifact deleted"),
        (status = 404, description = "Artifact not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_artifact(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    artifact_service(&state).delete(id, auth.user_id).await?;
    Ok(Json(ApiResponse::message_only(
        "Artifact deleted successfully",
    )))
}

/// POST /api/artifacts/:id/bookmark
#[utoipa::path(
    post,
    path = "/{id}/bookmark",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(("id" = Uuid, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Bookmark flag after the toggle", body = BookmarkData),
        (status = 404, description = "Artifact not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn toggle_bookmark(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookmarkData>>> {
    let is_bookmarked = artifact_service(&state)
        .toggle_bookmark(id, auth.user_id)
        .await?;
    let message = if is_bookmarked {
        "Artifact bookmarked"
    } else {
        "Artifact bookmark removed"
    };
    Ok(Json(ApiResponse::with_message(
        message,
        BookmarkData { is_bookmarked },
    )))
}

/// POST /api/artifacts/:id/read
#[utoipa::path(
    post,
    path = "/{id}/read",
    context_path = "/api/artifacts",
    tag = "artifacts",
    params(("id" = Uuid, Path, description = "Artifact id")),
    responses(
        (status = 200, description = "Read flag, always true", body = ReadData),
        (status = 404, description = "Artifact not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn mark_read(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReadData>>> {
    let is_read = artifact_service(&state).mark_read(id, auth.user_id).await?;
    Ok(Json(ApiResponse::with_message(
        "Artifact marked as read",
        ReadData { is_read },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> ArtifactWithFlags {
        ArtifactWithFlags {
            id: Uuid::new_v4(),
            temple_id: Uuid::new_v4(),
            title: "Arca Ganesha".to_string(),
            description: "A stone statue recovered from the temple grounds".to_string(),
            image_url: None,
            detail_period: "9th century".to_string(),
            detail_material: "Andesite".to_string(),
            detail_size: "120 cm".to_string(),
            detail_style: "Hindu-Javanese".to_string(),
            funfact_title: "Broken tusk".to_string(),
            funfact_description: "The statue is carved holding its own broken tusk".to_string(),
            location_url: "https://maps.app.goo.gl/ganesha".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_bookmarked: true,
            is_read: false,
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            storage_path: "/tmp/test".to_string(),
            placeholder_image_url: "http://localhost:8080/uploads/assets/placeholder.jpg"
                .to_string(),
            jwt_secret: "secret".to_string(),
            jwt_expiration_secs: 3600,
            ml_predict_url: None,
            environment: "test".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            admin_email: "admin@artefacto.local".to_string(),
            admin_password: None,
        }
    }

    #[test]
    fn response_carries_flags_and_renamed_ids() {
        let config = test_config();
        let json = serde_json::to_value(artifact_response(sample_artifact(), &config)).unwrap();
        assert!(json.get("artifactID").is_some());
        assert!(json.get("templeID").is_some());
        assert_eq!(json["isBookmarked"], serde_json::json!(true));
        assert_eq!(json["isRead"], serde_json::json!(false));
        assert_eq!(json["detailPeriod"], serde_json::json!("9th century"));
    }

    #[test]
    fn placeholder_applies_to_null_images() {
        let config = test_config();
        let response = artifact_response(sample_artifact(), &config);
        assert_eq!(response.image_url, config.placeholder_image_url);
    }
}
