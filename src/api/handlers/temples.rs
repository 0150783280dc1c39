//! Temple CRUD handlers.
//!
//! Reads are open to any authenticated user; writes are admin-only and
//! accept `multipart/form-data` with an optional `image` part.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::handlers::forms;
use crate::api::SharedState;
use crate::config::Config;
use crate::error::Result;
use crate::models::temple::Temple;
use crate::services::temple_service::{NewTemple, TemplePatch, TempleService};

#[derive(OpenApi)]
#[openapi(
    paths(list_temples, get_temple, create_temple, update_temple, delete_temple),
    components(schemas(TempleResponse, TempleData, TempleListData))
)]
pub struct TemplesApiDoc;

/// Routes available to any authenticated user.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_temples))
        .route("/:id", get(get_temple))
}

/// Admin-only routes.
pub fn admin_router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_temple))
        .route("/:id", put(update_temple))
        .route("/:id", delete(delete_temple))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempleResponse {
    #[serde(rename = "templeID")]
    pub temple_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub funfact_title: String,
    pub funfact_description: String,
    pub location_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TempleData {
    pub temple: TempleResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TempleListData {
    pub temples: Vec<TempleResponse>,
}

/// Null image columns render as the configured placeholder.
fn temple_response(temple: Temple, config: &Config) -> TempleResponse {
    TempleResponse {
        temple_id: temple.id,
        title: temple.title,
        description: temple.description,
        image_url: temple
            .image_url
            .unwrap_or_else(|| config.placeholder_image_url.clone()),
        funfact_title: temple.funfact_title,
        funfact_description: temple.funfact_description,
        location_url: temple.location_url,
        created_at: temple.created_at,
        updated_at: temple.updated_at,
    }
}

fn temple_service(state: &SharedState) -> TempleService {
    TempleService::new(
        state.db.clone(),
        state.storage.clone(),
        Arc::new(state.config.clone()),
    )
}

/// GET /api/temples
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/temples",
    tag = "temples",
    responses(
        (status = 200, description = "All temples, newest first", body = TempleListData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_temples(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<TempleListData>>> {
    let temples = temple_service(&state).list().await?;
    let temples = temples
        .into_iter()
        .map(|t| temple_response(t, &state.config))
        .collect();
    Ok(Json(ApiResponse::ok(TempleListData { temples })))
}

/// GET /api/temples/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/temples",
    tag = "temples",
    params(("id" = Uuid, Path, description = "Temple id")),
    responses(
        (status = 200, description = "Temple detail", body = TempleData),
        (status = 404, description = "Temple not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_temple(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TempleData>>> {
    let temple = temple_service(&state).get(id).await?;
    Ok(Json(ApiResponse::ok(TempleData {
        temple: temple_response(temple, &state.config),
    })))
}

/// POST /api/temples (admin, multipart)
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/temples",
    tag = "temples",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Temple created", body = TempleData),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin access required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_temple(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<TempleData>>)> {
    let mut form = forms::collect(multipart).await?;

    let mut errors = Vec::new();
    let title = forms::require_str(form.text("title"), "title", 3, &mut errors);
    let description = forms::require_str(form.text("description"), "description", 10, &mut errors);
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

    let new = NewTemple {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        funfact_title: funfact_title.unwrap_or_default(),
        funfact_description: funfact_description.unwrap_or_default(),
        location_url: location_url.unwrap_or_default(),
    };

    let temple = temple_service(&state)
        .create(new, form.take_file("image"))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Temple created successfully",
            TempleData {
                temple: temple_response(temple, &state.config),
            },
        )),
    ))
}

/// PUT /api/temples/:id (admin, multipart, presence-aware)
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/temples",
    tag = "temples",
    params(("id" = Uuid, Path, description = "Temple id")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Temple updated", body = TempleData),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Temple not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_temple(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<TempleData>>> {
    let mut form = forms::collect(multipart).await?;

    let mut errors = Vec::new();
    let patch = TemplePatch {
        title: forms::optional_str(form.text("title"), "title", 3, &mut errors),
        description: forms::optional_str(form.text("description"), "description", 10, &mut errors),
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

    let temple = temple_service(&state)
        .update(id, patch, form.take_file("image"))
        .await?;

    Ok(Json(ApiResponse::with_message(
        "Temple updated successfully",
        TempleData {
            temple: temple_response(temple, &state.config),
        },
    )))
}

/// DELETE /api/temples/:id (admin)
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/temples",
    tag = "temples",
    params(("id" = Uuid, Path, description = "Temple id")),
    responses(
        (status = 200, description = "Temple deleted"),
        (status = 404, description = "Temple not found"),
        (status = 409, description = "Temple still has artifacts or tickets"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_temple(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    temple_service(&state).delete(id).await?;
    Ok(Json(ApiResponse::message_only("Temple deleted successfully")))
}
