//! ML classification proxy handler.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use utoipa::OpenApi;

use crate::api::handlers::forms;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::ml_service::MlService;

#[derive(OpenApi)]
#[openapi(paths(predict))]
pub struct MlApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new().route("/predict", post(predict))
}

/// POST /api/ml/predict
///
/// Relays the uploaded image to the external classifier and returns its
/// JSON verdict with the upstream status code, unwrapped.
#[utoipa::path(
    post,
    path = "/predict",
    context_path = "/api/ml",
    tag = "ml",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upstream classification verdict"),
        (status = 400, description = "No image file in the request"),
        (status = 502, description = "Inference endpoint unreachable or not configured"),
    ),
)]
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = forms::collect(multipart).await?;
    let image = form
        .take_file("file")
        .or_else(|| form.take_file("image"))
        .ok_or_else(|| AppError::Validation("An image file is required".to_string()))?;

    let (status, body) = MlService::new(&state.config).predict(image).await?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(body)))
}
