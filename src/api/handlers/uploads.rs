//! Public serving of stored images.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::Response,
    routing::get,
    Router,
};

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::storage::content_type_for_key;

pub fn router() -> Router<SharedState> {
    Router::new().route("/*path", get(serve_upload))
}

/// GET /uploads/*path
///
/// Streams a stored blob with a content type derived from its
/// extension. Unknown keys are a 404.
pub async fn serve_upload(
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<Response> {
    let data = state.storage.get(&path).await?;

    Response::builder()
        .header(CONTENT_TYPE, content_type_for_key(&path))
        .header(CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
