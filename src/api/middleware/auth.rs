//! Authentication middleware.
//!
//! Extracts and validates the Bearer JWT on protected routes and stores
//! the caller's identity in request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth_service::{AuthService, Claims};

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            is_admin: claims.is_admin,
        }
    }
}

/// Token from a `Bearer <token>` Authorization value
fn parse_bearer(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

fn claims_from_request(
    auth_service: &AuthService,
    request: &Request,
) -> Result<Claims, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    let token = parse_bearer(header).ok_or_else(|| {
        AppError::Authentication("Invalid authorization header format".to_string())
    })?;

    auth_service.validate_token(token)
}

/// Authentication middleware - requires a valid Bearer JWT
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match claims_from_request(&auth_service, &request) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(AuthExtension::from(claims));
    next.run(request).await
}

/// Admin-only middleware - requires a valid Bearer JWT with the admin
/// flag set
pub async fn admin_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match claims_from_request(&auth_service, &request) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    if !claims.is_admin {
        return AppError::Authorization("Admin access required".to_string()).into_response();
    }

    request.extensions_mut().insert(AuthExtension::from(claims));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_accepts_well_formed_headers() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn parse_bearer_rejects_other_schemes_and_empty_tokens() {
        assert_eq!(parse_bearer("Basic dXNlcg=="), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("bearer abc"), None);
    }
}
