//! Route definitions for the API.

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::{admin_middleware, auth_middleware};
use super::SharedState;
use crate::services::auth_service::AuthService;

/// Maximum accepted multipart body for image uploads.
const UPLOAD_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    // Build OpenAPI spec once at startup
    let openapi = super::openapi::build_openapi();

    let router = Router::new()
        // Health endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // OpenAPI spec (served by SwaggerUi at /api/openapi.json) and Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", openapi))
        // Stored images, public by URL
        .nest("/uploads", handlers::uploads::router())
        // API routes
        .nest("/api", api_routes(state.clone()));

    router.with_state(state)
}

/// API routes under `/api`
fn api_routes(state: SharedState) -> Router<SharedState> {
    // Create an AuthService for middleware use
    let auth_service = Arc::new(AuthService::new(
        state.db.clone(),
        Arc::new(state.config.clone()),
    ));

    Router::new()
        // Auth routes - split into public (register/login) and protected (profile)
        .nest("/auth", handlers::auth::public_router())
        .nest(
            "/auth",
            handlers::auth::protected_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        // Temple catalog for any authenticated user, writes admin-only.
        // Admin writes take multipart image uploads, hence the raised limit.
        .nest(
            "/temples",
            handlers::temples::router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/temples",
            handlers::temples::admin_router()
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .layer(middleware::from_fn_with_state(
                    auth_service.clone(),
                    admin_middleware,
                )),
        )
        // Artifact catalog plus per-user bookmark/read flags
        .nest(
            "/artifacts",
            handlers::artifacts::router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/artifacts",
            handlers::artifacts::admin_router()
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .layer(middleware::from_fn_with_state(
                    auth_service.clone(),
                    admin_middleware,
                )),
        )
        // Ticket offerings
        .nest(
            "/tickets",
            handlers::tickets::router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/tickets",
            handlers::tickets::admin_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                admin_middleware,
            )),
        )
        // Purchases and transaction history
        .nest(
            "/transactions",
            handlers::transactions::router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/transactions",
            handlers::transactions::admin_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                admin_middleware,
            )),
        )
        // Issued tickets and redemption
        .nest(
            "/owned-tickets",
            handlers::owned_tickets::router().layer(middleware::from_fn_with_state(
                auth_service,
                auth_middleware,
            )),
        )
        // ML classification proxy, no auth
        .nest(
            "/ml",
            handlers::ml::router().layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::api::AppState;
    use crate::config::Config;
    use crate::models::user::User;
    use crate::storage::filesystem::FilesystemStorage;

    // The lazy pool never connects; these tests only exercise routing and
    // the auth layers, which reject before any query runs.
    fn test_state() -> SharedState {
        let config = Config {
            database_url: "postgres://localhost/unused".into(),
            bind_address: "127.0.0.1:0".into(),
            public_base_url: "http://localhost:8080".into(),
            storage_path: "/tmp/artefacto-router-tests".into(),
            placeholder_image_url: "http://localhost:8080/uploads/assets/placeholder.jpg".into(),
            jwt_secret: "router-test-secret".into(),
            jwt_expiration_secs: 3600,
            ml_predict_url: None,
            environment: "test".into(),
            cors_origins: vec!["http://localhost:3000".into()],
            admin_email: "admin@artefacto.local".into(),
            admin_password: None,
        };
        let db = sqlx::PgPool::connect_lazy(&config.database_url).unwrap();
        let storage = Arc::new(FilesystemStorage::new(&config.storage_path));
        Arc::new(AppState::new(config, db, storage))
    }

    fn token_for(state: &SharedState, is_admin: bool) -> String {
        let auth = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));
        let user = User {
            id: Uuid::new_v4(),
            username: "made".into(),
            email: "made@example.com".into(),
            password_hash: "unused".into(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        auth.issue_token(&user).unwrap()
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_tokens() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/temples")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_bearer_tokens_are_unauthorized() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/owned-tickets")
                    .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_plain_users() {
        let state = test_state();
        let token = token_for(&state, false);
        let app = create_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/transactions/admin")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_paths_fall_through_to_404() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
