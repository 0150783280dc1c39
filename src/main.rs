//! Artefacto - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rand::Rng;

use artefacto_backend::{
    api,
    config::Config,
    db,
    error::{AppError, Result},
    services::auth_service::AuthService,
    storage::filesystem::FilesystemStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artefacto_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting Artefacto backend");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // Provision admin user on first boot
    provision_admin_user(&db_pool, &config).await?;

    // Image storage on the local filesystem
    tokio::fs::create_dir_all(&config.storage_path).await?;
    let storage = Arc::new(FilesystemStorage::new(&config.storage_path));
    tracing::info!("Image storage at {}", config.storage_path);

    // Create application state
    let state = Arc::new(api::AppState::new(config.clone(), db_pool, storage));

    // Build router
    let app = Router::new()
        .merge(api::routes::create_router(state))
        .layer({
            // In production the API sits behind the same origin as the app,
            // so a permissive policy without credentials is enough. In
            // development the SPA dev server runs on a different port, so
            // we whitelist that origin and enable credentials.
            if config.environment == "development" {
                let mut origins = Vec::with_capacity(config.cors_origins.len());
                for origin in &config.cors_origins {
                    origins.push(origin.parse::<axum::http::HeaderValue>().map_err(|_| {
                        AppError::Config(format!("invalid CORS origin: {origin}"))
                    })?);
                }
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
                    .allow_credentials(true)
            } else {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        })
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the initial admin account if no admin exists yet.
///
/// Credentials come from the ADMIN_EMAIL / ADMIN_PASSWORD config; without a
/// configured password a random one is generated and logged once so the
/// operator can capture it.
async fn provision_admin_user(db: &sqlx::PgPool, config: &Config) -> Result<()> {
    let admin_exists: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE is_admin = true LIMIT 1")
            .fetch_optional(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

    if admin_exists.is_some() {
        return Ok(());
    }

    let email = config.admin_email.clone();
    let password = match &config.admin_password {
        Some(p) => p.clone(),
        None => {
            const CHARSET: &[u8] =
                b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789!@#$%&*";
            let mut rng = rand::rng();
            let p: String = (0..20)
                .map(|_| {
                    let idx = rng.random_range(0..CHARSET.len());
                    CHARSET[idx] as char
                })
                .collect();
            tracing::warn!("Generated admin password for {}: {}", email, p);
            p
        }
    };

    let password_hash = AuthService::hash_password(&password)?;

    sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, is_admin)
        VALUES ('admin', $1, $2, true)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .execute(db)
    .await
    .map_err(|e| AppError::Database(e.to_string()))?;

    tracing::info!("Provisioned admin account {}", email);
    Ok(())
}
