//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use crate::config::Config;
use crate::storage::StorageBackend;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub storage: Arc<dyn StorageBackend>,
}

impl AppState {
    pub fn new(config: Config, db: PgPool, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            config,
            db,
            storage,
        }
    }
}

pub type SharedState = Arc<AppState>;
