//! Artefacto - Backend Library
//!
//! REST backend for the Artefacto cultural heritage platform.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
