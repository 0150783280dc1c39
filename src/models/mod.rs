//! Database models (SQLx).

pub mod temple;
pub mod transaction;
pub mod user;
