//! HTTP request handlers.

pub mod artifacts;
pub mod auth;
pub mod forms;
pub mod health;
pub mod ml;
pub mod owned_tickets;
pub mod temples;
pub mod tickets;
pub mod transactions;
pub mod uploads;
