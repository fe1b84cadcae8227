//! HTTP route handlers.

pub mod categories;
pub mod health;
pub mod metrics;
pub mod stock;
