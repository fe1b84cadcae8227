//! Read models and projections for the query side.
//!
//! This crate provides the query side of the inventory core:
//! - [`Projection`] trait for processing ledger entries into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for feeding entries from the ledger to projections
//! - Two read model views: current stock levels and recent movement history

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{MovementHistoryView, MovementSummary, StockLevel, StockLevelsView};
