//! Read model views for the query side.

pub mod movement_history;
pub mod stock_levels;

pub use movement_history::{MovementHistoryView, MovementSummary};
pub use stock_levels::{StockLevel, StockLevelsView};
