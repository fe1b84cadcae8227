//! Stock ledger aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::StockItem;
pub use commands::*;
pub use events::{
    AdjustedData, MovementData, MovementDetails, RegisteredData, ReservationData, StockEvent,
    ThresholdsChangedData, TransferredData,
};
pub use service::StockService;
pub use value_objects::{Money, MovementRef, RefKind};

use thiserror::Error;

/// Errors that can occur during stock operations.
#[derive(Debug, Error)]
pub enum StockError {
    /// The product has no stock record yet.
    #[error("Product is not registered in the stock ledger")]
    NotRegistered,

    /// A stock record already exists for the product.
    #[error("Product is already registered in the stock ledger")]
    AlreadyRegistered,

    /// Quantity must be positive (or, for adjustments, non-zero).
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The movement would drive on-hand below the reserved floor.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The reservation would exceed the on-hand quantity.
    #[error("Reservation exceeds stock: requested {requested}, available {available}")]
    ReservationExceedsStock { requested: i64, available: i64 },

    /// The release would exceed the reserved quantity.
    #[error("Release exceeds reserved: requested {requested}, reserved {reserved}")]
    ReleaseExceedsReserved { requested: i64, reserved: i64 },

    /// Maximum stock must be at least the minimum, and thresholds non-negative.
    #[error("Invalid thresholds: minimum {minimum}, maximum {maximum:?}")]
    InvalidThresholds {
        minimum: i64,
        maximum: Option<i64>,
    },
}
