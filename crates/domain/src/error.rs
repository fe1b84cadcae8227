//! Domain error types.

use common::ProductId;
use ledger::LedgerError;
use thiserror::Error;

use crate::category::CategoryError;
use crate::stock::StockError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the movement ledger.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// An error occurred in the stock aggregate.
    #[error("Stock error: {0}")]
    Stock(StockError),

    /// An error occurred in the category tree.
    #[error("Category error: {0}")]
    Category(CategoryError),

    /// Concurrent writers exhausted the retry budget for a product.
    #[error("Conflicting concurrent updates for product {product_id}, retries exhausted")]
    Conflict { product_id: ProductId },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
