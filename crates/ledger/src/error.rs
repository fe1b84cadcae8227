use thiserror::Error;

use common::ProductId;

use crate::Sequence;

/// Errors that can occur when interacting with the movement ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Two writers raced on the same product; the expected sequence did not
    /// match the sequence actually stored.
    #[error(
        "sequence conflict for product {product_id}: expected sequence {expected}, found {actual}"
    )]
    SequenceConflict {
        product_id: ProductId,
        expected: Sequence,
        actual: Sequence,
    },

    /// The product has no entries in the ledger.
    #[error("product not found in ledger: {0}")]
    ProductNotFound(ProductId),

    /// The entries handed to `append` are not a valid batch.
    #[error("invalid append batch: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
