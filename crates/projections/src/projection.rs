//! Core projection trait and position tracking.

use async_trait::async_trait;
use ledger::LedgerEntry;

use crate::Result;

/// Tracks how many ledger entries a projection has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Number of entries processed by this projection.
    pub entries_processed: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self {
            entries_processed: 0,
        }
    }

    /// Advances the position by one entry.
    pub fn advance(&self) -> Self {
        Self {
            entries_processed: self.entries_processed + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.entries_processed)
    }
}

/// A projection that processes ledger entries and updates a read model.
///
/// Projections are the mechanism by which the movement ledger is transformed
/// into denormalized read models optimized for queries.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single ledger entry, updating the projection's read model.
    async fn handle(&self, entry: &LedgerEntry) -> Result<()>;

    /// Returns the current position of this projection.
    async fn position(&self) -> ProjectionPosition;

    /// Resets the projection to its initial state.
    async fn reset(&self) -> Result<()>;
}
