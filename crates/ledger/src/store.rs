use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use common::ProductId;

use crate::{LedgerEntry, LedgerError, LedgerQuery, Result, Sequence, Snapshot};

/// Options for appending entries to the ledger.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected sequence of the product for optimistic concurrency control.
    /// If None, no sequence check is performed (use with caution).
    pub expected_sequence: Option<Sequence>,
}

impl AppendOptions {
    /// Creates options with no sequence check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the product to be at a specific sequence.
    pub fn expect_sequence(sequence: Sequence) -> Self {
        Self {
            expected_sequence: Some(sequence),
        }
    }

    /// Creates options expecting the product to have no entries yet.
    pub fn expect_new() -> Self {
        Self {
            expected_sequence: Some(Sequence::initial()),
        }
    }
}

/// A stream of ledger entries.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<LedgerEntry>> + Send>>;

/// Core trait for movement-ledger implementations.
///
/// The ledger persists immutable entries; implementations must be
/// thread-safe (Send + Sync) and must make `append` atomic — either the
/// whole batch is recorded or none of it is.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends entries to the ledger.
    ///
    /// If `options.expected_sequence` is set, the operation fails with
    /// `SequenceConflict` when the product's current sequence doesn't
    /// match, leaving the ledger untouched.
    ///
    /// Returns the product's sequence after appending.
    async fn append(&self, entries: Vec<LedgerEntry>, options: AppendOptions) -> Result<Sequence>;

    /// Retrieves all entries for a product, oldest first.
    async fn entries_for_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>>;

    /// Retrieves a product's entries starting from a sequence (inclusive).
    ///
    /// Useful when replaying from a snapshot.
    async fn entries_for_product_from(
        &self,
        product_id: ProductId,
        from_sequence: Sequence,
    ) -> Result<Vec<LedgerEntry>>;

    /// Retrieves entries matching a query.
    async fn query_entries(&self, query: LedgerQuery) -> Result<Vec<LedgerEntry>>;

    /// Retrieves entries by type, oldest first.
    async fn entries_by_type(&self, entry_type: &str) -> Result<Vec<LedgerEntry>>;

    /// Streams every entry in the ledger in recorded order.
    async fn stream_all_entries(&self) -> Result<EntryStream>;

    /// Gets the current sequence of a product.
    ///
    /// Returns None if the product has no entries.
    async fn product_sequence(&self, product_id: ProductId) -> Result<Option<Sequence>>;

    /// Saves a snapshot of a product's state, replacing any existing one.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Retrieves the latest snapshot for a product, if any.
    async fn get_snapshot(&self, product_id: ProductId) -> Result<Option<Snapshot>>;
}

/// Extension trait providing convenience methods for ledger stores.
#[async_trait]
pub trait LedgerStoreExt: LedgerStore {
    /// Appends a single entry to the ledger.
    async fn append_entry(&self, entry: LedgerEntry, options: AppendOptions) -> Result<Sequence> {
        self.append(vec![entry], options).await
    }

    /// Checks whether a product has any ledger entries.
    async fn product_exists(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.product_sequence(product_id).await?.is_some())
    }

    /// Loads a product's entries, optionally starting from a snapshot.
    ///
    /// If a snapshot exists, returns it along with the entries after it;
    /// otherwise returns None and the full ledger for the product.
    async fn load_product(
        &self,
        product_id: ProductId,
    ) -> Result<(Option<Snapshot>, Vec<LedgerEntry>)> {
        if let Some(snapshot) = self.get_snapshot(product_id).await? {
            let entries = self
                .entries_for_product_from(product_id, snapshot.sequence.next())
                .await?;
            Ok((Some(snapshot), entries))
        } else {
            let entries = self.entries_for_product(product_id).await?;
            Ok((None, entries))
        }
    }
}

// Blanket implementation for all LedgerStore implementations
impl<T: LedgerStore + ?Sized> LedgerStoreExt for T {}

/// Validates a batch of entries before appending.
///
/// All entries must belong to the same product and carry contiguous
/// sequences.
pub fn validate_entries_for_append(entries: &[LedgerEntry]) -> Result<()> {
    if entries.is_empty() {
        return Err(LedgerError::InvalidAppend(
            "cannot append an empty entry batch".to_string(),
        ));
    }

    let first = &entries[0];
    for entry in entries.iter().skip(1) {
        if entry.product_id != first.product_id {
            return Err(LedgerError::InvalidAppend(
                "all entries in a batch must belong to the same product".to_string(),
            ));
        }
    }

    let mut expected = first.sequence;
    for entry in entries.iter().skip(1) {
        expected = expected.next();
        if entry.sequence != expected {
            return Err(LedgerError::InvalidAppend(format!(
                "entry sequences must be contiguous: expected {}, got {}",
                expected, entry.sequence
            )));
        }
    }

    Ok(())
}
