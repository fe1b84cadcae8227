use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::ProductId;

use crate::{
    LedgerEntry, LedgerError, LedgerQuery, Result, Sequence, Snapshot,
    store::{AppendOptions, EntryStream, LedgerStore, validate_entries_for_append},
};

/// In-memory ledger store implementation for testing.
///
/// This implementation keeps all entries in memory and provides
/// the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    snapshots: Arc<RwLock<HashMap<ProductId, Snapshot>>>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty in-memory ledger store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries stored.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Clears all entries and snapshots.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entries: Vec<LedgerEntry>, options: AppendOptions) -> Result<Sequence> {
        validate_entries_for_append(&entries)?;

        let first_entry = &entries[0];
        let product_id = first_entry.product_id;

        let mut store = self.entries.write().await;

        // Get current sequence for this product
        let current_sequence = store
            .iter()
            .filter(|e| e.product_id == product_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(Sequence::initial());

        // Check expected sequence if specified
        if let Some(expected) = options.expected_sequence
            && current_sequence != expected
        {
            return Err(LedgerError::SequenceConflict {
                product_id,
                expected,
                actual: current_sequence,
            });
        }

        // Check for sequence collisions (unique constraint simulation)
        let first_new_sequence = first_entry.sequence;
        if first_new_sequence <= current_sequence && current_sequence != Sequence::initial() {
            return Err(LedgerError::SequenceConflict {
                product_id,
                expected: options.expected_sequence.unwrap_or(current_sequence),
                actual: current_sequence,
            });
        }

        let last_sequence = entries
            .last()
            .map(|e| e.sequence)
            .unwrap_or(Sequence::initial());
        store.extend(entries);

        Ok(last_sequence)
    }

    async fn entries_for_product(&self, product_id: ProductId) -> Result<Vec<LedgerEntry>> {
        let store = self.entries.read().await;
        let mut entries: Vec<_> = store
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn entries_for_product_from(
        &self,
        product_id: ProductId,
        from_sequence: Sequence,
    ) -> Result<Vec<LedgerEntry>> {
        let store = self.entries.read().await;
        let mut entries: Vec<_> = store
            .iter()
            .filter(|e| e.product_id == product_id && e.sequence >= from_sequence)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn query_entries(&self, query: LedgerQuery) -> Result<Vec<LedgerEntry>> {
        let store = self.entries.read().await;
        let mut entries: Vec<_> = store
            .iter()
            .filter(|e| {
                if let Some(id) = query.product_id
                    && e.product_id != id
                {
                    return false;
                }
                if let Some(ref types) = query.entry_types
                    && !types.contains(&e.entry_type)
                {
                    return false;
                }
                if let Some(from) = query.from_sequence
                    && e.sequence < from
                {
                    return false;
                }
                if let Some(to) = query.to_sequence
                    && e.sequence > to
                {
                    return false;
                }
                if let Some(from) = query.from_timestamp
                    && e.recorded_at < from
                {
                    return false;
                }
                if let Some(to) = query.to_timestamp
                    && e.recorded_at > to
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        // Sort by timestamp then sequence, reversed for newest-first reads
        entries.sort_by(|a, b| {
            let ordering = a
                .recorded_at
                .cmp(&b.recorded_at)
                .then(a.sequence.cmp(&b.sequence));
            if query.newest_first {
                ordering.reverse()
            } else {
                ordering
            }
        });

        // Apply offset and limit
        let offset = query.offset.unwrap_or(0);
        let entries: Vec<_> = entries.into_iter().skip(offset).collect();

        let entries = if let Some(limit) = query.limit {
            entries.into_iter().take(limit).collect()
        } else {
            entries
        };

        Ok(entries)
    }

    async fn entries_by_type(&self, entry_type: &str) -> Result<Vec<LedgerEntry>> {
        let store = self.entries.read().await;
        let mut entries: Vec<_> = store
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(entries)
    }

    async fn stream_all_entries(&self) -> Result<EntryStream> {
        use futures_util::stream;

        let store = self.entries.read().await;
        let mut entries = store.clone();
        entries.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then(a.movement_id.as_uuid().cmp(&b.movement_id.as_uuid()))
        });

        let stream = stream::iter(entries.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn product_sequence(&self, product_id: ProductId) -> Result<Option<Sequence>> {
        let store = self.entries.read().await;
        let sequence = store
            .iter()
            .filter(|e| e.product_id == product_id)
            .map(|e| e.sequence)
            .max();
        Ok(sequence)
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.product_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, product_id: ProductId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry(
        product_id: ProductId,
        sequence: Sequence,
        entry_type: &str,
    ) -> LedgerEntry {
        LedgerEntry::builder()
            .product_id(product_id)
            .entry_type(entry_type)
            .sequence(sequence)
            .payload_raw(serde_json::json!({"quantity": 1}))
            .build()
    }

    #[tokio::test]
    async fn append_single_entry() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();
        let entry = create_test_entry(product_id, Sequence::first(), "Received");

        let result = store.append(vec![entry], AppendOptions::expect_new()).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Sequence::first());

        let entries = store.entries_for_product(product_id).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn append_multiple_entries() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let entries = vec![
            create_test_entry(product_id, Sequence::new(1), "Received"),
            create_test_entry(product_id, Sequence::new(2), "Issued"),
            create_test_entry(product_id, Sequence::new(3), "Issued"),
        ];

        let result = store.append(entries, AppendOptions::expect_new()).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Sequence::new(3));

        let stored = store.entries_for_product(product_id).await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn sequence_conflict_on_wrong_sequence() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let entry1 = create_test_entry(product_id, Sequence::first(), "Received");
        store
            .append(vec![entry1], AppendOptions::expect_new())
            .await
            .unwrap();

        // Try to append with a stale expected sequence
        let entry2 = create_test_entry(product_id, Sequence::new(2), "Issued");
        let result = store
            .append(
                vec![entry2],
                AppendOptions::expect_sequence(Sequence::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::SequenceConflict { .. })
        ));
    }

    #[tokio::test]
    async fn sequence_check_success() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let entry1 = create_test_entry(product_id, Sequence::first(), "Received");
        store
            .append(vec![entry1], AppendOptions::expect_new())
            .await
            .unwrap();

        let entry2 = create_test_entry(product_id, Sequence::new(2), "Issued");
        let result = store
            .append(
                vec![entry2],
                AppendOptions::expect_sequence(Sequence::first()),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn entries_from_sequence() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let entries = vec![
            create_test_entry(product_id, Sequence::new(1), "Received"),
            create_test_entry(product_id, Sequence::new(2), "Issued"),
            create_test_entry(product_id, Sequence::new(3), "Adjusted"),
        ];
        store.append(entries, AppendOptions::new()).await.unwrap();

        let from_s2 = store
            .entries_for_product_from(product_id, Sequence::new(2))
            .await
            .unwrap();
        assert_eq!(from_s2.len(), 2);
        assert_eq!(from_s2[0].sequence, Sequence::new(2));
        assert_eq!(from_s2[1].sequence, Sequence::new(3));
    }

    #[tokio::test]
    async fn entries_by_type() {
        let store = InMemoryLedgerStore::new();
        let id1 = ProductId::new();
        let id2 = ProductId::new();

        store
            .append(
                vec![create_test_entry(id1, Sequence::first(), "Received")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_entry(id2, Sequence::first(), "Issued")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_entry(id1, Sequence::new(2), "Received")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let received = store.entries_by_type("Received").await.unwrap();
        assert_eq!(received.len(), 2);

        let issued = store.entries_by_type("Issued").await.unwrap();
        assert_eq!(issued.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_save_and_retrieve() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let snapshot = Snapshot::new(
            product_id,
            Sequence::new(5),
            serde_json::json!({"on_hand": 70}),
        );

        store.save_snapshot(snapshot.clone()).await.unwrap();

        let retrieved = store.get_snapshot(product_id).await.unwrap();
        assert!(retrieved.is_some());
        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.product_id, product_id);
        assert_eq!(retrieved.sequence, Sequence::new(5));
    }

    #[tokio::test]
    async fn snapshot_not_found() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        let result = store.get_snapshot(product_id).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn query_entries_with_filters() {
        let store = InMemoryLedgerStore::new();
        let id1 = ProductId::new();

        let entries = vec![
            create_test_entry(id1, Sequence::new(1), "Received"),
            create_test_entry(id1, Sequence::new(2), "Issued"),
            create_test_entry(id1, Sequence::new(3), "Adjusted"),
        ];
        store.append(entries, AppendOptions::new()).await.unwrap();

        // Query with sequence range
        let query = LedgerQuery::new()
            .product_id(id1)
            .from_sequence(Sequence::new(2))
            .to_sequence(Sequence::new(2));

        let results = store.query_entries(query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sequence, Sequence::new(2));
    }

    #[tokio::test]
    async fn query_entries_newest_first_with_paging() {
        let store = InMemoryLedgerStore::new();
        let id1 = ProductId::new();

        let entries: Vec<_> = (1..=5)
            .map(|s| create_test_entry(id1, Sequence::new(s), "Received"))
            .collect();
        store.append(entries, AppendOptions::new()).await.unwrap();

        let query = LedgerQuery::for_product(id1).newest_first().page(1, 2);
        let results = store.query_entries(query).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sequence, Sequence::new(5));
        assert_eq!(results[1].sequence, Sequence::new(4));

        let query = LedgerQuery::for_product(id1).newest_first().page(3, 2);
        let results = store.query_entries(query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sequence, Sequence::new(1));
    }

    #[tokio::test]
    async fn stream_all_entries() {
        use futures_util::StreamExt;

        let store = InMemoryLedgerStore::new();
        let id1 = ProductId::new();
        let id2 = ProductId::new();

        store
            .append(
                vec![create_test_entry(id1, Sequence::first(), "Received")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_entry(id2, Sequence::first(), "Received")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let stream = store.stream_all_entries().await.unwrap();
        let entries: Vec<_> = stream.collect().await;
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn product_sequence() {
        let store = InMemoryLedgerStore::new();
        let product_id = ProductId::new();

        // No entries yet
        let sequence = store.product_sequence(product_id).await.unwrap();
        assert!(sequence.is_none());

        let entries = vec![
            create_test_entry(product_id, Sequence::new(1), "Received"),
            create_test_entry(product_id, Sequence::new(2), "Issued"),
        ];
        store.append(entries, AppendOptions::new()).await.unwrap();

        let sequence = store.product_sequence(product_id).await.unwrap();
        assert_eq!(sequence, Some(Sequence::new(2)));
    }
}
