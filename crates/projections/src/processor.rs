//! Projection processor for feeding ledger entries to projections.

use futures_util::StreamExt;
use ledger::{LedgerEntry, LedgerStore};
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Processes entries from the movement ledger and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: replays all entries from the ledger to bring projections up to date
/// - Single entry delivery: delivers a new entry to all projections
/// - Rebuild: resets all projections and replays from scratch
pub struct ProjectionProcessor<S: LedgerStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    /// Serializes catch-up and rebuild. The per-entry position check and
    /// `handle` are not atomic, so overlapping runs on a shared processor
    /// would double-apply entries.
    catch_up_lock: Mutex<()>,
}

impl<S: LedgerStore> ProjectionProcessor<S> {
    /// Creates a new processor over the given ledger store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up_lock: Mutex::new(()),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Runs catch-up processing: streams all entries from the ledger and
    /// delivers them to each projection that hasn't already seen them.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _guard = self.catch_up_lock.lock().await;
        self.catch_up_locked().await
    }

    async fn catch_up_locked(&self) -> Result<()> {
        let mut stream = self.store.stream_all_entries().await?;
        let mut entry_index: u64 = 0;

        while let Some(result) = stream.next().await {
            let entry = result?;
            entry_index += 1;

            for projection in &self.projections {
                let pos = projection.position().await;
                if pos.entries_processed < entry_index {
                    projection.handle(&entry).await?;
                    metrics::counter!("projections_entries_processed").increment(1);
                }
            }
        }

        tracing::info!(entries_processed = entry_index, "catch-up complete");

        Ok(())
    }

    /// Delivers a single ledger entry to all registered projections.
    #[tracing::instrument(skip(self, entry), fields(entry_type = %entry.entry_type))]
    pub async fn process_entry(&self, entry: &LedgerEntry) -> Result<()> {
        for projection in &self.projections {
            projection.handle(entry).await?;
        }
        Ok(())
    }

    /// Resets all projections and replays all entries from the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        let _guard = self.catch_up_lock.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.catch_up_locked().await
    }
}
