//! Command handling infrastructure.

use std::marker::PhantomData;

use common::ProductId;
use ledger::{AppendOptions, LedgerEntry, LedgerError, LedgerStore, LedgerStoreExt, Sequence, Snapshot};
use serde::Serialize;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// How many times a command is retried when a concurrent writer wins the
/// sequence race before the conflict is surfaced to the caller.
const MAX_CONFLICT_RETRIES: usize = 3;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new ledger sequence of the aggregate after the command.
    pub new_sequence: Sequence,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the product this command targets.
    fn product_id(&self) -> ProductId;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate from the ledger (with optional snapshot)
/// 2. Executing the command to produce events
/// 3. Persisting the events with an expected-sequence check
/// 4. Optionally saving a snapshot
pub struct CommandHandler<S, A>
where
    S: LedgerStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: LedgerStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given ledger store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying ledger store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its ledger.
    ///
    /// If the aggregate doesn't exist, returns a default instance.
    pub async fn load(&self, product_id: ProductId) -> Result<A, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de>,
    {
        let (snapshot, entries) = self.store.load_product(product_id).await?;

        let mut aggregate = if let Some(snapshot) = snapshot {
            self.restore_from_snapshot(snapshot)?
        } else {
            A::default()
        };

        // Apply entries after snapshot
        for entry in entries {
            let event: A::Event = serde_json::from_value(entry.payload)?;
            aggregate.apply(event);
            aggregate.set_sequence(entry.sequence);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, product_id: ProductId) -> Result<Option<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de>,
    {
        let aggregate = self.load(product_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error.
    pub async fn execute<F>(
        &self,
        product_id: ProductId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de> + Serialize,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(product_id).await?;
        let current_sequence = aggregate.sequence();

        // Execute command to get events
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_sequence: current_sequence,
            });
        }

        // Build ledger entries for persistence
        let entries = self.build_entries(product_id, current_sequence, &events)?;

        // Persist with optimistic concurrency
        let options = if current_sequence == Sequence::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_sequence(current_sequence)
        };

        let new_sequence = self.store.append(entries, options).await?;

        // Apply events to aggregate
        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_sequence(new_sequence);

        Ok(CommandResult {
            aggregate,
            events,
            new_sequence,
        })
    }

    /// Executes a command, retrying on sequence conflicts.
    ///
    /// A conflict means another writer appended to the same product between
    /// our load and our append. The aggregate is re-loaded and the command
    /// re-evaluated against the fresh state on each attempt. After
    /// `MAX_CONFLICT_RETRIES` attempts the conflict surfaces as
    /// `DomainError::Conflict`.
    pub async fn execute_with_retry<F>(
        &self,
        product_id: ProductId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de> + Serialize,
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.execute(product_id, &command_fn).await {
                Err(DomainError::Ledger(LedgerError::SequenceConflict { .. }))
                    if attempts < MAX_CONFLICT_RETRIES =>
                {
                    metrics::counter!("domain_command_retries_total").increment(1);
                    tracing::debug!(
                        product_id = %product_id,
                        attempt = attempts,
                        "sequence conflict, retrying command"
                    );
                }
                Err(DomainError::Ledger(LedgerError::SequenceConflict { .. })) => {
                    return Err(DomainError::Conflict { product_id });
                }
                other => return other,
            }
        }
    }

    /// Builds ledger entries from domain events.
    fn build_entries(
        &self,
        product_id: ProductId,
        current_sequence: Sequence,
        events: &[A::Event],
    ) -> Result<Vec<LedgerEntry>, DomainError>
    where
        A::Event: Serialize,
    {
        let mut entries = Vec::with_capacity(events.len());
        let mut sequence = current_sequence;

        for event in events {
            sequence = sequence.next();
            let entry = LedgerEntry::builder()
                .product_id(product_id)
                .entry_type(event.event_type())
                .sequence(sequence)
                .payload(event)?
                .build();
            entries.push(entry);
        }

        Ok(entries)
    }

    fn restore_from_snapshot(&self, snapshot: Snapshot) -> Result<A, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
    {
        let aggregate: A = serde_json::from_value(snapshot.state)?;
        Ok(aggregate)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: LedgerStore,
    A: SnapshotCapable,
{
    /// Executes a command and optionally saves a snapshot.
    pub async fn execute_with_snapshot<F>(
        &self,
        product_id: ProductId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de> + Serialize,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(product_id, command_fn).await?;

        // Save snapshot if needed
        if result.aggregate.should_snapshot() {
            let snapshot =
                Snapshot::from_state(product_id, result.new_sequence, &result.aggregate)?;
            self.store.save_snapshot(snapshot).await?;
        }

        Ok(result)
    }
}
