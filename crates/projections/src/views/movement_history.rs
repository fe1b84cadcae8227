//! Movement history read model — recent movements per product, newest first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ActorId, ProductId};
use domain::{MovementRef, StockEvent};
use ledger::{LedgerEntry, MovementId};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Default number of movements retained per product.
pub const DEFAULT_RETENTION: usize = 100;

/// A single movement in a product's recent history.
#[derive(Debug, Clone, Serialize)]
pub struct MovementSummary {
    pub movement_id: MovementId,
    pub kind: String,
    /// Net change to on-hand; zero for transfers and reservations.
    pub delta: i64,
    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
    pub recorded_at: DateTime<Utc>,
}

/// Internal state for the movement history view.
struct MovementHistoryState {
    /// Newest movement at the front of each deque.
    history: HashMap<ProductId, VecDeque<MovementSummary>>,
    position: ProjectionPosition,
}

/// Read model view of recent movements per product.
///
/// Retention is bounded: once a product's history exceeds the configured
/// limit the oldest summaries are dropped. The ledger itself remains the
/// complete record.
#[derive(Clone)]
pub struct MovementHistoryView {
    retention: usize,
    state: Arc<RwLock<MovementHistoryState>>,
}

impl MovementHistoryView {
    /// Creates a new view with the default retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Creates a new view keeping at most `retention` movements per product.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            state: Arc::new(RwLock::new(MovementHistoryState {
                history: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets a product's recent movements, newest first.
    pub async fn recent(&self, product_id: ProductId) -> Vec<MovementSummary> {
        self.state
            .read()
            .await
            .history
            .get(&product_id)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Gets a product's most recent movement.
    pub async fn latest(&self, product_id: ProductId) -> Option<MovementSummary> {
        self.state
            .read()
            .await
            .history
            .get(&product_id)
            .and_then(|d| d.front().cloned())
    }
}

impl Default for MovementHistoryView {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the summary-relevant fields from an event, skipping entries
/// that are not movements (registration and threshold changes).
fn summarize(entry: &LedgerEntry, event: &StockEvent) -> Option<MovementSummary> {
    let (reference, note, actor) = match event {
        StockEvent::Received(data) | StockEvent::Returned(data) | StockEvent::Issued(data) => {
            (data.reference.clone(), data.note.clone(), data.actor)
        }
        StockEvent::Adjusted(data) => (data.reference.clone(), data.note.clone(), data.actor),
        StockEvent::Transferred(data) => (data.reference.clone(), data.note.clone(), data.actor),
        StockEvent::Reserved(data) | StockEvent::Released(data) => {
            (data.reference.clone(), data.note.clone(), data.actor)
        }
        StockEvent::Registered(_) | StockEvent::ThresholdsChanged(_) => return None,
    };

    Some(MovementSummary {
        movement_id: entry.movement_id,
        kind: entry.entry_type.clone(),
        delta: event.signed_delta(),
        reference,
        note,
        actor,
        recorded_at: entry.recorded_at,
    })
}

#[async_trait]
impl Projection for MovementHistoryView {
    fn name(&self) -> &'static str {
        "MovementHistoryView"
    }

    async fn handle(&self, entry: &LedgerEntry) -> Result<()> {
        let event: StockEvent = serde_json::from_value(entry.payload.clone())?;

        let mut state = self.state.write().await;

        if let Some(summary) = summarize(entry, &event) {
            let history = state.history.entry(entry.product_id).or_default();
            history.push_front(summary);
            history.truncate(self.retention);
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.history.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for MovementHistoryView {
    fn name(&self) -> &'static str {
        "MovementHistoryView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.history.values().map(VecDeque::len).sum())
            .unwrap_or(0)
    }
}
