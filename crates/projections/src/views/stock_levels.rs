//! Stock levels read model — current quantities per product.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ProductId;
use domain::StockEvent;
use ledger::LedgerEntry;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Current stock level for a single product.
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub warehouse_location: String,
    pub on_hand: i64,
    pub reserved: i64,
    pub available: i64,
    pub minimum_stock: i64,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub last_movement_at: Option<DateTime<Utc>>,
}

impl StockLevel {
    /// True when the available quantity has fallen to the reorder point
    /// (or the minimum stock level when no reorder point is set).
    pub fn is_low_stock(&self) -> bool {
        self.available <= self.reorder_point.unwrap_or(self.minimum_stock)
    }
}

/// Internal state for the stock levels view.
struct StockLevelsState {
    levels: HashMap<ProductId, StockLevel>,
    position: ProjectionPosition,
}

/// Read model view of current stock levels across all products.
#[derive(Clone)]
pub struct StockLevelsView {
    state: Arc<RwLock<StockLevelsState>>,
}

impl StockLevelsView {
    /// Creates a new empty stock levels view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StockLevelsState {
                levels: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Gets the level for a specific product.
    pub async fn get(&self, product_id: ProductId) -> Option<StockLevel> {
        self.state.read().await.levels.get(&product_id).cloned()
    }

    /// Gets all product levels, ordered by location then product id.
    pub async fn all(&self) -> Vec<StockLevel> {
        let state = self.state.read().await;
        let mut levels: Vec<_> = state.levels.values().cloned().collect();
        levels.sort_by(|a, b| {
            a.warehouse_location
                .cmp(&b.warehouse_location)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        levels
    }

    /// Gets the products whose available quantity is at or below their
    /// reorder threshold.
    pub async fn low_stock(&self) -> Vec<StockLevel> {
        let state = self.state.read().await;
        let mut levels: Vec<_> = state
            .levels
            .values()
            .filter(|l| l.is_low_stock())
            .cloned()
            .collect();
        levels.sort_by_key(|l| l.available);
        levels
    }
}

impl Default for StockLevelsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for StockLevelsView {
    fn name(&self) -> &'static str {
        "StockLevelsView"
    }

    async fn handle(&self, entry: &LedgerEntry) -> Result<()> {
        let event: StockEvent = serde_json::from_value(entry.payload.clone())?;
        let product_id = entry.product_id;

        let mut state = self.state.write().await;

        match event {
            StockEvent::Registered(data) => {
                state.levels.insert(
                    product_id,
                    StockLevel {
                        product_id,
                        warehouse_location: data.warehouse_location,
                        on_hand: 0,
                        reserved: 0,
                        available: 0,
                        minimum_stock: data.minimum_stock,
                        maximum_stock: data.maximum_stock,
                        reorder_point: data.reorder_point,
                        last_movement_at: None,
                    },
                );
            }
            StockEvent::ThresholdsChanged(data) => {
                if let Some(level) = state.levels.get_mut(&product_id) {
                    level.minimum_stock = data.minimum_stock;
                    level.maximum_stock = data.maximum_stock;
                    level.reorder_point = data.reorder_point;
                }
            }
            StockEvent::Transferred(ref data) => {
                if let Some(level) = state.levels.get_mut(&product_id) {
                    level.warehouse_location = data.to_location.clone();
                    level.last_movement_at = Some(entry.recorded_at);
                }
            }
            StockEvent::Reserved(ref data) => {
                if let Some(level) = state.levels.get_mut(&product_id) {
                    level.reserved += data.quantity;
                    level.available = level.on_hand - level.reserved;
                    level.last_movement_at = Some(entry.recorded_at);
                }
            }
            StockEvent::Released(ref data) => {
                if let Some(level) = state.levels.get_mut(&product_id) {
                    level.reserved -= data.quantity;
                    level.available = level.on_hand - level.reserved;
                    level.last_movement_at = Some(entry.recorded_at);
                }
            }
            ref movement => {
                if let Some(level) = state.levels.get_mut(&product_id) {
                    level.on_hand += movement.signed_delta();
                    level.available = level.on_hand - level.reserved;
                    level.last_movement_at = Some(entry.recorded_at);
                }
            }
        }

        state.position = state.position.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.levels.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for StockLevelsView {
    fn name(&self) -> &'static str {
        "StockLevelsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.levels.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainEvent;
    use domain::stock::MovementDetails;
    use ledger::Sequence;

    fn make_entry(product_id: ProductId, sequence: i64, event: &StockEvent) -> LedgerEntry {
        LedgerEntry::builder()
            .product_id(product_id)
            .entry_type(event.event_type())
            .sequence(Sequence::new(sequence))
            .payload(event)
            .unwrap()
            .build()
    }

    async fn register_product(view: &StockLevelsView, product_id: ProductId) {
        let event = StockEvent::registered(product_id, "A-01", 5, Some(100), Some(10), None);
        view.handle(&make_entry(product_id, 1, &event)).await.unwrap();
    }

    #[tokio::test]
    async fn registered_creates_zero_level() {
        let view = StockLevelsView::new();
        let product_id = ProductId::new();
        register_product(&view, product_id).await;

        let level = view.get(product_id).await.unwrap();
        assert_eq!(level.on_hand, 0);
        assert_eq!(level.warehouse_location, "A-01");
        assert_eq!(level.reorder_point, Some(10));
        assert!(level.last_movement_at.is_none());
    }

    #[tokio::test]
    async fn movements_update_quantities() {
        let view = StockLevelsView::new();
        let product_id = ProductId::new();
        register_product(&view, product_id).await;

        let event = StockEvent::received(100, MovementDetails::default());
        view.handle(&make_entry(product_id, 2, &event)).await.unwrap();

        let event = StockEvent::issued(30, MovementDetails::default());
        view.handle(&make_entry(product_id, 3, &event)).await.unwrap();

        let event = StockEvent::reserved(20, MovementDetails::default());
        view.handle(&make_entry(product_id, 4, &event)).await.unwrap();

        let level = view.get(product_id).await.unwrap();
        assert_eq!(level.on_hand, 70);
        assert_eq!(level.reserved, 20);
        assert_eq!(level.available, 50);
        assert!(level.last_movement_at.is_some());
    }

    #[tokio::test]
    async fn transfer_moves_location() {
        let view = StockLevelsView::new();
        let product_id = ProductId::new();
        register_product(&view, product_id).await;

        let event = StockEvent::transferred(0, "B-09", MovementDetails::default());
        view.handle(&make_entry(product_id, 2, &event)).await.unwrap();

        let level = view.get(product_id).await.unwrap();
        assert_eq!(level.warehouse_location, "B-09");
        assert_eq!(level.on_hand, 0);
    }

    #[tokio::test]
    async fn low_stock_uses_reorder_point_then_minimum() {
        let view = StockLevelsView::new();

        // Reorder point 10: low at 10 available
        let with_reorder = ProductId::new();
        register_product(&view, with_reorder).await;
        let event = StockEvent::received(10, MovementDetails::default());
        view.handle(&make_entry(with_reorder, 2, &event)).await.unwrap();

        // No reorder point: falls back to minimum 5
        let without_reorder = ProductId::new();
        let event = StockEvent::registered(without_reorder, "A-02", 5, None, None, None);
        view.handle(&make_entry(without_reorder, 1, &event)).await.unwrap();
        let event = StockEvent::received(6, MovementDetails::default());
        view.handle(&make_entry(without_reorder, 2, &event)).await.unwrap();

        let low = view.low_stock().await;
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, with_reorder);

        // Drop the second product to its minimum
        let event = StockEvent::issued(1, MovementDetails::default());
        view.handle(&make_entry(without_reorder, 3, &event)).await.unwrap();
        assert_eq!(view.low_stock().await.len(), 2);
    }

    #[tokio::test]
    async fn thresholds_changed_updates_level() {
        let view = StockLevelsView::new();
        let product_id = ProductId::new();
        register_product(&view, product_id).await;

        let event = StockEvent::thresholds_changed(1, Some(20), Some(2), None);
        view.handle(&make_entry(product_id, 2, &event)).await.unwrap();

        let level = view.get(product_id).await.unwrap();
        assert_eq!(level.minimum_stock, 1);
        assert_eq!(level.maximum_stock, Some(20));
        assert_eq!(level.reorder_point, Some(2));
    }

    #[tokio::test]
    async fn all_is_ordered_by_location() {
        let view = StockLevelsView::new();

        let b = ProductId::new();
        let event = StockEvent::registered(b, "B-01", 0, None, None, None);
        view.handle(&make_entry(b, 1, &event)).await.unwrap();

        let a = ProductId::new();
        let event = StockEvent::registered(a, "A-01", 0, None, None, None);
        view.handle(&make_entry(a, 1, &event)).await.unwrap();

        let all = view.all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].warehouse_location, "A-01");
        assert_eq!(all[1].warehouse_location, "B-01");
    }

    #[tokio::test]
    async fn reset_clears_levels() {
        let view = StockLevelsView::new();
        let product_id = ProductId::new();
        register_product(&view, product_id).await;

        view.reset().await.unwrap();

        assert!(view.get(product_id).await.is_none());
        assert_eq!(view.position().await.entries_processed, 0);
    }
}
