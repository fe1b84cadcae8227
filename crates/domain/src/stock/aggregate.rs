//! StockItem aggregate implementation.

use common::{ActorId, ProductId};
use ledger::Sequence;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    MovementDetails, StockError, StockEvent,
    events::{RegisteredData, ThresholdsChangedData},
};

/// Stock aggregate root, one per product.
///
/// Holds the derived snapshot of a product's stock: current quantities,
/// location, and thresholds. State changes only by applying StockEvents;
/// the invariants `on_hand >= 0` and `0 <= reserved <= on_hand` hold after
/// every committed event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockItem {
    /// The product this record tracks.
    id: Option<ProductId>,

    /// Current ledger sequence for optimistic concurrency.
    #[serde(default)]
    sequence: Sequence,

    /// Where the stock is kept.
    warehouse_location: String,

    /// Physical quantity on the shelf.
    on_hand: i64,

    /// Quantity promised but not yet issued.
    reserved: i64,

    /// Level below which the item counts as low stock.
    minimum_stock: i64,

    /// Optional ceiling for replenishment.
    maximum_stock: Option<i64>,

    /// Optional explicit reorder trigger.
    reorder_point: Option<i64>,
}

impl Aggregate for StockItem {
    type Event = StockEvent;
    type Error = StockError;

    fn aggregate_type() -> &'static str {
        "StockItem"
    }

    fn id(&self) -> Option<ProductId> {
        self.id
    }

    fn sequence(&self) -> Sequence {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: Sequence) {
        self.sequence = sequence;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            StockEvent::Registered(data) => self.apply_registered(data),
            StockEvent::ThresholdsChanged(data) => self.apply_thresholds_changed(data),
            StockEvent::Transferred(data) => {
                self.warehouse_location = data.to_location;
            }
            StockEvent::Reserved(data) => {
                self.reserved += data.quantity;
            }
            StockEvent::Released(data) => {
                self.reserved -= data.quantity;
            }
            // All quantity movements reduce to their signed delta
            ref movement => {
                self.on_hand += movement.signed_delta();
            }
        }
    }
}

impl SnapshotCapable for StockItem {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl StockItem {
    /// Returns the warehouse location.
    pub fn warehouse_location(&self) -> &str {
        &self.warehouse_location
    }

    /// Returns the on-hand quantity.
    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    /// Returns the reserved quantity.
    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Returns the quantity free to issue or reserve.
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    /// Returns the minimum stock threshold.
    pub fn minimum_stock(&self) -> i64 {
        self.minimum_stock
    }

    /// Returns the maximum stock threshold, if set.
    pub fn maximum_stock(&self) -> Option<i64> {
        self.maximum_stock
    }

    /// Returns the reorder point, if set.
    pub fn reorder_point(&self) -> Option<i64> {
        self.reorder_point
    }

    /// Whether the item needs replenishing.
    ///
    /// Uses the reorder point when set, otherwise the minimum stock level.
    pub fn is_low_stock(&self) -> bool {
        let threshold = self.reorder_point.unwrap_or(self.minimum_stock);
        self.available() <= threshold
    }
}

// Command methods (return events)
impl StockItem {
    /// Registers the product in the stock ledger.
    pub fn register(
        &self,
        product_id: ProductId,
        warehouse_location: impl Into<String>,
        minimum_stock: i64,
        maximum_stock: Option<i64>,
        reorder_point: Option<i64>,
        actor: Option<ActorId>,
    ) -> Result<Vec<StockEvent>, StockError> {
        if self.id.is_some() {
            return Err(StockError::AlreadyRegistered);
        }

        validate_thresholds(minimum_stock, maximum_stock)?;

        Ok(vec![StockEvent::registered(
            product_id,
            warehouse_location,
            minimum_stock,
            maximum_stock,
            reorder_point,
            actor,
        )])
    }

    /// Records incoming stock from a supplier.
    pub fn receive(
        &self,
        quantity: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        Ok(vec![StockEvent::received(quantity, details)])
    }

    /// Records stock coming back after an issue.
    pub fn return_stock(
        &self,
        quantity: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        Ok(vec![StockEvent::returned(quantity, details)])
    }

    /// Records outgoing stock.
    ///
    /// Fails if the issue would drive on-hand below the reserved floor.
    pub fn issue(
        &self,
        quantity: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        if quantity > self.available() {
            return Err(StockError::InsufficientStock {
                requested: quantity,
                available: self.available(),
            });
        }

        Ok(vec![StockEvent::issued(quantity, details)])
    }

    /// Corrects the count by a signed delta (e.g. stocktake shrinkage).
    ///
    /// A zero delta is rejected; a negative delta honours the same floor
    /// guard as an issue.
    pub fn adjust(
        &self,
        delta: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;

        if delta == 0 {
            return Err(StockError::InvalidQuantity { quantity: delta });
        }

        if delta < 0 && -delta > self.available() {
            return Err(StockError::InsufficientStock {
                requested: -delta,
                available: self.available(),
            });
        }

        Ok(vec![StockEvent::adjusted(delta, details)])
    }

    /// Moves stock to a different warehouse location.
    ///
    /// The total quantity is unchanged; only the location metadata moves.
    pub fn transfer(
        &self,
        quantity: i64,
        to_location: impl Into<String>,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        if quantity > self.on_hand {
            return Err(StockError::InsufficientStock {
                requested: quantity,
                available: self.on_hand,
            });
        }

        Ok(vec![StockEvent::transferred(quantity, to_location, details)])
    }

    /// Reserves stock against a future issue.
    pub fn reserve(
        &self,
        quantity: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        if self.reserved + quantity > self.on_hand {
            return Err(StockError::ReservationExceedsStock {
                requested: quantity,
                available: self.available(),
            });
        }

        Ok(vec![StockEvent::reserved(quantity, details)])
    }

    /// Releases a previous reservation.
    pub fn release(
        &self,
        quantity: i64,
        details: MovementDetails,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        require_positive(quantity)?;

        if quantity > self.reserved {
            return Err(StockError::ReleaseExceedsReserved {
                requested: quantity,
                reserved: self.reserved,
            });
        }

        Ok(vec![StockEvent::released(quantity, details)])
    }

    /// Changes the replenishment thresholds.
    pub fn set_thresholds(
        &self,
        minimum_stock: i64,
        maximum_stock: Option<i64>,
        reorder_point: Option<i64>,
        actor: Option<ActorId>,
    ) -> Result<Vec<StockEvent>, StockError> {
        self.require_registered()?;
        validate_thresholds(minimum_stock, maximum_stock)?;

        Ok(vec![StockEvent::thresholds_changed(
            minimum_stock,
            maximum_stock,
            reorder_point,
            actor,
        )])
    }

    fn require_registered(&self) -> Result<(), StockError> {
        if self.id.is_none() {
            return Err(StockError::NotRegistered);
        }
        Ok(())
    }
}

fn require_positive(quantity: i64) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::InvalidQuantity { quantity });
    }
    Ok(())
}

fn validate_thresholds(minimum: i64, maximum: Option<i64>) -> Result<(), StockError> {
    let max_below_min = maximum.is_some_and(|max| max < minimum);
    if minimum < 0 || max_below_min {
        return Err(StockError::InvalidThresholds { minimum, maximum });
    }
    Ok(())
}

// Apply event helpers
impl StockItem {
    fn apply_registered(&mut self, data: RegisteredData) {
        self.id = Some(data.product_id);
        self.warehouse_location = data.warehouse_location;
        self.minimum_stock = data.minimum_stock;
        self.maximum_stock = data.maximum_stock;
        self.reorder_point = data.reorder_point;
    }

    fn apply_thresholds_changed(&mut self, data: ThresholdsChangedData) {
        self.minimum_stock = data.minimum_stock;
        self.maximum_stock = data.maximum_stock;
        self.reorder_point = data.reorder_point;
    }
}
