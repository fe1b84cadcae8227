//! Stock commands.

use common::{ActorId, ProductId};

use crate::command::Command;

use super::{Money, MovementDetails, MovementRef, StockItem};

/// Command to register a product in the stock ledger.
#[derive(Debug, Clone)]
pub struct RegisterStock {
    /// The product to register.
    pub product_id: ProductId,

    /// Where the stock will be kept.
    pub warehouse_location: String,

    /// Level below which the item counts as low stock.
    pub minimum_stock: i64,

    /// Optional ceiling for replenishment.
    pub maximum_stock: Option<i64>,

    /// Optional explicit reorder trigger.
    pub reorder_point: Option<i64>,

    /// Who is registering the product.
    pub actor: Option<ActorId>,
}

impl RegisterStock {
    /// Creates a new RegisterStock command with default thresholds.
    pub fn new(product_id: ProductId, warehouse_location: impl Into<String>) -> Self {
        Self {
            product_id,
            warehouse_location: warehouse_location.into(),
            minimum_stock: 0,
            maximum_stock: None,
            reorder_point: None,
            actor: None,
        }
    }

    /// Sets the thresholds.
    pub fn with_thresholds(
        mut self,
        minimum_stock: i64,
        maximum_stock: Option<i64>,
        reorder_point: Option<i64>,
    ) -> Self {
        self.minimum_stock = minimum_stock;
        self.maximum_stock = maximum_stock;
        self.reorder_point = reorder_point;
        self
    }

    /// Sets the acting user.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }
}

impl Command for RegisterStock {
    type Aggregate = StockItem;

    fn product_id(&self) -> ProductId {
        self.product_id
    }
}

/// A quantity movement command shared by receive, return, and issue.
#[derive(Debug, Clone)]
pub struct MoveStock {
    /// The product being moved.
    pub product_id: ProductId,

    /// Quantity moved (positive).
    pub quantity: i64,

    /// Cost per unit at movement time.
    pub unit_cost: Option<Money>,

    /// Document that caused the movement.
    pub reference: Option<MovementRef>,

    /// Free-form note.
    pub note: Option<String>,

    /// Who recorded the movement.
    pub actor: Option<ActorId>,
}

impl MoveStock {
    /// Creates a new movement command.
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_cost: None,
            reference: None,
            note: None,
            actor: None,
        }
    }

    /// Sets the unit cost.
    pub fn at_cost(mut self, unit_cost: Money) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    /// Sets the causing document reference.
    pub fn with_reference(mut self, reference: MovementRef) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the acting user.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Converts to the audit details carried on the produced event.
    pub fn details(&self) -> MovementDetails {
        MovementDetails {
            unit_cost: self.unit_cost,
            reference: self.reference.clone(),
            note: self.note.clone(),
            actor: self.actor,
        }
    }
}

impl Command for MoveStock {
    type Aggregate = StockItem;

    fn product_id(&self) -> ProductId {
        self.product_id
    }
}

/// Command to receive stock. Same shape as the other quantity movements.
pub type ReceiveStock = MoveStock;

/// Command to issue stock.
pub type IssueStock = MoveStock;

/// Command to return previously issued stock.
pub type ReturnStock = MoveStock;

/// Command to reserve stock.
pub type ReserveStock = MoveStock;

/// Command to release a reservation.
pub type ReleaseStock = MoveStock;

/// Command to correct the count by a signed delta.
#[derive(Debug, Clone)]
pub struct AdjustStock {
    /// The product being adjusted.
    pub product_id: ProductId,

    /// Signed correction to on-hand.
    pub delta: i64,

    /// Document that caused the adjustment.
    pub reference: Option<MovementRef>,

    /// Free-form note.
    pub note: Option<String>,

    /// Who recorded the adjustment.
    pub actor: Option<ActorId>,
}

impl AdjustStock {
    /// Creates a new AdjustStock command.
    pub fn new(product_id: ProductId, delta: i64) -> Self {
        Self {
            product_id,
            delta,
            reference: None,
            note: None,
            actor: None,
        }
    }

    /// Sets a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the acting user.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Converts to the audit details carried on the produced event.
    pub fn details(&self) -> MovementDetails {
        MovementDetails {
            unit_cost: None,
            reference: self.reference.clone(),
            note: self.note.clone(),
            actor: self.actor,
        }
    }
}

impl Command for AdjustStock {
    type Aggregate = StockItem;

    fn product_id(&self) -> ProductId {
        self.product_id
    }
}

/// Command to move stock to another warehouse location.
#[derive(Debug, Clone)]
pub struct TransferStock {
    /// The product being transferred.
    pub product_id: ProductId,

    /// Quantity moved (positive).
    pub quantity: i64,

    /// The destination warehouse location.
    pub to_location: String,

    /// Free-form note.
    pub note: Option<String>,

    /// Who recorded the transfer.
    pub actor: Option<ActorId>,
}

impl TransferStock {
    /// Creates a new TransferStock command.
    pub fn new(product_id: ProductId, quantity: i64, to_location: impl Into<String>) -> Self {
        Self {
            product_id,
            quantity,
            to_location: to_location.into(),
            note: None,
            actor: None,
        }
    }

    /// Sets a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the acting user.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Converts to the audit details carried on the produced event.
    pub fn details(&self) -> MovementDetails {
        MovementDetails {
            unit_cost: None,
            reference: None,
            note: self.note.clone(),
            actor: self.actor,
        }
    }
}

impl Command for TransferStock {
    type Aggregate = StockItem;

    fn product_id(&self) -> ProductId {
        self.product_id
    }
}

/// Command to change the replenishment thresholds.
#[derive(Debug, Clone)]
pub struct SetThresholds {
    /// The product whose thresholds change.
    pub product_id: ProductId,

    /// New minimum stock level.
    pub minimum_stock: i64,

    /// New maximum stock level.
    pub maximum_stock: Option<i64>,

    /// New reorder point.
    pub reorder_point: Option<i64>,

    /// Who changed the thresholds.
    pub actor: Option<ActorId>,
}

impl SetThresholds {
    /// Creates a new SetThresholds command.
    pub fn new(product_id: ProductId, minimum_stock: i64) -> Self {
        Self {
            product_id,
            minimum_stock,
            maximum_stock: None,
            reorder_point: None,
            actor: None,
        }
    }

    /// Sets the maximum stock level.
    pub fn with_maximum(mut self, maximum_stock: i64) -> Self {
        self.maximum_stock = Some(maximum_stock);
        self
    }

    /// Sets the reorder point.
    pub fn with_reorder_point(mut self, reorder_point: i64) -> Self {
        self.reorder_point = Some(reorder_point);
        self
    }

    /// Sets the acting user.
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }
}

impl Command for SetThresholds {
    type Aggregate = StockItem;

    fn product_id(&self) -> ProductId {
        self.product_id
    }
}
