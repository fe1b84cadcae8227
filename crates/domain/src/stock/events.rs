//! Stock movement events.

use chrono::{DateTime, Utc};
use common::{ActorId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Money, MovementRef};

/// Events that can occur on a stock item.
///
/// Movement events carry the net change to on-hand in `signed_delta`; ledger
/// replay of these deltas from zero must reproduce the current level exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StockEvent {
    /// Stock record was created for a product.
    Registered(RegisteredData),

    /// Minimum/maximum/reorder-point thresholds were changed.
    ThresholdsChanged(ThresholdsChangedData),

    /// Stock came in from a supplier.
    Received(MovementData),

    /// Previously issued stock came back.
    Returned(MovementData),

    /// Stock went out.
    Issued(MovementData),

    /// Count was corrected by a signed delta.
    Adjusted(AdjustedData),

    /// Stock was moved to a different warehouse location.
    Transferred(TransferredData),

    /// Stock was reserved against future issue.
    Reserved(ReservationData),

    /// A reservation was released.
    Released(ReservationData),
}

impl DomainEvent for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::Registered(_) => "Registered",
            StockEvent::ThresholdsChanged(_) => "ThresholdsChanged",
            StockEvent::Received(_) => "Received",
            StockEvent::Returned(_) => "Returned",
            StockEvent::Issued(_) => "Issued",
            StockEvent::Adjusted(_) => "Adjusted",
            StockEvent::Transferred(_) => "Transferred",
            StockEvent::Reserved(_) => "Reserved",
            StockEvent::Released(_) => "Released",
        }
    }
}

impl StockEvent {
    /// Net change to on-hand caused by this event.
    ///
    /// Summing this over a product's ledger reproduces its on-hand level.
    pub fn signed_delta(&self) -> i64 {
        match self {
            StockEvent::Received(data) | StockEvent::Returned(data) => data.quantity,
            StockEvent::Issued(data) => -data.quantity,
            StockEvent::Adjusted(data) => data.delta,
            StockEvent::Registered(_)
            | StockEvent::ThresholdsChanged(_)
            | StockEvent::Transferred(_)
            | StockEvent::Reserved(_)
            | StockEvent::Released(_) => 0,
        }
    }
}

/// Data for the Registered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredData {
    /// The product being registered.
    pub product_id: ProductId,

    /// Where the stock is kept.
    pub warehouse_location: String,

    /// Level below which the item counts as low stock.
    pub minimum_stock: i64,

    /// Optional ceiling for replenishment.
    pub maximum_stock: Option<i64>,

    /// Optional explicit reorder trigger.
    pub reorder_point: Option<i64>,

    /// Who registered the product.
    pub actor: Option<ActorId>,

    /// When the product was registered.
    pub registered_at: DateTime<Utc>,
}

/// Data for the ThresholdsChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsChangedData {
    pub minimum_stock: i64,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub actor: Option<ActorId>,
    pub changed_at: DateTime<Utc>,
}

/// Data shared by the Received, Returned, and Issued movement events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementData {
    /// Quantity moved (always positive; the sign comes from the kind).
    pub quantity: i64,

    /// Cost per unit at the time of the movement.
    pub unit_cost: Option<Money>,

    /// Document that caused the movement.
    pub reference: Option<MovementRef>,

    /// Free-form note.
    pub note: Option<String>,

    /// Who recorded the movement.
    pub actor: Option<ActorId>,

    /// When the movement happened.
    pub occurred_at: DateTime<Utc>,
}

/// Data for the Adjusted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustedData {
    /// Signed correction to on-hand, e.g. -3 for shrinkage found at stocktake.
    pub delta: i64,

    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for the Transferred event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferredData {
    /// Quantity moved to the new location.
    pub quantity: i64,

    /// The destination warehouse location.
    pub to_location: String,

    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
    pub occurred_at: DateTime<Utc>,
}

/// Data for the Reserved and Released events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationData {
    /// Quantity reserved or released (always positive).
    pub quantity: i64,

    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
    pub occurred_at: DateTime<Utc>,
}

// Convenience constructors
impl StockEvent {
    /// Creates a Registered event.
    pub fn registered(
        product_id: ProductId,
        warehouse_location: impl Into<String>,
        minimum_stock: i64,
        maximum_stock: Option<i64>,
        reorder_point: Option<i64>,
        actor: Option<ActorId>,
    ) -> Self {
        StockEvent::Registered(RegisteredData {
            product_id,
            warehouse_location: warehouse_location.into(),
            minimum_stock,
            maximum_stock,
            reorder_point,
            actor,
            registered_at: Utc::now(),
        })
    }

    /// Creates a ThresholdsChanged event.
    pub fn thresholds_changed(
        minimum_stock: i64,
        maximum_stock: Option<i64>,
        reorder_point: Option<i64>,
        actor: Option<ActorId>,
    ) -> Self {
        StockEvent::ThresholdsChanged(ThresholdsChangedData {
            minimum_stock,
            maximum_stock,
            reorder_point,
            actor,
            changed_at: Utc::now(),
        })
    }

    /// Creates a Received event.
    pub fn received(quantity: i64, details: MovementDetails) -> Self {
        StockEvent::Received(details.into_movement(quantity))
    }

    /// Creates a Returned event.
    pub fn returned(quantity: i64, details: MovementDetails) -> Self {
        StockEvent::Returned(details.into_movement(quantity))
    }

    /// Creates an Issued event.
    pub fn issued(quantity: i64, details: MovementDetails) -> Self {
        StockEvent::Issued(details.into_movement(quantity))
    }

    /// Creates an Adjusted event.
    pub fn adjusted(delta: i64, details: MovementDetails) -> Self {
        StockEvent::Adjusted(AdjustedData {
            delta,
            reference: details.reference,
            note: details.note,
            actor: details.actor,
            occurred_at: Utc::now(),
        })
    }

    /// Creates a Transferred event.
    pub fn transferred(quantity: i64, to_location: impl Into<String>, details: MovementDetails) -> Self {
        StockEvent::Transferred(TransferredData {
            quantity,
            to_location: to_location.into(),
            reference: details.reference,
            note: details.note,
            actor: details.actor,
            occurred_at: Utc::now(),
        })
    }

    /// Creates a Reserved event.
    pub fn reserved(quantity: i64, details: MovementDetails) -> Self {
        StockEvent::Reserved(details.into_reservation(quantity))
    }

    /// Creates a Released event.
    pub fn released(quantity: i64, details: MovementDetails) -> Self {
        StockEvent::Released(details.into_reservation(quantity))
    }
}

/// Optional audit details shared by the movement constructors.
#[derive(Debug, Clone, Default)]
pub struct MovementDetails {
    pub unit_cost: Option<Money>,
    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
}

impl MovementDetails {
    fn into_movement(self, quantity: i64) -> MovementData {
        MovementData {
            quantity,
            unit_cost: self.unit_cost,
            reference: self.reference,
            note: self.note,
            actor: self.actor,
            occurred_at: Utc::now(),
        }
    }

    fn into_reservation(self, quantity: i64) -> ReservationData {
        ReservationData {
            quantity,
            reference: self.reference,
            note: self.note,
            actor: self.actor,
            occurred_at: Utc::now(),
        }
    }
}
