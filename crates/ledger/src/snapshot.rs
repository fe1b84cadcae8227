use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::ProductId;

use crate::Sequence;

/// A materialized snapshot of a product's stock state at a ledger position.
///
/// Snapshots let a product's state be restored without replaying its whole
/// ledger; replay from the start remains the oracle for reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The product this snapshot belongs to.
    pub product_id: ProductId,

    /// The ledger sequence at the time of the snapshot.
    pub sequence: Sequence,

    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// The serialized stock state.
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a new snapshot.
    pub fn new(product_id: ProductId, sequence: Sequence, state: serde_json::Value) -> Self {
        Self {
            product_id,
            sequence,
            taken_at: Utc::now(),
            state,
        }
    }

    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        product_id: ProductId,
        sequence: Sequence,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            product_id,
            sequence,
            taken_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the snapshot state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }

    /// Gets a reference to the state as JSON.
    pub fn state_ref(&self) -> &serde_json::Value {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestState {
        on_hand: i64,
        reserved: i64,
    }

    #[test]
    fn snapshot_new() {
        let id = ProductId::new();
        let state = serde_json::json!({"on_hand": 42});

        let snapshot = Snapshot::new(id, Sequence::new(5), state.clone());

        assert_eq!(snapshot.product_id, id);
        assert_eq!(snapshot.sequence, Sequence::new(5));
        assert_eq!(snapshot.state, state);
    }

    #[test]
    fn snapshot_from_state_and_into_state() {
        let id = ProductId::new();
        let original = TestState {
            on_hand: 42,
            reserved: 7,
        };

        let snapshot = Snapshot::from_state(id, Sequence::new(5), &original).unwrap();

        let restored: TestState = snapshot.into_state().unwrap();
        assert_eq!(restored, original);
    }
}
