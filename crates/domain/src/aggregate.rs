//! Core aggregate and domain event traits.

use common::ProductId;
use ledger::Sequence;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and ledger filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates rebuilt from the movement ledger.
///
/// An aggregate is a cluster of domain objects that can be treated as a single unit.
/// The aggregate root ensures consistency of changes being made within the aggregate.
///
/// In this system, aggregates:
/// - Are rebuilt by replaying ledger entries
/// - Generate events from commands
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the product this aggregate tracks.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<ProductId>;

    /// Returns the current ledger sequence of the aggregate.
    ///
    /// The sequence starts at 0 for a new aggregate and increments with each entry.
    fn sequence(&self) -> Sequence;

    /// Sets the aggregate sequence.
    ///
    /// Called by the command handler after loading entries.
    fn set_sequence(&mut self, sequence: Sequence);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Trait for aggregates that support snapshotting.
///
/// Snapshotting is an optimization to avoid replaying the whole ledger when
/// loading an aggregate. The aggregate state is periodically serialized and
/// stored; replay from the start remains the oracle for reconciliation.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Returns the snapshot interval (number of entries between snapshots).
    fn snapshot_interval() -> usize {
        100
    }

    /// Returns whether a snapshot should be taken at the current sequence.
    fn should_snapshot(&self) -> bool {
        self.sequence().as_i64() > 0
            && (self.sequence().as_i64() as usize).is_multiple_of(Self::snapshot_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened { product_id: ProductId },
        Counted { value: i64 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "TestOpened",
                TestEvent::Counted { .. } => "TestCounted",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TestAggregate {
        id: Option<ProductId>,
        value: i64,
        sequence: Sequence,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
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
                TestEvent::Opened { product_id } => {
                    if self.id.is_none() {
                        self.id = Some(product_id);
                    }
                }
                TestEvent::Counted { value } => {
                    self.value = value;
                }
            }
        }
    }

    impl SnapshotCapable for TestAggregate {}

    #[test]
    fn aggregate_apply_events() {
        let mut aggregate = TestAggregate::default();
        let events = vec![
            TestEvent::Opened {
                product_id: ProductId::new(),
            },
            TestEvent::Counted { value: 42 },
        ];

        aggregate.apply_events(events);

        assert!(aggregate.id().is_some());
        assert_eq!(aggregate.value, 42);
    }

    #[test]
    fn domain_event_type() {
        let event = TestEvent::Opened {
            product_id: ProductId::new(),
        };
        assert_eq!(event.event_type(), "TestOpened");

        let event = TestEvent::Counted { value: 42 };
        assert_eq!(event.event_type(), "TestCounted");
    }

    #[test]
    fn snapshot_interval() {
        let mut aggregate = TestAggregate::default();
        assert!(!aggregate.should_snapshot());

        aggregate.set_sequence(Sequence::new(100));
        assert!(aggregate.should_snapshot());

        aggregate.set_sequence(Sequence::new(101));
        assert!(!aggregate.should_snapshot());
    }
}
