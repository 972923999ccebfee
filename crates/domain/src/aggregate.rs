//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced aggregates.
///
/// An aggregate is the consistency boundary for a cluster of domain state:
/// a booking with its totals, or the full seat inventory of one screening.
/// Commands validate against current state and produce events; `apply`
/// folds events back into state.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used for event store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 for a new aggregate and increments with each event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and deterministic: events are facts, so this must not
    /// fail and must not have side effects.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened,
        Bumped { by: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened => "Opened",
                TestEvent::Bumped { .. } => "Bumped",
            }
        }
    }

    #[derive(Debug, Default)]
    struct TestAggregate {
        id: Option<AggregateId>,
        counter: i32,
        version: Version,
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

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Opened => {
                    if self.id.is_none() {
                        self.id = Some(AggregateId::new());
                    }
                }
                TestEvent::Bumped { by } => {
                    self.counter += by;
                }
            }
        }
    }

    #[test]
    fn apply_events_folds_in_order() {
        let mut aggregate = TestAggregate::default();
        aggregate.apply_events(vec![
            TestEvent::Opened,
            TestEvent::Bumped { by: 2 },
            TestEvent::Bumped { by: 3 },
        ]);

        assert!(aggregate.id().is_some());
        assert_eq!(aggregate.counter, 5);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(TestEvent::Opened.event_type(), "Opened");
        assert_eq!(TestEvent::Bumped { by: 1 }.event_type(), "Bumped");
    }
}
