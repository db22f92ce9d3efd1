//! Core aggregate and domain event traits.

use std::fmt::Debug;

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::command::Command;
use crate::publisher::EventPublisher;

/// Trait for domain events.
///
/// Domain events represent facts that have happened to one aggregate instance.
/// They are immutable, named in past tense, and compared structurally.
pub trait DomainEvent:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Returns the event type name.
    ///
    /// This is the `event_type` column of the stored event.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate this event belongs to.
    fn aggregate_id(&self) -> AggregateId;
}

/// Ordered buffer of events produced but not yet appended to the event store.
///
/// Only the aggregate machinery in this crate can push into or drain the
/// buffer; everything else sees it read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBuffer<E> {
    events: Vec<E>,
}

impl<E> EventBuffer<E> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Returns the buffered events in production order.
    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }

    pub(crate) fn record(&mut self, event: E) {
        self.events.push(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate is a consistency boundary: the single place where every
/// invariant is checked before a fact is allowed to exist.
///
/// In event sourcing, aggregates:
/// - Decide which events a command produces, without mutating anything
/// - Apply events to update state (pure, deterministic)
/// - Buffer produced events until the application service appends them
pub trait Aggregate: Default + Serialize + DeserializeOwned + Debug + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The closed set of commands this aggregate accepts.
    type Command: Command;

    /// The validation errors a command can be rejected with.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    ///
    /// Used as the `aggregate_type` of stored events and snapshots.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the number of events applied to this instance.
    fn version(&self) -> Version;

    /// Validates a command against the current state and returns the
    /// resulting events, in order.
    ///
    /// Must not mutate state. A rejected command produces no events.
    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Applies an event to the aggregate, updating its state and version.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: &Self::Event);

    /// Returns the uncommitted-events buffer.
    fn changes(&self) -> &EventBuffer<Self::Event>;

    /// Returns the uncommitted-events buffer for recording.
    fn changes_mut(&mut self) -> &mut EventBuffer<Self::Event>;

    /// Handles a command.
    ///
    /// Every resulting event is published, applied and buffered, one at a
    /// time and in production order. A rejection leaves the aggregate, the
    /// buffer and the publisher untouched. Returns the events this call
    /// produced.
    fn handle(
        &mut self,
        command: &Self::Command,
        publisher: &dyn EventPublisher<Self::Event>,
    ) -> Result<&[Self::Event], Self::Error> {
        let events = self.decide(command)?;
        let start = self.changes().len();

        for event in events {
            publisher.publish(&event);
            self.apply(&event);
            self.changes_mut().record(event);
        }

        Ok(&self.changes().as_slice()[start..])
    }

    /// Returns the events produced since the aggregate was loaded.
    fn uncommitted_events(&self) -> &[Self::Event] {
        self.changes().as_slice()
    }

    /// Drains the uncommitted-events buffer.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        self.changes_mut().drain()
    }

    /// Returns the version this instance had before its uncommitted events.
    fn loaded_version(&self) -> Version {
        self.version().rewind(self.changes().len())
    }

    /// Rebuilds an aggregate by applying events, in order, to a blank instance.
    fn replay<'a>(events: impl IntoIterator<Item = &'a Self::Event>) -> Self
    where
        Self::Event: 'a,
    {
        let mut aggregate = Self::default();
        for event in events {
            aggregate.apply(event);
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{NoopPublisher, RecordingPublisher};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum CounterEvent {
        Started { id: AggregateId },
        Incremented { id: AggregateId, by: u32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Started { .. } => "CounterStarted",
                CounterEvent::Incremented { .. } => "CounterIncremented",
            }
        }

        fn aggregate_id(&self) -> AggregateId {
            match self {
                CounterEvent::Started { id } | CounterEvent::Incremented { id, .. } => *id,
            }
        }
    }

    #[derive(Debug, Clone)]
    enum CounterCommand {
        Start(AggregateId),
        Add(AggregateId, Vec<u32>),
    }

    impl Command for CounterCommand {
        fn aggregate_id(&self) -> AggregateId {
            match self {
                CounterCommand::Start(id) | CounterCommand::Add(id, _) => *id,
            }
        }

        fn name(&self) -> &'static str {
            match self {
                CounterCommand::Start(_) => "Start",
                CounterCommand::Add(..) => "Add",
            }
        }

        fn is_creation(&self) -> bool {
            matches!(self, CounterCommand::Start(_))
        }
    }

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum CounterError {
        #[error("not started")]
        NotStarted,
        #[error("increment must be positive")]
        ZeroIncrement,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        id: Option<AggregateId>,
        total: u32,
        version: Version,
        #[serde(skip)]
        changes: EventBuffer<CounterEvent>,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Command = CounterCommand;
        type Error = CounterError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn decide(&self, command: &CounterCommand) -> Result<Vec<CounterEvent>, CounterError> {
            match command {
                CounterCommand::Start(id) => Ok(vec![CounterEvent::Started { id: *id }]),
                CounterCommand::Add(id, amounts) => {
                    if self.id.is_none() {
                        return Err(CounterError::NotStarted);
                    }
                    if amounts.contains(&0) {
                        return Err(CounterError::ZeroIncrement);
                    }
                    Ok(amounts
                        .iter()
                        .map(|by| CounterEvent::Incremented { id: *id, by: *by })
                        .collect())
                }
            }
        }

        fn apply(&mut self, event: &CounterEvent) {
            match event {
                CounterEvent::Started { id } => self.id = Some(*id),
                CounterEvent::Incremented { by, .. } => self.total += by,
            }
            self.version = self.version.next();
        }

        fn changes(&self) -> &EventBuffer<CounterEvent> {
            &self.changes
        }

        fn changes_mut(&mut self) -> &mut EventBuffer<CounterEvent> {
            &mut self.changes
        }
    }

    #[test]
    fn test_handle_publishes_applies_and_buffers_in_order() {
        let id = AggregateId::new();
        let publisher = RecordingPublisher::<CounterEvent>::new();
        let mut counter = Counter::default();

        counter
            .handle(&CounterCommand::Start(id), &publisher)
            .unwrap();
        let produced = counter
            .handle(&CounterCommand::Add(id, vec![2, 3]), &publisher)
            .unwrap()
            .to_vec();

        assert_eq!(
            produced,
            vec![
                CounterEvent::Incremented { id, by: 2 },
                CounterEvent::Incremented { id, by: 3 },
            ]
        );
        assert_eq!(publisher.events(), counter.uncommitted_events());
        assert_eq!(counter.total, 5);
        assert_eq!(counter.version(), Version::new(3));
    }

    #[test]
    fn test_rejected_command_leaves_no_trace() {
        let id = AggregateId::new();
        let publisher = RecordingPublisher::<CounterEvent>::new();
        let mut counter = Counter::default();
        counter
            .handle(&CounterCommand::Start(id), &publisher)
            .unwrap();

        let result = counter.handle(&CounterCommand::Add(id, vec![1, 0]), &publisher);

        assert_eq!(result.unwrap_err(), CounterError::ZeroIncrement);
        assert_eq!(publisher.len(), 1);
        assert_eq!(counter.uncommitted_events().len(), 1);
        assert_eq!(counter.total, 0);
        assert_eq!(counter.version(), Version::first());
    }

    #[test]
    fn test_loaded_version_excludes_uncommitted_events() {
        let id = AggregateId::new();
        let mut counter = Counter::replay(&[
            CounterEvent::Started { id },
            CounterEvent::Incremented { id, by: 1 },
        ]);
        assert_eq!(counter.loaded_version(), Version::new(2));

        counter
            .handle(&CounterCommand::Add(id, vec![4]), &NoopPublisher)
            .unwrap();
        assert_eq!(counter.version(), Version::new(3));
        assert_eq!(counter.loaded_version(), Version::new(2));

        let drained = counter.take_uncommitted_events();
        assert_eq!(drained.len(), 1);
        assert!(counter.uncommitted_events().is_empty());
        assert_eq!(counter.loaded_version(), Version::new(3));
    }

    #[test]
    fn test_replay_matches_handled_state() {
        let id = AggregateId::new();
        let publisher = RecordingPublisher::<CounterEvent>::new();
        let mut counter = Counter::default();
        counter
            .handle(&CounterCommand::Start(id), &publisher)
            .unwrap();
        counter
            .handle(&CounterCommand::Add(id, vec![7, 1]), &publisher)
            .unwrap();

        let replayed = Counter::replay(&publisher.events());

        assert_eq!(replayed.id, counter.id);
        assert_eq!(replayed.total, counter.total);
        assert_eq!(replayed.version(), counter.version());
    }

    #[test]
    fn test_buffer_is_not_serialized() {
        let id = AggregateId::new();
        let mut counter = Counter::default();
        counter
            .handle(&CounterCommand::Start(id), &NoopPublisher)
            .unwrap();

        let json = serde_json::to_value(&counter).unwrap();
        let restored: Counter = serde_json::from_value(json).unwrap();

        assert_eq!(restored.id, Some(id));
        assert_eq!(restored.version(), Version::first());
        assert!(restored.uncommitted_events().is_empty());
    }

    #[test]
    fn test_domain_event_type() {
        let id = AggregateId::new();
        assert_eq!(CounterEvent::Started { id }.event_type(), "CounterStarted");
        assert_eq!(
            CounterEvent::Incremented { id, by: 1 }.aggregate_id(),
            id
        );
    }
}
