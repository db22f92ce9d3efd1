//! Synchronous event publication.
//!
//! An aggregate hands every event it produces to an [`EventPublisher`] the
//! moment the event exists, before the command's state change or events are
//! persisted. Subscribers can therefore observe an event whose owning change
//! is later rejected by the repository or never reaches the event store.
//! Delivery is at-least-once from the subscriber's point of view (an outer
//! retry re-publishes), so subscribers must be idempotent.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::aggregate::DomainEvent;

/// Receives every event an aggregate produces, in production order.
///
/// Publishing is fire-and-forget; implementations must not fail the caller.
pub trait EventPublisher<E>: Send + Sync {
    /// Publishes a single event.
    fn publish(&self, event: &E);
}

/// Publisher that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl<E> EventPublisher<E> for NoopPublisher {
    fn publish(&self, _event: &E) {}
}

/// Publisher that records published events.
///
/// Clones share the same recording, so a test can keep one handle while the
/// service owns another.
#[derive(Debug, Clone)]
pub struct RecordingPublisher<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone> RecordingPublisher<E> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns everything published so far, in order.
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<E: Clone> Default for RecordingPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send> EventPublisher<E> for RecordingPublisher<E> {
    fn publish(&self, event: &E) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Error reported by a subscriber that could not handle an event.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A named consumer of published events.
pub trait EventSubscriber<E>: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Handles one event.
    fn handle(&self, event: &E) -> Result<(), SubscriberError>;
}

/// Publisher that hands each event to every registered subscriber.
///
/// A failing subscriber is logged and counted; it never stops delivery to
/// the remaining subscribers and never reaches the aggregate.
pub struct FanOutPublisher<E> {
    subscribers: Vec<Arc<dyn EventSubscriber<E>>>,
}

impl<E: DomainEvent> FanOutPublisher<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Adds a subscriber, builder style.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber<E>>) -> Self {
        self.subscribe(subscriber);
        self
    }

    /// Adds a subscriber. Subscribers are called in registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber<E>>) {
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: DomainEvent> Default for FanOutPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventPublisher<E> for FanOutPublisher<E> {
    fn publish(&self, event: &E) {
        let event_type = event.event_type();
        metrics::counter!("events_published_total", "event_type" => event_type).increment(1);

        for subscriber in &self.subscribers {
            if let Err(error) = subscriber.handle(event) {
                tracing::warn!(
                    subscriber = subscriber.name(),
                    event_type,
                    aggregate_id = %event.aggregate_id(),
                    %error,
                    "subscriber failed to handle event"
                );
                metrics::counter!(
                    "subscriber_failures_total",
                    "subscriber" => subscriber.name().to_string()
                )
                .increment(1);
            }
        }
    }
}
