use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::TryStreamExt;

use crate::{AggregateId, EventEnvelope, EventStoreError, PendingEvent, Result, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the stream for optimistic concurrency control.
    /// If None, the batch is placed after whatever the stream holds.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stream to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the stream to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Append-only log of events, partitioned by aggregate.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to one aggregate's stream.
    ///
    /// The store assigns each event the next sequence number of the stream,
    /// in batch order, starting at 1 for a new stream. The batch lands
    /// atomically: either every event is written or none is. An empty batch
    /// is a no-op. If `options.expected_version` is set, the append fails
    /// with `ConcurrencyConflict` when the stream has moved.
    ///
    /// Returns the sequenced events.
    async fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<PendingEvent>,
        options: AppendOptions,
    ) -> Result<Vec<EventEnvelope>>;

    /// Reads an aggregate's stream from sequence 1 upward.
    ///
    /// The returned stream is lazy and finite. Every call starts over from
    /// the beginning.
    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<EventStream>;

    /// Gets the current version of an aggregate's stream.
    ///
    /// Returns None if the stream doesn't exist.
    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Reads a whole stream into memory.
    async fn load_events(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        self.read_stream(aggregate_id).await?.try_collect().await
    }

    /// Checks if a stream exists (has any events).
    async fn stream_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.current_version(aggregate_id).await?.is_some())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch before it is sequenced.
///
/// Every event of a batch must come from the same aggregate type, and must
/// carry an event type.
pub fn validate_batch(events: &[PendingEvent]) -> Result<()> {
    let Some(first) = events.first() else {
        return Ok(());
    };

    for event in events {
        if event.event_type.is_empty() {
            return Err(EventStoreError::InvalidBatch(
                "Event type must not be empty".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidBatch(format!(
                "All events must have the same aggregate type. Expected {}, got {}",
                first.aggregate_type, event.aggregate_type
            )));
        }
    }

    Ok(())
}

/// Checks an optional expected version against the stream's current one.
pub(crate) fn check_expected_version(
    aggregate_id: AggregateId,
    expected: Option<Version>,
    actual: Version,
) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => Err(EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
