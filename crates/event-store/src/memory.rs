use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, PendingEvent, Result, Snapshot, Version,
    snapshot::SnapshotStore,
    store::{AppendOptions, EventStore, EventStream, check_expected_version, validate_batch},
};

/// In-memory event and snapshot store.
///
/// Provides the same contract as the PostgreSQL implementation; clones share
/// the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Vec<EventEnvelope>>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Returns the number of snapshots stored.
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<PendingEvent>,
        options: AppendOptions,
    ) -> Result<Vec<EventEnvelope>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        validate_batch(&events)?;

        let mut streams = self.streams.write().await;
        let current = streams
            .get(&aggregate_id)
            .map(|stream| Version::new(stream.len() as i64))
            .unwrap_or(Version::initial());

        check_expected_version(aggregate_id, options.expected_version, current)?;

        // Sequence the whole batch before touching the stream.
        let now = Utc::now();
        let mut version = current;
        let sequenced: Vec<EventEnvelope> = events
            .into_iter()
            .map(|pending| {
                version = version.next();
                EventEnvelope::sequence(pending, aggregate_id, version, now)
            })
            .collect();

        tracing::debug!(
            %aggregate_id,
            first = %current.next(),
            last = %version,
            "appended events"
        );

        streams
            .entry(aggregate_id)
            .or_default()
            .extend(sequenced.iter().cloned());
        Ok(sequenced)
    }

    async fn read_stream(&self, aggregate_id: AggregateId) -> Result<EventStream> {
        use futures_util::stream;

        let events = self
            .streams
            .read()
            .await
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }
}

#[async_trait]
impl SnapshotStore for InMemoryEventStore {
    async fn load_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&aggregate_id).cloned())
    }

    async fn save_snapshot(&self, snapshot: Snapshot, expected: Version) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let actual = snapshots
            .get(&snapshot.aggregate_id)
            .map(|s| s.version)
            .unwrap_or(Version::initial());

        if actual != expected {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: snapshot.aggregate_id,
                expected,
                actual,
            });
        }

        snapshots.insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }
}
