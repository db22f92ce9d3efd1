use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, Result, Version};

/// The persisted current state of an aggregate.
///
/// A snapshot is overwritten on every save; only the latest one is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The aggregate this snapshot belongs to.
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Tab", "Runbook").
    pub aggregate_type: String,

    /// The number of events the aggregate had applied when it was saved.
    pub version: Version,

    /// When the snapshot was written.
    pub timestamp: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Creates a new snapshot.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Creates a snapshot from a serializable state.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::new(
            aggregate_id,
            aggregate_type,
            version,
            serde_json::to_value(state)?,
        ))
    }

    /// Deserializes the snapshot state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(
        self,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

/// Storage for aggregate snapshots with compare-and-set writes.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Retrieves the snapshot of an aggregate.
    ///
    /// Returns None if no snapshot exists.
    async fn load_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;

    /// Replaces the snapshot of an aggregate.
    ///
    /// Succeeds only when the stored snapshot is at `expected` (a missing
    /// snapshot counts as `Version::initial()`); fails with
    /// `ConcurrencyConflict` otherwise.
    async fn save_snapshot(&self, snapshot: Snapshot, expected: Version) -> Result<()>;
}
