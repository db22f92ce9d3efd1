//! Append-only event storage with per-aggregate streams and snapshot storage.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, PendingEvent, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use snapshot::{Snapshot, SnapshotStore};
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, validate_batch};
