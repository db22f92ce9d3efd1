//! Repositories map an aggregate identity to its durable current state.

use std::marker::PhantomData;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{EventStore, Snapshot, SnapshotStore, Version};
use futures_util::TryStreamExt;

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Locates aggregates by identity and persists their current state.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Returns the aggregate as it was last saved.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] for unknown identities.
    async fn find(&self, aggregate_id: AggregateId) -> Result<A, DomainError>;

    /// Persists the aggregate's current state, overwriting the previous one.
    ///
    /// Fails with [`DomainError::ConcurrencyConflict`] when the stored state
    /// moved since the aggregate was loaded. The uncommitted-events buffer
    /// is never part of the saved state.
    async fn save(&self, aggregate: &A) -> Result<(), DomainError>;

    /// Returns false when `save` writes nothing and only checks the version.
    ///
    /// For such repositories the event stream is the only durable state, so
    /// a rejected append leaves nothing behind.
    fn saves_state(&self) -> bool {
        true
    }
}

/// Repository that keeps one snapshot row per aggregate.
///
/// Saves are compare-and-set on the version the aggregate was loaded at.
pub struct SnapshotRepository<S, A>
where
    S: SnapshotStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> SnapshotRepository<S, A>
where
    S: SnapshotStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S, A> Repository<A> for SnapshotRepository<S, A>
where
    S: SnapshotStore,
    A: Aggregate,
{
    async fn find(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let snapshot = self.store.load_snapshot(aggregate_id).await?.ok_or(
            DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id,
            },
        )?;

        Ok(snapshot.into_state()?)
    }

    async fn save(&self, aggregate: &A) -> Result<(), DomainError> {
        let aggregate_id = aggregate.id().ok_or(DomainError::MissingIdentity {
            aggregate_type: A::aggregate_type(),
        })?;

        let snapshot = Snapshot::from_state(
            aggregate_id,
            A::aggregate_type(),
            aggregate.version(),
            aggregate,
        )?;

        self.store
            .save_snapshot(snapshot, aggregate.loaded_version())
            .await?;

        Ok(())
    }
}

/// Repository that rebuilds aggregates from their event stream.
///
/// The stream itself is written by the application service, so `save` only
/// verifies that nobody appended since the aggregate was loaded. The check is
/// not a reservation; the append that follows must carry the same expected
/// version.
pub struct EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S, A> Repository<A> for EventSourcedRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    async fn find(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let mut stream = self.store.read_stream(aggregate_id).await?;
        let mut aggregate = A::default();

        while let Some(envelope) = stream.try_next().await? {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(&event);
        }

        if aggregate.version() == Version::initial() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id,
            });
        }

        Ok(aggregate)
    }

    async fn save(&self, aggregate: &A) -> Result<(), DomainError> {
        let aggregate_id = aggregate.id().ok_or(DomainError::MissingIdentity {
            aggregate_type: A::aggregate_type(),
        })?;

        let expected = aggregate.loaded_version();
        let actual = self
            .store
            .current_version(aggregate_id)
            .await?
            .unwrap_or(Version::initial());

        if actual != expected {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            });
        }

        Ok(())
    }

    fn saves_state(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::NoopPublisher;
    use crate::runbook::{AddTask, CreateRunbook, Runbook, RunbookCommand};
    use event_store::{AppendOptions, EventStoreExt, InMemoryEventStore, PendingEvent};

    fn created_runbook() -> Runbook {
        let mut runbook = Runbook::default();
        runbook
            .handle(
                &CreateRunbook::new("Failover", "alice").into(),
                &NoopPublisher,
            )
            .unwrap();
        runbook
    }

    async fn append_all(store: &InMemoryEventStore, runbook: &mut Runbook) {
        let id = runbook.id().unwrap();
        let pending = runbook
            .take_uncommitted_events()
            .iter()
            .map(|e| PendingEvent::from_event("Runbook", crate::DomainEvent::event_type(e), e))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        store
            .append(id, pending, AppendOptions::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_find_unknown_is_not_found() {
        let repository = SnapshotRepository::<_, Runbook>::new(InMemoryEventStore::new());

        let result = repository.find(AggregateId::new()).await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_snapshot_save_then_find_round_trips() {
        let repository = SnapshotRepository::new(InMemoryEventStore::new());
        let runbook = created_runbook();
        let id = runbook.id().unwrap();

        repository.save(&runbook).await.unwrap();
        let found: Runbook = repository.find(id).await.unwrap();

        assert_eq!(found.id(), Some(id));
        assert_eq!(found.name(), "Failover");
        assert_eq!(found.version(), Version::first());
        assert!(found.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_save_from_stale_copy_conflicts() {
        let repository = SnapshotRepository::new(InMemoryEventStore::new());
        let runbook = created_runbook();
        let id = runbook.id().unwrap();
        repository.save(&runbook).await.unwrap();

        let mut first: Runbook = repository.find(id).await.unwrap();
        let mut second: Runbook = repository.find(id).await.unwrap();
        let add: RunbookCommand = AddTask::new(id, "t1", "Drain traffic", "").into();
        first.handle(&add, &NoopPublisher).unwrap();
        second.handle(&add, &NoopPublisher).unwrap();

        repository.save(&first).await.unwrap();
        let result = repository.save(&second).await;

        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_creating_an_existing_identity_conflicts() {
        let repository = SnapshotRepository::new(InMemoryEventStore::new());
        let runbook = created_runbook();
        repository.save(&runbook).await.unwrap();

        let mut duplicate = Runbook::default();
        duplicate
            .handle(
                &CreateRunbook::with_id(runbook.id().unwrap(), "Again", "bob").into(),
                &NoopPublisher,
            )
            .unwrap();

        assert!(repository.save(&duplicate).await.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_saving_blank_aggregate_is_rejected() {
        let repository = SnapshotRepository::new(InMemoryEventStore::new());

        let result = repository.save(&Runbook::default()).await;

        assert!(matches!(
            result,
            Err(DomainError::MissingIdentity {
                aggregate_type: "Runbook"
            })
        ));
    }

    #[tokio::test]
    async fn test_event_sourced_find_replays_stream() {
        let store = InMemoryEventStore::new();
        let repository = EventSourcedRepository::<_, Runbook>::new(store.clone());
        let mut runbook = created_runbook();
        let id = runbook.id().unwrap();
        runbook
            .handle(&AddTask::new(id, "t1", "Drain traffic", "").into(), &NoopPublisher)
            .unwrap();
        append_all(&store, &mut runbook).await;

        let found = repository.find(id).await.unwrap();

        assert_eq!(found.version(), Version::new(2));
        assert_eq!(found.tasks().len(), 1);
        assert_eq!(store.load_events(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_event_sourced_find_unknown_is_not_found() {
        let repository = EventSourcedRepository::<_, Runbook>::new(InMemoryEventStore::new());

        assert!(repository.find(AggregateId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_event_sourced_save_detects_moved_stream() {
        let store = InMemoryEventStore::new();
        let repository = EventSourcedRepository::<_, Runbook>::new(store.clone());
        let mut runbook = created_runbook();
        let id = runbook.id().unwrap();
        append_all(&store, &mut runbook).await;

        let mut stale = repository.find(id).await.unwrap();
        let mut fresh = repository.find(id).await.unwrap();
        fresh
            .handle(&AddTask::new(id, "t1", "Drain traffic", "").into(), &NoopPublisher)
            .unwrap();
        repository.save(&fresh).await.unwrap();
        append_all(&store, &mut fresh).await;

        stale
            .handle(&AddTask::new(id, "t2", "Promote replica", "").into(), &NoopPublisher)
            .unwrap();
        let result = repository.save(&stale).await;

        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::first() && actual == Version::new(2)
        ));
    }
}
