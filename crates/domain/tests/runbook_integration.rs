//! Integration tests for the Runbook aggregate.
//!
//! Runbooks are exercised through both repository flavours: snapshot-backed
//! and rebuilt from the event stream.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{
    AddTask, Aggregate, CompleteRunbook, CompleteTask, CreateRunbook, DomainError,
    EventSourcedRepository, NoopPublisher, RecordingPublisher, Repository, Runbook, RunbookError,
    RunbookEvent, RunbookService, RunbookStatus, SnapshotRepository, StartTask, TaskStatus,
    ValidationError,
};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreExt, EventStream, InMemoryEventStore,
    PendingEvent, Result as StoreResult, Version,
};
use tokio::sync::Barrier;

type SnapshotService =
    RunbookService<SnapshotRepository<InMemoryEventStore, Runbook>, InMemoryEventStore>;
type ReplayService =
    RunbookService<EventSourcedRepository<InMemoryEventStore, Runbook>, InMemoryEventStore>;

fn snapshot_service() -> (SnapshotService, InMemoryEventStore, RecordingPublisher<RunbookEvent>) {
    let store = InMemoryEventStore::new();
    let publisher = RecordingPublisher::<RunbookEvent>::new();
    let service = RunbookService::with_store(store.clone(), Arc::new(publisher.clone()));
    (service, store, publisher)
}

fn replay_service() -> (ReplayService, InMemoryEventStore) {
    let store = InMemoryEventStore::new();
    let service = RunbookService::new(
        EventSourcedRepository::new(store.clone()),
        store.clone(),
        Arc::new(NoopPublisher),
    );
    (service, store)
}

async fn create_with_tasks<R>(
    service: &RunbookService<R, InMemoryEventStore>,
    task_ids: &[&str],
) -> AggregateId
where
    R: Repository<Runbook>,
{
    let cmd = CreateRunbook::new("Region evacuation", "alice");
    let runbook_id = cmd.runbook_id;
    service.create_runbook(cmd).await.unwrap();

    for task_id in task_ids {
        service
            .add_task(AddTask::new(runbook_id, *task_id, format!("Step {task_id}"), ""))
            .await
            .unwrap();
    }

    runbook_id
}

mod runbook_lifecycle {
    use super::*;

    #[tokio::test]
    async fn complete_runbook_lifecycle() {
        let (service, store, publisher) = snapshot_service();
        let id = create_with_tasks(&service, &["drain", "promote"]).await;

        for task in ["drain", "promote"] {
            service
                .start_task(StartTask::new(id, task, "bob"))
                .await
                .unwrap();
            service
                .complete_task(CompleteTask::new(id, task, "bob"))
                .await
                .unwrap();
        }
        let result = service
            .complete_runbook(CompleteRunbook::new(id, "alice"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.status(), RunbookStatus::Completed);
        assert_eq!(result.new_version(), Version::new(8));
        assert_eq!(publisher.len(), 8);

        let stored = store.load_events(id).await.unwrap();
        let versions: Vec<i64> = stored.iter().map(|e| e.version.as_i64()).collect();
        assert_eq!(versions, (1..=8).collect::<Vec<_>>());
        assert!(stored.iter().all(|e| e.aggregate_type == "Runbook"));
    }

    #[tokio::test]
    async fn completing_with_outstanding_tasks_is_rejected() {
        let (service, store, publisher) = snapshot_service();
        let id = create_with_tasks(&service, &["drain", "promote"]).await;
        service
            .start_task(StartTask::new(id, "drain", "bob"))
            .await
            .unwrap();
        service
            .complete_task(CompleteTask::new(id, "drain", "bob"))
            .await
            .unwrap();
        service
            .start_task(StartTask::new(id, "promote", "bob"))
            .await
            .unwrap();
        let published = publisher.len();

        let error = service
            .complete_runbook(CompleteRunbook::new(id, "alice"))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DomainError::Validation(ValidationError::Runbook(RunbookError::OutstandingTasks {
                count: 1
            }))
        ));
        assert_eq!(publisher.len(), published);
        assert_eq!(store.load_events(id).await.unwrap().len(), 6);

        let runbook = service.get_runbook(id).await.unwrap();
        assert_eq!(runbook.status(), RunbookStatus::InProgress);
        assert_eq!(runbook.version(), Version::new(6));
    }

    #[tokio::test]
    async fn repeated_invalid_command_yields_same_error() {
        let (service, store, _publisher) = snapshot_service();
        let id = create_with_tasks(&service, &["drain"]).await;

        let first = service
            .complete_task(CompleteTask::new(id, "drain", "bob"))
            .await
            .unwrap_err();
        let second = service
            .complete_task(CompleteTask::new(id, "drain", "bob"))
            .await
            .unwrap_err();

        assert_eq!(first.validation(), second.validation());
        assert_eq!(store.load_events(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replaying_published_events_reproduces_state() {
        let (service, _store, publisher) = snapshot_service();
        let id = create_with_tasks(&service, &["a", "b", "c"]).await;

        // Valid and invalid commands interleaved.
        let _ = service.start_task(StartTask::new(id, "b", "bob")).await;
        let _ = service.start_task(StartTask::new(id, "b", "bob")).await;
        let _ = service.complete_task(CompleteTask::new(id, "a", "bob")).await;
        let _ = service.complete_task(CompleteTask::new(id, "b", "bob")).await;
        let _ = service.add_task(AddTask::new(id, "a", "Duplicate", "")).await;
        let _ = service.start_task(StartTask::new(id, "c", "carol")).await;

        let replayed = Runbook::replay(&publisher.events());
        let loaded = service.get_runbook(id).await.unwrap();

        assert_eq!(replayed.version(), loaded.version());
        assert_eq!(replayed.status(), loaded.status());
        assert_eq!(replayed.tasks(), loaded.tasks());
        let statuses: Vec<_> = loaded.tasks().iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![TaskStatus::Added, TaskStatus::Completed, TaskStatus::InProgress]
        );
    }
}

mod event_sourced {
    use super::*;

    #[tokio::test]
    async fn runbook_is_rebuilt_from_its_stream() {
        let (service, store) = replay_service();
        let id = create_with_tasks(&service, &["drain"]).await;
        service
            .start_task(StartTask::new(id, "drain", "bob"))
            .await
            .unwrap();

        let runbook = service.get_runbook(id).await.unwrap();

        assert_eq!(runbook.version(), Version::new(3));
        assert_eq!(runbook.status(), RunbookStatus::InProgress);
        assert_eq!(store.snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn creating_an_existing_runbook_conflicts() {
        let (service, store) = replay_service();
        let id = create_with_tasks(&service, &[]).await;

        let error = service
            .create_runbook(CreateRunbook::with_id(id, "Again", "bob"))
            .await
            .unwrap_err();

        assert!(error.is_retryable());
        assert_eq!(store.load_events(id).await.unwrap().len(), 1);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn concurrent_modifications_detected() {
        let (service, _store, _publisher) = snapshot_service();
        let id = create_with_tasks(&service, &["drain", "promote"]).await;
        let repository = service.application().repository();

        let mut stale = repository.find(id).await.unwrap();

        service
            .start_task(StartTask::new(id, "drain", "bob"))
            .await
            .unwrap();

        stale
            .handle(&StartTask::new(id, "promote", "carol").into(), &NoopPublisher)
            .unwrap();
        let error = repository.save(&stale).await.unwrap_err();

        assert!(matches!(
            error,
            DomainError::ConcurrencyConflict { expected, actual, .. }
                if expected == Version::new(3) && actual == Version::new(4)
        ));
        assert!(error.is_retryable());
    }

    /// Store that holds every version check until two callers reach it, so
    /// both commands pass the repository check before either appends.
    #[derive(Clone)]
    struct LockstepStore {
        inner: InMemoryEventStore,
        gate: Arc<Barrier>,
    }

    #[async_trait]
    impl EventStore for LockstepStore {
        async fn append(
            &self,
            aggregate_id: AggregateId,
            events: Vec<PendingEvent>,
            options: AppendOptions,
        ) -> StoreResult<Vec<EventEnvelope>> {
            self.inner.append(aggregate_id, events, options).await
        }

        async fn read_stream(&self, aggregate_id: AggregateId) -> StoreResult<EventStream> {
            self.inner.read_stream(aggregate_id).await
        }

        async fn current_version(&self, aggregate_id: AggregateId) -> StoreResult<Option<Version>> {
            self.gate.wait().await;
            self.inner.current_version(aggregate_id).await
        }
    }

    #[tokio::test]
    async fn racing_commands_on_replayed_aggregate_commit_once() {
        let (setup, inner) = replay_service();
        let id = create_with_tasks(&setup, &[]).await;

        let store = LockstepStore {
            inner: inner.clone(),
            gate: Arc::new(Barrier::new(2)),
        };
        let service = RunbookService::new(
            EventSourcedRepository::<_, Runbook>::new(store.clone()),
            store,
            Arc::new(NoopPublisher),
        );

        let (first, second) = tokio::join!(
            service.add_task(AddTask::new(id, "t1", "Drain traffic", "")),
            service.add_task(AddTask::new(id, "t1", "Drain traffic", "")),
        );

        let (won, lost): (Vec<_>, Vec<_>) = [first, second].into_iter().partition(Result::is_ok);
        assert_eq!(won.len(), 1);
        let error = lost.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(
            error,
            DomainError::ConcurrencyConflict { expected, actual, .. }
                if expected == Version::new(1) && actual == Version::new(2)
        ));
        assert!(error.is_retryable());

        let runbook = setup.get_runbook(id).await.unwrap();
        let task_ids: Vec<_> = runbook.tasks().iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(task_ids, vec!["t1"]);
        assert_eq!(runbook.version(), Version::new(2));
        assert_eq!(inner.load_events(id).await.unwrap().len(), 2);
    }
}
