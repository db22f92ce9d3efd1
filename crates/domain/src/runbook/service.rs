//! Runbook service providing a simplified API for runbook operations.

use std::sync::Arc;

use common::AggregateId;
use event_store::{EventStore, SnapshotStore};

use crate::command::CommandResult;
use crate::error::DomainError;
use crate::publisher::EventPublisher;
use crate::repository::{Repository, SnapshotRepository};
use crate::service::ApplicationService;

use super::{
    AddTask, CompleteRunbook, CompleteTask, CreateRunbook, Runbook, RunbookEvent, StartTask,
};

/// Service for managing runbooks.
///
/// One method per runbook command, each running through the
/// [`ApplicationService`].
pub struct RunbookService<R, S>
where
    R: Repository<Runbook>,
    S: EventStore,
{
    inner: ApplicationService<Runbook, R, S>,
}

impl<R, S> RunbookService<R, S>
where
    R: Repository<Runbook>,
    S: EventStore,
{
    pub fn new(repository: R, store: S, publisher: Arc<dyn EventPublisher<RunbookEvent>>) -> Self {
        Self {
            inner: ApplicationService::new(repository, store, publisher),
        }
    }

    /// Returns the underlying application service.
    pub fn application(&self) -> &ApplicationService<Runbook, R, S> {
        &self.inner
    }

    pub async fn create_runbook(
        &self,
        cmd: CreateRunbook,
    ) -> Result<CommandResult<Runbook>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn add_task(&self, cmd: AddTask) -> Result<CommandResult<Runbook>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn start_task(&self, cmd: StartTask) -> Result<CommandResult<Runbook>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn complete_task(
        &self,
        cmd: CompleteTask,
    ) -> Result<CommandResult<Runbook>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn complete_runbook(
        &self,
        cmd: CompleteRunbook,
    ) -> Result<CommandResult<Runbook>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    /// Gets a runbook by ID.
    pub async fn get_runbook(&self, runbook_id: AggregateId) -> Result<Runbook, DomainError> {
        self.inner.load(runbook_id).await
    }
}

impl<S> RunbookService<SnapshotRepository<S, Runbook>, S>
where
    S: EventStore + SnapshotStore + Clone,
{
    /// Creates a service whose repository keeps snapshots in the same store
    /// that receives the events.
    pub fn with_store(store: S, publisher: Arc<dyn EventPublisher<RunbookEvent>>) -> Self {
        Self::new(SnapshotRepository::new(store.clone()), store, publisher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::publisher::RecordingPublisher;
    use crate::runbook::RunbookStatus;
    use event_store::{EventStoreExt, InMemoryEventStore, Version};

    #[tokio::test]
    async fn test_runbook_service_round_trip() {
        let store = InMemoryEventStore::new();
        let publisher = RecordingPublisher::<RunbookEvent>::new();
        let service = RunbookService::with_store(store.clone(), Arc::new(publisher.clone()));

        let cmd = CreateRunbook::new("Certificate rotation", "alice");
        let id = cmd.runbook_id;
        service.create_runbook(cmd).await.unwrap();
        service
            .add_task(AddTask::new(id, "t1", "Issue cert", ""))
            .await
            .unwrap();
        service
            .start_task(StartTask::new(id, "t1", "bob"))
            .await
            .unwrap();
        service
            .complete_task(CompleteTask::new(id, "t1", "bob"))
            .await
            .unwrap();
        let result = service
            .complete_runbook(CompleteRunbook::new(id, "alice"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.status(), RunbookStatus::Completed);
        assert_eq!(result.new_version(), Version::new(5));
        assert!(result.aggregate.uncommitted_events().is_empty());

        let stored = store.load_events(id).await.unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(publisher.len(), 5);

        let loaded = service.get_runbook(id).await.unwrap();
        assert_eq!(loaded.version(), Version::new(5));
        assert!(loaded.is_completed());
    }
}
