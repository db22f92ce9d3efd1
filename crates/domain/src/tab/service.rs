//! Tab service providing a simplified API for tab operations.

use std::sync::Arc;

use common::AggregateId;
use event_store::{EventStore, SnapshotStore};

use crate::command::CommandResult;
use crate::error::DomainError;
use crate::publisher::EventPublisher;
use crate::repository::{Repository, SnapshotRepository};
use crate::service::ApplicationService;

use super::{CloseTab, MarkDrinksServed, MarkFoodServed, OpenTab, PlaceOrder, Tab, TabEvent};

/// Service for managing tabs.
pub struct TabService<R, S>
where
    R: Repository<Tab>,
    S: EventStore,
{
    inner: ApplicationService<Tab, R, S>,
}

impl<R, S> TabService<R, S>
where
    R: Repository<Tab>,
    S: EventStore,
{
    pub fn new(repository: R, store: S, publisher: Arc<dyn EventPublisher<TabEvent>>) -> Self {
        Self {
            inner: ApplicationService::new(repository, store, publisher),
        }
    }

    /// Returns the underlying application service.
    pub fn application(&self) -> &ApplicationService<Tab, R, S> {
        &self.inner
    }

    pub async fn open_tab(&self, cmd: OpenTab) -> Result<CommandResult<Tab>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Tab>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn mark_drinks_served(
        &self,
        cmd: MarkDrinksServed,
    ) -> Result<CommandResult<Tab>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn mark_food_served(
        &self,
        cmd: MarkFoodServed,
    ) -> Result<CommandResult<Tab>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    pub async fn close_tab(&self, cmd: CloseTab) -> Result<CommandResult<Tab>, DomainError> {
        self.inner.execute(cmd.into()).await
    }

    /// Gets a tab by ID.
    pub async fn get_tab(&self, tab_id: AggregateId) -> Result<Tab, DomainError> {
        self.inner.load(tab_id).await
    }
}

impl<S> TabService<SnapshotRepository<S, Tab>, S>
where
    S: EventStore + SnapshotStore + Clone,
{
    /// Creates a service whose repository keeps snapshots in the same store
    /// that receives the events.
    pub fn with_store(store: S, publisher: Arc<dyn EventPublisher<TabEvent>>) -> Self {
        Self::new(SnapshotRepository::new(store.clone()), store, publisher)
    }
}
