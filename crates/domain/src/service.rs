//! Application service: the single place that drives one command through
//! the aggregate, the repository and the event store.

use std::marker::PhantomData;
use std::sync::Arc;

use common::AggregateId;
use event_store::{AppendOptions, EventStore, PendingEvent};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::command::{Command, CommandResult};
use crate::error::DomainError;
use crate::publisher::EventPublisher;
use crate::repository::Repository;

/// Orchestrates commands for one aggregate type.
///
/// Every command runs, in this fixed order:
/// 1. Resolve the aggregate (blank for creation commands, otherwise loaded)
/// 2. Dispatch the command, publishing each produced event
/// 3. Save the aggregate's new state through the repository
/// 4. Append the produced events to the event store
/// 5. Clear the aggregate's uncommitted-events buffer
///
/// The append expects the stream to be at the version the aggregate was
/// loaded at, so two commands working from the same state cannot both land.
///
/// Steps 3 and 4 are separate writes. If the append fails after a save that
/// wrote state, the events are returned inside
/// [`DomainError::EventsNotAppended`] instead of being dropped. When the
/// repository saves nothing, a moved stream is a plain
/// [`DomainError::ConcurrencyConflict`].
pub struct ApplicationService<A, R, S>
where
    A: Aggregate,
    R: Repository<A>,
    S: EventStore,
{
    repository: R,
    store: S,
    publisher: Arc<dyn EventPublisher<A::Event>>,
    _phantom: PhantomData<A>,
}

impl<A, R, S> ApplicationService<A, R, S>
where
    A: Aggregate,
    R: Repository<A>,
    S: EventStore,
    DomainError: From<A::Error>,
{
    pub fn new(repository: R, store: S, publisher: Arc<dyn EventPublisher<A::Event>>) -> Self {
        Self {
            repository,
            store,
            publisher,
            _phantom: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads the current state of an aggregate.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.repository.find(aggregate_id).await
    }

    /// Executes a command and persists its outcome.
    #[tracing::instrument(
        skip(self, command),
        fields(
            aggregate_type = A::aggregate_type(),
            aggregate_id = %command.aggregate_id(),
            command = command.name(),
        )
    )]
    pub async fn execute(&self, command: A::Command) -> Result<CommandResult<A>, DomainError> {
        let result = self.run(&command).await;

        metrics::counter!(
            "commands_handled_total",
            "aggregate" => A::aggregate_type(),
            "outcome" => outcome(&result)
        )
        .increment(1);

        result
    }

    async fn run(&self, command: &A::Command) -> Result<CommandResult<A>, DomainError> {
        let aggregate_id = command.aggregate_id();

        let mut aggregate = if command.is_creation() {
            A::default()
        } else {
            self.repository.find(aggregate_id).await?
        };

        if let Err(error) = aggregate.handle(command, self.publisher.as_ref()) {
            tracing::debug!(%error, "command rejected");
            return Err(error.into());
        }

        if let Err(error) = self.repository.save(&aggregate).await {
            if error.is_retryable() {
                tracing::warn!(%error, "aggregate changed since it was loaded");
            } else {
                tracing::error!(
                    %error,
                    unappended = aggregate.uncommitted_events().len(),
                    "failed to save aggregate"
                );
            }
            return Err(error);
        }

        let pending = aggregate
            .uncommitted_events()
            .iter()
            .map(|event| PendingEvent::from_event(A::aggregate_type(), event.event_type(), event))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = AppendOptions::expect_version(aggregate.loaded_version());
        let stored = match self
            .store
            .append(aggregate_id, pending.clone(), expected)
            .await
        {
            Ok(stored) => stored,
            Err(source) if source.is_conflict() && !self.repository.saves_state() => {
                tracing::warn!(error = %source, "stream moved since the aggregate was loaded");
                return Err(source.into());
            }
            Err(source) => {
                tracing::error!(
                    error = %source,
                    unappended = pending.len(),
                    "aggregate saved but its events were not appended"
                );
                return Err(DomainError::EventsNotAppended {
                    aggregate_id,
                    pending,
                    source,
                });
            }
        };

        metrics::counter!("events_appended_total", "aggregate" => A::aggregate_type())
            .increment(stored.len() as u64);

        let events = aggregate.take_uncommitted_events();

        tracing::info!(
            events = events.len(),
            version = %aggregate.version(),
            "command handled"
        );

        Ok(CommandResult {
            aggregate,
            events,
            stored,
        })
    }
}

fn outcome<T>(result: &Result<T, DomainError>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(DomainError::Validation(_)) => "rejected",
        Err(DomainError::AggregateNotFound { .. }) => "not_found",
        Err(DomainError::ConcurrencyConflict { .. }) => "conflict",
        Err(_) => "persistence_failure",
    }
}
