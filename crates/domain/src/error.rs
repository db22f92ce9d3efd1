//! Domain error types.

use common::AggregateId;
use event_store::{EventStoreError, PendingEvent, Version};
use thiserror::Error;

use crate::runbook::RunbookError;
use crate::tab::TabError;

/// A command was rejected by an aggregate before any event existed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Runbook(#[from] RunbookError),

    #[error(transparent)]
    Tab(#[from] TabError),
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The command violated an aggregate invariant. Nothing was changed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The aggregate was saved by someone else since it was loaded.
    /// Reload and retry the whole command.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The aggregate has no identity and cannot be persisted.
    #[error("{aggregate_type} has no identity and cannot be saved")]
    MissingIdentity { aggregate_type: &'static str },

    /// Reading or writing the store failed.
    #[error("Persistence error: {0}")]
    Persistence(#[source] EventStoreError),

    /// The aggregate state was saved but its events could not be appended.
    ///
    /// `pending` holds the events in production order so an outer layer can
    /// append them again or compensate.
    #[error("{count} event(s) for aggregate {aggregate_id} were saved but not appended: {source}", count = .pending.len())]
    EventsNotAppended {
        aggregate_id: AggregateId,
        pending: Vec<PendingEvent>,
        #[source]
        source: EventStoreError,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if retrying the command from a fresh load may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict { .. })
    }

    /// Returns true if the command was rejected by the aggregate.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::AggregateNotFound { .. })
    }

    /// Returns the validation error, if this is a rejection.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            DomainError::Validation(error) => Some(error),
            _ => None,
        }
    }
}

impl From<EventStoreError> for DomainError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            },
            EventStoreError::Serialization(e) => DomainError::Serialization(e),
            other => DomainError::Persistence(other),
        }
    }
}

impl From<RunbookError> for DomainError {
    fn from(e: RunbookError) -> Self {
        DomainError::Validation(e.into())
    }
}

impl From<TabError> for DomainError {
    fn from(e: TabError) -> Self {
        DomainError::Validation(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_domain_conflict() {
        let aggregate_id = AggregateId::new();
        let error: DomainError = EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected: Version::first(),
            actual: Version::new(2),
        }
        .into();

        assert!(error.is_retryable());
        assert!(matches!(
            error,
            DomainError::ConcurrencyConflict { actual, .. } if actual == Version::new(2)
        ));
    }

    #[test]
    fn test_other_store_errors_are_persistence_failures() {
        let error: DomainError = EventStoreError::InvalidBatch("empty type".to_string()).into();
        assert!(matches!(error, DomainError::Persistence(_)));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_validation_errors_are_distinguishable() {
        let error: DomainError = TabError::TabNotOpen.into();
        assert!(error.is_validation());
        assert_eq!(
            error.validation(),
            Some(&ValidationError::Tab(TabError::TabNotOpen))
        );
        assert_eq!(error.to_string(), "Validation failed: Tab is not open");
    }

    #[test]
    fn test_unappended_events_are_reported() {
        let error = DomainError::EventsNotAppended {
            aggregate_id: AggregateId::new(),
            pending: vec![PendingEvent::new("Tab", "TabOpened", serde_json::json!({}))],
            source: EventStoreError::Configuration("offline".to_string()),
        };
        assert!(error.to_string().starts_with("1 event(s) for aggregate"));
    }
}
