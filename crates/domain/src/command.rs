//! Command contract and command results.

use std::fmt::Debug;

use common::AggregateId;
use event_store::{EventEnvelope, Version};

use crate::aggregate::Aggregate;

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action. Each aggregate
/// accepts a closed enum of commands, one variant per command type.
pub trait Command: Debug + Send + Sync {
    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// Returns the command name, used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Returns true if the command brings a new aggregate into existence.
    ///
    /// Creation commands are handled against a blank aggregate instead of
    /// one loaded from the repository.
    fn is_creation(&self) -> bool {
        false
    }
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were produced, in order.
    pub events: Vec<A::Event>,

    /// The events as the event store sequenced them.
    pub stored: Vec<EventEnvelope>,
}

impl<A: Aggregate> CommandResult<A> {
    /// Returns the version of the aggregate after the command.
    pub fn new_version(&self) -> Version {
        self.aggregate.version()
    }
}
