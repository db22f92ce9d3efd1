//! Runbook domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{TaskId, UserId};

/// Events that can occur on a runbook aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunbookEvent {
    /// Runbook was created.
    RunbookCreated(RunbookCreatedData),

    /// Task was added to the runbook.
    TaskAdded(TaskAddedData),

    /// Someone started working on a task.
    TaskStarted(TaskStartedData),

    /// A task was finished.
    TaskCompleted(TaskCompletedData),

    /// Every task was done and the runbook was closed.
    RunbookCompleted(RunbookCompletedData),
}

impl DomainEvent for RunbookEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RunbookEvent::RunbookCreated(_) => "RunbookCreated",
            RunbookEvent::TaskAdded(_) => "TaskAdded",
            RunbookEvent::TaskStarted(_) => "TaskStarted",
            RunbookEvent::TaskCompleted(_) => "TaskCompleted",
            RunbookEvent::RunbookCompleted(_) => "RunbookCompleted",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            RunbookEvent::RunbookCreated(data) => data.runbook_id,
            RunbookEvent::TaskAdded(data) => data.runbook_id,
            RunbookEvent::TaskStarted(data) => data.runbook_id,
            RunbookEvent::TaskCompleted(data) => data.runbook_id,
            RunbookEvent::RunbookCompleted(data) => data.runbook_id,
        }
    }
}

/// Data for RunbookCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookCreatedData {
    pub runbook_id: AggregateId,
    pub name: String,
    pub owner_id: UserId,
}

/// Data for TaskAdded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAddedData {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub name: String,
    pub description: String,
}

/// Data for TaskStarted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStartedData {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub user_id: UserId,
}

/// Data for TaskCompleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletedData {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub user_id: UserId,
}

/// Data for RunbookCompleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookCompletedData {
    pub runbook_id: AggregateId,
    pub user_id: UserId,
}

// Convenience constructors
impl RunbookEvent {
    pub fn runbook_created(
        runbook_id: AggregateId,
        name: impl Into<String>,
        owner_id: impl Into<UserId>,
    ) -> Self {
        RunbookEvent::RunbookCreated(RunbookCreatedData {
            runbook_id,
            name: name.into(),
            owner_id: owner_id.into(),
        })
    }

    pub fn task_added(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        RunbookEvent::TaskAdded(TaskAddedData {
            runbook_id,
            task_id: task_id.into(),
            name: name.into(),
            description: description.into(),
        })
    }

    pub fn task_started(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        user_id: impl Into<UserId>,
    ) -> Self {
        RunbookEvent::TaskStarted(TaskStartedData {
            runbook_id,
            task_id: task_id.into(),
            user_id: user_id.into(),
        })
    }

    pub fn task_completed(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        user_id: impl Into<UserId>,
    ) -> Self {
        RunbookEvent::TaskCompleted(TaskCompletedData {
            runbook_id,
            task_id: task_id.into(),
            user_id: user_id.into(),
        })
    }

    pub fn runbook_completed(runbook_id: AggregateId, user_id: impl Into<UserId>) -> Self {
        RunbookEvent::RunbookCompleted(RunbookCompletedData {
            runbook_id,
            user_id: user_id.into(),
        })
    }
}
