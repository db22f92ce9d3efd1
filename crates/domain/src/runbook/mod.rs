//! Runbook aggregate: an ordered list of tasks worked through to completion.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Runbook;
pub use commands::*;
pub use events::{
    RunbookCompletedData, RunbookCreatedData, RunbookEvent, TaskAddedData, TaskCompletedData,
    TaskStartedData,
};
pub use service::RunbookService;
pub use state::{RunbookStatus, TaskStatus};
pub use value_objects::{Task, TaskId, UserId};

use thiserror::Error;

/// Errors that can occur during runbook operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunbookError {
    /// The runbook already exists.
    #[error("Runbook already created")]
    AlreadyCreated,

    /// The runbook has not been created yet.
    #[error("Runbook has not been created")]
    NotCreated,

    /// Runbook name is required.
    #[error("Runbook name is required")]
    NameRequired,

    /// The runbook is completed and accepts no further changes.
    #[error("Runbook is already completed")]
    RunbookCompleted,

    /// A task with the same ID already exists.
    #[error("Task already exists: {task_id}")]
    DuplicateTask { task_id: TaskId },

    /// Task not found in the runbook.
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: TaskId },

    /// The task was already started.
    #[error("Task already started: {task_id}")]
    TaskAlreadyStarted { task_id: TaskId },

    /// The task has not been started.
    #[error("Task not started: {task_id}")]
    TaskNotStarted { task_id: TaskId },

    /// The task was already completed.
    #[error("Task already completed: {task_id}")]
    TaskAlreadyCompleted { task_id: TaskId },

    /// A runbook without tasks cannot be completed.
    #[error("Runbook has no tasks")]
    NoTasks,

    /// Some tasks are not completed yet.
    #[error("Cannot complete runbook with {count} outstanding task(s)")]
    OutstandingTasks { count: usize },
}
