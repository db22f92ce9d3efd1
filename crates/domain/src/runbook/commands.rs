//! Runbook commands.

use common::AggregateId;

use crate::command::Command;

use super::{TaskId, UserId};

/// Command to create a new runbook.
#[derive(Debug, Clone)]
pub struct CreateRunbook {
    /// The runbook ID to create.
    pub runbook_id: AggregateId,

    /// Human-readable runbook name.
    pub name: String,

    /// Who owns the runbook.
    pub owner_id: UserId,
}

impl CreateRunbook {
    /// Creates a new CreateRunbook command with a generated runbook ID.
    pub fn new(name: impl Into<String>, owner_id: impl Into<UserId>) -> Self {
        Self::with_id(AggregateId::new(), name, owner_id)
    }

    /// Creates a new CreateRunbook command for a known runbook ID.
    pub fn with_id(
        runbook_id: AggregateId,
        name: impl Into<String>,
        owner_id: impl Into<UserId>,
    ) -> Self {
        Self {
            runbook_id,
            name: name.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// Command to add a task to a runbook.
#[derive(Debug, Clone)]
pub struct AddTask {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub name: String,
    pub description: String,
}

impl AddTask {
    pub fn new(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            runbook_id,
            task_id: task_id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Command to start working on a task.
#[derive(Debug, Clone)]
pub struct StartTask {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub user_id: UserId,
}

impl StartTask {
    pub fn new(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            runbook_id,
            task_id: task_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Command to mark a started task as done.
#[derive(Debug, Clone)]
pub struct CompleteTask {
    pub runbook_id: AggregateId,
    pub task_id: TaskId,
    pub user_id: UserId,
}

impl CompleteTask {
    pub fn new(
        runbook_id: AggregateId,
        task_id: impl Into<TaskId>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            runbook_id,
            task_id: task_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Command to close a runbook once all its tasks are done.
#[derive(Debug, Clone)]
pub struct CompleteRunbook {
    pub runbook_id: AggregateId,
    pub user_id: UserId,
}

impl CompleteRunbook {
    pub fn new(runbook_id: AggregateId, user_id: impl Into<UserId>) -> Self {
        Self {
            runbook_id,
            user_id: user_id.into(),
        }
    }
}

/// Every command a runbook accepts.
#[derive(Debug, Clone)]
pub enum RunbookCommand {
    CreateRunbook(CreateRunbook),
    AddTask(AddTask),
    StartTask(StartTask),
    CompleteTask(CompleteTask),
    CompleteRunbook(CompleteRunbook),
}

impl Command for RunbookCommand {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            RunbookCommand::CreateRunbook(cmd) => cmd.runbook_id,
            RunbookCommand::AddTask(cmd) => cmd.runbook_id,
            RunbookCommand::StartTask(cmd) => cmd.runbook_id,
            RunbookCommand::CompleteTask(cmd) => cmd.runbook_id,
            RunbookCommand::CompleteRunbook(cmd) => cmd.runbook_id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RunbookCommand::CreateRunbook(_) => "CreateRunbook",
            RunbookCommand::AddTask(_) => "AddTask",
            RunbookCommand::StartTask(_) => "StartTask",
            RunbookCommand::CompleteTask(_) => "CompleteTask",
            RunbookCommand::CompleteRunbook(_) => "CompleteRunbook",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, RunbookCommand::CreateRunbook(_))
    }
}

impl From<CreateRunbook> for RunbookCommand {
    fn from(cmd: CreateRunbook) -> Self {
        RunbookCommand::CreateRunbook(cmd)
    }
}

impl From<AddTask> for RunbookCommand {
    fn from(cmd: AddTask) -> Self {
        RunbookCommand::AddTask(cmd)
    }
}

impl From<StartTask> for RunbookCommand {
    fn from(cmd: StartTask) -> Self {
        RunbookCommand::StartTask(cmd)
    }
}

impl From<CompleteTask> for RunbookCommand {
    fn from(cmd: CompleteTask) -> Self {
        RunbookCommand::CompleteTask(cmd)
    }
}

impl From<CompleteRunbook> for RunbookCommand {
    fn from(cmd: CompleteRunbook) -> Self {
        RunbookCommand::CompleteRunbook(cmd)
    }
}
