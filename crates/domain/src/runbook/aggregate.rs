//! Runbook aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, EventBuffer};

use super::{
    AddTask, CompleteRunbook, CompleteTask, CreateRunbook, RunbookCommand, RunbookError,
    RunbookEvent, RunbookStatus, StartTask, Task, TaskId, TaskStatus, UserId,
    events::{RunbookCreatedData, TaskAddedData, TaskCompletedData, TaskStartedData},
};

/// Runbook aggregate root.
///
/// A runbook is an ordered checklist of tasks. Each task is started and then
/// completed; the runbook can only be completed once every task is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Runbook {
    id: Option<AggregateId>,

    /// Number of events applied.
    #[serde(default)]
    version: Version,

    name: String,

    owner_id: Option<UserId>,

    status: RunbookStatus,

    /// Tasks in the order they were added.
    tasks: Vec<Task>,

    #[serde(skip)]
    changes: EventBuffer<RunbookEvent>,
}

impl Aggregate for Runbook {
    type Event = RunbookEvent;
    type Command = RunbookCommand;
    type Error = RunbookError;

    fn aggregate_type() -> &'static str {
        "Runbook"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn decide(&self, command: &RunbookCommand) -> Result<Vec<RunbookEvent>, RunbookError> {
        match command {
            RunbookCommand::CreateRunbook(cmd) => self.create(cmd),
            RunbookCommand::AddTask(cmd) => self.add_task(cmd),
            RunbookCommand::StartTask(cmd) => self.start_task(cmd),
            RunbookCommand::CompleteTask(cmd) => self.complete_task(cmd),
            RunbookCommand::CompleteRunbook(cmd) => self.complete(cmd),
        }
    }

    fn apply(&mut self, event: &RunbookEvent) {
        match event {
            RunbookEvent::RunbookCreated(data) => self.apply_created(data),
            RunbookEvent::TaskAdded(data) => self.apply_task_added(data),
            RunbookEvent::TaskStarted(data) => self.apply_task_started(data),
            RunbookEvent::TaskCompleted(data) => self.apply_task_completed(data),
            RunbookEvent::RunbookCompleted(_) => {
                self.status = RunbookStatus::Completed;
            }
        }
        self.version = self.version.next();
    }

    fn changes(&self) -> &EventBuffer<RunbookEvent> {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut EventBuffer<RunbookEvent> {
        &mut self.changes
    }
}

// Query methods
impl Runbook {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_id(&self) -> Option<&UserId> {
        self.owner_id.as_ref()
    }

    pub fn status(&self) -> RunbookStatus {
        self.status
    }

    /// Returns the tasks in the order they were added.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.task_id == task_id)
    }

    /// Returns how many tasks are not completed yet.
    pub fn outstanding_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_completed()).count()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command handlers (return events)
impl Runbook {
    fn create(&self, cmd: &CreateRunbook) -> Result<Vec<RunbookEvent>, RunbookError> {
        if self.id.is_some() {
            return Err(RunbookError::AlreadyCreated);
        }

        if cmd.name.trim().is_empty() {
            return Err(RunbookError::NameRequired);
        }

        Ok(vec![RunbookEvent::runbook_created(
            cmd.runbook_id,
            cmd.name.clone(),
            cmd.owner_id.clone(),
        )])
    }

    fn add_task(&self, cmd: &AddTask) -> Result<Vec<RunbookEvent>, RunbookError> {
        self.ensure_open()?;

        if self.task(&cmd.task_id).is_some() {
            return Err(RunbookError::DuplicateTask {
                task_id: cmd.task_id.clone(),
            });
        }

        Ok(vec![RunbookEvent::task_added(
            cmd.runbook_id,
            cmd.task_id.clone(),
            cmd.name.clone(),
            cmd.description.clone(),
        )])
    }

    fn start_task(&self, cmd: &StartTask) -> Result<Vec<RunbookEvent>, RunbookError> {
        self.ensure_open()?;

        let task = self.existing_task(&cmd.task_id)?;
        match task.status {
            TaskStatus::Added => Ok(vec![RunbookEvent::task_started(
                cmd.runbook_id,
                cmd.task_id.clone(),
                cmd.user_id.clone(),
            )]),
            TaskStatus::InProgress => Err(RunbookError::TaskAlreadyStarted {
                task_id: cmd.task_id.clone(),
            }),
            TaskStatus::Completed => Err(RunbookError::TaskAlreadyCompleted {
                task_id: cmd.task_id.clone(),
            }),
        }
    }

    fn complete_task(&self, cmd: &CompleteTask) -> Result<Vec<RunbookEvent>, RunbookError> {
        self.ensure_open()?;

        let task = self.existing_task(&cmd.task_id)?;
        match task.status {
            TaskStatus::InProgress => Ok(vec![RunbookEvent::task_completed(
                cmd.runbook_id,
                cmd.task_id.clone(),
                cmd.user_id.clone(),
            )]),
            TaskStatus::Added => Err(RunbookError::TaskNotStarted {
                task_id: cmd.task_id.clone(),
            }),
            TaskStatus::Completed => Err(RunbookError::TaskAlreadyCompleted {
                task_id: cmd.task_id.clone(),
            }),
        }
    }

    fn complete(&self, cmd: &CompleteRunbook) -> Result<Vec<RunbookEvent>, RunbookError> {
        self.ensure_open()?;

        if self.tasks.is_empty() {
            return Err(RunbookError::NoTasks);
        }

        let count = self.outstanding_tasks();
        if count > 0 {
            return Err(RunbookError::OutstandingTasks { count });
        }

        Ok(vec![RunbookEvent::runbook_completed(
            cmd.runbook_id,
            cmd.user_id.clone(),
        )])
    }

    /// Checks that the runbook exists and still accepts changes.
    fn ensure_open(&self) -> Result<(), RunbookError> {
        if self.id.is_none() {
            return Err(RunbookError::NotCreated);
        }
        if !self.status.accepts_changes() {
            return Err(RunbookError::RunbookCompleted);
        }
        Ok(())
    }

    fn existing_task(&self, task_id: &TaskId) -> Result<&Task, RunbookError> {
        self.task(task_id).ok_or_else(|| RunbookError::TaskNotFound {
            task_id: task_id.clone(),
        })
    }
}

// Event handlers
impl Runbook {
    fn apply_created(&mut self, data: &RunbookCreatedData) {
        self.id = Some(data.runbook_id);
        self.name = data.name.clone();
        self.owner_id = Some(data.owner_id.clone());
        self.status = RunbookStatus::Created;
    }

    fn apply_task_added(&mut self, data: &TaskAddedData) {
        self.tasks.push(Task::new(
            data.task_id.clone(),
            data.name.clone(),
            data.description.clone(),
        ));
    }

    fn apply_task_started(&mut self, data: &TaskStartedData) {
        if let Some(task) = self.task_mut(&data.task_id) {
            task.status = TaskStatus::InProgress;
            task.assignee = Some(data.user_id.clone());
        }
        if self.status == RunbookStatus::Created {
            self.status = RunbookStatus::InProgress;
        }
    }

    fn apply_task_completed(&mut self, data: &TaskCompletedData) {
        if let Some(task) = self.task_mut(&data.task_id) {
            task.status = TaskStatus::Completed;
            task.completed_by = Some(data.user_id.clone());
        }
    }

    fn task_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.task_id == task_id)
    }
}
