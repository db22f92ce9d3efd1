//! Runbook and task lifecycles.

use serde::{Deserialize, Serialize};

/// The state of a runbook.
///
/// State transitions:
/// ```text
/// Created ──► InProgress ──► Completed
///   (first task started)  (all tasks completed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunbookStatus {
    /// Tasks are being added; none started yet.
    #[default]
    Created,

    /// At least one task has been started.
    InProgress,

    /// Every task is done (terminal state).
    Completed,
}

impl RunbookStatus {
    /// Returns true if tasks can still be added or worked on.
    pub fn accepts_changes(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunbookStatus::Completed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunbookStatus::Created => "Created",
            RunbookStatus::InProgress => "InProgress",
            RunbookStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for RunbookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state of a single task.
///
/// ```text
/// Added ──► InProgress ──► Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    Added,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Added => "Added",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
