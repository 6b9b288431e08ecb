//! Task record, status and priority.
//!
//! # Invariants
//! - `reporter` is set once at creation and never reassigned.
//! - `project_id` is mutable: a task may move between projects.
//! - `deadline`, when present, is positive epoch milliseconds.

use crate::model::project::ProjectId;
use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    /// Terminal statuses are the ones reporters may not set without also
    /// being the assignee or holding an elevated/engineering role.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Blocked)
    }

    /// Whether this status counts as completed work.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ToDo => "to do",
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        };
        write!(f, "{label}")
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// Task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task id.
    pub id: TaskId,
    /// Short summary line.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Priority bucket.
    pub priority: TaskPriority,
    /// Optional due timestamp, epoch milliseconds.
    pub deadline: Option<i64>,
    /// Owning project. Mutable.
    pub project_id: ProjectId,
    /// Currently assigned user, if any. Mutable.
    pub assignee: Option<UserId>,
    /// Reporting user. Immutable after creation.
    pub reporter: UserId,
    /// Creation timestamp, epoch milliseconds.
    pub created_at: i64,
    /// Last update timestamp, epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// Creates a task with a generated id and `ToDo` status.
    pub fn new(
        title: impl Into<String>,
        project_id: ProjectId,
        reporter: UserId,
        priority: TaskPriority,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::ToDo,
            priority,
            deadline: None,
            project_id,
            assignee: None,
            reporter,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks title and deadline shape before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(deadline) = self.deadline {
            if deadline <= 0 {
                return Err(ValidationError::InvalidDeadline(deadline));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskPriority, TaskStatus};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn terminal_statuses_are_done_and_blocked() {
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Blocked.is_terminal());
        assert!(!TaskStatus::ToDo.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn only_done_counts_as_completed() {
        assert!(TaskStatus::Done.is_completed());
        assert!(!TaskStatus::Blocked.is_completed());
    }

    #[test]
    fn new_task_defaults_to_todo_without_assignee() {
        let task = Task::new("fix it", Uuid::new_v4(), Uuid::new_v4(), TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::ToDo);
        assert!(task.assignee.is_none());
        assert!(task.deadline.is_none());
    }

    #[test]
    fn non_positive_deadline_is_rejected() {
        let mut task = Task::new("t", Uuid::new_v4(), Uuid::new_v4(), TaskPriority::Low);
        task.deadline = Some(0);
        assert_eq!(task.validate(), Err(ValidationError::InvalidDeadline(0)));
    }
}
