//! Project record and lifecycle status.
//!
//! # Invariants
//! - `name` is unique across all projects (enforced by storage).
//! - `created_by` is set once at creation and never reassigned.

use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a project.
pub type ProjectId = Uuid;

/// Upper bound on project name length, matching storage expectations.
pub const PROJECT_NAME_MAX_CHARS: usize = 120;

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

/// Project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Stable project id.
    pub id: ProjectId,
    /// Unique project name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Creating user. Immutable after creation.
    pub created_by: UserId,
    /// Creation timestamp, epoch milliseconds.
    pub created_at: i64,
    /// Last update timestamp, epoch milliseconds.
    pub updated_at: i64,
}

impl Project {
    /// Creates a project with a generated id and `NotStarted` status.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: UserId,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: ProjectStatus::NotStarted,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks name shape before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if trimmed.chars().count() > PROJECT_NAME_MAX_CHARS {
            return Err(ValidationError::NameTooLong {
                max_chars: PROJECT_NAME_MAX_CHARS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectStatus, PROJECT_NAME_MAX_CHARS};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn new_project_starts_not_started() {
        let project = Project::new("Apollo", "", Uuid::new_v4());
        assert_eq!(project.status, ProjectStatus::NotStarted);
        assert_eq!(project.created_at, project.updated_at);
    }

    #[test]
    fn blank_name_is_rejected() {
        let project = Project::new("  ", "", Uuid::new_v4());
        assert_eq!(project.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(PROJECT_NAME_MAX_CHARS + 1);
        let project = Project::new(name, "", Uuid::new_v4());
        assert!(matches!(
            project.validate(),
            Err(ValidationError::NameTooLong { .. })
        ));
    }
}
