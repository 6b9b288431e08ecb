//! User record and the actor identity passed through the pipeline.
//!
//! # Invariants
//! - `Actor` is an explicit value handed to every orchestrator call; no
//!   component reads identity from ambient state.
//! - A user's role may change out-of-band, but the `Actor` captured for one
//!   request stays fixed for that request's lifetime.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user account.
pub type UserId = Uuid;

/// Role granted to a user account.
///
/// Roles are ordered only by convention; authorization decisions use
/// explicit matching, never numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProjectManager,
    Developer,
    Tester,
    Viewer,
}

impl Role {
    /// Admin and project manager bypass relationship checks entirely.
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Admin | Self::ProjectManager)
    }
}

/// User account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable account id.
    pub id: UserId,
    /// Display/login name. Unique per deployment.
    pub username: String,
    /// Current role.
    pub role: Role,
}

impl User {
    /// Creates a user with a generated stable id.
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
        }
    }

    /// Checks username shape before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        Ok(())
    }

    /// Identity/role snapshot used for authorization.
    pub fn as_actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }
}

/// Identity of the user performing one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user's stable id.
    pub id: UserId,
    /// Role at the time the request was admitted.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::{Role, User};
    use crate::model::ValidationError;

    #[test]
    fn elevated_roles_are_admin_and_pm() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::ProjectManager.is_elevated());
        assert!(!Role::Developer.is_elevated());
        assert!(!Role::Tester.is_elevated());
        assert!(!Role::Viewer.is_elevated());
    }

    #[test]
    fn blank_username_is_rejected() {
        let user = User::new("   ", Role::Viewer);
        assert_eq!(user.validate(), Err(ValidationError::EmptyUsername));
    }

    #[test]
    fn actor_snapshot_copies_id_and_role() {
        let user = User::new("dana", Role::Developer);
        let actor = user.as_actor();
        assert_eq!(actor.id, user.id);
        assert_eq!(actor.role, Role::Developer);
    }
}
