//! Persisted notification record.
//!
//! # Invariants
//! - Every notification has exactly one recipient; there is no broadcast
//!   notification row.
//! - Rows are created only as a side effect of a task/project mutation,
//!   never directly by a client.
//! - After creation only the `read` flag changes (plus deletion by owner).

use crate::model::user::UserId;
use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a notification row.
pub type NotificationId = Uuid;

/// Semantic category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskUpdated,
    ProjectAssigned,
    General,
}

/// Notification record delivered to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable row id.
    pub id: NotificationId,
    /// The single recipient.
    pub recipient: UserId,
    /// Human-readable message.
    pub message: String,
    /// Semantic category.
    pub kind: NotificationKind,
    /// Affected entity, when one exists.
    pub related_id: Option<Uuid>,
    /// Deep link the recipient's client can navigate to directly.
    pub link: Option<String>,
    /// Read flag. Defaults to `false`.
    pub read: bool,
    /// Creation timestamp, epoch milliseconds.
    pub created_at: i64,
}

impl Notification {
    /// Creates an unread notification with a generated id.
    pub fn new(
        recipient: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
        related_id: Option<Uuid>,
        link: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            message: message.into(),
            kind,
            related_id,
            link,
            read: false,
            created_at: now_epoch_ms(),
        }
    }

    /// Checks message shape before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Notification, NotificationKind};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn new_notification_starts_unread() {
        let row = Notification::new(
            Uuid::new_v4(),
            "you were assigned",
            NotificationKind::TaskAssigned,
            None,
            None,
        );
        assert!(!row.read);
        assert!(row.created_at > 0);
    }

    #[test]
    fn empty_message_is_rejected() {
        let row = Notification::new(Uuid::new_v4(), " ", NotificationKind::General, None, None);
        assert_eq!(row.validate(), Err(ValidationError::EmptyMessage));
    }
}
