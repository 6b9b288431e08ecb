//! Notification trigger derivation.
//!
//! Pure mapping from one task mutation's before/after state to the set of
//! notification rows to persist.
//!
//! # Invariants
//! - The actor is never notified about their own action (self-notification
//!   is always suppressed).
//! - When a completion and a generic status change would both notify the
//!   same recipient, only the completion notification is produced.
//! - Every produced row carries a deep link to the affected entity.

use crate::model::notification::{Notification, NotificationKind};
use crate::model::task::Task;
use crate::model::user::{Actor, UserId};

/// Deep link to one task inside its project.
pub fn task_link(task: &Task) -> String {
    format!("/projects/{}/tasks/{}", task.project_id, task.id)
}

/// Deep link to one project.
pub fn project_link(task: &Task) -> String {
    format!("/projects/{}", task.project_id)
}

/// Derives the notification rows for one task mutation.
///
/// `before`/`after` encode the mutation kind: create is `(None, Some)`,
/// update is `(Some, Some)`, delete is `(Some, None)`.
pub fn derive_task_notifications(
    actor: &Actor,
    before: Option<&Task>,
    after: Option<&Task>,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    match (before, after) {
        // Create: only a fresh assignment can be relevant to someone else.
        (None, Some(created)) => {
            if let Some(assignee) = created.assignee {
                if assignee != actor.id {
                    notifications.push(assigned(actor, created, assignee));
                }
            }
        }
        (Some(previous), Some(current)) => {
            if let Some(assignee) = current.assignee {
                if previous.assignee != Some(assignee) && assignee != actor.id {
                    notifications.push(assigned(actor, current, assignee));
                }
            }

            let status_changed = previous.status != current.status;
            let completed = status_changed && current.status.is_completed();

            if completed && current.reporter != actor.id {
                notifications.push(Notification::new(
                    current.reporter,
                    format!("Task \"{}\" was completed", current.title),
                    NotificationKind::TaskUpdated,
                    Some(current.id),
                    Some(task_link(current)),
                ));
            }

            if status_changed {
                if let Some(assignee) = current.assignee {
                    let already_notified_of_completion =
                        completed && assignee == current.reporter;
                    if assignee != actor.id && !already_notified_of_completion {
                        notifications.push(Notification::new(
                            assignee,
                            format!(
                                "Task \"{}\" moved to {}",
                                current.title, current.status
                            ),
                            NotificationKind::TaskUpdated,
                            Some(current.id),
                            Some(task_link(current)),
                        ));
                    }
                }
            }
        }
        (Some(deleted), None) => {
            if let Some(assignee) = deleted.assignee {
                if assignee != actor.id {
                    notifications.push(Notification::new(
                        assignee,
                        format!("Task \"{}\" was deleted", deleted.title),
                        NotificationKind::General,
                        Some(deleted.id),
                        Some(project_link(deleted)),
                    ));
                }
            }
        }
        (None, None) => {}
    }

    notifications
}

fn assigned(actor: &Actor, task: &Task, assignee: UserId) -> Notification {
    debug_assert_ne!(assignee, actor.id);
    Notification::new(
        assignee,
        format!("You were assigned to task \"{}\"", task.title),
        NotificationKind::TaskAssigned,
        Some(task.id),
        Some(task_link(task)),
    )
}
