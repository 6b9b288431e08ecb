//! Notification inbox service.
//!
//! Read/update surface for notification rows, consumed outside the mutation
//! pipeline. All operations are owner-scoped: a recipient can only see and
//! touch their own rows.

use crate::model::notification::{Notification, NotificationId};
use crate::model::user::UserId;
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::RepoResult;

/// Use-case facade over the notification repository.
pub struct NotificationService<N: NotificationRepository> {
    repo: N,
}

impl<N: NotificationRepository> NotificationService<N> {
    pub fn new(repo: N) -> Self {
        Self { repo }
    }

    /// Lists one recipient's notifications, newest first.
    pub fn inbox(&self, recipient: UserId) -> RepoResult<Vec<Notification>> {
        self.repo.list_for_recipient(recipient)
    }

    /// Counts one recipient's unread notifications.
    pub fn unread_count(&self, recipient: UserId) -> RepoResult<u64> {
        self.repo.unread_count(recipient)
    }

    /// Marks one owned notification as read. A foreign or unknown id is
    /// not-found.
    pub fn mark_read(&self, recipient: UserId, id: NotificationId) -> RepoResult<()> {
        self.repo.mark_read(recipient, id)
    }

    /// Marks all of one recipient's notifications as read; returns how many
    /// rows changed.
    pub fn mark_all_read(&self, recipient: UserId) -> RepoResult<u64> {
        self.repo.mark_all_read(recipient)
    }

    /// Deletes one owned notification.
    pub fn delete(&self, recipient: UserId, id: NotificationId) -> RepoResult<()> {
        self.repo.delete_for_owner(recipient, id)
    }
}
