//! Notification repository contract and SQLite implementation.
//!
//! # Invariants
//! - Every read/update/delete is scoped by recipient: a caller can never
//!   touch another user's rows, and a foreign id reads as not-found.
//! - Inbox ordering is `created_at DESC, id ASC`.

use crate::model::notification::{Notification, NotificationId, NotificationKind};
use crate::model::user::UserId;
use crate::repo::{parse_bool_column, parse_uuid_column, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    recipient,
    message,
    kind,
    related_id,
    link,
    is_read,
    created_at
FROM notifications";

/// Repository interface for notification rows.
pub trait NotificationRepository {
    /// Persists one notification and returns its stable id.
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId>;
    /// Lists all notifications addressed to one recipient, newest first.
    fn list_for_recipient(&self, recipient: UserId) -> RepoResult<Vec<Notification>>;
    /// Counts unread notifications for one recipient.
    fn unread_count(&self, recipient: UserId) -> RepoResult<u64>;
    /// Marks one owned notification as read.
    fn mark_read(&self, recipient: UserId, id: NotificationId) -> RepoResult<()>;
    /// Marks every unread notification of one recipient as read. Returns
    /// the number of rows changed.
    fn mark_all_read(&self, recipient: UserId) -> RepoResult<u64>;
    /// Deletes one owned notification.
    fn delete_for_owner(&self, recipient: UserId, id: NotificationId) -> RepoResult<()>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;

        self.conn.execute(
            "INSERT INTO notifications (
                id,
                recipient,
                message,
                kind,
                related_id,
                link,
                is_read,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                notification.id.to_string(),
                notification.recipient.to_string(),
                notification.message.as_str(),
                kind_to_db(notification.kind),
                notification.related_id.map(|id| id.to_string()),
                notification.link.as_deref(),
                i64::from(notification.read),
                notification.created_at,
            ],
        )?;

        Ok(notification.id)
    }

    fn list_for_recipient(&self, recipient: UserId) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL} WHERE recipient = ?1 ORDER BY created_at DESC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![recipient.to_string()])?;
        let mut notifications = Vec::new();

        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }

        Ok(notifications)
    }

    fn unread_count(&self, recipient: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ?1 AND is_read = 0;",
            params![recipient.to_string()],
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    fn mark_read(&self, recipient: UserId, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient = ?2;",
            params![id.to_string(), recipient.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn mark_all_read(&self, recipient: UserId) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient = ?1 AND is_read = 0;",
            params![recipient.to_string()],
        )?;

        Ok(changed as u64)
    }

    fn delete_for_owner(&self, recipient: UserId, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND recipient = ?2;",
            params![id.to_string(), recipient.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id_text: String = row.get("id")?;
    let recipient_text: String = row.get("recipient")?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid notification kind `{kind_text}` in notifications.kind"
        ))
    })?;

    let related_id = match row.get::<_, Option<String>>("related_id")? {
        Some(value) => Some(parse_uuid_column(&value, "notifications.related_id")?),
        None => None,
    };

    Ok(Notification {
        id: parse_uuid_column(&id_text, "notifications.id")?,
        recipient: parse_uuid_column(&recipient_text, "notifications.recipient")?,
        message: row.get("message")?,
        kind,
        related_id,
        link: row.get("link")?,
        read: parse_bool_column(row.get("is_read")?, "notifications.is_read")?,
        created_at: row.get("created_at")?,
    })
}

fn kind_to_db(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::TaskAssigned => "task_assigned",
        NotificationKind::TaskUpdated => "task_updated",
        NotificationKind::ProjectAssigned => "project_assigned",
        NotificationKind::General => "general",
    }
}

fn parse_kind(value: &str) -> Option<NotificationKind> {
    match value {
        "task_assigned" => Some(NotificationKind::TaskAssigned),
        "task_updated" => Some(NotificationKind::TaskUpdated),
        "project_assigned" => Some(NotificationKind::ProjectAssigned),
        "general" => Some(NotificationKind::General),
        _ => None,
    }
}
