//! Task repository contract and SQLite implementation.
//!
//! # Invariants
//! - `reporter` and `created_at` are written at creation only; updates never
//!   touch them.
//! - Listings are ordered by `updated_at DESC, id ASC` so pagination and
//!   cache snapshots stay stable.

use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskId, TaskPriority, TaskStatus};
use crate::repo::{parse_uuid_column, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    status,
    priority,
    deadline,
    project_id,
    assignee,
    reporter,
    created_at,
    updated_at
FROM tasks";

/// Repository interface for task records.
pub trait TaskRepository {
    /// Persists one task and returns its stable id.
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Replaces mutable task fields. `reporter`/`created_at` are never
    /// written on update.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Gets one task by stable id.
    fn find_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Lists all tasks, or the tasks of one project.
    fn list_tasks(&self, project: Option<ProjectId>) -> RepoResult<Vec<Task>>;
    /// Hard-deletes one task.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                title,
                description,
                status,
                priority,
                deadline,
                project_id,
                assignee,
                reporter,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                task_status_to_db(task.status),
                task_priority_to_db(task.priority),
                task.deadline,
                task.project_id.to_string(),
                task.assignee.map(|id| id.to_string()),
                task.reporter.to_string(),
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(task.id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                status = ?3,
                priority = ?4,
                deadline = ?5,
                project_id = ?6,
                assignee = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?8;",
            params![
                task.title.as_str(),
                task.description.as_str(),
                task_status_to_db(task.status),
                task_priority_to_db(task.priority),
                task.deadline,
                task.project_id.to_string(),
                task.assignee.map(|id| id.to_string()),
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }

        Ok(())
    }

    fn find_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }

        Ok(None)
    }

    fn list_tasks(&self, project: Option<ProjectId>) -> RepoResult<Vec<Task>> {
        let mut tasks = Vec::new();

        match project {
            Some(project_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{TASK_SELECT_SQL} WHERE project_id = ?1 ORDER BY updated_at DESC, id ASC;"
                ))?;
                let mut rows = stmt.query(params![project_id.to_string()])?;
                while let Some(row) = rows.next()? {
                    tasks.push(parse_task_row(row)?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{TASK_SELECT_SQL} ORDER BY updated_at DESC, id ASC;"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    tasks.push(parse_task_row(row)?);
                }
            }
        }

        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let reporter_text: String = row.get("reporter")?;

    let status_text: String = row.get("status")?;
    let status = parse_task_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_task_priority(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let assignee = match row.get::<_, Option<String>>("assignee")? {
        Some(value) => Some(parse_uuid_column(&value, "tasks.assignee")?),
        None => None,
    };

    Ok(Task {
        id: parse_uuid_column(&id_text, "tasks.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        deadline: row.get("deadline")?,
        project_id: parse_uuid_column(&project_text, "tasks.project_id")?,
        assignee,
        reporter: parse_uuid_column(&reporter_text, "tasks.reporter")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn task_status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "to_do",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Done => "done",
        TaskStatus::Blocked => "blocked",
    }
}

fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "to_do" => Some(TaskStatus::ToDo),
        "in_progress" => Some(TaskStatus::InProgress),
        "done" => Some(TaskStatus::Done),
        "blocked" => Some(TaskStatus::Blocked),
        _ => None,
    }
}

fn task_priority_to_db(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

fn parse_task_priority(value: &str) -> Option<TaskPriority> {
    match value {
        "low" => Some(TaskPriority::Low),
        "medium" => Some(TaskPriority::Medium),
        "high" => Some(TaskPriority::High),
        _ => None,
    }
}
