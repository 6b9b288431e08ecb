//! Project repository contract and SQLite implementation.
//!
//! # Invariants
//! - `projects.name` uniqueness violations surface as
//!   `RepoError::DuplicateProjectName`, never as raw SQLite failures.
//! - Filtered listings assemble SQL dynamically but only from the fixed
//!   sort-field/order vocabulary, never from caller strings.

use crate::model::project::{Project, ProjectId, ProjectStatus};
use crate::repo::{parse_uuid_column, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    status,
    created_by,
    created_at,
    updated_at
FROM projects";

/// Sort field vocabulary for project listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSortField {
    Name,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl ProjectSortField {
    /// Canonical lowercase token, shared by SQL assembly and cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Status => "status",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Sort direction for project listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Canonical lowercase token, shared by SQL assembly and cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query options for filtered project listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListQuery {
    /// Optional exact status filter.
    pub status: Option<ProjectStatus>,
    /// Optional normalized search term matched against name and description.
    pub search: Option<String>,
    /// Sort field.
    pub sort_by: ProjectSortField,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl Default for ProjectListQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            sort_by: ProjectSortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Repository interface for project records.
pub trait ProjectRepository {
    /// Persists one project and returns its stable id.
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    /// Replaces mutable project fields. `created_by`/`created_at` are never
    /// written on update.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    /// Gets one project by stable id.
    fn find_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists projects using the filtered/sorted query shape.
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    /// Hard-deletes one project. Tasks cascade at the schema level.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn
            .execute(
                "INSERT INTO projects (
                    id,
                    name,
                    description,
                    status,
                    created_by,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    project.id.to_string(),
                    project.name.as_str(),
                    project.description.as_str(),
                    project_status_to_db(project.status),
                    project.created_by.to_string(),
                    project.created_at,
                    project.updated_at,
                ],
            )
            .map_err(|err| map_name_conflict(err, &project.name))?;

        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE projects
                 SET
                    name = ?1,
                    description = ?2,
                    status = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![
                    project.name.as_str(),
                    project.description.as_str(),
                    project_status_to_db(project.status),
                    project.id.to_string(),
                ],
            )
            .map_err(|err| map_name_conflict(err, &project.name))?;

        if changed == 0 {
            return Err(RepoError::NotFound(project.id));
        }

        Ok(())
    }

    fn find_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }

        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(project_status_to_db(status).to_string()));
        }

        if let Some(search) = query.search.as_deref() {
            sql.push_str(" AND (name LIKE '%' || ? || '%' OR description LIKE '%' || ? || '%')");
            bind_values.push(Value::Text(search.to_string()));
            bind_values.push(Value::Text(search.to_string()));
        }

        sql.push_str(&format!(
            " ORDER BY {} {}, id ASC",
            query.sort_by.as_str(),
            query.sort_order.sql()
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();

        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }

        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    let created_by_text: String = row.get("created_by")?;
    let status_text: String = row.get("status")?;
    let status = parse_project_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid project status `{status_text}` in projects.status"
        ))
    })?;

    Ok(Project {
        id: parse_uuid_column(&id_text, "projects.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status,
        created_by: parse_uuid_column(&created_by_text, "projects.created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_name_conflict(err: rusqlite::Error, name: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(code, Some(message)) = &err {
        if code.code == ErrorCode::ConstraintViolation && message.contains("projects.name") {
            return RepoError::DuplicateProjectName(name.to_string());
        }
    }
    RepoError::from(err)
}

fn project_status_to_db(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::NotStarted => "not_started",
        ProjectStatus::InProgress => "in_progress",
        ProjectStatus::Completed => "completed",
        ProjectStatus::OnHold => "on_hold",
        ProjectStatus::Cancelled => "cancelled",
    }
}

fn parse_project_status(value: &str) -> Option<ProjectStatus> {
    match value {
        "not_started" => Some(ProjectStatus::NotStarted),
        "in_progress" => Some(ProjectStatus::InProgress),
        "completed" => Some(ProjectStatus::Completed),
        "on_hold" => Some(ProjectStatus::OnHold),
        "cancelled" => Some(ProjectStatus::Cancelled),
        _ => None,
    }
}
