//! User repository contract and SQLite implementation.
//!
//! Users are administered out-of-band; the pipeline only needs creation
//! (seeding) and referential lookup.

use crate::model::user::{Role, User, UserId};
use crate::repo::{parse_uuid_column, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for user records.
pub trait UserRepository {
    /// Persists one user and returns its stable id.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Gets one user by stable id.
    fn find_user(&self, id: UserId) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (id, username, role) VALUES (?1, ?2, ?3);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                role_to_db(user.role),
            ],
        )?;

        Ok(user.id)
    }

    fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, role FROM users WHERE id = ?1;")?;

        let mut rows = stmt.query(params![id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: parse_uuid_column(&id_text, "users.id")?,
        username: row.get("username")?,
        role,
    })
}

fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::ProjectManager => "project_manager",
        Role::Developer => "developer",
        Role::Tester => "tester",
        Role::Viewer => "viewer",
    }
}

fn parse_role(value: &str) -> Option<Role> {
    match value {
        "admin" => Some(Role::Admin),
        "project_manager" => Some(Role::ProjectManager),
        "developer" => Some(Role::Developer),
        "tester" => Some(Role::Tester),
        "viewer" => Some(Role::Viewer),
        _ => None,
    }
}
