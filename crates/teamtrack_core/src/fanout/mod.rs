//! Change propagation fan-out.
//!
//! # Responsibility
//! - Deliver each successful mutation to live subscribers of the affected
//!   scope and persist notifications for specifically affected users.
//!
//! # Invariants
//! - Live delivery is fire-and-forget: a disconnected or lagging subscriber
//!   simply misses events and reconciles via an authoritative read.
//! - Notifications are per-user rows, never broadcast to a scope.

use crate::model::project::{Project, ProjectId};
use crate::model::task::Task;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod bus;
pub mod notify;

/// Live-broadcast topic: one per project, plus the global project-list
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Project(ProjectId),
    AllProjects,
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(project_id) => write!(f, "project:{project_id}"),
            Self::AllProjects => write!(f, "projects:all"),
        }
    }
}

/// Mutation kind carried by every live event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Wire-level event name.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Event payload: the full refreshed entity, or a deletion marker carrying
/// at least the identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "entity")]
pub enum ChangeBody {
    Task(Task),
    Project(Project),
    Removed { id: Uuid },
}

/// One live event delivered to every subscriber of its scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub scope: Scope,
    pub body: ChangeBody,
}
