//! Typed cache key builder.
//!
//! Keys are derived from query shape through one constructor per shape, so
//! call sites never concatenate strings and two different queries can never
//! collide on a key.

use crate::model::project::{ProjectId, ProjectStatus};
use crate::repo::project_repo::ProjectListQuery;

/// Namespace prefix shared by every filtered project listing key. Project
/// mutations sweep this whole prefix.
pub const PROJECT_LIST_NAMESPACE: &str = "projects:list:";

/// Canonical cache key for one supported query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// The unfiltered "all tasks" listing.
    AllTasks,
    /// Tasks of one project.
    ProjectTasks(ProjectId),
    /// One filtered/sorted project listing.
    ProjectList {
        status: Option<ProjectStatus>,
        search: Option<String>,
        sort_by: &'static str,
        sort_order: &'static str,
    },
    /// Single-project detail view.
    ProjectDetail(ProjectId),
}

impl CacheKey {
    /// Builds the listing key for one normalized project query.
    ///
    /// The search term must already be normalized (trimmed, lowercased,
    /// whitespace-collapsed) so equal queries always map to equal keys.
    pub fn for_project_list(query: &ProjectListQuery) -> Self {
        Self::ProjectList {
            status: query.status,
            search: query.search.clone(),
            sort_by: query.sort_by.as_str(),
            sort_order: query.sort_order.as_str(),
        }
    }

    /// Renders the canonical string form stored in the cache backend.
    pub fn render(&self) -> String {
        match self {
            Self::AllTasks => "tasks:all".to_string(),
            Self::ProjectTasks(project_id) => format!("tasks:project:{project_id}"),
            Self::ProjectList {
                status,
                search,
                sort_by,
                sort_order,
            } => format!(
                "{PROJECT_LIST_NAMESPACE}status={}:search={}:sort={sort_by}.{sort_order}",
                status.map_or("any", status_token),
                search.as_deref().unwrap_or("-"),
            ),
            Self::ProjectDetail(project_id) => format!("projects:detail:{project_id}"),
        }
    }

    /// Parameterized listing keys get a shorter TTL to bound staleness
    /// windows for less-common query shapes.
    pub fn is_short_lived(&self) -> bool {
        matches!(self, Self::ProjectList { .. })
    }
}

fn status_token(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::NotStarted => "not_started",
        ProjectStatus::InProgress => "in_progress",
        ProjectStatus::Completed => "completed",
        ProjectStatus::OnHold => "on_hold",
        ProjectStatus::Cancelled => "cancelled",
    }
}
