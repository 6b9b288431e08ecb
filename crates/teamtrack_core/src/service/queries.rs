//! Read-through cached queries.
//!
//! # Responsibility
//! - Serve the list/detail read shapes backed by the cache layer,
//!   populating entries lazily on miss.
//! - Normalize search input so equal queries hit equal cache keys.
//!
//! # Invariants
//! - A cache miss (or a degraded cache) always falls through to the entity
//!   store; reads never fail because of the cache.
//! - Negative detail lookups are not cached.

use crate::cache::key::CacheKey;
use crate::cache::{CacheCoherency, CacheStore};
use crate::model::project::{Project, ProjectId};
use crate::model::task::Task;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Normalizes one raw search term: trim, collapse inner whitespace,
/// lowercase. Empty input normalizes to `None` (no filter).
pub fn normalize_search(term: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(term.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.to_lowercase())
}

/// Cached read surface consumed by list/detail route handlers.
pub struct QueryService<P, T, C>
where
    P: ProjectRepository,
    T: TaskRepository,
    C: CacheStore,
{
    projects: P,
    tasks: T,
    cache: Arc<CacheCoherency<C>>,
}

impl<P, T, C> QueryService<P, T, C>
where
    P: ProjectRepository,
    T: TaskRepository,
    C: CacheStore,
{
    pub fn new(projects: P, tasks: T, cache: Arc<CacheCoherency<C>>) -> Self {
        Self {
            projects,
            tasks,
            cache,
        }
    }

    /// Lists every task, cached under the canonical all-tasks key.
    pub fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let key = CacheKey::AllTasks;
        if let Some(cached) = self.cache.read_json::<Vec<Task>>(&key) {
            return Ok(cached);
        }

        let tasks = self.tasks.list_tasks(None)?;
        self.cache.write_json(&key, &tasks);
        Ok(tasks)
    }

    /// Lists the tasks of one project, cached per project key.
    pub fn tasks_of_project(&self, project_id: ProjectId) -> RepoResult<Vec<Task>> {
        let key = CacheKey::ProjectTasks(project_id);
        if let Some(cached) = self.cache.read_json::<Vec<Task>>(&key) {
            return Ok(cached);
        }

        let tasks = self.tasks.list_tasks(Some(project_id))?;
        self.cache.write_json(&key, &tasks);
        Ok(tasks)
    }

    /// Lists projects for one filtered/sorted query shape.
    ///
    /// The search term is normalized before both key derivation and the
    /// store query, so equivalent inputs share one cache entry.
    pub fn list_projects(&self, mut query: ProjectListQuery) -> RepoResult<Vec<Project>> {
        query.search = query.search.as_deref().and_then(normalize_search);

        let key = CacheKey::for_project_list(&query);
        if let Some(cached) = self.cache.read_json::<Vec<Project>>(&key) {
            return Ok(cached);
        }

        let projects = self.projects.list_projects(&query)?;
        self.cache.write_json(&key, &projects);
        Ok(projects)
    }

    /// Loads one project's detail view through the cache.
    pub fn project_detail(&self, project_id: ProjectId) -> RepoResult<Option<Project>> {
        let key = CacheKey::ProjectDetail(project_id);
        if let Some(cached) = self.cache.read_json::<Project>(&key) {
            return Ok(Some(cached));
        }

        let project = self.projects.find_project(project_id)?;
        if let Some(found) = &project {
            self.cache.write_json(&key, found);
        }
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_search;

    #[test]
    fn normalize_search_collapses_and_lowercases() {
        assert_eq!(
            normalize_search("  Login   Bug "),
            Some("login bug".to_string())
        );
    }

    #[test]
    fn normalize_search_drops_empty_terms() {
        assert_eq!(normalize_search("   "), None);
        assert_eq!(normalize_search(""), None);
    }
}
