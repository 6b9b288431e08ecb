//! Mutation orchestrator.
//!
//! # Responsibility
//! - Run every task/project write through the fixed sequence: validate the
//!   payload, resolve references, authorize, commit, invalidate cache,
//!   propagate.
//!
//! # Invariants
//! - Any failure before the commit aborts with no side effects.
//! - Cache invalidation is applied before `mutate` returns, so the caller's
//!   next read reflects its own write.
//! - Cache and propagation failures after a successful commit are logged
//!   and swallowed; the committed mutation is the source of truth.

use crate::authz::{authorize, AuthzRequest, Decision, DenyReason};
use crate::cache::{CacheCoherency, CacheStore};
use crate::fanout::bus::ScopeBus;
use crate::fanout::notify::derive_task_notifications;
use crate::fanout::{ChangeBody, ChangeEvent, ChangeKind, Scope};
use crate::model::notification::Notification;
use crate::model::project::{Project, ProjectId, ProjectStatus};
use crate::model::task::{Task, TaskId, TaskPriority, TaskStatus};
use crate::model::user::{Actor, UserId};
use crate::model::ValidationError;
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Three-state patch for clearable fields, so "leave as is" and "clear" are
/// distinct at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl<T: Copy> FieldUpdate<T> {
    fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Unchanged => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }
}

/// Payload for task creation. The reporter is always the acting user.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub deadline: Option<i64>,
    pub project_id: ProjectId,
    pub assignee: Option<UserId>,
}

impl TaskDraft {
    /// Minimal draft: title + project, medium priority, unassigned.
    pub fn new(title: impl Into<String>, project_id: ProjectId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: TaskPriority::Medium,
            deadline: None,
            project_id,
            assignee: None,
        }
    }
}

/// Partial update for one task. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: FieldUpdate<i64>,
    pub project_id: Option<ProjectId>,
    pub assignee: FieldUpdate<UserId>,
}

/// Payload for project creation. The creator is always the acting user.
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Partial update for one project. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// One write request admitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum MutationRequest {
    CreateTask(TaskDraft),
    UpdateTask(TaskId, TaskChanges),
    DeleteTask(TaskId),
    CreateProject(ProjectDraft),
    UpdateProject(ProjectId, ProjectChanges),
    DeleteProject(ProjectId),
}

/// Refreshed entity state returned after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutatedEntity {
    Task(Task),
    Project(Project),
    DeletedTask(TaskId),
    DeletedProject(ProjectId),
}

/// Successful mutation result.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub entity: MutatedEntity,
    /// Notification rows persisted as part of this mutation's fan-out.
    pub notifications_issued: Vec<Notification>,
}

/// HTTP-style class a `MutateError` maps onto at the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    NotFound,
    Forbidden,
    Validation,
    Conflict,
    Unexpected,
}

/// Terminal failure of one mutation.
#[derive(Debug)]
pub enum MutateError {
    /// Referenced project does not exist.
    ProjectNotFound(ProjectId),
    /// Target task does not exist.
    TaskNotFound(TaskId),
    /// Referenced user (assignee) does not exist.
    UserNotFound(UserId),
    /// Authorization denial with its reason code.
    Forbidden(DenyReason),
    /// Payload failed field-level validation.
    Validation(ValidationError),
    /// Another project already uses the requested name.
    DuplicateProjectName(String),
    /// Storage failure during resolution or commit.
    Store(RepoError),
    /// Committed state failed to read back.
    Inconsistent(&'static str),
}

impl MutateError {
    /// Transport-layer status class for this failure.
    pub fn status_class(&self) -> StatusClass {
        match self {
            Self::ProjectNotFound(_) | Self::TaskNotFound(_) | Self::UserNotFound(_) => {
                StatusClass::NotFound
            }
            Self::Forbidden(_) => StatusClass::Forbidden,
            Self::Validation(_) => StatusClass::Validation,
            Self::DuplicateProjectName(_) => StatusClass::Conflict,
            Self::Store(_) | Self::Inconsistent(_) => StatusClass::Unexpected,
        }
    }
}

impl Display for MutateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::Forbidden(reason) => write!(f, "{reason}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateProjectName(name) => {
                write!(f, "project name already in use: `{name}`")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Inconsistent(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for MutateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

fn store_err(err: RepoError) -> MutateError {
    match err {
        RepoError::Validation(err) => MutateError::Validation(err),
        RepoError::DuplicateProjectName(name) => MutateError::DuplicateProjectName(name),
        other => MutateError::Store(other),
    }
}

/// The only entry point route handlers invoke for task/project writes.
pub struct MutationService<U, P, T, N, C>
where
    U: UserRepository,
    P: ProjectRepository,
    T: TaskRepository,
    N: NotificationRepository,
    C: CacheStore,
{
    users: U,
    projects: P,
    tasks: T,
    notifications: N,
    cache: Arc<CacheCoherency<C>>,
    bus: Arc<ScopeBus>,
}

impl<U, P, T, N, C> MutationService<U, P, T, N, C>
where
    U: UserRepository,
    P: ProjectRepository,
    T: TaskRepository,
    N: NotificationRepository,
    C: CacheStore,
{
    pub fn new(
        users: U,
        projects: P,
        tasks: T,
        notifications: N,
        cache: Arc<CacheCoherency<C>>,
        bus: Arc<ScopeBus>,
    ) -> Self {
        Self {
            users,
            projects,
            tasks,
            notifications,
            cache,
            bus,
        }
    }

    /// Runs one write through the pipeline.
    pub fn mutate(
        &self,
        actor: &Actor,
        request: MutationRequest,
    ) -> Result<MutationOutcome, MutateError> {
        match request {
            MutationRequest::CreateTask(draft) => self.create_task(actor, draft),
            MutationRequest::UpdateTask(id, changes) => self.update_task(actor, id, changes),
            MutationRequest::DeleteTask(id) => self.delete_task(actor, id),
            MutationRequest::CreateProject(draft) => self.create_project(actor, draft),
            MutationRequest::UpdateProject(id, changes) => {
                self.update_project(actor, id, changes)
            }
            MutationRequest::DeleteProject(id) => self.delete_project(actor, id),
        }
    }

    fn create_task(
        &self,
        actor: &Actor,
        draft: TaskDraft,
    ) -> Result<MutationOutcome, MutateError> {
        let mut task = Task::new(draft.title, draft.project_id, actor.id, draft.priority);
        task.description = draft.description;
        task.deadline = draft.deadline;
        task.assignee = draft.assignee;
        task.validate().map_err(MutateError::Validation)?;

        let project = self
            .projects
            .find_project(draft.project_id)
            .map_err(store_err)?
            .ok_or(MutateError::ProjectNotFound(draft.project_id))?;
        if let Some(assignee) = draft.assignee {
            self.resolve_user(assignee)?;
        }

        self.check(actor, &AuthzRequest::CreateTask { project: &project })?;

        self.tasks.create_task(&task).map_err(store_err)?;
        let created = self
            .tasks
            .find_task(task.id)
            .map_err(store_err)?
            .ok_or(MutateError::Inconsistent("created task missing in read-back"))?;

        self.cache.task_mutation(created.project_id, None);

        self.publish(ChangeEvent {
            kind: ChangeKind::Created,
            scope: Scope::Project(created.project_id),
            body: ChangeBody::Task(created.clone()),
        });
        let notifications_issued =
            self.persist_notifications(derive_task_notifications(actor, None, Some(&created)));

        info!(
            "event=mutation_applied module=pipeline kind=task_create id={} actor={}",
            created.id, actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::Task(created),
            notifications_issued,
        })
    }

    fn update_task(
        &self,
        actor: &Actor,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<MutationOutcome, MutateError> {
        let task = self
            .tasks
            .find_task(id)
            .map_err(store_err)?
            .ok_or(MutateError::TaskNotFound(id))?;

        if let Some(project_id) = changes.project_id {
            if project_id != task.project_id {
                self.projects
                    .find_project(project_id)
                    .map_err(store_err)?
                    .ok_or(MutateError::ProjectNotFound(project_id))?;
            }
        }
        if let FieldUpdate::Set(assignee) = changes.assignee {
            self.resolve_user(assignee)?;
        }

        // Only an actual status move counts as a proposal for the
        // terminal-status carve-out; a no-op re-send of the current status
        // stays authorized for reporters.
        let proposed_status = changes.status.filter(|status| *status != task.status);
        self.check(
            actor,
            &AuthzRequest::UpdateTask {
                task: &task,
                proposed_status,
            },
        )?;

        let mut updated = task.clone();
        if let Some(title) = changes.title {
            updated.title = title;
        }
        if let Some(description) = changes.description {
            updated.description = description;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(priority) = changes.priority {
            updated.priority = priority;
        }
        updated.deadline = changes.deadline.resolve(task.deadline);
        if let Some(project_id) = changes.project_id {
            updated.project_id = project_id;
        }
        updated.assignee = changes.assignee.resolve(task.assignee);
        updated.validate().map_err(MutateError::Validation)?;

        self.tasks.update_task(&updated).map_err(store_err)?;
        let refreshed = self
            .tasks
            .find_task(id)
            .map_err(store_err)?
            .ok_or(MutateError::Inconsistent("updated task missing in read-back"))?;

        let moved = refreshed.project_id != task.project_id;
        self.cache
            .task_mutation(task.project_id, moved.then_some(refreshed.project_id));

        if moved {
            // Clients watching the old project see the task leave; clients
            // watching the new project see it arrive.
            self.publish(ChangeEvent {
                kind: ChangeKind::Deleted,
                scope: Scope::Project(task.project_id),
                body: ChangeBody::Removed { id: refreshed.id },
            });
            self.publish(ChangeEvent {
                kind: ChangeKind::Created,
                scope: Scope::Project(refreshed.project_id),
                body: ChangeBody::Task(refreshed.clone()),
            });
        } else {
            self.publish(ChangeEvent {
                kind: ChangeKind::Updated,
                scope: Scope::Project(refreshed.project_id),
                body: ChangeBody::Task(refreshed.clone()),
            });
        }

        let notifications_issued = self.persist_notifications(derive_task_notifications(
            actor,
            Some(&task),
            Some(&refreshed),
        ));

        info!(
            "event=mutation_applied module=pipeline kind=task_update id={} actor={} moved={moved}",
            refreshed.id, actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::Task(refreshed),
            notifications_issued,
        })
    }

    fn delete_task(&self, actor: &Actor, id: TaskId) -> Result<MutationOutcome, MutateError> {
        let task = self
            .tasks
            .find_task(id)
            .map_err(store_err)?
            .ok_or(MutateError::TaskNotFound(id))?;

        self.check(actor, &AuthzRequest::DeleteTask { task: &task })?;

        self.tasks.delete_task(id).map_err(store_err)?;

        self.cache.task_mutation(task.project_id, None);

        self.publish(ChangeEvent {
            kind: ChangeKind::Deleted,
            scope: Scope::Project(task.project_id),
            body: ChangeBody::Removed { id },
        });
        let notifications_issued =
            self.persist_notifications(derive_task_notifications(actor, Some(&task), None));

        info!(
            "event=mutation_applied module=pipeline kind=task_delete id={id} actor={}",
            actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::DeletedTask(id),
            notifications_issued,
        })
    }

    fn create_project(
        &self,
        actor: &Actor,
        draft: ProjectDraft,
    ) -> Result<MutationOutcome, MutateError> {
        let project = Project::new(draft.name, draft.description, actor.id);
        project.validate().map_err(MutateError::Validation)?;

        self.check(actor, &AuthzRequest::CreateProject)?;

        self.projects.create_project(&project).map_err(store_err)?;
        let created = self
            .projects
            .find_project(project.id)
            .map_err(store_err)?
            .ok_or(MutateError::Inconsistent(
                "created project missing in read-back",
            ))?;

        self.cache.project_mutation(created.id);

        self.publish(ChangeEvent {
            kind: ChangeKind::Created,
            scope: Scope::AllProjects,
            body: ChangeBody::Project(created.clone()),
        });

        info!(
            "event=mutation_applied module=pipeline kind=project_create id={} actor={}",
            created.id, actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::Project(created),
            notifications_issued: Vec::new(),
        })
    }

    fn update_project(
        &self,
        actor: &Actor,
        id: ProjectId,
        changes: ProjectChanges,
    ) -> Result<MutationOutcome, MutateError> {
        let project = self
            .projects
            .find_project(id)
            .map_err(store_err)?
            .ok_or(MutateError::ProjectNotFound(id))?;

        self.check(actor, &AuthzRequest::UpdateProject { project: &project })?;

        let mut updated = project.clone();
        if let Some(name) = changes.name {
            updated.name = name;
        }
        if let Some(description) = changes.description {
            updated.description = description;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }
        updated.validate().map_err(MutateError::Validation)?;

        self.projects.update_project(&updated).map_err(store_err)?;
        let refreshed = self
            .projects
            .find_project(id)
            .map_err(store_err)?
            .ok_or(MutateError::Inconsistent(
                "updated project missing in read-back",
            ))?;

        self.cache.project_mutation(id);

        self.publish(ChangeEvent {
            kind: ChangeKind::Updated,
            scope: Scope::Project(id),
            body: ChangeBody::Project(refreshed.clone()),
        });
        self.publish(ChangeEvent {
            kind: ChangeKind::Updated,
            scope: Scope::AllProjects,
            body: ChangeBody::Project(refreshed.clone()),
        });

        info!(
            "event=mutation_applied module=pipeline kind=project_update id={id} actor={}",
            actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::Project(refreshed),
            notifications_issued: Vec::new(),
        })
    }

    fn delete_project(
        &self,
        actor: &Actor,
        id: ProjectId,
    ) -> Result<MutationOutcome, MutateError> {
        let project = self
            .projects
            .find_project(id)
            .map_err(store_err)?
            .ok_or(MutateError::ProjectNotFound(id))?;

        self.check(actor, &AuthzRequest::DeleteProject { project: &project })?;

        self.projects.delete_project(id).map_err(store_err)?;

        // Tasks cascade with the project, so their listing keys are part of
        // this mutation's footprint too.
        self.cache.project_mutation(id);
        self.cache.task_mutation(id, None);

        self.publish(ChangeEvent {
            kind: ChangeKind::Deleted,
            scope: Scope::Project(id),
            body: ChangeBody::Removed { id },
        });
        self.publish(ChangeEvent {
            kind: ChangeKind::Deleted,
            scope: Scope::AllProjects,
            body: ChangeBody::Removed { id },
        });

        info!(
            "event=mutation_applied module=pipeline kind=project_delete id={id} actor={}",
            actor.id
        );
        Ok(MutationOutcome {
            entity: MutatedEntity::DeletedProject(id),
            notifications_issued: Vec::new(),
        })
    }

    fn resolve_user(&self, id: UserId) -> Result<(), MutateError> {
        self.users
            .find_user(id)
            .map_err(store_err)?
            .ok_or(MutateError::UserNotFound(id))
            .map(|_| ())
    }

    fn check(&self, actor: &Actor, request: &AuthzRequest<'_>) -> Result<(), MutateError> {
        match authorize(actor, request) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                info!(
                    "event=mutation_denied module=pipeline actor={} reason={}",
                    actor.id,
                    reason.code()
                );
                Err(MutateError::Forbidden(reason))
            }
        }
    }

    fn publish(&self, event: ChangeEvent) {
        let scope = event.scope;
        let kind = event.kind.event_name();
        let delivered = self.bus.publish(event);
        debug!("event=live_broadcast module=fanout scope={scope} kind={kind} delivered={delivered}");
    }

    fn persist_notifications(&self, rows: Vec<Notification>) -> Vec<Notification> {
        let mut issued = Vec::with_capacity(rows.len());
        for row in rows {
            match self.notifications.create_notification(&row) {
                Ok(_) => issued.push(row),
                Err(err) => warn!(
                    "event=notification_persist_failed module=fanout recipient={} error={err}",
                    row.recipient
                ),
            }
        }
        issued
    }
}

#[cfg(test)]
mod tests {
    use super::FieldUpdate;

    #[test]
    fn field_update_resolves_three_states() {
        assert_eq!(FieldUpdate::<i64>::Unchanged.resolve(Some(5)), Some(5));
        assert_eq!(FieldUpdate::<i64>::Clear.resolve(Some(5)), None);
        assert_eq!(FieldUpdate::Set(7).resolve(Some(5)), Some(7));
        assert_eq!(FieldUpdate::Set(7).resolve(None), Some(7));
    }
}
