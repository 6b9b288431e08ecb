//! Core mutation pipeline for the TeamTrack collaborative tracker.
//! This crate is the single source of truth for authorization, cache
//! coherency and change propagation on every task/project write.

pub mod authz;
pub mod cache;
pub mod db;
pub mod fanout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use authz::{authorize, AuthzRequest, Decision, DenyReason};
pub use cache::key::CacheKey;
pub use cache::{CacheCoherency, CacheConfig, CacheError, CacheStore, MemoryCache};
pub use fanout::bus::ScopeBus;
pub use fanout::{ChangeBody, ChangeEvent, ChangeKind, Scope};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::notification::{Notification, NotificationId, NotificationKind};
pub use model::project::{Project, ProjectId, ProjectStatus};
pub use model::task::{Task, TaskId, TaskPriority, TaskStatus};
pub use model::user::{Actor, Role, User, UserId};
pub use model::ValidationError;
pub use repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
pub use repo::project_repo::{
    ProjectListQuery, ProjectRepository, ProjectSortField, SortOrder, SqliteProjectRepository,
};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::mutation::{
    FieldUpdate, MutateError, MutatedEntity, MutationOutcome, MutationRequest, MutationService,
    ProjectChanges, ProjectDraft, StatusClass, TaskChanges, TaskDraft,
};
pub use service::notifications::NotificationService;
pub use service::queries::QueryService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
