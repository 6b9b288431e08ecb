use rusqlite::Connection;
use std::sync::Arc;
use teamtrack_core::db::open_db_in_memory;
use teamtrack_core::{
    Actor, CacheCoherency, CacheConfig, MemoryCache, MutateError, MutatedEntity,
    MutationRequest, MutationService, ProjectChanges, ProjectDraft, Role, ScopeBus,
    SqliteNotificationRepository, SqliteProjectRepository, SqliteTaskRepository,
    SqliteUserRepository, TaskChanges, TaskDraft, TaskStatus, User, UserRepository,
};

type Pipeline<'c> = MutationService<
    SqliteUserRepository<'c>,
    SqliteProjectRepository<'c>,
    SqliteTaskRepository<'c>,
    SqliteNotificationRepository<'c>,
    MemoryCache,
>;

fn pipeline(conn: &Connection) -> Pipeline<'_> {
    MutationService::new(
        SqliteUserRepository::new(conn),
        SqliteProjectRepository::new(conn),
        SqliteTaskRepository::new(conn),
        SqliteNotificationRepository::new(conn),
        Arc::new(CacheCoherency::new(MemoryCache::new(), CacheConfig::default())),
        Arc::new(ScopeBus::new()),
    )
}

fn seed_user(conn: &Connection, username: &str, role: Role) -> Actor {
    let user = User::new(username, role);
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user.as_actor()
}

/// Elevated roles run the complete create/update/delete cycle on both
/// entity kinds without a single denial.
#[test]
fn admin_and_pm_pass_the_full_action_matrix() {
    for (username, role) in [("admin", Role::Admin), ("pm", Role::ProjectManager)] {
        let conn = open_db_in_memory().unwrap();
        let service = pipeline(&conn);
        let elevated = seed_user(&conn, username, role);
        // Entities owned by someone else entirely.
        let owner = seed_user(&conn, "owner", Role::Admin);

        let project = match service
            .mutate(
                &owner,
                MutationRequest::CreateProject(ProjectDraft::new("Matrix")),
            )
            .unwrap()
            .entity
        {
            MutatedEntity::Project(project) => project,
            other => panic!("expected project, got {other:?}"),
        };
        let task = match service
            .mutate(
                &owner,
                MutationRequest::CreateTask(TaskDraft::new("cell", project.id)),
            )
            .unwrap()
            .entity
        {
            MutatedEntity::Task(task) => task,
            other => panic!("expected task, got {other:?}"),
        };

        service
            .mutate(
                &elevated,
                MutationRequest::CreateTask(TaskDraft::new("their own", project.id)),
            )
            .unwrap();
        service
            .mutate(
                &elevated,
                MutationRequest::UpdateTask(
                    task.id,
                    TaskChanges {
                        status: Some(TaskStatus::Done),
                        ..TaskChanges::default()
                    },
                ),
            )
            .unwrap();
        service
            .mutate(&elevated, MutationRequest::DeleteTask(task.id))
            .unwrap();
        service
            .mutate(
                &elevated,
                MutationRequest::UpdateProject(
                    project.id,
                    ProjectChanges {
                        description: Some("touched".to_string()),
                        ..ProjectChanges::default()
                    },
                ),
            )
            .unwrap();
        service
            .mutate(&elevated, MutationRequest::DeleteProject(project.id))
            .unwrap();
        service
            .mutate(
                &elevated,
                MutationRequest::CreateProject(ProjectDraft::new("Their Own")),
            )
            .unwrap();
    }
}

#[test]
fn non_elevated_roles_cannot_create_projects() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn);

    for (username, role) in [
        ("dev", Role::Developer),
        ("tester", Role::Tester),
        ("viewer", Role::Viewer),
    ] {
        let actor = seed_user(&conn, username, role);
        let err = service
            .mutate(
                &actor,
                MutationRequest::CreateProject(ProjectDraft::new(username.to_uppercase())),
            )
            .unwrap_err();
        assert!(
            matches!(err, MutateError::Forbidden(_)),
            "{role:?} should be denied project creation"
        );
    }
}

#[test]
fn task_creation_roles_match_the_matrix() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn);
    let admin = seed_user(&conn, "admin", Role::Admin);

    let project = match service
        .mutate(
            &admin,
            MutationRequest::CreateProject(ProjectDraft::new("Roles")),
        )
        .unwrap()
        .entity
    {
        MutatedEntity::Project(project) => project,
        other => panic!("expected project, got {other:?}"),
    };

    for (username, role) in [("dev", Role::Developer), ("tester", Role::Tester)] {
        let actor = seed_user(&conn, username, role);
        service
            .mutate(
                &actor,
                MutationRequest::CreateTask(TaskDraft::new(format!("by {username}"), project.id)),
            )
            .unwrap();
    }

    let viewer = seed_user(&conn, "viewer", Role::Viewer);
    let err = service
        .mutate(
            &viewer,
            MutationRequest::CreateTask(TaskDraft::new("denied", project.id)),
        )
        .unwrap_err();
    assert!(matches!(err, MutateError::Forbidden(_)));
}

#[test]
fn assignee_update_rights_do_not_extend_to_delete() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn);
    let admin = seed_user(&conn, "admin", Role::Admin);
    let assignee = seed_user(&conn, "assignee", Role::Tester);

    let project = match service
        .mutate(
            &admin,
            MutationRequest::CreateProject(ProjectDraft::new("Rights")),
        )
        .unwrap()
        .entity
    {
        MutatedEntity::Project(project) => project,
        other => panic!("expected project, got {other:?}"),
    };
    let mut draft = TaskDraft::new("assigned work", project.id);
    draft.assignee = Some(assignee.id);
    let task = match service
        .mutate(&admin, MutationRequest::CreateTask(draft))
        .unwrap()
        .entity
    {
        MutatedEntity::Task(task) => task,
        other => panic!("expected task, got {other:?}"),
    };

    // The assignee may update, even into a terminal status.
    service
        .mutate(
            &assignee,
            MutationRequest::UpdateTask(
                task.id,
                TaskChanges {
                    status: Some(TaskStatus::Done),
                    ..TaskChanges::default()
                },
            ),
        )
        .unwrap();

    // But deletion stays reporter/elevated-only.
    let err = service
        .mutate(&assignee, MutationRequest::DeleteTask(task.id))
        .unwrap_err();
    assert!(matches!(err, MutateError::Forbidden(_)));
}
