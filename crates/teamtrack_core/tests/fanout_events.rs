use rusqlite::Connection;
use std::sync::Arc;
use teamtrack_core::db::open_db_in_memory;
use teamtrack_core::{
    Actor, CacheCoherency, CacheConfig, ChangeBody, ChangeKind, MemoryCache, MutatedEntity,
    MutationRequest, MutationService, NotificationService, Project, ProjectDraft, Role, Scope,
    ScopeBus, SqliteNotificationRepository, SqliteProjectRepository, SqliteTaskRepository,
    SqliteUserRepository, Task, TaskChanges, TaskDraft, TaskStatus, User, UserRepository,
};

type Pipeline<'c> = MutationService<
    SqliteUserRepository<'c>,
    SqliteProjectRepository<'c>,
    SqliteTaskRepository<'c>,
    SqliteNotificationRepository<'c>,
    MemoryCache,
>;

fn pipeline<'c>(conn: &'c Connection, bus: Arc<ScopeBus>) -> Pipeline<'c> {
    MutationService::new(
        SqliteUserRepository::new(conn),
        SqliteProjectRepository::new(conn),
        SqliteTaskRepository::new(conn),
        SqliteNotificationRepository::new(conn),
        Arc::new(CacheCoherency::new(MemoryCache::new(), CacheConfig::default())),
        bus,
    )
}

fn seed_user(conn: &Connection, username: &str, role: Role) -> Actor {
    let user = User::new(username, role);
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user.as_actor()
}

fn created_project(service: &Pipeline<'_>, actor: &Actor, name: &str) -> Project {
    match service
        .mutate(actor, MutationRequest::CreateProject(ProjectDraft::new(name)))
        .unwrap()
        .entity
    {
        MutatedEntity::Project(project) => project,
        other => panic!("expected project, got {other:?}"),
    }
}

fn created_task(service: &Pipeline<'_>, actor: &Actor, draft: TaskDraft) -> Task {
    match service
        .mutate(actor, MutationRequest::CreateTask(draft))
        .unwrap()
        .entity
    {
        MutatedEntity::Task(task) => task,
        other => panic!("expected task, got {other:?}"),
    }
}

#[test]
fn cross_project_move_emits_deletion_then_creation() {
    let conn = open_db_in_memory().unwrap();
    let bus = Arc::new(ScopeBus::new());
    let service = pipeline(&conn, bus.clone());
    let admin = seed_user(&conn, "admin", Role::Admin);

    let project_a = created_project(&service, &admin, "A");
    let project_b = created_project(&service, &admin, "B");
    let task = created_task(&service, &admin, TaskDraft::new("mover", project_a.id));

    let mut old_scope = bus.subscribe(Scope::Project(project_a.id));
    let mut new_scope = bus.subscribe(Scope::Project(project_b.id));

    let changes = TaskChanges {
        project_id: Some(project_b.id),
        ..TaskChanges::default()
    };
    service
        .mutate(&admin, MutationRequest::UpdateTask(task.id, changes))
        .unwrap();

    // Old-project viewers see the task leave.
    let left = old_scope.try_recv().unwrap();
    assert_eq!(left.kind, ChangeKind::Deleted);
    assert!(matches!(left.body, ChangeBody::Removed { id } if id == task.id));

    // New-project viewers see it arrive with its full state.
    let arrived = new_scope.try_recv().unwrap();
    assert_eq!(arrived.kind, ChangeKind::Created);
    match arrived.body {
        ChangeBody::Task(moved) => assert_eq!(moved.project_id, project_b.id),
        other => panic!("expected task body, got {other:?}"),
    }
}

#[test]
fn in_place_update_emits_updated_on_the_project_scope() {
    let conn = open_db_in_memory().unwrap();
    let bus = Arc::new(ScopeBus::new());
    let service = pipeline(&conn, bus.clone());
    let admin = seed_user(&conn, "admin", Role::Admin);
    let project = created_project(&service, &admin, "Steady");
    let task = created_task(&service, &admin, TaskDraft::new("still here", project.id));

    let mut live = bus.subscribe(Scope::Project(project.id));

    let changes = TaskChanges {
        status: Some(TaskStatus::InProgress),
        ..TaskChanges::default()
    };
    service
        .mutate(&admin, MutationRequest::UpdateTask(task.id, changes))
        .unwrap();

    let event = live.try_recv().unwrap();
    assert_eq!(event.kind, ChangeKind::Updated);
    assert!(live.try_recv().is_err(), "exactly one event expected");
}

#[test]
fn project_creation_reaches_the_all_projects_scope() {
    let conn = open_db_in_memory().unwrap();
    let bus = Arc::new(ScopeBus::new());
    let service = pipeline(&conn, bus.clone());
    let admin = seed_user(&conn, "admin", Role::Admin);

    let mut live = bus.subscribe(Scope::AllProjects);
    let project = created_project(&service, &admin, "Announced");

    let event = live.try_recv().unwrap();
    assert_eq!(event.kind, ChangeKind::Created);
    match event.body {
        ChangeBody::Project(announced) => assert_eq!(announced.id, project.id),
        other => panic!("expected project body, got {other:?}"),
    }
}

#[test]
fn disconnected_subscriber_just_misses_events() {
    let conn = open_db_in_memory().unwrap();
    let bus = Arc::new(ScopeBus::new());
    let service = pipeline(&conn, bus.clone());
    let admin = seed_user(&conn, "admin", Role::Admin);
    let project = created_project(&service, &admin, "Lossy");

    let live = bus.subscribe(Scope::Project(project.id));
    drop(live);
    bus.unsubscribe(Scope::Project(project.id));

    // No receiver: publishing is a no-op rather than an error.
    created_task(&service, &admin, TaskDraft::new("unseen", project.id));
    assert_eq!(bus.subscriber_count(Scope::Project(project.id)), 0);
}

#[test]
fn self_assignment_creates_no_notification() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn, Arc::new(ScopeBus::new()));
    let developer = seed_user(&conn, "dev", Role::Developer);
    let admin = seed_user(&conn, "admin", Role::Admin);
    let project = created_project(&service, &admin, "Self Serve");

    let mut draft = TaskDraft::new("my own task", project.id);
    draft.assignee = Some(developer.id);
    let outcome = service
        .mutate(&developer, MutationRequest::CreateTask(draft))
        .unwrap();

    assert!(outcome.notifications_issued.is_empty());
    let inbox = NotificationService::new(SqliteNotificationRepository::new(&conn));
    assert_eq!(inbox.inbox(developer.id).unwrap().len(), 0);
}

#[test]
fn completion_notifies_reporter_once_even_when_also_assignee() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn, Arc::new(ScopeBus::new()));
    let admin = seed_user(&conn, "admin", Role::Admin);
    let reporter = seed_user(&conn, "reporter", Role::Developer);
    let project = created_project(&service, &admin, "Double Trouble");

    // Reporter is also the assignee: completing the task by someone else
    // must produce exactly one notification, the completion one.
    let mut draft = TaskDraft::new("both hats", project.id);
    draft.assignee = Some(reporter.id);
    let task = created_task(&service, &reporter, draft);

    let changes = TaskChanges {
        status: Some(TaskStatus::Done),
        ..TaskChanges::default()
    };
    let outcome = service
        .mutate(&admin, MutationRequest::UpdateTask(task.id, changes))
        .unwrap();

    assert_eq!(outcome.notifications_issued.len(), 1);
    assert_eq!(outcome.notifications_issued[0].recipient, reporter.id);
    assert!(outcome.notifications_issued[0].message.contains("completed"));
}

#[test]
fn status_change_notifies_assignee_who_is_not_the_actor() {
    let conn = open_db_in_memory().unwrap();
    let service = pipeline(&conn, Arc::new(ScopeBus::new()));
    let admin = seed_user(&conn, "admin", Role::Admin);
    let assignee = seed_user(&conn, "assignee", Role::Tester);
    let project = created_project(&service, &admin, "Watched");

    let mut draft = TaskDraft::new("observed", project.id);
    draft.assignee = Some(assignee.id);
    let task = created_task(&service, &admin, draft);

    let changes = TaskChanges {
        status: Some(TaskStatus::Blocked),
        ..TaskChanges::default()
    };
    let outcome = service
        .mutate(&admin, MutationRequest::UpdateTask(task.id, changes))
        .unwrap();

    // Blocked is terminal but not completed: only the generic status-change
    // notification for the assignee, nothing for the reporter.
    assert_eq!(outcome.notifications_issued.len(), 1);
    assert_eq!(outcome.notifications_issued[0].recipient, assignee.id);
    assert!(outcome.notifications_issued[0].message.contains("blocked"));
}
