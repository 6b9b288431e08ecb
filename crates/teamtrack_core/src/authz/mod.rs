//! Authorization decision engine.
//!
//! # Responsibility
//! - Decide, per mutation, whether the acting user may perform the requested
//!   state transition, from role and relationship to the target entity.
//!
//! # Invariants
//! - `authorize` is a pure function over already-loaded state; it performs
//!   no I/O and never resolves references itself. A create against a missing
//!   project is the orchestrator's not-found error, not a denial here.
//! - Rules are evaluated in a fixed precedence order; the first match wins.
//! - Every denial carries a machine-distinguishable reason code.

use crate::model::project::Project;
use crate::model::task::{Task, TaskStatus};
use crate::model::user::{Actor, Role};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Reason code attached to every denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The actor's role grants no path to this action.
    InsufficientRole,
    /// Task updates require being the assignee or the reporter.
    NotAssigneeOrReporter,
    /// Reporters who are neither assignee nor Developer/Tester may not move
    /// a task into a terminal status.
    ReporterCannotSetTerminalStatus,
}

impl DenyReason {
    /// Stable wire code for client-side branching.
    pub fn code(self) -> &'static str {
        match self {
            Self::InsufficientRole => "role_insufficient",
            Self::NotAssigneeOrReporter => "not_assignee_or_reporter",
            Self::ReporterCannotSetTerminalStatus => "reporter_terminal_status_forbidden",
        }
    }
}

impl Display for DenyReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientRole => write!(f, "insufficient role for this action"),
            Self::NotAssigneeOrReporter => {
                write!(f, "only the assignee or the reporter may modify this task")
            }
            Self::ReporterCannotSetTerminalStatus => {
                write!(f, "the reporter cannot move this task to done or blocked")
            }
        }
    }
}

/// Outcome of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// One requested state transition, described against already-loaded state.
///
/// Update variants carry the entity's current state; create variants carry
/// the would-be parent. `proposed_status` is the only piece of the change
/// set the matrix inspects.
#[derive(Debug, Clone, Copy)]
pub enum AuthzRequest<'a> {
    CreateTask {
        project: &'a Project,
    },
    UpdateTask {
        task: &'a Task,
        proposed_status: Option<TaskStatus>,
    },
    DeleteTask {
        task: &'a Task,
    },
    CreateProject,
    UpdateProject {
        project: &'a Project,
    },
    DeleteProject {
        project: &'a Project,
    },
}

/// Evaluates the role/relationship matrix for one requested transition.
///
/// Precedence: elevated roles short-circuit to allow; task creation admits
/// Developer and Tester; task updates hinge on assignee/reporter
/// relationships with the reporter terminal-status carve-out; task deletion
/// admits the reporter; project updates/deletion admit the creator.
/// Everything unmatched is denied with `InsufficientRole`.
pub fn authorize(actor: &Actor, request: &AuthzRequest<'_>) -> Decision {
    if actor.role.is_elevated() {
        return Decision::Allow;
    }

    match request {
        AuthzRequest::CreateTask { project: _ } => {
            if matches!(actor.role, Role::Developer | Role::Tester) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientRole)
            }
        }
        AuthzRequest::UpdateTask {
            task,
            proposed_status,
        } => authorize_task_update(actor, task, *proposed_status),
        AuthzRequest::DeleteTask { task } => {
            if task.reporter == actor.id {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientRole)
            }
        }
        AuthzRequest::CreateProject => Decision::Deny(DenyReason::InsufficientRole),
        AuthzRequest::UpdateProject { project } | AuthzRequest::DeleteProject { project } => {
            if project.created_by == actor.id {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientRole)
            }
        }
    }
}

fn authorize_task_update(
    actor: &Actor,
    task: &Task,
    proposed_status: Option<TaskStatus>,
) -> Decision {
    if task.assignee == Some(actor.id) {
        return Decision::Allow;
    }

    if task.reporter == actor.id {
        // Carve-out inside the reporter rule: a reporter-only actor may edit
        // freely except for moving the task into a terminal status.
        let moves_to_terminal = proposed_status.is_some_and(TaskStatus::is_terminal);
        let engineering_role = matches!(actor.role, Role::Developer | Role::Tester);
        if moves_to_terminal && !engineering_role {
            return Decision::Deny(DenyReason::ReporterCannotSetTerminalStatus);
        }
        return Decision::Allow;
    }

    Decision::Deny(DenyReason::NotAssigneeOrReporter)
}
