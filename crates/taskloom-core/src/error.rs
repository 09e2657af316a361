//! Fatal error taxonomy. Every variant fails the request; recoverable
//! issues (dangling edges, rollback distance) are [`Notification`]s instead.
//!
//! [`Notification`]: crate::notification::Notification

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskloomError {
    #[error("parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("allocation for {person} must be within [0, 1], got {fraction}")]
    BadAllocation { person: String, fraction: f64 },

    #[error("name collision: {name} is declared as both a team and a person")]
    NameCollision { name: String },

    #[error("task {task} mixes team and person assignees: {assignees:?}")]
    MixedAssignees { task: String, assignees: Vec<String> },

    #[error("task {task} names unknown assignee {assignee}")]
    UnknownAssignee { task: String, assignee: String },

    #[error("dependency cycle detected: {}", .edges.iter().map(|(u, v)| format!("{u} -> {v}")).collect::<Vec<_>>().join(", "))]
    CycleDetected { edges: Vec<(String, String)> },

    #[error("bad dates for task {task}: {reason}")]
    BadDates { task: String, reason: String },

    #[error("in-progress task {task} has incomplete ancestor chain: {}", .ancestors.join(" <- "))]
    InProgressWithIncompleteAncestor {
        task: String,
        ancestors: Vec<String>,
    },

    #[error("task {task} has no estimate and no date window to infer one")]
    MissingEstimate { task: String },

    #[error("task {task} depends on {depends_on}, which is already in the past")]
    DependsOnPast { task: String, depends_on: String },

    #[error("no feasible schedule found within rollback bound of {bound_days} business days")]
    ScheduleNotFound { bound_days: i64 },

    #[error("solver exceeded its time budget of {budget_seconds}s without a solution")]
    SolverTimeout { budget_seconds: u64 },
}
