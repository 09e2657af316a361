//! Input verification (§4.3): runs once, before any graph is built. Checks
//! that are inherently graph-shaped (cycles, precedence-vs-dates,
//! in-progress ancestor completeness) live in `taskloom_solver::graph`
//! instead, since they need edges resolved into a real DAG.
//!
//! Grounded in `backend_rewrite/verify.py::verify_inputs`, generalized to
//! the fuller invariant list `spec.md` §3 requires: assignee resolution
//! (already enforced at parse time by [`crate::tabular::parse_tasks`], but
//! re-checked here so a caller can run the verifier standalone against
//! tasks it didn't parse itself), non-negative estimates, and the
//! date/estimate window invariant.

use taskloom_core::{calendar, InputTask, Metadata, TaskloomError};

/// Re-checks assignee resolution, non-negative estimates, and date/estimate
/// window consistency for every task. Idempotent: running it twice against
/// tasks it has already accepted raises no new errors.
pub fn verify_inputs(tasks: &[InputTask], metadata: &Metadata) -> Result<(), TaskloomError> {
    for task in tasks {
        for assignee in &task.assignees {
            if !metadata.is_team(assignee) && !metadata.is_person(assignee) {
                return Err(TaskloomError::UnknownAssignee {
                    task: task.name.clone(),
                    assignee: assignee.clone(),
                });
            }
        }

        if let Some(estimate) = task.estimate {
            if estimate < 0 {
                return Err(TaskloomError::BadDates {
                    task: task.name.clone(),
                    reason: format!("estimate must be non-negative, got {estimate}"),
                });
            }
            if task.parallelizable && estimate < 2 {
                return Err(TaskloomError::BadDates {
                    task: task.name.clone(),
                    reason: "parallelizable task must have estimate >= 2".into(),
                });
            }
        }

        if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
            let estimate = task.estimate.unwrap_or(0);
            if estimate > 0 {
                if start >= end {
                    return Err(TaskloomError::BadDates {
                        task: task.name.clone(),
                        reason: format!("start_date {start} is not before end_date {end}"),
                    });
                }
                let span = calendar::busdays_between(start, end);
                if span + 1 < estimate {
                    return Err(TaskloomError::BadDates {
                        task: task.name.clone(),
                        reason: format!(
                            "estimate {estimate} does not fit the {span}-business-day window {start}..{end}"
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}
