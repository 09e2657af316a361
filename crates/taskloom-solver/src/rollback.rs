//! Rollback driver (§4.6): retries the full build→verify→expand→schedule
//! pipeline against a "today" anchor stepped backward in fixed business-day
//! increments, since users often submit plans whose `start_date`s have
//! already slipped. Not present as a standalone function in
//! `original_source` (the Python rewrite's tests reference it but the
//! implementation was not retrieved); implemented here as the explicit
//! iterative loop the redesign notes call for, not recursion.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use taskloom_core::{calendar, InputTask, Metadata, Notification, TaskloomError};

use crate::cp::{self, ScheduleOutcome};
use crate::expand;
use crate::graph::{self, TaskGraph};

/// Default retry step, in business days (§4.6).
pub const DEFAULT_STEP: i64 = 5;
/// Default retry bound, in business days (§4.6).
pub const DEFAULT_BOUND: i64 = 80;

/// A feasible attempt's result: the pre-expansion graph (what the merger
/// projects results onto), the post-expansion graph and its specific-sibling
/// and parallelizable-chain maps (what the scheduler actually solved and
/// what the merger collapses back), the anchor used, and how many business
/// days it was rolled back from `today`.
pub struct RollbackResult {
    pub upper: TaskGraph,
    pub lower: TaskGraph,
    pub specific_map: HashMap<String, Vec<String>>,
    pub parallelizable_map: HashMap<String, Vec<String>>,
    pub anchor: NaiveDate,
    pub offset: i64,
    pub optimal: bool,
}

/// Runs the retry loop of §4.6's pseudocode: for `offset` in
/// `0, step, 2*step, ..., bound`, rebuild, verify, expand, and schedule
/// against `anchor = today - offset` business days. Returns the first
/// feasible attempt, or `ScheduleNotFound` once `bound` is exhausted.
#[tracing::instrument(skip_all, fields(today = %today))]
pub fn roll_back(
    tasks: &[InputTask],
    metadata: &Metadata,
    today: NaiveDate,
    budget: Duration,
    step: i64,
    bound: i64,
    notifications: &mut Vec<Notification>,
) -> Result<RollbackResult, TaskloomError> {
    let mut offset = 0;
    loop {
        let anchor = calendar::busdays_offset(today, -offset);
        let attempt_tasks: Vec<InputTask> = tasks.to_vec();

        let mut upper = graph::build_graph(attempt_tasks, notifications);
        graph::verify_graph(&upper)?;

        let upper_tasks: Vec<InputTask> = upper
            .graph
            .node_indices()
            .map(|idx| upper.graph[idx].clone())
            .collect();
        let (specific_expanded, specific_map) = expand::expand_specific(upper_tasks);
        let (lower_tasks, parallelizable_map) = expand::expand_parallelizable(specific_expanded);

        let mut lower = graph::build_graph(lower_tasks, notifications);
        graph::verify_graph(&lower)?;

        match cp::schedule(&mut lower, metadata, &specific_map, anchor, budget)? {
            ScheduleOutcome::Solved { optimal, .. } => {
                if offset > 0 {
                    notifications.push(Notification::warn(format!(
                        "schedule found only after rolling back {offset} business days"
                    )));
                }
                return Ok(RollbackResult {
                    upper,
                    lower,
                    specific_map,
                    parallelizable_map,
                    anchor,
                    offset,
                    optimal,
                });
            }
            ScheduleOutcome::Infeasible | ScheduleOutcome::Timeout => {
                if offset >= bound {
                    notifications.push(Notification::warn(format!(
                        "no schedule found within {bound} business days of rollback"
                    )));
                    // `TaskloomError` lives in taskloom-core, which cannot
                    // depend on this crate's `TaskGraph`, so the un-scheduled
                    // upper graph isn't carried on the error; a caller that
                    // still wants to render the raw structure can rebuild it
                    // from the same `tasks` slice (`build_graph` is pure).
                    return Err(TaskloomError::ScheduleNotFound { bound_days: bound });
                }
                offset += step;
            }
        }
    }
}
