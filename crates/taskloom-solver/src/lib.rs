//! Graph construction, expansion, CP scheduling, rollback search, and
//! merge/decoration for the `taskloom` scheduling pipeline (`spec.md`
//! §2 items 6-10): the hard part of the repo.
//!
//! [`schedule_project`] is the single entry point a caller (the CLI, or any
//! future outer surface) needs: it runs verify -> rollback(build -> verify
//! -> expand -> schedule) -> merge/decorate end to end.

pub mod cp;
pub mod expand;
pub mod graph;
pub mod merge;
pub mod persistence_sqlite;
pub mod rollback;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use taskloom_core::{Decoration, InputTask, Metadata, Notification, Person, TaskloomError};

/// A fully scheduled, merged, and decorated project: the pre-expansion
/// graph with every task's solved `start_date`/`end_date`/`assignees`
/// written in, plus the reporting data §4.7 computes from it.
pub struct ProjectSchedule {
    pub graph: graph::TaskGraph,
    pub decorations: std::collections::HashMap<String, Decoration>,
    pub makespan: i64,
    pub optimal: bool,
    pub rollback_offset: i64,
    pub utilization: BTreeMap<Person, f64>,
    pub notifications: Vec<Notification>,
}

/// Default solver wall-clock budget (§6), overridable via
/// `SOLVER_TIME_BUDGET_SECONDS`.
pub const DEFAULT_SOLVER_BUDGET_SECONDS: u64 = 10;

/// Reads `SOLVER_TIME_BUDGET_SECONDS` from the environment, falling back to
/// [`DEFAULT_SOLVER_BUDGET_SECONDS`] if unset or unparseable.
pub fn solver_budget_from_env() -> Duration {
    let secs = std::env::var("SOLVER_TIME_BUDGET_SECONDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SOLVER_BUDGET_SECONDS);
    Duration::from_secs(secs)
}

/// Runs the full pipeline of `spec.md` §2's control flow, starting from
/// already-parsed input: verify inputs, then roll back (build -> verify ->
/// expand -> schedule) against `today` until feasible, then merge + decorate
/// the result. `budget` bounds every individual solver invocation the
/// rollback driver makes.
#[tracing::instrument(skip_all, fields(tasks = tasks.len(), today = %today))]
pub fn schedule_project(
    tasks: Vec<InputTask>,
    metadata: &Metadata,
    today: NaiveDate,
    budget: Duration,
) -> Result<ProjectSchedule, TaskloomError> {
    taskloom_parser::verify_inputs(&tasks, metadata)?;

    let mut notifications = Vec::new();
    let result = rollback::roll_back(
        &tasks,
        metadata,
        today,
        budget,
        rollback::DEFAULT_STEP,
        rollback::DEFAULT_BOUND,
        &mut notifications,
    )?;

    let merged = merge::merge_and_decorate(
        result.upper,
        &result.lower,
        &result.specific_map,
        &result.parallelizable_map,
        today,
        result.optimal,
        &mut notifications,
    );

    Ok(ProjectSchedule {
        graph: merged.graph,
        decorations: merged.decorations,
        makespan: merged.makespan,
        optimal: merged.optimal,
        rollback_offset: result.offset,
        utilization: merged.utilization,
        notifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloom_core::{SchedulerFields, Status};

    fn task(name: &str, estimate: i64, assignees: Vec<&str>, next: Vec<&str>) -> InputTask {
        InputTask {
            name: name.to_string(),
            description: String::new(),
            specific_assignments: true,
            assignees: assignees.into_iter().map(String::from).collect(),
            next: next.into_iter().map(String::from).collect(),
            parallelizable: false,
            estimate: Some(estimate),
            start_date: None,
            end_date: None,
            status: Status::NotStarted,
            input_row_idx: 0,
            scheduler_fields: SchedulerFields::default(),
        }
    }

    #[test]
    fn end_to_end_single_person_three_tasks() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        let tasks = vec![
            task("T1", 3, vec!["Alice"], vec![]),
            task("T2", 2, vec!["Alice"], vec![]),
            task("T3", 4, vec!["Alice"], vec![]),
        ];
        let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let schedule =
            schedule_project(tasks, &metadata, today, Duration::from_secs(10)).unwrap();
        assert_eq!(schedule.rollback_offset, 0);
        assert_eq!(schedule.makespan, 9);
    }
}
