//! The CP scheduler (§4.5): densification of a post-expansion graph into a
//! `pumpkin_solver` model via [`model::Model`], then read-back into
//! `SchedulerAssignment`s. Grounded line-for-line in
//! `backend_rewrite/scheduler.py`'s `schedule()` and `find_solution()`.

pub mod model;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use taskloom_core::{calendar, InputTask, Metadata, SchedulerAssignment, TaskloomError};

use crate::graph::TaskGraph;
use model::{BoolVar, Interval, Model, Outcome};

/// Outcome of one scheduling attempt, distinguishing a found schedule from
/// the two ways the rollback driver treats as "try an earlier anchor".
pub enum ScheduleOutcome {
    Solved {
        assignments: HashMap<NodeIndex, SchedulerAssignment>,
        optimal: bool,
    },
    Infeasible,
    Timeout,
}

/// `estimate` if present, else inferred from the date window (business-day
/// span). Only absent when a task lacks both, which is `MissingEstimate`.
fn resolve_raw_estimate(task: &InputTask) -> Result<i64, TaskloomError> {
    if let Some(e) = task.estimate {
        return Ok(e);
    }
    match (task.start_date, task.end_date) {
        (Some(s), Some(e)) => Ok(calendar::busdays_between(s, e).max(0)),
        _ => Err(TaskloomError::MissingEstimate {
            task: task.name.clone(),
        }),
    }
}

/// Mirrors `scheduler.py::get_assignees`: an empty assignee list pools every
/// known person; a specific-assignment list is a fixed dense-id list; a
/// team list expands to the union of team members' dense ids.
fn dense_pool(
    task: &InputTask,
    metadata: &Metadata,
    person_ids: &HashMap<String, usize>,
) -> (Vec<usize>, Vec<usize>) {
    if task.assignees.is_empty() {
        return (vec![], person_ids.values().copied().collect());
    }
    if task.specific_assignments {
        let fixed = task
            .assignees
            .iter()
            .filter_map(|p| person_ids.get(p).copied())
            .collect();
        return (fixed, vec![]);
    }
    let mut pool = BTreeSet::new();
    for team_name in &task.assignees {
        for member in metadata.resolve_pool(team_name) {
            if let Some(&pid) = person_ids.get(&member) {
                pool.insert(pid);
            }
        }
    }
    (vec![], pool.into_iter().collect())
}

/// Builds and solves the CP model for one scheduling attempt. `anchor` is
/// this attempt's "today": all `earliest_start`/`latest_end` offsets are
/// relative to it. On `Solved`, `graph`'s `scheduler_fields`, `start_date`,
/// `end_date`, and `assignees` are mutated in place for non-excluded tasks;
/// excluded tasks (already in the past) are left untouched.
#[tracing::instrument(skip_all, fields(anchor = %anchor))]
pub fn schedule(
    graph: &mut TaskGraph,
    metadata: &Metadata,
    specific_map: &HashMap<String, Vec<String>>,
    anchor: NaiveDate,
    budget: Duration,
) -> Result<ScheduleOutcome, TaskloomError> {
    let person_ids: HashMap<String, usize> = metadata
        .people_allocations
        .keys()
        .enumerate()
        .map(|(i, p)| (p.clone(), i))
        .collect();
    let mut id_to_person: Vec<String> = vec![String::new(); person_ids.len()];
    for (name, &id) in &person_ids {
        id_to_person[id] = name.clone();
    }

    let node_order: Vec<NodeIndex> = graph.graph.node_indices().collect();

    let raw_estimates: HashMap<NodeIndex, i64> = node_order
        .iter()
        .map(|&idx| resolve_raw_estimate(&graph.graph[idx]).map(|e| (idx, e)))
        .collect::<Result<_, _>>()?;
    let horizon: i64 = raw_estimates.values().sum::<i64>().max(1);

    // Densification: dense id, eligible/fixed pool, window, exclude, and
    // the in-progress-adjusted estimate, per §4.5.
    for (pos, &idx) in node_order.iter().enumerate() {
        let raw_estimate = raw_estimates[&idx];
        let (fixed, eligible, exclude, earliest_start, latest_end, effective_estimate) = {
            let task = &graph.graph[idx];
            let exclude = task.end_date.is_some_and(|e| anchor > e);
            let elapsed = match task.start_date {
                Some(s) if anchor >= s => calendar::busdays_between(s, anchor).max(0),
                _ => 0,
            };
            let effective_estimate = (raw_estimate - elapsed).max(0);
            let earliest_start = task
                .start_date
                .map(|s| calendar::busdays_between(anchor, s))
                .unwrap_or(0);
            let latest_end = task
                .end_date
                .map(|e| calendar::busdays_between(anchor, e))
                .unwrap_or(horizon);
            let (fixed, eligible) = dense_pool(task, metadata, &person_ids);
            (fixed, eligible, exclude, earliest_start, latest_end, effective_estimate)
        };

        let fields = &mut graph.graph[idx].scheduler_fields;
        fields.id = Some(pos);
        fields.eligible_assignees = eligible;
        fields.assignees = fixed;
        fields.earliest_start = earliest_start;
        fields.latest_end = latest_end;
        fields.estimate = effective_estimate;
        fields.exclude = exclude;
    }

    // Constraint 3 (partial): a non-excluded task cannot depend on an
    // excluded one (excluded means "already done in the past").
    for edge in graph.graph.edge_indices() {
        let (u, v) = graph.graph.edge_endpoints(edge).unwrap();
        if graph.graph[u].scheduler_fields.exclude && !graph.graph[v].scheduler_fields.exclude {
            return Err(TaskloomError::DependsOnPast {
                task: graph.graph[v].name.clone(),
                depends_on: graph.graph[u].name.clone(),
            });
        }
    }

    let active: Vec<NodeIndex> = node_order
        .iter()
        .copied()
        .filter(|&idx| !graph.graph[idx].scheduler_fields.exclude)
        .collect();

    let big_m = horizon + id_to_person.len() as i64 + 1;
    let mut model = Model::new(big_m);

    let mut starts = HashMap::new();
    let mut ends = HashMap::new();
    // Only created for each task's eligible/fixed pool, not every person:
    // unlike the Python original's full task x person cross-product guarded
    // by a restricted-domain `person_assignments` variable, `pumpkin_solver`
    // only proves out contiguous integer domains, so the pool restriction is
    // expressed by which literals exist at all rather than by a variable's
    // domain (see cp::model's module doc).
    let mut is_assigned: HashMap<(NodeIndex, usize), BoolVar> = HashMap::new();

    for &idx in &active {
        let fields = graph.graph[idx].scheduler_fields.clone();
        let start = model.new_int(fields.earliest_start.max(0), horizon);
        let end = model.new_int(0, fields.latest_end.max(0));
        let _ = model.new_interval(start, end, fields.estimate);
        starts.insert(idx, start);
        ends.insert(idx, end);

        let pool: Vec<usize> = if !fields.assignees.is_empty() {
            fields.assignees.clone()
        } else {
            fields.eligible_assignees.clone()
        };
        let lits: Vec<BoolVar> = pool
            .iter()
            .map(|&pid| {
                let lit = model.new_bool();
                is_assigned.insert((idx, pid), lit);
                lit
            })
            .collect();
        if !lits.is_empty() {
            model.exactly_one(&lits);
        }
    }

    // Specific-sibling synchrony (constraint 4).
    for (base_name, siblings) in specific_map {
        let Some(base_idx) = graph.node(base_name) else {
            continue;
        };
        if graph.graph[base_idx].scheduler_fields.exclude {
            continue;
        }
        for sibling_name in siblings {
            let Some(sib_idx) = graph.node(sibling_name) else {
                continue;
            };
            if graph.graph[sib_idx].scheduler_fields.exclude {
                continue;
            }
            model.eq(starts[&base_idx], starts[&sib_idx]);
            model.eq(ends[&base_idx], ends[&sib_idx]);
        }
    }

    // Precedence (constraint 3, remainder).
    for edge in graph.graph.edge_indices() {
        let (u, v) = graph.graph.edge_endpoints(edge).unwrap();
        if graph.graph[u].scheduler_fields.exclude || graph.graph[v].scheduler_fields.exclude {
            continue;
        }
        model.ge_offset(starts[&v], ends[&u], 0);
    }

    let makespan = model.new_int(0, horizon);
    for &idx in &active {
        model.ge_offset(makespan, ends[&idx], 0);
    }

    // Resource exclusivity (constraint 5) and allocation cap (constraint 6).
    for (person, &pid) in &person_ids {
        let entries: Vec<(Interval, BoolVar)> = active
            .iter()
            .filter_map(|&idx| {
                is_assigned.get(&(idx, pid)).map(|&lit| {
                    (
                        Interval {
                            start: starts[&idx],
                            end: ends[&idx],
                        },
                        lit,
                    )
                })
            })
            .collect();
        if entries.len() > 1 {
            model.no_overlap(&entries);
        }

        let allocation = metadata.allocation_of(person);
        if allocation < 1.0 {
            let mut terms: Vec<(model::IntVar, i64)> = active
                .iter()
                .filter_map(|&idx| {
                    is_assigned
                        .get(&(idx, pid))
                        .map(|&lit| (lit, 100 * graph.graph[idx].scheduler_fields.estimate))
                })
                .collect();
            if !terms.is_empty() {
                let cap = (allocation * 100.0).floor() as i64;
                terms.push((makespan, -cap));
                model.linear_le(&terms, 0);
            }
        }
    }

    let (solution, optimal) = match model.minimize(makespan, budget) {
        Outcome::Optimal(s) => (s, true),
        Outcome::Feasible(s) => (s, false),
        Outcome::Infeasible => return Ok(ScheduleOutcome::Infeasible),
        Outcome::Timeout => return Ok(ScheduleOutcome::Timeout),
    };

    let mut assignments = HashMap::new();
    for &idx in &active {
        let start = solution.value(starts[&idx]);
        let end = solution.value(ends[&idx]);
        let pool: Vec<usize> = {
            let fields = &graph.graph[idx].scheduler_fields;
            if !fields.assignees.is_empty() {
                fields.assignees.clone()
            } else {
                fields.eligible_assignees.clone()
            }
        };
        let assignee_id = pool
            .iter()
            .copied()
            .find(|&pid| {
                is_assigned
                    .get(&(idx, pid))
                    .is_some_and(|&lit| solution.value(lit) == 1)
            })
            .or_else(|| pool.first().copied())
            .unwrap_or(0);
        let assignee = id_to_person.get(assignee_id).cloned().unwrap_or_default();

        let id = graph.graph[idx].scheduler_fields.id.unwrap_or(0);
        let task = &mut graph.graph[idx];
        let new_start = calendar::busdays_offset(anchor, start);
        let new_end = calendar::busdays_offset(anchor, end);
        task.start_date = Some(new_start);
        task.end_date = Some(new_end);
        task.assignees = vec![assignee.clone()];

        assignments.insert(
            idx,
            SchedulerAssignment {
                id,
                start_date: new_start,
                end_date: new_end,
                assignee,
            },
        );
    }

    Ok(ScheduleOutcome::Solved {
        assignments,
        optimal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
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

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 27).unwrap() // Monday
    }

    #[test]
    fn single_person_three_tasks_minimizes_makespan_to_sum() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        let mut notes = Vec::new();
        let mut tg = build_graph(
            vec![
                task("T1", 3, vec!["Alice"], vec![]),
                task("T2", 2, vec!["Alice"], vec![]),
                task("T3", 4, vec!["Alice"], vec![]),
            ],
            &mut notes,
        );
        let outcome = schedule(
            &mut tg,
            &metadata,
            &HashMap::new(),
            anchor(),
            Duration::from_secs(10),
        )
        .unwrap();
        match outcome {
            ScheduleOutcome::Solved { assignments, .. } => {
                let makespan = assignments.values().map(|a| a.end_date).max().unwrap();
                let expected = calendar::busdays_offset(anchor(), 9);
                assert_eq!(makespan, expected);
            }
            _ => panic!("expected a feasible schedule"),
        }
    }

    #[test]
    fn two_people_parallelize_three_tasks_to_five() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        metadata.add_person("Bob");
        let mut notes = Vec::new();
        let mut tg = build_graph(
            vec![
                task("T1", 3, vec!["Alice", "Bob"], vec![]),
                task("T2", 2, vec!["Alice", "Bob"], vec![]),
                task("T3", 4, vec!["Alice", "Bob"], vec![]),
            ],
            &mut notes,
        );
        // Both people are eligible for every task (pool, not fixed):
        // simulate the post-%TEAM pool form used by the real pipeline.
        for node in tg.graph.node_indices() {
            tg.graph[node].specific_assignments = false;
        }
        let outcome = schedule(
            &mut tg,
            &metadata,
            &HashMap::new(),
            anchor(),
            Duration::from_secs(10),
        )
        .unwrap();
        match outcome {
            ScheduleOutcome::Solved { assignments, .. } => {
                let makespan = assignments.values().map(|a| a.end_date).max().unwrap();
                let expected = calendar::busdays_offset(anchor(), 5);
                assert_eq!(makespan, expected);
            }
            _ => panic!("expected a feasible schedule"),
        }
    }

    #[test]
    fn chain_respects_precedence() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        let mut notes = Vec::new();
        let mut tg = build_graph(
            vec![
                task("T1", 2, vec!["Alice"], vec!["T2"]),
                task("T2", 3, vec!["Alice"], vec!["T3"]),
                task("T3", 1, vec!["Alice"], vec![]),
            ],
            &mut notes,
        );
        let outcome = schedule(
            &mut tg,
            &metadata,
            &HashMap::new(),
            anchor(),
            Duration::from_secs(10),
        )
        .unwrap();
        match outcome {
            ScheduleOutcome::Solved { assignments, .. } => {
                let makespan = assignments.values().map(|a| a.end_date).max().unwrap();
                let expected = calendar::busdays_offset(anchor(), 6);
                assert_eq!(makespan, expected);
            }
            _ => panic!("expected a feasible schedule"),
        }
    }

    #[test]
    fn missing_estimate_without_dates_is_rejected() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        let mut notes = Vec::new();
        let mut t = task("T1", 0, vec!["Alice"], vec![]);
        t.estimate = None;
        let mut tg = build_graph(vec![t], &mut notes);
        let err = schedule(
            &mut tg,
            &metadata,
            &HashMap::new(),
            anchor(),
            Duration::from_secs(10),
        )
        .unwrap_err();
        assert!(matches!(err, TaskloomError::MissingEstimate { .. }));
    }

    #[test]
    fn excluded_task_cannot_be_depended_on() {
        let mut metadata = Metadata::new();
        metadata.add_person("Alice");
        let mut notes = Vec::new();
        let mut past = task("Past", 1, vec!["Alice"], vec!["Future"]);
        past.end_date = Some(anchor() - chrono::Duration::days(10));
        let future = task("Future", 1, vec!["Alice"], vec![]);
        let mut tg = build_graph(vec![past, future], &mut notes);
        let err = schedule(
            &mut tg,
            &metadata,
            &HashMap::new(),
            anchor(),
            Duration::from_secs(10),
        )
        .unwrap_err();
        assert!(matches!(err, TaskloomError::DependsOnPast { .. }));
    }
}
