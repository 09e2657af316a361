//! Merger and decorator (§4.7): folds solved subtask results from the
//! post-expansion graph `L` back onto the original (pre-expansion) graph
//! `G`, then computes critical-path membership, per-edge slack, per-person
//! utilization, and tasks-starting-soon notifications.
//!
//! Grounded in `backend_rewrite/graph.py`'s `merge_parallel`/`merge_specific`/
//! `merge_graphs` for the fold-back half, and
//! `backend_rewrite/graph_metrics.py`'s `compute_total_work_longest_path` and
//! the commented-out `enrich_graph` sketch for the decorate half. The
//! critical-path computation itself follows the teacher's own forward/
//! backward longest-path pass in `utf8proj-solver::cpm` (earliest/latest
//! finish, zero-slack membership) rather than a from-scratch algorithm.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use taskloom_core::{calendar, Decoration, Notification, Person, SOON_THRESHOLD};

use crate::graph::TaskGraph;

/// A solved task's projected fields, keyed by name in whatever namespace
/// the lower graph used (post-expansion). Collapsed in two passes (first
/// parallelizable chains, then specific siblings) to unwind expansion in
/// the reverse order it was applied.
#[derive(Debug, Clone)]
struct Resolved {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    assignees: Vec<Person>,
    estimate: i64,
    excluded: bool,
}

fn resolve_lower(lower: &TaskGraph) -> HashMap<String, Resolved> {
    lower
        .graph
        .node_indices()
        .map(|idx| {
            let t = &lower.graph[idx];
            (
                t.name.clone(),
                Resolved {
                    start_date: t.start_date,
                    end_date: t.end_date,
                    assignees: t.assignees.clone(),
                    estimate: t.scheduler_fields.estimate,
                    excluded: t.scheduler_fields.exclude,
                },
            )
        })
        .collect()
}

fn push_unique(dst: &mut Vec<Person>, src: &[Person]) {
    for p in src {
        if !dst.contains(p) {
            dst.push(p.clone());
        }
    }
}

/// Collapses each parallelizable chain `T -> T_chain_1 -> ... -> T_chain_{E-1}`
/// into a single entry keyed by `T`'s name: `estimate = 1 + |chain|`,
/// `end_date = max(chain end_dates)`, `assignees` the union of every link's
/// assignee (the effort was split across however many distinct people
/// picked up a unit).
fn collapse_parallelizable(
    resolved: &mut HashMap<String, Resolved>,
    parallelizable_map: &HashMap<String, Vec<String>>,
) {
    for (head_name, chain) in parallelizable_map {
        let Some(mut head) = resolved.get(head_name).cloned() else {
            continue;
        };
        for link_name in chain {
            if let Some(link) = resolved.get(link_name) {
                head.end_date = match (head.end_date, link.end_date) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (Some(a), None) => Some(a),
                    (None, b) => b,
                };
                push_unique(&mut head.assignees, &link.assignees);
                head.excluded = head.excluded && link.excluded;
            }
        }
        head.estimate = 1 + chain.len() as i64;
        resolved.insert(head_name.clone(), head);
        for link_name in chain {
            resolved.remove(link_name);
        }
    }
}

/// Collapses each specific-assignment sibling group back onto the base
/// task: `assignees` is extended with every sibling's (single) assignee,
/// `start_date`/`end_date` are left as the base's (the synchrony
/// constraint already forced them equal to every sibling's).
fn collapse_specific(
    resolved: &mut HashMap<String, Resolved>,
    specific_map: &HashMap<String, Vec<String>>,
) {
    for (base_name, siblings) in specific_map {
        let Some(mut base) = resolved.get(base_name).cloned() else {
            continue;
        };
        for sibling_name in siblings {
            if let Some(sibling) = resolved.get(sibling_name) {
                push_unique(&mut base.assignees, &sibling.assignees);
            }
        }
        resolved.insert(base_name.clone(), base);
        for sibling_name in siblings {
            resolved.remove(sibling_name);
        }
    }
}

/// Result of a full merge + decorate pass: the upper graph with its dates,
/// assignees, and (for parallelizable tasks) estimate rewritten in place,
/// the per-task critical-path flag, the makespan, and per-person
/// utilization percentages.
pub struct MergedSchedule {
    pub graph: TaskGraph,
    pub decorations: HashMap<String, Decoration>,
    pub makespan: i64,
    pub optimal: bool,
    pub utilization: BTreeMap<Person, f64>,
}

/// Runs the full §4.7 pass: merge subtask results onto `upper`, then
/// decorate it with critical-path/slack/utilization data and
/// tasks-starting-soon notifications (emitted against `today`, the
/// request's real anchor, not a rolled-back one).
#[tracing::instrument(skip_all)]
pub fn merge_and_decorate(
    mut upper: TaskGraph,
    lower: &TaskGraph,
    specific_map: &HashMap<String, Vec<String>>,
    parallelizable_map: &HashMap<String, Vec<String>>,
    today: NaiveDate,
    optimal: bool,
    notifications: &mut Vec<Notification>,
) -> MergedSchedule {
    let mut resolved = resolve_lower(lower);
    collapse_parallelizable(&mut resolved, parallelizable_map);
    collapse_specific(&mut resolved, specific_map);

    for idx in upper.graph.node_indices() {
        let name = upper.graph[idx].name.clone();
        let Some(r) = resolved.get(&name) else {
            continue;
        };
        let is_parallelizable = parallelizable_map.contains_key(&name);
        let task = &mut upper.graph[idx];
        if !r.excluded {
            task.start_date = r.start_date;
            task.end_date = r.end_date;
            task.assignees = r.assignees.clone();
        }
        if is_parallelizable {
            task.estimate = Some(r.estimate);
        }
    }

    let (decorations, makespan) = decorate(&mut upper);
    emit_starting_soon(&upper, today, notifications);
    let utilization = utilization(&upper, makespan);

    MergedSchedule {
        graph: upper,
        decorations,
        makespan,
        optimal,
        utilization,
    }
}

/// Forward/backward longest-path pass over `upper`'s merged estimates:
/// `forward[v]` is the longest chain of estimates strictly before `v`
/// starts; `backward[v]` is the longest chain strictly after `v` finishes.
/// `v` is critical when `forward[v] + estimate[v] + backward[v] ==
/// makespan`; an edge `(u, v)` is critical when both endpoints are and the
/// edge actually realizes that maximal chain (not just two independently
/// critical nodes that happen to be adjacent).
fn decorate(upper: &mut TaskGraph) -> (HashMap<String, Decoration>, i64) {
    let order = petgraph::algo::toposort(&upper.graph, None)
        .expect("graph has already passed acyclicity verification");

    let estimate = |idx: NodeIndex, g: &TaskGraph| g.graph[idx].estimate.unwrap_or(0);

    let mut forward: HashMap<NodeIndex, i64> = HashMap::new();
    for &idx in &order {
        let preds_max = upper
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|p| forward[&p] + estimate(p, upper))
            .max()
            .unwrap_or(0);
        forward.insert(idx, preds_max);
    }

    let makespan = order
        .iter()
        .map(|&idx| forward[&idx] + estimate(idx, upper))
        .max()
        .unwrap_or(0);

    let mut backward: HashMap<NodeIndex, i64> = HashMap::new();
    for &idx in order.iter().rev() {
        let succ_max = upper
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|s| backward[&s] + estimate(s, upper))
            .max()
            .unwrap_or(0);
        backward.insert(idx, succ_max);
    }

    let mut decorations = HashMap::new();
    for &idx in &order {
        let total = forward[&idx] + estimate(idx, upper) + backward[&idx];
        let critical = total == makespan;
        decorations.insert(upper.graph[idx].name.clone(), Decoration { critical });
    }

    for edge in upper.graph.edge_indices() {
        let (u, v) = upper.graph.edge_endpoints(edge).unwrap();
        let edge_critical = decorations[&upper.graph[u].name].critical
            && decorations[&upper.graph[v].name].critical
            && forward[&u] + estimate(u, upper) == forward[&v];
        let slack = match (upper.graph[u].end_date, upper.graph[v].start_date) {
            (Some(end), Some(start)) => calendar::busdays_between(end, start),
            _ => 0,
        };
        let edge_weight = &mut upper.graph[edge];
        edge_weight.critical = edge_critical;
        edge_weight.slack = slack;
    }

    (decorations, makespan)
}

/// Emits an INFO notification for every task whose merged `start_date` sits
/// within `SOON_THRESHOLD` business days of `today` (and has not already
/// started).
fn emit_starting_soon(upper: &TaskGraph, today: NaiveDate, notifications: &mut Vec<Notification>) {
    for idx in upper.graph.node_indices() {
        let task = &upper.graph[idx];
        let Some(start) = task.start_date else {
            continue;
        };
        let offset = calendar::busdays_between(today, start);
        if (0..=SOON_THRESHOLD).contains(&offset) {
            notifications.push(Notification::info(format!(
                "task {} starts in {offset} business day(s)",
                task.name
            )));
        }
    }
}

/// Per-person utilization: the share of the makespan each person spends on
/// assigned work, as a percentage. A task with multiple assignees (the
/// merged form of a specific-assignment or parallelizable task) contributes
/// its full estimate to every one of its assignees, matching how the
/// allocation cap constraint (§4.5) counts their time.
fn utilization(upper: &TaskGraph, makespan: i64) -> BTreeMap<Person, f64> {
    let mut days: BTreeMap<Person, i64> = BTreeMap::new();
    for idx in upper.graph.node_indices() {
        let task = &upper.graph[idx];
        let estimate = task.estimate.unwrap_or(0);
        for assignee in &task.assignees {
            *days.entry(assignee.clone()).or_insert(0) += estimate;
        }
    }
    days.into_iter()
        .map(|(person, allocated)| {
            let pct = if makespan > 0 {
                allocated as f64 / makespan as f64 * 100.0
            } else {
                0.0
            };
            (person, pct)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use taskloom_core::{InputTask, SchedulerFields, Status};

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

    fn dated(mut t: InputTask, start: NaiveDate, end: NaiveDate) -> InputTask {
        t.start_date = Some(start);
        t.end_date = Some(end);
        t
    }

    fn d(s: &str) -> NaiveDate {
        calendar::parse_date(s).unwrap()
    }

    #[test]
    fn chain_is_fully_critical_with_zero_slack() {
        let mut notes = Vec::new();
        let upper = build_graph(
            vec![
                dated(task("T1", 2, vec!["Alice"], vec!["T2"]), d("2026-07-27"), d("2026-07-29")),
                dated(task("T2", 3, vec!["Alice"], vec![]), d("2026-07-29"), d("2026-08-03")),
            ],
            &mut notes,
        );
        let merged = merge_and_decorate(
            upper,
            &build_graph(vec![], &mut notes),
            &HashMap::new(),
            &HashMap::new(),
            d("2026-07-27"),
            true,
            &mut notes,
        );
        assert!(merged.decorations["T1"].critical);
        assert!(merged.decorations["T2"].critical);
        assert_eq!(merged.makespan, 5);
        let edge = merged
            .graph
            .graph
            .edge_indices()
            .next()
            .map(|e| merged.graph.graph[e])
            .unwrap();
        assert!(edge.critical);
        assert_eq!(edge.slack, 0);
    }

    #[test]
    fn off_critical_sibling_is_not_flagged() {
        let mut notes = Vec::new();
        let upper = build_graph(
            vec![
                dated(task("Long", 4, vec!["Alice"], vec!["Join"]), d("2026-07-27"), d("2026-07-31")),
                dated(task("Short", 1, vec!["Bob"], vec!["Join"]), d("2026-07-27"), d("2026-07-28")),
                dated(task("Join", 1, vec!["Alice"], vec![]), d("2026-07-31"), d("2026-08-03")),
            ],
            &mut notes,
        );
        let merged = merge_and_decorate(
            upper,
            &build_graph(vec![], &mut notes),
            &HashMap::new(),
            &HashMap::new(),
            d("2026-07-27"),
            true,
            &mut notes,
        );
        assert!(merged.decorations["Long"].critical);
        assert!(!merged.decorations["Short"].critical);
        assert!(merged.decorations["Join"].critical);
    }

    #[test]
    fn parallelizable_merge_restores_estimate_and_unions_assignees() {
        let mut notes = Vec::new();
        let head = task("Big", 1, vec!["Lewis"], vec!["Big_chain_1"]);
        let upper_head = dated(head, d("2026-07-27"), d("2026-07-28"));
        let upper = build_graph(vec![upper_head], &mut notes);

        let mut lower_head = task("Big", 1, vec!["Lewis"], vec![]);
        lower_head.start_date = Some(d("2026-07-27"));
        lower_head.end_date = Some(d("2026-07-28"));
        lower_head.scheduler_fields.estimate = 1;
        let mut link1 = task("Big_chain_1", 1, vec!["John"], vec![]);
        link1.start_date = Some(d("2026-07-28"));
        link1.end_date = Some(d("2026-07-29"));
        link1.scheduler_fields.estimate = 1;
        let mut link2 = task("Big_chain_2", 1, vec!["Jack"], vec![]);
        link2.start_date = Some(d("2026-07-27"));
        link2.end_date = Some(d("2026-07-28"));
        link2.scheduler_fields.estimate = 1;
        let lower = build_graph(vec![lower_head, link1, link2], &mut notes);

        let mut parallelizable_map = HashMap::new();
        parallelizable_map.insert(
            "Big".to_string(),
            vec!["Big_chain_1".to_string(), "Big_chain_2".to_string()],
        );

        let merged = merge_and_decorate(
            upper,
            &lower,
            &HashMap::new(),
            &parallelizable_map,
            d("2026-07-27"),
            true,
            &mut notes,
        );

        let big = merged
            .graph
            .graph
            .node_indices()
            .map(|i| &merged.graph.graph[i])
            .find(|t| t.name == "Big")
            .unwrap();
        assert_eq!(big.estimate, Some(3));
        assert_eq!(big.end_date, Some(d("2026-07-29")));
        assert_eq!(big.assignees.len(), 3);
        assert!(big.assignees.contains(&"Lewis".to_string()));
        assert!(big.assignees.contains(&"John".to_string()));
        assert!(big.assignees.contains(&"Jack".to_string()));
    }

    #[test]
    fn utilization_counts_every_assignee_of_a_merged_task() {
        let mut notes = Vec::new();
        let upper = build_graph(
            vec![dated(
                task("T1", 4, vec!["Alice", "Bob"], vec![]),
                d("2026-07-27"),
                d("2026-07-31"),
            )],
            &mut notes,
        );
        let merged = merge_and_decorate(
            upper,
            &build_graph(vec![], &mut notes),
            &HashMap::new(),
            &HashMap::new(),
            d("2026-07-27"),
            true,
            &mut notes,
        );
        assert_eq!(merged.utilization["Alice"], 100.0);
        assert_eq!(merged.utilization["Bob"], 100.0);
    }

    #[test]
    fn starting_soon_notification_emitted_within_threshold() {
        let mut notes = Vec::new();
        let upper = build_graph(
            vec![dated(task("T1", 1, vec!["Alice"], vec![]), d("2026-07-28"), d("2026-07-29"))],
            &mut notes,
        );
        let mut local_notes = Vec::new();
        let _ = merge_and_decorate(
            upper,
            &build_graph(vec![], &mut notes),
            &HashMap::new(),
            &HashMap::new(),
            d("2026-07-27"),
            true,
            &mut local_notes,
        );
        assert!(local_notes
            .iter()
            .any(|n| n.message.contains("starts in 1 business day")));
    }
}
