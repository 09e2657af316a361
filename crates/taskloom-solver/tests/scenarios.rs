//! Multi-stage pipeline scenarios from `spec.md` §8: each one drives
//! `taskloom_solver::schedule_project` end to end (verify -> rollback ->
//! expand -> schedule -> merge/decorate) and checks the invariants the
//! spec calls out, rather than any particular CP tie-break.

use std::time::Duration;

use chrono::NaiveDate;
use taskloom_core::{InputTask, Metadata, SchedulerFields, Status, TaskloomError};
use taskloom_solver::schedule_project;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 27).unwrap()
}

fn budget() -> Duration {
    Duration::from_secs(10)
}

fn task(name: &str, estimate: i64, assignees: &[&str], next: &[&str]) -> InputTask {
    InputTask {
        name: name.to_string(),
        description: String::new(),
        specific_assignments: true,
        assignees: assignees.iter().map(|s| s.to_string()).collect(),
        next: next.iter().map(|s| s.to_string()).collect(),
        parallelizable: false,
        estimate: Some(estimate),
        start_date: None,
        end_date: None,
        status: Status::NotStarted,
        input_row_idx: 0,
        scheduler_fields: SchedulerFields::default(),
    }
}

fn pool_task(name: &str, estimate: i64, team: &str, next: &[&str]) -> InputTask {
    let mut t = task(name, estimate, &[team], next);
    t.specific_assignments = false;
    t
}

/// Scenario 1: single person, three independent tasks. Makespan is the
/// sum of estimates; no rollback needed.
#[test]
fn scenario_single_person_three_independent_tasks() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let tasks = vec![
        task("T1", 3, &["Alice"], &[]),
        task("T2", 2, &["Alice"], &[]),
        task("T3", 4, &["Alice"], &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 9);
    assert_eq!(schedule.rollback_offset, 0);
}

/// Scenario 2: two people, three independent tasks they can split, so the
/// makespan collapses to the length of the longest single task's chain
/// across the optimal split (5, not 9).
#[test]
fn scenario_two_people_parallelize_three_tasks() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    metadata.add_person("Bob");
    metadata.add_team("Both", vec!["Alice".into(), "Bob".into()]);
    let tasks = vec![
        pool_task("T1", 3, "Both", &[]),
        pool_task("T2", 2, "Both", &[]),
        pool_task("T3", 4, "Both", &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 5);
}

/// Scenario 3: a linear chain worked by a single person is just the sum of
/// its estimates, since precedence forces sequential execution regardless
/// of how many people are available.
#[test]
fn scenario_chain_single_person() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let tasks = vec![
        task("T1", 2, &["Alice"], &["T2"]),
        task("T2", 3, &["Alice"], &["T3"]),
        task("T3", 1, &["Alice"], &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 6);
}

/// Scenario 6: a cyclic input is rejected before any scheduling attempt.
#[test]
fn scenario_cyclic_input_is_rejected() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let tasks = vec![
        task("T1", 1, &["Alice"], &["T2"]),
        task("T2", 1, &["Alice"], &["T3"]),
        task("T3", 1, &["Alice"], &["T1"]),
    ];
    let err = schedule_project(tasks, &metadata, monday(), budget()).unwrap_err();
    assert!(matches!(err, TaskloomError::CycleDetected { .. }));
}

/// Scenario 7: a fixed assignment interleaved with pool work. Alice does
/// T1 then T3 sequentially (1 + 2 = 3 days) while Bob or Charlie handles
/// T2 (3 days) in parallel; makespan is the max of the two, 3.
#[test]
fn scenario_mixed_fixed_and_pool_assignments() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    metadata.add_team("BobOrCharlie", vec!["Bob".into(), "Charlie".into()]);
    metadata.add_team("JustAlice", vec!["Alice".into()]);
    let tasks = vec![
        task("T1", 1, &["Alice"], &[]),
        pool_task("T2", 3, "BobOrCharlie", &[]),
        pool_task("T3", 2, "JustAlice", &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 3);
}

/// A deadline the anchor cannot meet forces the rollback driver to step
/// `today` backward; once it rolls back far enough, the same project
/// becomes feasible and the merged schedule still honors every window.
#[test]
fn deadline_too_tight_at_today_triggers_rollback() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let mut t1 = task("T1", 2, &["Alice"], &["T2"]);
    // A 2-business-day task with only a 1-business-day window from `today`
    // cannot be scheduled without rolling `today` back.
    t1.end_date = Some(taskloom_core::calendar::busdays_offset(monday(), 1));
    let t2 = task("T2", 1, &["Alice"], &[]);
    let tasks = vec![t1, t2];

    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert!(schedule.rollback_offset > 0);

    for idx in schedule.graph.graph.node_indices() {
        let t = &schedule.graph.graph[idx];
        if let (Some(start), Some(end)) = (t.start_date, t.end_date) {
            assert!(start <= end);
        }
    }
}

/// Scenario 4 (§8, exact values): T1=2 -> T2=3 -> T3=1, single person
/// Alice, T2's `latest_end` pinned to 2 business days from `today`. The
/// chain alone needs 5 business days to reach T2, so the deadline is
/// infeasible at `today` and rollback must walk back exactly 5 business
/// days before it can be met; the merged schedule keeps the same 6-day
/// makespan the unconstrained chain has in scenario 3.
#[test]
fn scenario_4_deadline_forcing_rollback_exact_spec_values() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let t1 = task("T1", 2, &["Alice"], &["T2"]);
    let mut t2 = task("T2", 3, &["Alice"], &["T3"]);
    t2.end_date = Some(taskloom_core::calendar::busdays_offset(monday(), 2));
    let t3 = task("T3", 1, &["Alice"], &[]);
    let tasks = vec![t1, t2, t3];

    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.rollback_offset, 5);
    assert_eq!(schedule.makespan, 6);
}

/// Scenario 5 (§8, exact values), parallelizable half: BigTask (~7) run
/// alongside the chain TaskA=3 -> TaskB=1 -> TaskC=4 -> Done=0, with
/// {Lewis, John, Jack} all eligible for every pool task. Splitting BigTask
/// into unit segments lets the crew work both the chain and BigTask's
/// pieces at once, so the makespan is bounded by the longer side (8),
/// not their sum.
#[test]
fn scenario_5_parallelizable_big_task_exact_spec_values() {
    let mut metadata = Metadata::new();
    metadata.add_person("Lewis");
    metadata.add_person("John");
    metadata.add_person("Jack");
    metadata.add_team("Crew", vec!["Lewis".into(), "John".into(), "Jack".into()]);

    let mut big = pool_task("BigTask", 7, "Crew", &[]);
    big.parallelizable = true;

    let tasks = vec![
        big,
        pool_task("TaskA", 3, "Crew", &["TaskB"]),
        pool_task("TaskB", 1, "Crew", &["TaskC"]),
        pool_task("TaskC", 4, "Crew", &["Done"]),
        pool_task("Done", 0, "Crew", &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 8);
}

/// Scenario 5 (§8, exact values), non-parallelizable half: the same
/// BigTask/chain shape, but BigTask stays a monolithic 7-day block. With
/// no split to interleave, the makespan grows to 11.
#[test]
fn scenario_5_without_parallelizable_exact_spec_values() {
    let mut metadata = Metadata::new();
    metadata.add_person("Lewis");
    metadata.add_person("John");
    metadata.add_person("Jack");
    metadata.add_team("Crew", vec!["Lewis".into(), "John".into(), "Jack".into()]);

    let big = pool_task("BigTask", 7, "Crew", &[]);

    let tasks = vec![
        big,
        pool_task("TaskA", 3, "Crew", &["TaskB"]),
        pool_task("TaskB", 1, "Crew", &["TaskC"]),
        pool_task("TaskC", 4, "Crew", &["Done"]),
        pool_task("Done", 0, "Crew", &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    assert_eq!(schedule.makespan, 11);
}

/// If scheduling is feasible against `today`, it stays feasible against an
/// earlier anchor: rolling `today` back only relaxes every task's window,
/// it never tightens one (§8 "Rollback monotonicity").
#[test]
fn rollback_monotonicity_earlier_anchor_stays_feasible() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    let tasks = vec![task("T1", 3, &["Alice"], &[])];
    let earlier = taskloom_core::calendar::busdays_offset(monday(), -10);
    let schedule = schedule_project(tasks, &metadata, earlier, budget()).unwrap();
    assert_eq!(schedule.rollback_offset, 0);
    assert_eq!(schedule.makespan, 3);
}

/// A parallelizable task's own duration is unaffected by the split (each
/// unit is still precedence-linked to the next), but splitting it frees
/// the other assignees to do unrelated work in parallel rather than
/// waiting on one person to finish a monolithic task — makespan is bounded
/// by the longer of the two independent chains, not their sum.
#[test]
fn parallelizable_task_runs_alongside_an_unrelated_chain() {
    let mut metadata = Metadata::new();
    metadata.add_person("Lewis");
    metadata.add_person("John");
    metadata.add_person("Jack");
    metadata.add_team("Crew", vec!["Lewis".into(), "John".into(), "Jack".into()]);

    let mut big = pool_task("Big", 4, "Crew", &[]);
    big.parallelizable = true;

    let tasks = vec![
        big,
        pool_task("TaskA", 2, "Crew", &["TaskB"]),
        pool_task("TaskB", 1, "Crew", &["TaskC"]),
        pool_task("TaskC", 1, "Crew", &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();
    // The chain TaskA -> TaskB -> TaskC takes at least 4 business days by
    // precedence alone; Big also takes 4 (a 4-unit chain is still
    // sequential). Three people are enough to run both chains at once.
    assert_eq!(schedule.makespan, 4);
}

/// Precedence, window, and duration invariants (§8) hold across a graph
/// with both a fixed assignment and a deadline.
#[test]
fn invariants_hold_across_a_richer_graph() {
    let mut metadata = Metadata::new();
    metadata.add_person("Alice");
    metadata.add_person("Bob");
    metadata.add_team("Both", vec!["Alice".into(), "Bob".into()]);

    let tasks = vec![
        task("T1", 2, &["Alice"], &["T2"]),
        pool_task("T2", 3, "Both", &["T3"]),
        task("T3", 1, &["Bob"], &[]),
    ];
    let schedule = schedule_project(tasks, &metadata, monday(), budget()).unwrap();

    let by_name: std::collections::HashMap<_, _> = schedule
        .graph
        .graph
        .node_indices()
        .map(|idx| (schedule.graph.graph[idx].name.clone(), idx))
        .collect();

    for edge in schedule.graph.graph.edge_indices() {
        let (u, v) = schedule.graph.graph.edge_endpoints(edge).unwrap();
        let (u_task, v_task) = (&schedule.graph.graph[u], &schedule.graph.graph[v]);
        assert!(u_task.end_date.unwrap() <= v_task.start_date.unwrap());
    }

    for name in ["T1", "T2", "T3"] {
        let idx = by_name[name];
        let t = &schedule.graph.graph[idx];
        let estimate = t.estimate.unwrap();
        let span = taskloom_core::calendar::busdays_between(
            t.start_date.unwrap(),
            t.end_date.unwrap(),
        );
        assert_eq!(span, estimate);
    }
}
