//! Domain model: people, teams, tasks, and the per-request metadata that
//! binds them together.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A person's identity is their name; case-sensitive, unique across the
/// combined person/team namespace.
pub type Person = String;

/// A named, ordered group of people. Teams and people share one namespace:
/// a name is either a team or a person, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub members: Vec<Person>,
}

/// Process-wide, per-request roster: team membership and fractional
/// availability. `add_team` seeds members at default allocation 1.0;
/// a later `add_allocation` overrides it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub teams: BTreeMap<String, Team>,
    pub people_allocations: BTreeMap<Person, f64>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `person` at full allocation if they are not already known.
    /// Matches `Metadata.add_person` in the source: never clobbers an
    /// existing allocation.
    pub fn add_person(&mut self, person: &str) {
        self.people_allocations
            .entry(person.to_string())
            .or_insert(1.0);
    }

    /// Sets (or overrides) a person's allocation fraction, registering them
    /// first if unknown.
    pub fn add_allocation(&mut self, person: &str, fraction: f64) {
        self.add_person(person);
        self.people_allocations.insert(person.to_string(), fraction);
    }

    /// Registers a team and adds each member at default allocation.
    pub fn add_team(&mut self, name: &str, members: Vec<Person>) {
        for member in &members {
            self.add_person(member);
        }
        self.teams.insert(
            name.to_string(),
            Team {
                name: name.to_string(),
                members,
            },
        );
    }

    /// True if `name` is a known team.
    pub fn is_team(&self, name: &str) -> bool {
        self.teams.contains_key(name)
    }

    /// True if `name` is a known person (either via `%ALLOCATION` or as a
    /// team member).
    pub fn is_person(&self, name: &str) -> bool {
        self.people_allocations.contains_key(name)
    }

    /// Every person reachable from an assignee name: the team's members if
    /// `name` is a team, otherwise the singleton `[name]`.
    pub fn resolve_pool(&self, name: &str) -> Vec<Person> {
        match self.teams.get(name) {
            Some(team) => team.members.clone(),
            None => vec![name.to_string()],
        }
    }

    pub fn allocation_of(&self, person: &str) -> f64 {
        self.people_allocations.get(person).copied().unwrap_or(1.0)
    }
}

/// Task lifecycle status, normalized at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    InProgress,
    Blocked,
    Milestone,
    Completed,
}

impl Status {
    /// Maps free-text status cells (including synonyms) to a canonical
    /// `Status`. Unrecognized non-empty text is passed through as
    /// `NotStarted` by the caller's validation layer, not here.
    pub fn parse(raw: &str) -> Option<Status> {
        let normalized = raw.trim().to_lowercase();
        Some(match normalized.as_str() {
            "" => Status::NotStarted,
            "not started" | "notstarted" => Status::NotStarted,
            "in progress" | "inprogress" | "in review" | "investigating" | "on hold"
            | "onhold" | "waiting" | "paused" => Status::InProgress,
            "blocked" => Status::Blocked,
            "milestone" => Status::Milestone,
            "completed" | "complete" | "done" => Status::Completed,
            _ => return None,
        })
    }

    /// Stable integer ordinal used by the persistence schema
    /// (`tasks.status_ordinal`).
    pub fn ordinal(self) -> i32 {
        match self {
            Status::NotStarted => 0,
            Status::InProgress => 1,
            Status::Blocked => 2,
            Status::Milestone => 3,
            Status::Completed => 4,
        }
    }

    /// A completed ancestor is acceptable preceding an in-progress task; so
    /// is a milestone (it is instantaneous and carries no open work).
    pub fn satisfies_in_progress_ancestor(self) -> bool {
        matches!(self, Status::Completed | Status::Milestone)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::NotStarted => "NotStarted",
            Status::InProgress => "InProgress",
            Status::Blocked => "Blocked",
            Status::Milestone => "Milestone",
            Status::Completed => "Completed",
        };
        write!(f, "{s}")
    }
}

/// Fields the scheduler derives and mutates per task during one attempt.
/// Absent on a freshly parsed `InputTask`; populated by the graph builder
/// just before scheduling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerFields {
    /// Dense id assigned by the graph builder.
    pub id: Option<usize>,
    /// Dense person-ids this task may be assigned to (the pool).
    pub eligible_assignees: Vec<usize>,
    /// Dense person-ids fixed for this task (specific assignments).
    pub assignees: Vec<usize>,
    pub earliest_start: i64,
    pub latest_end: i64,
    /// Estimate after in-progress adjustment; may differ from
    /// `InputTask.estimate`.
    pub estimate: i64,
    pub exclude: bool,
}

/// A single task as produced by the parser and carried through the
/// pipeline. `scheduler_fields` is derived, not part of user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTask {
    pub name: String,
    pub description: String,
    pub specific_assignments: bool,
    pub assignees: Vec<String>,
    pub next: Vec<String>,
    pub parallelizable: bool,
    pub estimate: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Status,
    pub input_row_idx: usize,
    #[serde(default)]
    pub scheduler_fields: SchedulerFields,
}

impl InputTask {
    /// A task with `estimate == Some(0)` is a milestone event.
    pub fn is_milestone(&self) -> bool {
        self.estimate == Some(0)
    }
}

/// Edge annotation in the task graph. `weight` is the ancestor's estimate
/// (for longest-path computation); `slack`/`critical` are filled during
/// decoration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Edge {
    pub weight: i64,
    pub slack: i64,
    pub critical: bool,
}

/// A solved (start, end, assignee) triple emitted by the scheduler for one
/// task, keyed by the task's dense id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerAssignment {
    pub id: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assignee: Person,
}

/// Per-task decoration computed by the merger: critical-path membership.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Decoration {
    pub critical: bool,
}

/// Tasks-starting-soon threshold: a task whose start is within this many
/// business days of the anchor earns a notification.
pub const SOON_THRESHOLD: i64 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_team_then_allocation_override() {
        let mut m = Metadata::new();
        m.add_team("core", vec!["Alice".into(), "Bob".into()]);
        assert_eq!(m.allocation_of("Alice"), 1.0);
        m.add_allocation("Alice", 0.5);
        assert_eq!(m.allocation_of("Alice"), 0.5);
    }

    #[test]
    fn add_allocation_registers_floating_person() {
        let mut m = Metadata::new();
        m.add_allocation("Dee", 0.75);
        assert!(m.is_person("Dee"));
        assert!(!m.is_team("Dee"));
        assert_eq!(m.allocation_of("Dee"), 0.75);
    }

    #[test]
    fn resolve_pool_expands_team() {
        let mut m = Metadata::new();
        m.add_team("core", vec!["Alice".into(), "Bob".into()]);
        assert_eq!(m.resolve_pool("core"), vec!["Alice", "Bob"]);
        assert_eq!(m.resolve_pool("Alice"), vec!["Alice"]);
    }

    #[test]
    fn status_synonyms_normalize() {
        assert_eq!(Status::parse("in review"), Some(Status::InProgress));
        assert_eq!(Status::parse("On Hold"), Some(Status::InProgress));
        assert_eq!(Status::parse(""), Some(Status::NotStarted));
        assert_eq!(Status::parse("done"), Some(Status::Completed));
        assert_eq!(Status::parse("nonsense"), None);
    }

    #[test]
    fn milestone_is_zero_estimate() {
        let t = InputTask {
            name: "M".into(),
            description: String::new(),
            specific_assignments: false,
            assignees: vec![],
            next: vec![],
            parallelizable: false,
            estimate: Some(0),
            start_date: None,
            end_date: None,
            status: Status::NotStarted,
            input_row_idx: 0,
            scheduler_fields: SchedulerFields::default(),
        };
        assert!(t.is_milestone());
    }
}
