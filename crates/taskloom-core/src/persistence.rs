//! The persistence interface from §6: a write-only `save_schedule` port.
//! The concrete SQLite-backed implementation lives in
//! `taskloom_solver::persistence_sqlite`, which depends on this crate, not
//! the other way around — this module only defines the interface and the
//! `TaskCalendar` payload shape it accepts.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{Person, Status};

/// Assignment of people to tasks by date: `date -> person -> [task names]`.
/// Built by the decorator from a solved schedule, grounded in the
/// reference implementation's `TaskCalendar`.
#[derive(Debug, Clone, Default)]
pub struct TaskCalendar {
    entries: BTreeMap<NaiveDate, BTreeMap<Person, Vec<CalendarTask>>>,
}

/// One task's presence on a calendar day, carrying just enough to persist
/// a `tasks` row (`task`, `assignee`, `status_ordinal`).
#[derive(Debug, Clone)]
pub struct CalendarTask {
    pub name: String,
    pub status: Status,
}

impl TaskCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, person: &str, date: NaiveDate, task: CalendarTask) {
        self.entries
            .entry(date)
            .or_default()
            .entry(person.to_string())
            .or_default()
            .push(task);
    }

    pub fn merge(&mut self, other: TaskCalendar) {
        for (date, people) in other.entries {
            for (person, tasks) in people {
                for task in tasks {
                    self.assign(&person, date, task);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Person, &CalendarTask)> {
        self.entries.iter().flat_map(|(date, people)| {
            people
                .iter()
                .flat_map(move |(person, tasks)| tasks.iter().map(move |t| (*date, person, t)))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schema-level contract for historical schedule persistence. Every call
/// creates a new `schedules` row; history is retained, never overwritten.
pub trait SchedulePersistence {
    type Error;

    fn save_schedule(
        &mut self,
        project_name: &str,
        calendar: &TaskCalendar,
    ) -> Result<(), Self::Error>;
}
