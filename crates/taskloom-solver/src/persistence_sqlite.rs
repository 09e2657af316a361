//! SQLite-backed implementation of [`taskloom_core::SchedulePersistence`]
//! (§6's persistence interface). Grounded in
//! `backend_rewrite/database_sqlite3.py`'s three-table schema and in
//! `AEtherlight-ai-lumina`'s `SqliteMetadata` for the `rusqlite` usage
//! pattern (open-or-create, `CREATE TABLE IF NOT EXISTS`, indexed foreign
//! keys) — the teacher itself carries no SQL dependency, so this is an
//! enrichment pulled from the wider example pack (see `DESIGN.md`).
//!
//! Every [`SqliteSchedulePersistence::save_schedule`] call inserts a new
//! `schedules` row and the full calendar that goes with it; history is
//! never overwritten, matching §6's "historical schedules are retained".

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection};
use taskloom_core::persistence::{SchedulePersistence, TaskCalendar};

/// Opens (creating if absent) a SQLite database with the `projects` /
/// `schedules` / `tasks` schema from §6.
pub struct SqliteSchedulePersistence {
    conn: Connection,
}

impl SqliteSchedulePersistence {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory database, useful for tests and short-lived callers that
    /// don't need the history to outlive the process.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                last_updated_ns INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS schedules (
                id INTEGER PRIMARY KEY,
                project_id INTEGER NOT NULL REFERENCES projects(id),
                created_ns INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                schedule_id INTEGER NOT NULL REFERENCES schedules(id),
                task TEXT NOT NULL,
                date TEXT NOT NULL,
                assignee TEXT NOT NULL,
                status_ordinal INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_schedules_project ON schedules(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_schedule ON tasks(schedule_id);",
        )?;
        Ok(Self { conn })
    }

    fn now_ns() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_nanos() as i64
    }

    fn upsert_project(&self, name: &str) -> rusqlite::Result<i64> {
        let now = Self::now_ns();
        self.conn.execute(
            "INSERT INTO projects (name, last_updated_ns) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET last_updated_ns = excluded.last_updated_ns",
            params![name, now],
        )?;
        self.conn.query_row(
            "SELECT id FROM projects WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
    }

    /// Every `schedules` row created for `project_name`, most recent first,
    /// paired with the calendar it stored. Supports the "historical
    /// schedules are retained" guarantee with an actual read path.
    pub fn history(&self, project_name: &str) -> rusqlite::Result<Vec<(i64, TaskCalendar)>> {
        let project_id: i64 = match self.conn.query_row(
            "SELECT id FROM projects WHERE name = ?1",
            params![project_name],
            |row| row.get(0),
        ) {
            Ok(id) => id,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut stmt = self.conn.prepare(
            "SELECT id FROM schedules WHERE project_id = ?1 ORDER BY created_ns DESC",
        )?;
        let schedule_ids: Vec<i64> = stmt
            .query_map(params![project_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let mut out = Vec::with_capacity(schedule_ids.len());
        for schedule_id in schedule_ids {
            let mut task_stmt = self.conn.prepare(
                "SELECT task, date, assignee, status_ordinal FROM tasks WHERE schedule_id = ?1",
            )?;
            let mut calendar = TaskCalendar::new();
            let rows = task_stmt.query_map(params![schedule_id], |row| {
                let task: String = row.get(0)?;
                let date: String = row.get(1)?;
                let assignee: String = row.get(2)?;
                let ordinal: i32 = row.get(3)?;
                Ok((task, date, assignee, ordinal))
            })?;
            for row in rows {
                let (task, date, assignee, ordinal) = row?;
                let Some(parsed_date) = taskloom_core::calendar::parse_date(&date) else {
                    continue;
                };
                let status = ordinal_to_status(ordinal);
                calendar.assign(
                    &assignee,
                    parsed_date,
                    taskloom_core::persistence::CalendarTask { name: task, status },
                );
            }
            out.push((schedule_id, calendar));
        }
        Ok(out)
    }
}

fn ordinal_to_status(ordinal: i32) -> taskloom_core::Status {
    use taskloom_core::Status;
    match ordinal {
        0 => Status::NotStarted,
        1 => Status::InProgress,
        2 => Status::Blocked,
        3 => Status::Milestone,
        _ => Status::Completed,
    }
}

impl SchedulePersistence for SqliteSchedulePersistence {
    type Error = rusqlite::Error;

    fn save_schedule(
        &mut self,
        project_name: &str,
        calendar: &TaskCalendar,
    ) -> Result<(), Self::Error> {
        let project_id = self.upsert_project(project_name)?;
        let now = Self::now_ns();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO schedules (project_id, created_ns) VALUES (?1, ?2)",
            params![project_id, now],
        )?;
        let schedule_id = tx.last_insert_rowid();
        for (date, person, calendar_task) in calendar.iter() {
            tx.execute(
                "INSERT INTO tasks (schedule_id, task, date, assignee, status_ordinal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    schedule_id,
                    calendar_task.name,
                    date.to_string(),
                    person,
                    calendar_task.status.ordinal(),
                ],
            )?;
        }
        tx.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskloom_core::persistence::CalendarTask;
    use taskloom_core::Status;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 27).unwrap()
    }

    #[test]
    fn save_then_history_round_trips_one_schedule() {
        let mut store = SqliteSchedulePersistence::open_in_memory().unwrap();
        let mut calendar = TaskCalendar::new();
        calendar.assign(
            "Alice",
            day(),
            CalendarTask {
                name: "T1".into(),
                status: Status::InProgress,
            },
        );
        store.save_schedule("demo", &calendar).unwrap();

        let history = store.history("demo").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].1.iter().count(), 1);
    }

    #[test]
    fn every_save_creates_a_new_schedule_row() {
        let mut store = SqliteSchedulePersistence::open_in_memory().unwrap();
        let mut calendar = TaskCalendar::new();
        calendar.assign(
            "Alice",
            day(),
            CalendarTask {
                name: "T1".into(),
                status: Status::NotStarted,
            },
        );
        store.save_schedule("demo", &calendar).unwrap();
        store.save_schedule("demo", &calendar).unwrap();

        let history = store.history("demo").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn unknown_project_has_empty_history() {
        let store = SqliteSchedulePersistence::open_in_memory().unwrap();
        assert!(store.history("nonexistent").unwrap().is_empty());
    }
}
