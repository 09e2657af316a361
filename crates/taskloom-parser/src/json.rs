//! JSON grammar (§6): an array of objects with the same field names as the
//! tabular grammar, case-sensitive, `next` as an array of strings.

use serde::Deserialize;
use taskloom_core::{InputTask, Metadata, SchedulerFields, Status, TaskloomError};

use crate::tabular::classify_assignees_public;

#[derive(Debug, Deserialize)]
struct JsonTask {
    #[serde(rename = "Task")]
    task: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Estimate", default)]
    estimate: Option<String>,
    #[serde(rename = "StartDate", default)]
    start_date: Option<String>,
    #[serde(rename = "EndDate", default)]
    end_date: Option<String>,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Assignee", default)]
    assignee: String,
    #[serde(rename = "next", default)]
    next: Vec<String>,
}

/// Collects every distinct assignee name referenced across a JSON payload,
/// without requiring `Metadata` up front. The JSON grammar has no `%TEAM`/
/// `%ALLOCATION` directive syntax, so the caller registers these as floating
/// people before classifying assignee homogeneity.
pub fn collect_assignee_names(payload: &str) -> Result<Vec<String>, TaskloomError> {
    let raw: Vec<JsonTask> =
        serde_json::from_str(payload).map_err(|e| TaskloomError::ParseError {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;
    let mut names = Vec::new();
    for jt in &raw {
        for a in jt.assignee.split(',') {
            let a = a.trim();
            if !a.is_empty() && !names.contains(&a.to_string()) {
                names.push(a.to_string());
            }
        }
    }
    Ok(names)
}

/// Parses a JSON array payload into [`InputTask`]s. Returns `Err` if the
/// payload does not parse as an array of objects at all (the caller uses
/// this to decide whether to fall back to the tabular grammar).
pub fn parse_json_tasks(
    payload: &str,
    metadata: &Metadata,
) -> Result<Vec<InputTask>, TaskloomError> {
    let raw: Vec<JsonTask> =
        serde_json::from_str(payload).map_err(|e| TaskloomError::ParseError {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

    let mut tasks = Vec::with_capacity(raw.len());
    for (idx, jt) in raw.into_iter().enumerate() {
        if jt.task.trim().is_empty() {
            continue;
        }
        let estimate_raw = jt.estimate.unwrap_or_default();
        let (estimate, parallelizable) = crate::tabular::parse_estimate_public(&estimate_raw)?;
        let start_date =
            crate::tabular::parse_optional_date_public(&jt.start_date.unwrap_or_default())?;
        let end_date =
            crate::tabular::parse_optional_date_public(&jt.end_date.unwrap_or_default())?;
        let status = Status::parse(&jt.status).ok_or_else(|| TaskloomError::ParseError {
            line: idx,
            column: 0,
            message: format!("unrecognized status for task {}", jt.task),
        })?;
        let assignees: Vec<String> = jt
            .assignee
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let specific_assignments = classify_assignees_public(&jt.task, &assignees, metadata)?;

        tasks.push(InputTask {
            name: jt.task,
            description: jt.description,
            specific_assignments,
            assignees,
            next: jt.next,
            parallelizable,
            estimate,
            start_date,
            end_date,
            status,
            input_row_idx: idx,
            scheduler_fields: SchedulerFields::default(),
        });
    }
    Ok(tasks)
}
