//! Request-payload dispatch (§6): a request carries one text payload that
//! may be JSON or delimited tabular text. The parser tries JSON, then
//! comma-CSV, then tab-CSV, committing to the first grammar that yields a
//! non-empty task list.

use taskloom_core::{InputTask, Metadata, TaskloomError};

use crate::{json, metadata, rows, tabular};

/// The metadata and tasks recovered from a payload, regardless of which
/// grammar matched.
#[derive(Debug, Clone)]
pub struct ParsedInput {
    pub metadata: Metadata,
    pub tasks: Vec<InputTask>,
}

fn try_json(payload: &str) -> Option<ParsedInput> {
    let names = json::collect_assignee_names(payload).ok()?;
    let mut metadata = Metadata::new();
    for name in names {
        metadata.add_person(&name);
    }
    let tasks = json::parse_json_tasks(payload, &metadata).ok()?;
    if tasks.is_empty() {
        return None;
    }
    Some(ParsedInput { metadata, tasks })
}

fn try_tabular(payload: &str, delimiter: char) -> Result<ParsedInput, TaskloomError> {
    let rows = rows::rows_from_text(payload, delimiter);
    let metadata = metadata::extract_metadata(&rows)?;
    let tasks = tabular::parse_tasks(&rows, &metadata)?;
    Ok(ParsedInput { metadata, tasks })
}

/// Parses `payload` by trying JSON, then comma-separated, then
/// tab-separated tabular text, in that order. Returns the first grammar's
/// result once it yields at least one task; the tab-CSV attempt's error (if
/// even that fails) is the one surfaced to the caller.
pub fn parse_payload(payload: &str) -> Result<ParsedInput, TaskloomError> {
    if let Some(parsed) = try_json(payload) {
        return Ok(parsed);
    }
    if let Ok(parsed) = try_tabular(payload, ',') {
        if !parsed.tasks.is_empty() {
            return Ok(parsed);
        }
    }
    let tab_result = try_tabular(payload, '\t')?;
    if tab_result.tasks.is_empty() {
        return Err(TaskloomError::ParseError {
            line: 0,
            column: 0,
            message: "payload did not yield any tasks under JSON, comma-CSV, or tab-CSV grammars"
                .into(),
        });
    }
    Ok(tab_result)
}
