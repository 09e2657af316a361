//! Task parser (§4.2): converts data rows (everything that is not a
//! metadata directive) into [`InputTask`] records, grounded in the
//! reference implementation's `csv_string_to_task_list`.

use taskloom_core::{calendar, InputTask, Metadata, SchedulerFields, Status, TaskloomError};

use crate::metadata::row_is_metadata;

const REQUIRED_HEADERS: &[&str] = &[
    "Task",
    "Description",
    "Estimate",
    "StartDate",
    "EndDate",
    "Status",
    "Assignee",
    "next",
];

struct Header {
    index: std::collections::HashMap<String, usize>,
    next_index: usize,
}

fn parse_header(row: &[String]) -> Result<Header, TaskloomError> {
    let mut index = std::collections::HashMap::new();
    for (i, cell) in row.iter().enumerate() {
        index.insert(cell.trim().to_string(), i);
    }
    for required in REQUIRED_HEADERS {
        if !index.contains_key(*required) {
            return Err(TaskloomError::ParseError {
                line: 1,
                column: 0,
                message: format!("missing required header column {required}"),
            });
        }
    }
    let next_index = index["next"];
    for (name, &i) in &index {
        if !name.is_empty() && name != "next" && i > next_index {
            return Err(TaskloomError::ParseError {
                line: 1,
                column: i,
                message: format!("column {name} appears after next, which must be last"),
            });
        }
    }
    Ok(Header { index, next_index })
}

fn cell<'a>(row: &'a [String], header: &Header, name: &str) -> &'a str {
    header
        .index
        .get(name)
        .and_then(|&i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

/// Public re-export for sibling grammars (JSON) that share estimate parsing.
pub fn parse_estimate_public(raw: &str) -> Result<(Option<i64>, bool), TaskloomError> {
    parse_estimate(raw)
}

/// Public re-export for sibling grammars (JSON) that share date parsing.
pub fn parse_optional_date_public(raw: &str) -> Result<Option<chrono::NaiveDate>, TaskloomError> {
    parse_optional_date(raw)
}

/// Public re-export of assignee-homogeneity classification for the JSON
/// grammar, which enforces the same `specific_assignments` rule.
pub fn classify_assignees_public(
    task_name: &str,
    assignees: &[String],
    metadata: &Metadata,
) -> Result<bool, TaskloomError> {
    classify_assignees(task_name, assignees, metadata)
}

pub(crate) fn parse_estimate(raw: &str) -> Result<(Option<i64>, bool), TaskloomError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok((None, false));
    }
    let (parallelizable, digits) = match trimmed.strip_prefix('~') {
        Some(rest) => (true, rest.trim()),
        None => (false, trimmed),
    };
    let value: i64 = digits.parse().map_err(|_| TaskloomError::ParseError {
        line: 0,
        column: 0,
        message: format!("invalid estimate {raw:?}"),
    })?;
    if value < 0 {
        return Err(TaskloomError::ParseError {
            line: 0,
            column: 0,
            message: format!("estimate must be non-negative, got {value}"),
        });
    }
    if parallelizable && value < 2 {
        return Err(TaskloomError::ParseError {
            line: 0,
            column: 0,
            message: "parallelizable estimate must be >= 2".into(),
        });
    }
    Ok((Some(value), parallelizable))
}

pub(crate) fn parse_optional_date(raw: &str) -> Result<Option<chrono::NaiveDate>, TaskloomError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    calendar::parse_date(trimmed)
        .map(Some)
        .ok_or_else(|| TaskloomError::ParseError {
            line: 0,
            column: 0,
            message: format!("invalid date {raw:?}, expected YYYY-MM-DD"),
        })
}

/// Checks assignee-list homogeneity against `metadata` and returns whether
/// the list is a specific (all-people) assignment. A mix of team and
/// person names fails with `MixedAssignees`.
fn classify_assignees(
    task_name: &str,
    assignees: &[String],
    metadata: &Metadata,
) -> Result<bool, TaskloomError> {
    if assignees.is_empty() {
        return Ok(false);
    }
    for a in assignees {
        if !metadata.is_team(a) && !metadata.is_person(a) {
            return Err(TaskloomError::UnknownAssignee {
                task: task_name.to_string(),
                assignee: a.clone(),
            });
        }
    }
    let any_team = assignees.iter().any(|a| metadata.is_team(a));
    let any_person_only = assignees.iter().any(|a| !metadata.is_team(a));
    if any_team && any_person_only {
        return Err(TaskloomError::MixedAssignees {
            task: task_name.to_string(),
            assignees: assignees.to_vec(),
        });
    }
    Ok(!any_team)
}

/// Parses data rows into [`InputTask`]s. Directive rows, blank rows, and
/// rows with an empty `Task` cell are skipped.
pub fn parse_tasks(
    rows: &[Vec<String>],
    metadata: &Metadata,
) -> Result<Vec<InputTask>, TaskloomError> {
    let mut rows_iter = rows.iter().enumerate();
    let header = loop {
        match rows_iter.next() {
            Some((_, row)) if row_is_metadata(row) => continue,
            Some((_, row)) if row.iter().all(|c| c.trim().is_empty()) => continue,
            Some((_, row)) => break parse_header(row)?,
            None => {
                return Err(TaskloomError::ParseError {
                    line: 0,
                    column: 0,
                    message: "no header row found".into(),
                })
            }
        }
    };

    let mut tasks = Vec::new();
    for (row_idx, row) in rows_iter {
        if row_is_metadata(row) {
            continue;
        }
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let name = cell(row, &header, "Task").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let description = cell(row, &header, "Description").trim().to_string();
        let (estimate, parallelizable) = parse_estimate(cell(row, &header, "Estimate"))?;
        let start_date = parse_optional_date(cell(row, &header, "StartDate"))?;
        let end_date = parse_optional_date(cell(row, &header, "EndDate"))?;
        let status = Status::parse(cell(row, &header, "Status")).ok_or_else(|| {
            TaskloomError::ParseError {
                line: row_idx,
                column: 0,
                message: format!("unrecognized status for task {name}"),
            }
        })?;
        let assignees: Vec<String> = cell(row, &header, "Assignee")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let specific_assignments = classify_assignees(&name, &assignees, metadata)?;
        let next: Vec<String> = row[header.next_index..]
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        tasks.push(InputTask {
            name,
            description,
            specific_assignments,
            assignees,
            next,
            parallelizable,
            estimate,
            start_date,
            end_date,
            status,
            input_row_idx: row_idx,
            scheduler_fields: SchedulerFields::default(),
        });
    }
    Ok(tasks)
}
