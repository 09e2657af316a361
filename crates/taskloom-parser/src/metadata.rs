//! Metadata extractor (§4.1): reads `%TEAM` and `%ALLOCATION` directive
//! rows out of the raw tabular input.

use taskloom_core::{Metadata, TaskloomError};

/// True if `row` is a directive row (`%TEAM`/`%ALLOCATION`), matching the
/// reference implementation's `row_contains_metadata`.
pub fn row_is_metadata(row: &[String]) -> bool {
    row.first()
        .map(|cell| cell.trim().starts_with('%'))
        .unwrap_or(false)
}

fn validate_allocation(person: &str, raw: &str) -> Result<f64, TaskloomError> {
    let fraction: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TaskloomError::BadAllocation {
            person: person.to_string(),
            fraction: f64::NAN,
        })?;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(TaskloomError::BadAllocation {
            person: person.to_string(),
            fraction,
        });
    }
    Ok(fraction)
}

/// Applies one `%TEAM` or `%ALLOCATION` row to `metadata`. `row[0]` has
/// already been identified as a directive by [`row_is_metadata`].
fn apply_directive(metadata: &mut Metadata, row: &[String]) -> Result<(), TaskloomError> {
    let directive = row[0].trim();
    match directive {
        "%TEAM" => {
            let name = row
                .get(1)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| TaskloomError::ParseError {
                    line: 0,
                    column: 0,
                    message: "%TEAM row missing a name".into(),
                })?;
            let members: Vec<String> = row
                .iter()
                .skip(2)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if members.is_empty() {
                return Err(TaskloomError::ParseError {
                    line: 0,
                    column: 0,
                    message: format!("%TEAM {name} requires at least one member"),
                });
            }
            if metadata.is_person(&name) {
                return Err(TaskloomError::NameCollision { name });
            }
            metadata.add_team(&name, members);
            Ok(())
        }
        "%ALLOCATION" => {
            let person = row
                .get(1)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| TaskloomError::ParseError {
                    line: 0,
                    column: 0,
                    message: "%ALLOCATION row missing a person".into(),
                })?;
            let raw = row.get(2).map(String::as_str).unwrap_or("");
            if metadata.is_team(&person) {
                return Err(TaskloomError::NameCollision { name: person });
            }
            let fraction = validate_allocation(&person, raw)?;
            metadata.add_allocation(&person, fraction);
            Ok(())
        }
        other => Err(TaskloomError::ParseError {
            line: 0,
            column: 0,
            message: format!("unknown directive {other}"),
        }),
    }
}

/// Extracts team and allocation directives from `rows`, returning the
/// populated [`Metadata`]. Order within the input is immaterial except
/// that a later `%ALLOCATION` always overrides an earlier `%TEAM`'s
/// default allocation for that person, and a duplicate `%TEAM` name
/// replaces the prior team.
pub fn extract_metadata(rows: &[Vec<String>]) -> Result<Metadata, TaskloomError> {
    let mut metadata = Metadata::new();
    for row in rows {
        if row_is_metadata(row) {
            apply_directive(&mut metadata, row)?;
        }
    }
    Ok(metadata)
}
