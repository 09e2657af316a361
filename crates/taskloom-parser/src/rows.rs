//! Row tokenizer for delimited-text payloads. The grammar is simple
//! (comma- or tab-separated, optionally double-quoted cells), so this is a
//! small hand-rolled splitter rather than a pulled-in CSV crate.

/// Splits `text` into rows of trimmed cells on `delimiter`, honoring
/// double-quoted cells (a delimiter or newline inside quotes does not
/// split) with `""` as an escaped quote, mirroring Python's default
/// `csv.reader` dialect.
pub fn rows_from_text(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
        } else if c == '"' && cell.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            row.push(std::mem::take(&mut cell));
        } else if c == '\n' {
            row.push(std::mem::take(&mut cell));
            rows.push(std::mem::take(&mut row));
        } else if c == '\r' {
            // swallow; \r\n line endings collapse to the \n branch
        } else {
            cell.push(c);
        }
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    rows
}
