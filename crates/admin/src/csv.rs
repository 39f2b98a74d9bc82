//! CSV intake and reports.
//!
//! Input files carry one match-field column (`Id`, `Sku`, `Email`, `Name`,
//! `Handle` or `External_ID`, any case) and, for value operations, a `value`
//! column. Files are validated as a whole before any row is processed.

use tagfield_core::{Gid, MatchField, OperationResult, ResourceType};
use thiserror::Error;

use crate::services::{BatchRow, RawValue, ResolveError, Resolver};

/// Maximum number of valid rows per file.
pub const MAX_ROWS: usize = 5_000;

/// Whole-file CSV errors. The batch never starts when one occurs.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("CSV is empty")]
    Empty,

    #[error("CSV has no identifier column (expected one of Id, Sku, Email, Name, Handle, External_ID)")]
    MissingMatchColumn,

    #[error("CSV has no value column")]
    MissingValueColumn,

    #[error("No valid records found")]
    NoRecords,

    #[error("CSV has {rows} rows; the limit is {MAX_ROWS}")]
    TooManyRows { rows: usize },

    #[error(transparent)]
    InvalidId(#[from] ResolveError),
}

/// A validated input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub field: MatchField,
    pub rows: Vec<BatchRow>,
}

/// Parse and validate a batch file.
///
/// Rows with a blank identifier are not counted. When `field` is `Id`, every
/// GID must belong to `resource_type`.
///
/// # Errors
///
/// Returns a [`CsvError`] describing the first whole-file problem.
pub fn parse_batch(
    data: &[u8],
    resource_type: ResourceType,
    require_value: bool,
) -> Result<ParsedCsv, CsvError> {
    let text = std::str::from_utf8(data)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = parse_records(text).into_iter();

    let headers = records.next().ok_or(CsvError::Empty)?;
    let (key_column, field) = headers
        .iter()
        .enumerate()
        .find_map(|(i, h)| MatchField::from_header(h).map(|f| (i, f)))
        .ok_or(CsvError::MissingMatchColumn)?;
    let value_column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("value"));
    if require_value && value_column.is_none() {
        return Err(CsvError::MissingValueColumn);
    }

    let rows: Vec<BatchRow> = records
        .filter_map(|record| {
            let key = record.get(key_column)?.trim().to_string();
            if key.is_empty() {
                return None;
            }
            let value = value_column
                .and_then(|i| record.get(i))
                .filter(|v| !v.trim().is_empty())
                .map(|v| RawValue::Text(v.clone()));
            Some(BatchRow::new(key, value))
        })
        .collect();

    if rows.is_empty() {
        return Err(CsvError::NoRecords);
    }
    if rows.len() > MAX_ROWS {
        return Err(CsvError::TooManyRows { rows: rows.len() });
    }
    if field == MatchField::Id {
        for row in &rows {
            Resolver::check_gid(resource_type, &row.key)?;
        }
    } else if let Some(row) = rows.iter().find(|r| Gid::looks_like_gid(&r.key)) {
        Resolver::check_gid(resource_type, &row.key)?;
    }

    Ok(ParsedCsv { field, rows })
}

/// Split CSV text into records, honouring quoted fields that contain
/// commas, doubled quotes or newlines. Blank lines are dropped.
#[must_use]
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |record: &mut Vec<String>, current: &mut String| {
        record.push(std::mem::take(current));
        let done = std::mem::take(record);
        if !done.iter().all(|c| c.trim().is_empty()) {
            records.push(done);
        }
    };

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut current)),
            '\r' => {}
            '\n' => end_record(&mut record, &mut current),
            _ => current.push(ch),
        }
    }
    end_record(&mut record, &mut current);
    records
}

/// Quote one cell, doubling embedded quotes.
///
/// Values a spreadsheet would evaluate as formulas (leading `=`, `+`, `-` or
/// `@`) are wrapped as `="..."` so they display literally.
#[must_use]
pub fn quote_cell(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    if value.starts_with(['=', '+', '-', '@']) {
        format!("\"=\"\"{escaped}\"\"\"")
    } else {
        format!("\"{escaped}\"")
    }
}

/// Join cells into one quoted CSV line.
#[must_use]
pub fn csv_line<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|c| quote_cell(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// The per-row outcome report: match field, `success`, `error`.
#[must_use]
pub fn report(field: MatchField, results: &[OperationResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(csv_line([field.header(), "success", "error"]));
    for result in results {
        lines.push(csv_line([
            result.id.as_str(),
            if result.success { "true" } else { "false" },
            result.error.as_deref().unwrap_or_default(),
        ]));
    }
    lines.join("\n") + "\n"
}
