//! Parameter tables on disk (CSV, TSV or JSON).

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use epirun_core::errors::{io_error, ErrorInfo, SweepError};
use indexmap::IndexSet;
use serde_json::Value;

use crate::paths::{flatten, unflatten, ParamMap};

/// On-disk layout of a parameter table, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-delimited with flattened headers.
    Csv,
    /// Tab-delimited with flattened headers.
    Tsv,
    /// JSON array of nested objects.
    Json,
}

impl TableFormat {
    /// `.json` and `.tsv` are recognised; everything else is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TableFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => TableFormat::Tsv,
            _ => TableFormat::Csv,
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            TableFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

fn csv_error(code: &str, path: &Path, err: csv::Error) -> SweepError {
    if err.is_io_error() {
        io_error(code, path, err)
    } else {
        SweepError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }
}

/// Parses one delimited cell: integer, then float, then boolean, else string.
///
/// Empty cells are absent and yield `None`.
pub fn parse_cell(cell: &str) -> Option<Value> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Some(Value::from(int));
    }
    if let Ok(float) = cell.parse::<f64>() {
        if float.is_finite() {
            return Some(Value::from(float));
        }
    }
    match cell {
        "true" | "True" | "TRUE" => Some(Value::Bool(true)),
        "false" | "False" | "FALSE" => Some(Value::Bool(false)),
        _ => Some(Value::String(cell.to_string())),
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Loads every row of the table at `path` as a nested mapping.
pub fn read_parameter_table(path: &Path, separator: &str) -> Result<Vec<ParamMap>, SweepError> {
    let format = TableFormat::from_path(path);
    if format == TableFormat::Json {
        let bytes = fs::read(path).map_err(|err| io_error("table-read", path, err))?;
        return serde_json::from_slice::<Vec<ParamMap>>(&bytes).map_err(|err| {
            SweepError::Serde(
                ErrorInfo::new("table-json", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        });
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter())
        .trim(Trim::All)
        .from_path(path)
        .map_err(|err| csv_error("table-read", path, err))?;
    let headers = reader
        .headers()
        .map_err(|err| csv_error("table-header", path, err))?
        .clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| csv_error("table-record", path, err))?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter_map(|(header, cell)| parse_cell(cell).map(|value| (header.to_string(), value)));
        rows.push(unflatten(cells, separator)?);
    }
    Ok(rows)
}

/// Writes `rows` to `path` in the format implied by its extension.
///
/// Delimited headers are the union of flattened keys in first-seen order.
/// A value that would read back differently, such as the string `"007"` or a
/// list, is refused for CSV and TSV; JSON tables keep every type.
pub fn write_parameter_table(path: &Path, rows: &[ParamMap], separator: &str) -> Result<(), SweepError> {
    let format = TableFormat::from_path(path);
    if format == TableFormat::Json {
        let text = serde_json::to_string_pretty(rows).map_err(|err| {
            SweepError::Serde(ErrorInfo::new("table-json", err.to_string()))
        })?;
        return fs::write(path, text).map_err(|err| io_error("table-write", path, err));
    }

    let flat_rows: Vec<_> = rows.iter().map(|row| flatten(row, separator)).collect();
    for (index, row) in flat_rows.iter().enumerate() {
        for (column, value) in row {
            if parse_cell(&format_cell(value)).as_ref() != Some(value) {
                return Err(SweepError::Configuration(
                    ErrorInfo::new("table-cell-ambiguous", "value would not read back with the same type")
                        .with_context("row", index.to_string())
                        .with_context("column", column.as_str())
                        .with_context("value", value.to_string())
                        .with_hint("write the table with a .json extension"),
                ));
            }
        }
    }
    let headers: IndexSet<&String> = flat_rows.iter().flat_map(|row| row.keys()).collect();
    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_path(path)
        .map_err(|err| csv_error("table-write", path, err))?;
    writer
        .write_record(headers.iter().map(|h| h.as_str()))
        .map_err(|err| csv_error("table-write", path, err))?;
    for row in &flat_rows {
        let record: Vec<String> = headers
            .iter()
            .map(|header| row.get(*header).map(format_cell).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|err| csv_error("table-write", path, err))?;
    }
    writer.flush().map_err(|err| io_error("table-write", path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cells_parse_in_priority_order() {
        assert_eq!(parse_cell("3"), Some(json!(3)));
        assert_eq!(parse_cell("0.25"), Some(json!(0.25)));
        assert_eq!(parse_cell("True"), Some(json!(true)));
        assert_eq!(parse_cell("London"), Some(json!("London")));
        assert_eq!(parse_cell("  "), None);
    }

    #[test]
    fn numeric_looking_strings_are_refused_in_delimited_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let row = json!({"region_code": "007", "label": "1"})
            .as_object()
            .cloned()
            .expect("object");
        let err = write_parameter_table(&dir.path().join("codes.csv"), &[row], "__").expect_err("ambiguous");
        assert_eq!(err.info().code, "table-cell-ambiguous");
    }

    #[test]
    fn extension_picks_format() {
        assert_eq!(TableFormat::from_path(Path::new("runs.json")), TableFormat::Json);
        assert_eq!(TableFormat::from_path(Path::new("runs.TSV")), TableFormat::Tsv);
        assert_eq!(TableFormat::from_path(Path::new("runs.dat")), TableFormat::Csv);
    }
}
