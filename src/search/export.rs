//! Row export formats
//!
//! Renders finished rows as JSON, newline-delimited JSON or CSV. CSV columns
//! are the union of row fields in first-seen order.

use indexmap::IndexSet;
use serde_json::Value;
use thiserror::Error;

use crate::search::row::Row;

/// Output encoding for a set of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Ndjson,
    Csv,
}

impl OutputFormat {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// HTTP content type
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Ndjson => "application/x-ndjson",
            Self::Csv => "text/csv",
        }
    }
}

/// Column names across all rows
pub fn columns(rows: &[Row]) -> Vec<String> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    for row in rows {
        seen.extend(row.columns());
    }
    seen.into_iter().map(str::to_string).collect()
}

/// Render rows in the given format
pub fn render(rows: &[Row], format: OutputFormat) -> Result<String, ExportError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Ndjson => to_ndjson(rows),
        OutputFormat::Csv => to_csv(rows),
    }
}

/// One JSON object per line
pub fn to_ndjson(rows: &[Row]) -> Result<String, ExportError> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}

/// CSV with a header row; missing and null cells are empty
pub fn to_csv(rows: &[Row]) -> Result<String, ExportError> {
    let columns = columns(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell(row.get(c))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Errors while rendering rows
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to flush output: {0}")]
    Flush(String),

    #[error("Output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with("host", "web-1").with("n", 3),
            Row::new().with("host", "web, 2").with("mean", Value::Null),
        ]
    }

    #[test]
    fn test_columns_first_seen_order() {
        assert_eq!(columns(&rows()), vec!["host", "n", "mean"]);
    }

    #[test]
    fn test_csv_quotes_and_blanks() {
        let csv = to_csv(&rows()).unwrap();
        assert_eq!(csv, "host,n,mean\nweb-1,3,\n\"web, 2\",,\n");
    }

    #[test]
    fn test_ndjson_lines() {
        let out = render(&rows(), OutputFormat::Ndjson).unwrap();
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"host":"web-1","n":3}"#);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_str("jsonl"), Some(OutputFormat::Ndjson));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
