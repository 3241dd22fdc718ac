//! Plain text log ingestion.
//!
//! Reads a line-oriented log file into a `RecordTable` with four columns:
//! Time, Level, Line, Message. Each line is inspected for a leading
//! timestamp and a severity keyword; lines that carry neither still ingest
//! as Info-level messages, so arbitrary text files remain filterable.

use crate::filter::compare::parse_timestamp;
use crate::schema::{Column, TableSchema, UnifiedLevel};
use crate::table::{CellValue, Record, RecordTable};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

// Leading ISO-ish timestamp: date, 'T' or space, time with optional
// fractional seconds and optional zone suffix.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?)\s*")
        .expect("valid timestamp regex")
});

static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\[\(]?(TRACE|DEBUG|VERBOSE|INFO|WARNING|WARN|ERROR|FATAL|CRITICAL)[\]\)]?[:\s-]+")
        .expect("valid level regex")
});

/// The columns a text log table is built with, kept so callers can compose
/// queries against well-known names.
pub struct TextLogColumns {
    pub time: Column,
    pub level: Column,
    pub line: Column,
    pub message: Column,
}

impl TextLogColumns {
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            columns: vec![
                self.time.clone(),
                self.level.clone(),
                self.line.clone(),
                self.message.clone(),
            ],
            timestamp_column: Some(self.time.clone()),
            unified_level_column: Some(self.level.clone()),
            name_column: Some(self.message.clone()),
            ..TableSchema::default()
        }
    }
}

pub fn text_log_columns() -> TextLogColumns {
    TextLogColumns {
        time: Column::with_width_hint("Time", 12.0),
        level: Column::with_width_hint("Level", 5.0),
        line: Column::with_width_hint("Line", 5.0),
        message: Column::new("Message"),
    }
}

/// Reads a log file into a fresh table, one row per line.
pub fn load_text_log(path: impl AsRef<Path>) -> Result<RecordTable> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let columns = text_log_columns();
    let table = RecordTable::new(columns.schema());

    for (index, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("failed to read {}", path.display()))?;
        table.append(parse_line(index + 1, &line));
    }

    Ok(table)
}

/// Ingests one line, lexing off the optional timestamp and level prefix.
pub fn parse_line(line_number: usize, line: &str) -> Record {
    let mut rest = line;

    let timestamp = TIMESTAMP_RE.captures(rest).and_then(|caps| {
        let matched = caps.get(0)?;
        let parsed = parse_timestamp(caps.get(1)?.as_str())?;
        rest = &rest[matched.end()..];
        Some(parsed)
    });

    let level = LEVEL_RE.captures(rest).map(|caps| {
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
        match caps.get(1).map_or("", |m| m.as_str()) {
            "TRACE" | "DEBUG" | "VERBOSE" => UnifiedLevel::Verbose,
            "WARNING" | "WARN" => UnifiedLevel::Warning,
            "ERROR" => UnifiedLevel::Error,
            "FATAL" | "CRITICAL" => UnifiedLevel::Fatal,
            _ => UnifiedLevel::Info,
        }
    });

    Record::new(vec![
        timestamp.map_or(CellValue::Empty, CellValue::Time),
        CellValue::Level(level.unwrap_or(UnifiedLevel::Info)),
        CellValue::Int {
            value: line_number as i64,
            name: None,
        },
        CellValue::Str(rest.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableSnapshot;
    use chrono::{TimeZone, Utc};

    fn ingest(lines: &[&str]) -> (RecordTable, TextLogColumns) {
        let columns = text_log_columns();
        let table = RecordTable::new(columns.schema());
        for (index, line) in lines.iter().enumerate() {
            table.append(parse_line(index + 1, line));
        }
        (table, columns)
    }

    #[test]
    fn test_timestamp_and_level_prefix() {
        let (table, columns) =
            ingest(&["2026-01-02T03:04:05Z ERROR disk failed"]);
        let snapshot = table.snapshot();

        let expected = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(snapshot.column_timestamp(0, &columns.time), Some(expected));
        assert_eq!(snapshot.row_level(0), Some(UnifiedLevel::Error));
        assert_eq!(
            snapshot.column_string(0, &columns.message).as_deref(),
            Some("disk failed")
        );
    }

    #[test]
    fn test_bare_line_defaults_to_info() {
        let (table, columns) = ingest(&["just some text"]);
        let snapshot = table.snapshot();

        assert_eq!(snapshot.column_timestamp(0, &columns.time), None);
        assert_eq!(snapshot.row_level(0), Some(UnifiedLevel::Info));
        assert_eq!(
            snapshot.column_string(0, &columns.message).as_deref(),
            Some("just some text")
        );
        assert_eq!(snapshot.column_int(0, &columns.line), Some(1));
    }

    #[test]
    fn test_level_keyword_mapping() {
        let (table, _) = ingest(&[
            "DEBUG a",
            "[WARN] b",
            "CRITICAL: c",
            "INFO d",
        ]);
        let snapshot = table.snapshot();
        assert_eq!(snapshot.row_level(0), Some(UnifiedLevel::Verbose));
        assert_eq!(snapshot.row_level(1), Some(UnifiedLevel::Warning));
        assert_eq!(snapshot.row_level(2), Some(UnifiedLevel::Fatal));
        assert_eq!(snapshot.row_level(3), Some(UnifiedLevel::Info));
    }
}
