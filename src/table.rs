//! Table snapshots and the in-memory record table.
//!
//! A `TableSnapshot` is an immutable, versioned read view over trace rows:
//! row count, generation id, and typed getters keyed by (row index, column).
//! The generation id changes only when existing rows are mutated or removed
//! or the schema changes; pure appends never bump it, which is what lets the
//! filtered view update incrementally. Row indices are stable within one
//! generation.
//!
//! `RecordTable` is the concrete single-writer table backing the CLI and the
//! tests: appends go through a short exclusive critical section, snapshots
//! copy only a block-list reference and a length.

use crate::schema::{Column, TableSchema, UnifiedLevel, UnifiedOpcode};
use crate::store::{ListBuilder, ListSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};

/// Read view over a table at a fixed row count and generation.
pub trait TableSnapshot: Send + Sync {
    fn schema(&self) -> &TableSchema;

    fn row_count(&self) -> usize;

    /// Increments only when existing rows are modified/removed or the schema
    /// changes. Appends do not increment it.
    fn generation_id(&self) -> u64;

    /// Display string for a cell. `None` when the cell has no value.
    fn column_string(&self, row: usize, column: &Column) -> Option<Cow<'_, str>>;

    /// For columns that pair an integer with a friendly name (process/thread
    /// ids), the friendly name alone. `None` when unresolved.
    fn column_name_for_id(&self, row: usize, column: &Column) -> Option<Cow<'_, str>>;

    fn column_int(&self, row: usize, column: &Column) -> Option<i64>;

    fn column_timestamp(&self, row: usize, column: &Column) -> Option<DateTime<Utc>>;

    fn column_level(&self, row: usize, column: &Column) -> Option<UnifiedLevel>;

    fn column_opcode(&self, row: usize, column: &Column) -> UnifiedOpcode;

    /// Level of the row through the schema's level role column, if any.
    fn row_level(&self, row: usize) -> Option<UnifiedLevel> {
        let column = self.schema().unified_level_column.clone()?;
        self.column_level(row, &column)
    }
}

/// One cell of a record, positionally matched to the schema's column list.
#[derive(Debug, Clone, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Str(String),
    /// An opaque integer identifier with an optionally resolved display name
    /// (e.g. a process id and the process name).
    Int {
        value: i64,
        name: Option<String>,
    },
    Time(DateTime<Utc>),
    Level(UnifiedLevel),
    Opcode(UnifiedOpcode),
}

#[derive(Debug, Clone, Default)]
pub struct Record {
    cells: Vec<CellValue>,
}

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Record { cells }
    }

    fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&CellValue::Empty)
    }
}

#[derive(Debug)]
struct RecordTableInner {
    rows: ListBuilder<Record>,
    generation: u64,
}

/// Append-only in-memory table. One writer appends; any number of readers
/// take snapshots once per frame.
#[derive(Debug)]
pub struct RecordTable {
    schema: Arc<TableSchema>,
    inner: Mutex<RecordTableInner>,
}

impl RecordTable {
    pub fn new(schema: TableSchema) -> Self {
        RecordTable {
            schema: Arc::new(schema),
            inner: Mutex::new(RecordTableInner {
                rows: ListBuilder::new(),
                generation: 1,
            }),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn append(&self, record: Record) {
        let mut inner = self.inner.lock().expect("record table lock");
        inner.rows.push(record);
    }

    /// Drops all rows. This is a destructive change, so it bumps the
    /// generation id and forces dependent filtered views to rebuild.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("record table lock");
        inner.rows = ListBuilder::new();
        inner.generation += 1;
    }

    pub fn snapshot(&self) -> RecordTableSnapshot {
        let mut inner = self.inner.lock().expect("record table lock");
        RecordTableSnapshot {
            schema: self.schema.clone(),
            rows: inner.rows.snapshot(),
            generation: inner.generation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordTableSnapshot {
    schema: Arc<TableSchema>,
    rows: ListSnapshot<Record>,
    generation: u64,
}

impl RecordTableSnapshot {
    fn column_index(&self, column: &Column) -> Option<usize> {
        self.schema.columns.iter().position(|c| c == column)
    }

    fn cell(&self, row: usize, column: &Column) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|record| record.cell(index))
    }
}

impl TableSnapshot for RecordTableSnapshot {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn generation_id(&self) -> u64 {
        self.generation
    }

    fn column_string(&self, row: usize, column: &Column) -> Option<Cow<'_, str>> {
        match self.cell(row, column)? {
            CellValue::Empty => None,
            CellValue::Str(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Int {
                value,
                name: Some(name),
            } => Some(Cow::Owned(format!("{name} ({value})"))),
            CellValue::Int { value, name: None } => Some(Cow::Owned(value.to_string())),
            CellValue::Time(ts) => {
                Some(Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
            }
            CellValue::Level(level) => Some(Cow::Borrowed(level.name())),
            CellValue::Opcode(UnifiedOpcode::None) => None,
            CellValue::Opcode(UnifiedOpcode::Start) => Some(Cow::Borrowed("Start")),
            CellValue::Opcode(UnifiedOpcode::Stop) => Some(Cow::Borrowed("Stop")),
        }
    }

    fn column_name_for_id(&self, row: usize, column: &Column) -> Option<Cow<'_, str>> {
        match self.cell(row, column)? {
            CellValue::Int {
                name: Some(name), ..
            } => Some(Cow::Borrowed(name.as_str())),
            _ => None,
        }
    }

    fn column_int(&self, row: usize, column: &Column) -> Option<i64> {
        match self.cell(row, column)? {
            CellValue::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    fn column_timestamp(&self, row: usize, column: &Column) -> Option<DateTime<Utc>> {
        match self.cell(row, column)? {
            CellValue::Time(ts) => Some(*ts),
            _ => None,
        }
    }

    fn column_level(&self, row: usize, column: &Column) -> Option<UnifiedLevel> {
        match self.cell(row, column)? {
            CellValue::Level(level) => Some(*level),
            _ => None,
        }
    }

    fn column_opcode(&self, row: usize, column: &Column) -> UnifiedOpcode {
        match self.cell(row, column) {
            Some(CellValue::Opcode(opcode)) => *opcode,
            _ => UnifiedOpcode::None,
        }
    }
}
