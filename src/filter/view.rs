//! Incremental maintenance of the rows passing the viewer rules.
//!
//! The builder is created once per viewer and updated every frame. As long
//! as neither the table generation nor the rule generation changed, an
//! update only scans rows appended since the previous one. Either generation
//! changing can alter the verdict of any previously scanned row, so the
//! visible set is rebuilt from row 0 — there is no cheaper general
//! incremental update, and rebuilds only happen on rule edits or rare
//! destructive table changes.

use super::rules::{RuleAction, ViewerRules};
use crate::schema::{Column, TableSchema, UnifiedLevel, UnifiedOpcode};
use crate::store::{ListBuilder, ListSnapshot};
use crate::table::TableSnapshot;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::sync::Arc;

/// Stands in for the table before the first `update`.
#[derive(Debug)]
struct EmptyTableSnapshot {
    schema: TableSchema,
}

impl TableSnapshot for EmptyTableSnapshot {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn row_count(&self) -> usize {
        0
    }

    fn generation_id(&self) -> u64 {
        0
    }

    fn column_string(&self, _row: usize, _column: &Column) -> Option<Cow<'_, str>> {
        None
    }

    fn column_name_for_id(&self, _row: usize, _column: &Column) -> Option<Cow<'_, str>> {
        None
    }

    fn column_int(&self, _row: usize, _column: &Column) -> Option<i64> {
        None
    }

    fn column_timestamp(&self, _row: usize, _column: &Column) -> Option<DateTime<Utc>> {
        None
    }

    fn column_level(&self, _row: usize, _column: &Column) -> Option<UnifiedLevel> {
        None
    }

    fn column_opcode(&self, _row: usize, _column: &Column) -> UnifiedOpcode {
        UnifiedOpcode::None
    }
}

/// Mutable builder tracking which full-table row indices are visible. Not
/// readable directly; take a `snapshot()` for that.
pub struct FilteredViewBuilder {
    visible_rows: ListBuilder<usize>,
    table: Arc<dyn TableSnapshot>,
    scanned_rows: usize,
    error_count: usize,
    last_table_generation: Option<u64>,
    last_rule_generation: Option<u64>,
}

impl FilteredViewBuilder {
    pub fn new() -> Self {
        FilteredViewBuilder {
            visible_rows: ListBuilder::new(),
            table: Arc::new(EmptyTableSnapshot {
                schema: TableSchema::default(),
            }),
            scanned_rows: 0,
            error_count: 0,
            last_table_generation: None,
            last_rule_generation: None,
        }
    }

    /// Brings the visible set up to date with the latest table snapshot and
    /// rules. Returns true when the view was rebuilt from scratch rather
    /// than extended incrementally.
    pub fn update(&mut self, rules: &mut ViewerRules, snapshot: Arc<dyn TableSnapshot>) -> bool {
        rules.ensure_compiled(snapshot.as_ref());

        let rebuild = self.last_table_generation != Some(snapshot.generation_id())
            || self.last_rule_generation != Some(rules.generation_id());
        if rebuild {
            self.visible_rows = ListBuilder::new();
            self.scanned_rows = 0;
            self.error_count = 0;
        }

        for row in self.scanned_rows..snapshot.row_count() {
            if rules.is_empty() || rules.evaluate(snapshot.as_ref(), row) == RuleAction::Include {
                if snapshot
                    .row_level(row)
                    .is_some_and(|level| level.is_error())
                {
                    self.error_count += 1;
                }
                self.visible_rows.push(row);
            }
        }

        self.scanned_rows = snapshot.row_count();
        self.last_table_generation = Some(snapshot.generation_id());
        self.last_rule_generation = Some(rules.generation_id());
        self.table = snapshot;

        rebuild
    }

    /// Read-only view at the current state; reissued every frame.
    pub fn snapshot(&mut self) -> FilteredSnapshot {
        FilteredSnapshot {
            table: self.table.clone(),
            visible_rows: self.visible_rows.snapshot(),
            error_count: self.error_count,
        }
    }
}

impl Default for FilteredViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Order-preserving subsequence of a full table snapshot. Filtered row
/// indices translate to full-table indices and delegate, so this is itself
/// a `TableSnapshot` over the visible rows.
#[derive(Clone)]
pub struct FilteredSnapshot {
    table: Arc<dyn TableSnapshot>,
    visible_rows: ListSnapshot<usize>,
    error_count: usize,
}

impl FilteredSnapshot {
    /// Translates a filtered index to its full-table row index.
    pub fn full_row_index(&self, filtered_row: usize) -> Option<usize> {
        self.visible_rows.get(filtered_row).copied()
    }

    /// Rows with Error or Fatal level among the visible rows.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn unfiltered_row_count(&self) -> usize {
        self.table.row_count()
    }
}

impl TableSnapshot for FilteredSnapshot {
    fn schema(&self) -> &TableSchema {
        self.table.schema()
    }

    fn row_count(&self) -> usize {
        self.visible_rows.len()
    }

    fn generation_id(&self) -> u64 {
        self.table.generation_id()
    }

    fn column_string(&self, row: usize, column: &Column) -> Option<Cow<'_, str>> {
        self.full_row_index(row)
            .and_then(|full| self.table.column_string(full, column))
    }

    fn column_name_for_id(&self, row: usize, column: &Column) -> Option<Cow<'_, str>> {
        self.full_row_index(row)
            .and_then(|full| self.table.column_name_for_id(full, column))
    }

    fn column_int(&self, row: usize, column: &Column) -> Option<i64> {
        self.full_row_index(row)
            .and_then(|full| self.table.column_int(full, column))
    }

    fn column_timestamp(&self, row: usize, column: &Column) -> Option<DateTime<Utc>> {
        self.full_row_index(row)
            .and_then(|full| self.table.column_timestamp(full, column))
    }

    fn column_level(&self, row: usize, column: &Column) -> Option<UnifiedLevel> {
        self.full_row_index(row)
            .and_then(|full| self.table.column_level(full, column))
    }

    fn column_opcode(&self, row: usize, column: &Column) -> UnifiedOpcode {
        self.full_row_index(row)
            .map(|full| self.table.column_opcode(full, column))
            .unwrap_or(UnifiedOpcode::None)
    }
}
