//! Typed column descriptors and table schemas.
//!
//! Columns are identity objects: two columns are equal only if they are the
//! same descriptor, never because their names happen to collide. A schema is
//! an ordered list of columns (display order) plus optional pointers to the
//! columns playing well-known roles (timestamp, level, pid, ...), which is
//! what lets the query language pick a typed grammar per column.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w]").expect("valid non-word regex"));

/// A unified severity all trace sources map onto, used for colorization and
/// ordinal level comparisons. The derived `Ord` is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum UnifiedLevel {
    Verbose,
    Info,
    Warning,
    Error,
    Fatal,
}

impl UnifiedLevel {
    /// All levels, most severe first (the order suggestions are shown in).
    pub const ALL_DESCENDING: [UnifiedLevel; 5] = [
        UnifiedLevel::Fatal,
        UnifiedLevel::Error,
        UnifiedLevel::Warning,
        UnifiedLevel::Info,
        UnifiedLevel::Verbose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnifiedLevel::Verbose => "Verbose",
            UnifiedLevel::Info => "Info",
            UnifiedLevel::Warning => "Warning",
            UnifiedLevel::Error => "Error",
            UnifiedLevel::Fatal => "Fatal",
        }
    }

    /// True for the severities surfaced in the filtered view's error count.
    pub fn is_error(&self) -> bool {
        matches!(self, UnifiedLevel::Error | UnifiedLevel::Fatal)
    }
}

impl fmt::Display for UnifiedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnifiedLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnifiedLevel::ALL_DESCENDING
            .iter()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or(())
    }
}

/// Start/stop marker some sources attach to rows (scope tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum UnifiedOpcode {
    #[default]
    None,
    Start,
    Stop,
}

#[derive(Debug)]
struct ColumnInfo {
    name: String,
    /// Width hint in font-height units; `None` means stretch.
    width_hint: Option<f32>,
}

/// A column descriptor with identity semantics: cloning shares the identity,
/// and equality is pointer equality so same-named columns from different
/// sources never compare equal.
#[derive(Debug, Clone)]
pub struct Column(Arc<ColumnInfo>);

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column(Arc::new(ColumnInfo {
            name: name.into(),
            width_hint: None,
        }))
    }

    pub fn with_width_hint(name: impl Into<String>, width_hint: f32) -> Self {
        Column(Arc::new(ColumnInfo {
            name: name.into(),
            width_hint: Some(width_hint),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn width_hint(&self) -> Option<f32> {
        self.0.width_hint
    }

    /// The `@`-prefixed name the query language resolves this column by.
    /// Names may contain spaces and punctuation that would make parsing
    /// ambiguous, so everything except word characters is stripped.
    pub fn variable_name(&self) -> String {
        format!("@{}", NON_WORD_RE.replace_all(&self.0.name, ""))
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Column {}

impl std::hash::Hash for Column {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// An ordered list of columns plus optional well-known role pointers. Each
/// role pointer, when set, must reference a member of `columns` and must be
/// readable through the matching typed accessor on the table snapshot.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub timestamp_column: Option<Column>,
    pub unified_level_column: Option<Column>,
    pub unified_opcode_column: Option<Column>,
    pub process_id_column: Option<Column>,
    pub thread_id_column: Option<Column>,
    pub provider_column: Option<Column>,
    pub name_column: Option<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        TableSchema {
            columns,
            ..TableSchema::default()
        }
    }

    fn is_role(role: &Option<Column>, column: &Column) -> bool {
        role.as_ref().is_some_and(|c| c == column)
    }

    pub fn is_timestamp(&self, column: &Column) -> bool {
        Self::is_role(&self.timestamp_column, column)
    }

    pub fn is_unified_level(&self, column: &Column) -> bool {
        Self::is_role(&self.unified_level_column, column)
    }

    pub fn is_process_or_thread_id(&self, column: &Column) -> bool {
        Self::is_role(&self.process_id_column, column)
            || Self::is_role(&self.thread_id_column, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_identity_equal_only() {
        let a = Column::new("Name");
        let b = Column::new("Name");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_variable_name_strips_non_word_characters() {
        let column = Column::new("@[ Column 2 *] ");
        assert_eq!(column.variable_name(), "@Column2");

        let plain = Column::new("Process Id");
        assert_eq!(plain.variable_name(), "@ProcessId");
    }

    #[test]
    fn test_level_ordering_is_severity_ascending() {
        assert!(UnifiedLevel::Verbose < UnifiedLevel::Info);
        assert!(UnifiedLevel::Warning < UnifiedLevel::Error);
        assert!(UnifiedLevel::Error < UnifiedLevel::Fatal);
    }

    #[test]
    fn test_level_from_str_is_case_insensitive() {
        assert_eq!("error".parse::<UnifiedLevel>(), Ok(UnifiedLevel::Error));
        assert_eq!("WARNING".parse::<UnifiedLevel>(), Ok(UnifiedLevel::Warning));
        assert!("nope".parse::<UnifiedLevel>().is_err());
    }

    #[test]
    fn test_role_pointer_checks() {
        let pid = Column::new("Pid");
        let msg = Column::new("Message");
        let schema = TableSchema {
            columns: vec![pid.clone(), msg.clone()],
            process_id_column: Some(pid.clone()),
            ..TableSchema::default()
        };
        assert!(schema.is_process_or_thread_id(&pid));
        assert!(!schema.is_process_or_thread_id(&msg));
    }
}
