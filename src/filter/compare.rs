//! Builders for the compiled column tests the parser emits.
//!
//! Everything here is bound at parse time: columns are captured by identity,
//! regexes are compiled once, `in` lists become hash sets. Evaluating a
//! predicate over a row does no name lookups and never panics on missing
//! cells.

use crate::schema::{Column, UnifiedLevel};
use crate::table::TableSnapshot;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

/// A compiled row selector: a boolean function of (snapshot, row index).
pub type RowPredicate = Arc<dyn Fn(&dyn TableSnapshot, usize) -> bool + Send + Sync>;

/// How a string predicate reads its column: the display string, or the
/// resolved friendly name of an integer-identifier column (so a process id
/// column can be matched by process name).
#[derive(Clone)]
pub enum StringAccessor {
    Display(Column),
    NameForId(Column),
}

impl StringAccessor {
    fn get<'a>(&self, snapshot: &'a dyn TableSnapshot, row: usize) -> Option<Cow<'a, str>> {
        match self {
            StringAccessor::Display(column) => snapshot.column_string(row, column),
            StringAccessor::NameForId(column) => snapshot.column_name_for_id(row, column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn eval<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
        }
    }
}

pub fn and(left: RowPredicate, right: RowPredicate) -> RowPredicate {
    Arc::new(move |snapshot, row| left(snapshot, row) && right(snapshot, row))
}

pub fn or(left: RowPredicate, right: RowPredicate) -> RowPredicate {
    Arc::new(move |snapshot, row| left(snapshot, row) || right(snapshot, row))
}

pub fn not(inner: RowPredicate) -> RowPredicate {
    Arc::new(move |snapshot, row| !inner(snapshot, row))
}

/// String equality. A missing cell never equals a literal, so `negate`
/// (the `!=`/`!~` forms) matches missing cells.
pub fn string_equals(
    accessor: StringAccessor,
    literal: String,
    case_sensitive: bool,
    negate: bool,
) -> RowPredicate {
    Arc::new(move |snapshot, row| {
        let equal = accessor.get(snapshot, row).is_some_and(|value| {
            if case_sensitive {
                value == literal
            } else {
                unicode_eq_ignore_case(&value, &literal)
            }
        });
        equal != negate
    })
}

/// Substring test. Missing cells contain nothing.
pub fn string_contains(
    accessor: StringAccessor,
    needle: String,
    case_sensitive: bool,
) -> RowPredicate {
    let folded_needle = if case_sensitive {
        needle
    } else {
        needle.to_lowercase()
    };
    Arc::new(move |snapshot, row| {
        accessor.get(snapshot, row).is_some_and(|value| {
            if case_sensitive {
                value.contains(folded_needle.as_str())
            } else {
                value.to_lowercase().contains(folded_needle.as_str())
            }
        })
    })
}

/// Hash-set membership over string literals.
pub fn string_in(
    accessor: StringAccessor,
    values: Vec<String>,
    case_sensitive: bool,
) -> RowPredicate {
    let set: HashSet<String> = values
        .into_iter()
        .map(|v| if case_sensitive { v } else { v.to_lowercase() })
        .collect();
    Arc::new(move |snapshot, row| {
        accessor.get(snapshot, row).is_some_and(|value| {
            if case_sensitive {
                set.contains(value.as_ref())
            } else {
                set.contains(&value.to_lowercase())
            }
        })
    })
}

/// Match against a regex that was compiled at parse time.
pub fn string_matches(accessor: StringAccessor, regex: Regex) -> RowPredicate {
    Arc::new(move |snapshot, row| {
        accessor
            .get(snapshot, row)
            .is_some_and(|value| regex.is_match(&value))
    })
}

/// Compiles a `*`/`?` wildcard pattern into an anchored regex. Every other
/// regex metacharacter in the pattern is escaped first, so `a.b*` matches
/// a literal dot followed by anything.
pub fn wildcard_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    RegexBuilder::new(&format!("^{escaped}$"))
        .case_insensitive(!case_sensitive)
        .build()
}

/// Compiles a user-supplied raw regular expression.
pub fn raw_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
}

/// Ordinal comparison over the level column's severity ordering. Rows
/// without a level fail every comparison except `!=`.
pub fn level_compare(column: Column, level: UnifiedLevel, op: CompareOp) -> RowPredicate {
    Arc::new(move |snapshot, row| match snapshot.column_level(row, &column) {
        Some(value) => op.eval(value, level),
        None => op == CompareOp::Ne,
    })
}

pub fn level_in(column: Column, levels: Vec<UnifiedLevel>) -> RowPredicate {
    Arc::new(move |snapshot, row| {
        snapshot
            .column_level(row, &column)
            .is_some_and(|value| levels.contains(&value))
    })
}

pub fn time_compare(column: Column, timestamp: DateTime<Utc>, op: CompareOp) -> RowPredicate {
    Arc::new(
        move |snapshot, row| match snapshot.column_timestamp(row, &column) {
            Some(value) => op.eval(value, timestamp),
            None => op == CompareOp::Ne,
        },
    )
}

/// Identifier equality; ids are opaque so only `==`/`!=` exist.
pub fn int_compare(column: Column, value: i64, negate: bool) -> RowPredicate {
    Arc::new(move |snapshot, row| {
        let equal = snapshot.column_int(row, &column) == Some(value);
        equal != negate
    })
}

pub fn int_in(column: Column, values: Vec<i64>) -> RowPredicate {
    let set: HashSet<i64> = values.into_iter().collect();
    Arc::new(move |snapshot, row| {
        snapshot
            .column_int(row, &column)
            .is_some_and(|value| set.contains(&value))
    })
}

fn unicode_eq_ignore_case(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

/// Timestamp literal formats accepted by the query language (and the text
/// log reader): RFC 3339, or a naive date-time treated as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    None
}
