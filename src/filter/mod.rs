//! Row selector queries: parsing, compiled predicates, rules, and the
//! incrementally maintained filtered view.
//!
//! Queries combine per-column predicates with `and`, `or`, `not` and
//! parentheses (`and` binds tighter than `or`). A column is referenced as
//! `@Name`, its schema name stripped of non-word characters, matched
//! case-insensitively.
//!
//! # Operators
//!
//! ```text
//! string columns:
//!   @Col == "x"   / @Col != "x"        case-sensitive equality
//!   @Col =~ "x"   / @Col !~ "x"        case-insensitive equality
//!   @Col contains "x"                  substring (contains_cs: case-sensitive)
//!   @Col matches "a*b?"                wildcard   (matches_cs: case-sensitive)
//!   @Col matches regex "^a.+b$"        raw regular expression
//!   @Col in ["a", "b"]                 membership (in_cs: case-sensitive)
//!
//! level column:
//!   @Level == error      also != < <= > >= over
//!   @Level >= warning    Verbose < Info < Warning < Error < Fatal
//!   @Level in [error, fatal]
//!
//! timestamp column:
//!   @Time >= "2026-01-02T03:04:05Z"    also == != < <= >
//!
//! process/thread id columns:
//!   @Pid == 1234 / @Pid in [1, 2]      by raw id
//!   @Pid contains "loader"             any string operator, by resolved name
//! ```
//!
//! # Examples
//!
//! ```text
//! @Level >= warning and not @Provider contains "Microsoft"
//! @Name matches "Disk*" or @Pid in [4, 1024]
//! (@Msg contains "timeout" or @Msg contains "retry") and @Level == error
//! ```
//!
//! A failed parse never panics or unwinds: it reports the stall offset, the
//! offending token, and every token that would have been valid there.

pub mod compare;
pub mod error;
pub mod parser;
pub mod rules;
pub mod tokenizer;
pub mod view;

pub use compare::RowPredicate;
pub use error::FilterError;
pub use parser::{ParseOutcome, SelectorParser};
pub use rules::{Rule, RuleAction, ViewerRules};
pub use tokenizer::{escape_string_literal, tokenize, unescape_string_literal, Token, EOF_TEXT};
pub use view::{FilteredSnapshot, FilteredViewBuilder};
