//! Recursive-descent parser for row selector queries.
//!
//! The parser is speculative and never fails with an error path the caller
//! has to unwind: malformed input produces a `ParseOutcome` with no predicate
//! and a diagnostic instead. Every token candidate the parser probes is
//! recorded, whether it matched or not, so a failed parse carries the full
//! set of valid continuations at the stall point — exactly what an
//! as-you-type suggestion popup needs.
//!
//! On success the returned predicate is bound directly to column descriptors
//! and compiled comparison closures; evaluating it per row involves no
//! re-parsing and no lookup by column name.

use super::compare::{self, CompareOp, RowPredicate, StringAccessor};
use super::error::FilterError;
use super::tokenizer::{self, Token};
use crate::schema::{Column, TableSchema, UnifiedLevel};

/// Result of parsing a query. `predicate` is `Some` only when the whole
/// input parsed; otherwise `expected`, `expected_offset` and `actual_token`
/// describe where progress stalled and what would have been valid there.
#[derive(Clone)]
pub struct ParseOutcome {
    pub predicate: Option<RowPredicate>,
    /// De-duplicated candidates probed at the stall point, in probe order.
    pub expected: Vec<String>,
    /// Byte offset of the token where progress stalled.
    pub expected_offset: usize,
    /// The offending token, or `None` when input ended too early.
    pub actual_token: Option<String>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.predicate.is_some()
    }
}

impl std::fmt::Debug for ParseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOutcome")
            .field("predicate", &self.predicate.is_some())
            .field("expected", &self.expected)
            .field("expected_offset", &self.expected_offset)
            .field("actual_token", &self.actual_token)
            .finish()
    }
}

#[derive(Clone)]
struct ParserState<'t, 'a> {
    tokens: &'t [Token<'a>],
    cursor: usize,
    expected: Vec<String>,
    expected_offset: usize,
}

impl<'t, 'a> ParserState<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        ParserState {
            tokens,
            cursor: 0,
            expected: Vec::new(),
            expected_offset: tokens[0].start,
        }
    }

    fn current(&self) -> Token<'a> {
        self.tokens[self.cursor]
    }

    fn is_eof(&self) -> bool {
        self.current().is_eof()
    }

    /// Tests the current token against a candidate and unconditionally
    /// records the candidate, so the caller ends up with the complete
    /// valid-continuation set rather than just the first successful branch.
    fn matches(&mut self, candidate: &str) -> bool {
        self.expected.push(candidate.to_string());
        !self.is_eof() && self.current().text.eq_ignore_ascii_case(candidate)
    }

    /// Records a placeholder (e.g. `"[integer]"`) describing what belongs at
    /// the current position, without testing anything.
    fn expect_hint(&mut self, hint: &str) {
        self.expected.push(hint.to_string());
    }

    /// Moving past a token means it was valid, so the expected set restarts
    /// for the new position. Never advances past the EOF token.
    fn advance(&mut self) {
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        self.expected.clear();
        self.expected_offset = self.current().start;
    }
}

/// Parses selector queries against one schema. Stateless between calls, so
/// one parser can serve every rule of a viewer.
pub struct SelectorParser<'s> {
    schema: &'s TableSchema,
}

impl<'s> SelectorParser<'s> {
    pub fn new(schema: &'s TableSchema) -> Self {
        SelectorParser { schema }
    }

    /// Parses the query text. `Err` only for tokenizer-level failures
    /// (unterminated string literal); grammar failures are reported inside
    /// the `ParseOutcome` and never as an error.
    pub fn parse(&self, text: &str) -> Result<ParseOutcome, FilterError> {
        let tokens = tokenizer::tokenize(text)?;
        let mut state = ParserState::new(&tokens);
        let predicate = self.parse_expression(&mut state, false);

        let mut seen = std::collections::HashSet::new();
        let expected = state
            .expected
            .iter()
            .filter(|candidate| seen.insert(candidate.to_lowercase()))
            .cloned()
            .collect();

        Ok(ParseOutcome {
            predicate,
            expected,
            expected_offset: state.expected_offset,
            actual_token: (!state.is_eof()).then(|| state.current().text.to_string()),
        })
    }

    /// Expression := Term ( "and" Term | "or" Expression )*
    ///
    /// "and" binds tighter than "or": an "and" joins just the next term,
    /// while an "or" swallows everything to its right as one expression.
    fn parse_expression(
        &self,
        state: &mut ParserState,
        close_paren_expected: bool,
    ) -> Option<RowPredicate> {
        let mut left = self.parse_term(state)?;

        loop {
            if close_paren_expected && state.matches(")") {
                // Do not consume the ')': several levels of expression
                // parsing may need to observe it to pop back to the term
                // that consumed the '('.
                break;
            } else if state.matches("and") {
                state.advance();
                let right = self.parse_term(state)?;
                left = compare::and(left, right);
            } else if state.matches("or") {
                state.advance();
                let right = self.parse_expression(state, close_paren_expected)?;
                left = compare::or(left, right);
            } else if state.is_eof() {
                // Checked after the token probes above so the expected set
                // is fully populated at end of input.
                break;
            } else {
                return None; // Unexpected token.
            }
        }

        Some(left)
    }

    /// Term := "(" Expression ")" | "not" Term | Predicate
    fn parse_term(&self, state: &mut ParserState) -> Option<RowPredicate> {
        if state.matches("(") {
            state.advance();
            let inner = self.parse_expression(state, true)?;
            if !state.matches(")") {
                return None;
            }
            state.advance();
            Some(inner)
        } else if state.matches("not") {
            state.advance();
            Some(compare::not(self.parse_term(state)?))
        } else {
            self.parse_predicate(state)
        }
    }

    /// Predicate := <column-variable> <type-specific grammar>
    fn parse_predicate(&self, state: &mut ParserState) -> Option<RowPredicate> {
        // Probe every column rather than doing a map lookup so each column
        // variable lands in the expected set.
        let mut matched: Option<Column> = None;
        for column in &self.schema.columns {
            if state.matches(&column.variable_name()) && matched.is_none() {
                matched = Some(column.clone());
            }
        }

        let column = matched?;
        state.advance();

        if self.schema.is_unified_level(&column) {
            self.parse_level_predicate(state, column)
        } else if self.schema.is_timestamp(&column) {
            self.parse_timestamp_predicate(state, column)
        } else if self.schema.is_process_or_thread_id(&column) {
            self.parse_id_predicate(state, column)
        } else {
            self.parse_string_predicate(state, StringAccessor::Display(column))
        }
    }

    fn parse_string_predicate(
        &self,
        state: &mut ParserState,
        accessor: StringAccessor,
    ) -> Option<RowPredicate> {
        // "equals"/"equals_cs" are kept as word aliases of the superseded
        // grammar so stored queries from older versions keep parsing.
        if state.matches("==") || state.matches("equals_cs") {
            state.advance();
            let value = read_string_literal(state)?;
            state.advance();
            Some(compare::string_equals(accessor, value, true, false))
        } else if state.matches("!=") {
            state.advance();
            let value = read_string_literal(state)?;
            state.advance();
            Some(compare::string_equals(accessor, value, true, true))
        } else if state.matches("=~") || state.matches("equals") {
            state.advance();
            let value = read_string_literal(state)?;
            state.advance();
            Some(compare::string_equals(accessor, value, false, false))
        } else if state.matches("!~") {
            state.advance();
            let value = read_string_literal(state)?;
            state.advance();
            Some(compare::string_equals(accessor, value, false, true))
        } else if state.matches("contains") || state.matches("contains_cs") {
            let case_sensitive = is_cs_operator(state);
            state.advance();
            let value = read_string_literal(state)?;
            state.advance();
            Some(compare::string_contains(accessor, value, case_sensitive))
        } else if state.matches("matches") || state.matches("matches_cs") {
            let case_sensitive = is_cs_operator(state);
            state.advance();
            // Optional modifier switching from wildcard to raw regex.
            let raw = state.matches("regex");
            if raw {
                state.advance();
            }
            let value = read_string_literal(state)?;
            let regex = if raw {
                compare::raw_regex(&value, case_sensitive).ok()?
            } else {
                compare::wildcard_regex(&value, case_sensitive).ok()?
            };
            state.advance();
            Some(compare::string_matches(accessor, regex))
        } else if state.matches("in") || state.matches("in_cs") {
            let case_sensitive = is_cs_operator(state);
            state.advance();
            let values = read_list(state, read_string_literal)?;
            Some(compare::string_in(accessor, values, case_sensitive))
        } else {
            None // Unexpected token or end of input.
        }
    }

    fn parse_level_predicate(
        &self,
        state: &mut ParserState,
        column: Column,
    ) -> Option<RowPredicate> {
        if state.matches("in") {
            state.advance();
            let levels = read_list(state, read_level)?;
            Some(compare::level_in(column, levels))
        } else {
            let op = read_compare_op(state)?;
            state.advance();
            let level = read_level(state)?;
            state.advance();
            Some(compare::level_compare(column, level, op))
        }
    }

    fn parse_timestamp_predicate(
        &self,
        state: &mut ParserState,
        column: Column,
    ) -> Option<RowPredicate> {
        let op = read_compare_op(state)?;
        state.advance();
        let literal = read_string_literal(state)?;
        // An unparseable timestamp literal is a parse failure, not a
        // predicate that silently matches nothing.
        let Some(timestamp) = compare::parse_timestamp(&literal) else {
            state.expect_hint("\"[timestamp]\"");
            return None;
        };
        state.advance();
        Some(compare::time_compare(column, timestamp, op))
    }

    /// Process/thread id columns accept two grammars: integer identity tests
    /// over the raw id, or the whole string grammar over the resolved
    /// display name. Both run on independent state copies; if both fail, the
    /// one that consumed more tokens wins, and ties union their suggestions.
    fn parse_id_predicate(&self, state: &mut ParserState, column: Column) -> Option<RowPredicate> {
        let mut int_state = state.clone();
        let int_predicate = self.parse_int_predicate(&mut int_state, column.clone());
        if int_predicate.is_some() {
            *state = int_state;
            return int_predicate;
        }

        let mut name_state = state.clone();
        let name_predicate =
            self.parse_string_predicate(&mut name_state, StringAccessor::NameForId(column));
        if name_predicate.is_some() {
            *state = name_state;
            return name_predicate;
        }

        if int_state.cursor > name_state.cursor {
            *state = int_state;
        } else if name_state.cursor > int_state.cursor {
            *state = name_state;
        } else {
            int_state.expected.append(&mut name_state.expected);
            *state = int_state;
        }
        None
    }

    fn parse_int_predicate(&self, state: &mut ParserState, column: Column) -> Option<RowPredicate> {
        // Ids are opaque identifiers: equality and membership only.
        if state.matches("==") {
            state.advance();
            let value = read_int(state)?;
            state.advance();
            Some(compare::int_compare(column, value, false))
        } else if state.matches("!=") {
            state.advance();
            let value = read_int(state)?;
            state.advance();
            Some(compare::int_compare(column, value, true))
        } else if state.matches("in") {
            state.advance();
            let values = read_list(state, read_int)?;
            Some(compare::int_in(column, values))
        } else {
            None
        }
    }
}

// True when the operator under the cursor is a case-sensitive variant.
// Only meaningful right after a successful operator probe.
fn is_cs_operator(state: &ParserState) -> bool {
    state
        .current()
        .text
        .to_ascii_lowercase()
        .ends_with("_cs")
}

fn read_compare_op(state: &mut ParserState) -> Option<CompareOp> {
    const OPS: [(&str, CompareOp); 6] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<", CompareOp::Lt),
        ("<=", CompareOp::Le),
        (">", CompareOp::Gt),
        (">=", CompareOp::Ge),
    ];

    let mut matched = None;
    for (text, op) in OPS {
        if state.matches(text) && matched.is_none() {
            matched = Some(op);
        }
    }
    matched
}

/// Validates that the current token is a quoted string literal and
/// unescapes it. Does not advance; the caller does that after binding.
fn read_string_literal(state: &mut ParserState) -> Option<String> {
    if state.is_eof() || !state.current().text.starts_with('"') {
        state.expect_hint("\""); // suggest an opening quote
        return None;
    }
    // The tokenizer only emits complete quoted literals.
    Some(tokenizer::unescape_string_literal(state.current().text))
}

/// Reads a level name in severity-descending probe order so suggestions are
/// listed most severe first. All names are probed so all land in the
/// expected set. Does not advance.
fn read_level(state: &mut ParserState) -> Option<UnifiedLevel> {
    let mut matched = None;
    for level in UnifiedLevel::ALL_DESCENDING {
        if state.matches(level.name()) && matched.is_none() {
            matched = Some(level);
        }
    }
    matched
}

fn read_int(state: &mut ParserState) -> Option<i64> {
    state.expect_hint("[integer]");
    if state.is_eof() {
        return None;
    }
    state.current().text.parse().ok()
}

/// Reads a bracketed, comma-separated list where `read_item` parses one
/// element (without advancing). Consumes through the closing bracket.
fn read_list<T>(
    state: &mut ParserState,
    read_item: fn(&mut ParserState) -> Option<T>,
) -> Option<Vec<T>> {
    if !state.matches("[") {
        return None;
    }
    state.advance();

    let mut items = Vec::new();
    loop {
        if state.matches("]") {
            state.advance();
            break;
        }
        if !items.is_empty() {
            if !state.matches(",") {
                return None;
            }
            state.advance();
        }
        items.push(read_item(state)?);
        state.advance();
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;

    fn schema() -> TableSchema {
        TableSchema::new(vec![Column::new("Column1"), Column::new("Column2")])
    }

    #[test]
    fn test_expected_tokens_at_start() {
        let schema = schema();
        let parser = SelectorParser::new(&schema);
        let outcome = parser.parse("nonsense").expect("tokenizes");

        assert!(outcome.predicate.is_none());
        assert_eq!(outcome.expected_offset, 0);
        assert_eq!(outcome.actual_token.as_deref(), Some("nonsense"));
        for candidate in ["(", "not", "@Column1", "@Column2"] {
            assert!(
                outcome.expected.iter().any(|t| t == candidate),
                "missing {candidate} in {:?}",
                outcome.expected
            );
        }
    }

    #[test]
    fn test_expected_tokens_are_deduplicated() {
        let schema = schema();
        let parser = SelectorParser::new(&schema);
        let outcome = parser.parse("").expect("tokenizes");

        let mut sorted = outcome.expected.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), outcome.expected.len());
        assert!(outcome.actual_token.is_none());
    }

    #[test]
    fn test_unterminated_literal_is_tokenizer_error() {
        let schema = schema();
        let parser = SelectorParser::new(&schema);
        let result = parser.parse("@Column1 == \"oops");
        assert!(matches!(
            result,
            Err(FilterError::UnterminatedStringLiteral { start: 12 })
        ));
    }
}
