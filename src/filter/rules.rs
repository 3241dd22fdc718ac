//! Ordered include/exclude rules driving the filtered view.
//!
//! Evaluation walks the rules in order and the first rule whose predicate
//! matches decides the row. The default for unmatched rows is Include, but
//! flips to Exclude as soon as the rule set contains any active Include
//! rule: once the user expresses a positive selection, everything they did
//! not select is hidden.

use super::compare::RowPredicate;
use super::parser::SelectorParser;
use crate::table::TableSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleAction {
    Include,
    Exclude,
}

#[derive(Clone)]
pub struct Rule {
    query: String,
    action: RuleAction,
    enabled: bool,
    /// Compiled lazily against the current schema; `None` until compiled or
    /// when the query does not parse (such rules are skipped).
    predicate: Option<RowPredicate>,
}

impl Rule {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn action(&self) -> RuleAction {
        self.action
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("query", &self.query)
            .field("action", &self.action)
            .field("enabled", &self.enabled)
            .field("compiled", &self.predicate.is_some())
            .finish()
    }
}

/// The rule list of one viewer. Any mutation bumps the generation id, which
/// tells dependent filtered views to rebuild from scratch.
#[derive(Debug, Clone, Default)]
pub struct ViewerRules {
    rules: Vec<Rule>,
    generation: u64,
    compiled_rule_generation: Option<u64>,
    compiled_table_generation: Option<u64>,
}

impl ViewerRules {
    pub fn new() -> Self {
        ViewerRules {
            generation: 1,
            ..ViewerRules::default()
        }
    }

    pub fn generation_id(&self) -> u64 {
        self.generation
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Include rules go last so anything already excluded stays excluded.
    pub fn add_include(&mut self, query: impl Into<String>) {
        self.rules.push(Rule {
            query: query.into(),
            action: RuleAction::Include,
            enabled: true,
            predicate: None,
        });
        self.bump();
    }

    /// Exclude rules go first so they trump preexisting include rules.
    pub fn add_exclude(&mut self, query: impl Into<String>) {
        self.rules.insert(
            0,
            Rule {
                query: query.into(),
                action: RuleAction::Exclude,
                enabled: true,
                predicate: None,
            },
        );
        self.bump();
    }

    pub fn update(&mut self, index: usize, query: impl Into<String>) {
        let rule = &mut self.rules[index];
        rule.query = query.into();
        rule.predicate = None;
        self.bump();
    }

    pub fn remove(&mut self, index: usize) {
        self.rules.remove(index);
        self.bump();
    }

    pub fn move_rule(&mut self, index: usize, new_index: usize) {
        let rule = self.rules.remove(index);
        self.rules.insert(new_index, rule);
        self.bump();
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        self.rules[index].enabled = enabled;
        self.bump();
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.bump();
    }

    /// Recompiles the rule predicates when either the rule list or the table
    /// (and thus possibly its schema) changed since the last compilation.
    pub fn ensure_compiled(&mut self, snapshot: &dyn TableSnapshot) {
        if self.compiled_rule_generation == Some(self.generation)
            && self.compiled_table_generation == Some(snapshot.generation_id())
        {
            return;
        }

        let parser = SelectorParser::new(snapshot.schema());
        for rule in &mut self.rules {
            rule.predicate = parser
                .parse(&rule.query)
                .ok()
                .and_then(|outcome| outcome.predicate);
        }

        self.compiled_rule_generation = Some(self.generation);
        self.compiled_table_generation = Some(snapshot.generation_id());
    }

    /// Action for one row: first matching rule wins. Rules that are disabled
    /// or failed to compile are skipped. Call `ensure_compiled` first.
    pub fn evaluate(&self, snapshot: &dyn TableSnapshot, row: usize) -> RuleAction {
        let mut default_action = RuleAction::Include;
        for rule in &self.rules {
            let Some(predicate) = &rule.predicate else {
                continue;
            };
            if !rule.enabled {
                continue;
            }
            if predicate(snapshot, row) {
                return rule.action;
            }
            if rule.action == RuleAction::Include {
                default_action = RuleAction::Exclude;
            }
        }
        default_action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TableSchema};
    use crate::table::{CellValue, Record, RecordTable};

    fn table_with_rows(values: &[&str]) -> RecordTable {
        let column = Column::new("Message");
        let table = RecordTable::new(TableSchema::new(vec![column]));
        for value in values {
            table.append(Record::new(vec![CellValue::Str(value.to_string())]));
        }
        table
    }

    #[test]
    fn test_generation_bumps_on_every_edit() {
        let mut rules = ViewerRules::new();
        let mut last = rules.generation_id();

        rules.add_include("@Message == \"a\"");
        assert!(rules.generation_id() > last);
        last = rules.generation_id();

        rules.add_exclude("@Message == \"b\"");
        assert!(rules.generation_id() > last);
        last = rules.generation_id();

        rules.set_enabled(0, false);
        assert!(rules.generation_id() > last);
        last = rules.generation_id();

        rules.move_rule(0, 1);
        assert!(rules.generation_id() > last);
        last = rules.generation_id();

        rules.remove(0);
        assert!(rules.generation_id() > last);
        last = rules.generation_id();

        rules.clear();
        assert!(rules.generation_id() > last);
    }

    #[test]
    fn test_exclude_rules_are_inserted_first() {
        let mut rules = ViewerRules::new();
        rules.add_include("@Message == \"a\"");
        rules.add_exclude("@Message == \"b\"");

        assert_eq!(rules.rules()[0].action(), RuleAction::Exclude);
        assert_eq!(rules.rules()[1].action(), RuleAction::Include);
    }

    #[test]
    fn test_only_excludes_default_to_include() {
        let table = table_with_rows(&["spam", "keep me"]);
        let snapshot = table.snapshot();

        let mut rules = ViewerRules::new();
        rules.add_exclude("@Message contains \"spam\"");
        rules.ensure_compiled(&snapshot);

        assert_eq!(rules.evaluate(&snapshot, 0), RuleAction::Exclude);
        assert_eq!(rules.evaluate(&snapshot, 1), RuleAction::Include);
    }

    #[test]
    fn test_any_include_rule_flips_default_to_exclude() {
        let table = table_with_rows(&["interesting", "noise"]);
        let snapshot = table.snapshot();

        let mut rules = ViewerRules::new();
        rules.add_include("@Message contains \"interesting\"");
        rules.ensure_compiled(&snapshot);

        assert_eq!(rules.evaluate(&snapshot, 0), RuleAction::Include);
        assert_eq!(rules.evaluate(&snapshot, 1), RuleAction::Exclude);
    }

    #[test]
    fn test_disabled_rules_do_not_evaluate_or_flip_default() {
        let table = table_with_rows(&["noise"]);
        let snapshot = table.snapshot();

        let mut rules = ViewerRules::new();
        rules.add_include("@Message contains \"interesting\"");
        rules.set_enabled(0, false);
        rules.ensure_compiled(&snapshot);

        assert_eq!(rules.evaluate(&snapshot, 0), RuleAction::Include);
    }

    #[test]
    fn test_unparseable_rules_are_skipped() {
        let table = table_with_rows(&["anything"]);
        let snapshot = table.snapshot();

        let mut rules = ViewerRules::new();
        rules.add_exclude("@Message equals noquote");
        rules.ensure_compiled(&snapshot);

        assert_eq!(rules.evaluate(&snapshot, 0), RuleAction::Include);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let table = table_with_rows(&["both match"]);
        let snapshot = table.snapshot();

        let mut rules = ViewerRules::new();
        rules.add_include("@Message contains \"match\"");
        rules.add_exclude("@Message contains \"both\"");
        rules.ensure_compiled(&snapshot);

        // The exclude rule was inserted ahead of the include rule.
        assert_eq!(rules.evaluate(&snapshot, 0), RuleAction::Exclude);
    }
}
