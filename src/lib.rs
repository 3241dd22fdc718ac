pub mod cli;
pub mod filter;
pub mod schema;
pub mod store;
pub mod table;
pub mod textlog;

pub use cli::{Cli, OutputFormat, cli_parse};
pub use filter::{
    FilterError, FilteredSnapshot, FilteredViewBuilder, ParseOutcome, RuleAction, SelectorParser,
    ViewerRules,
};
pub use schema::{Column, TableSchema, UnifiedLevel, UnifiedOpcode};
pub use table::{CellValue, Record, RecordTable, TableSnapshot};
pub use textlog::load_text_log;

use anyhow::{Result, bail};
use colored::Colorize;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use std::borrow::Cow;
use std::sync::Arc;

pub fn run() -> Result<()> {
    run_with(&cli_parse())
}

pub fn run_with(cli: &Cli) -> Result<()> {
    let table = load_text_log(&cli.file)?;
    let snapshot: Arc<dyn TableSnapshot> = Arc::new(table.snapshot());

    validate_queries(snapshot.schema(), cli)?;

    let mut rules = ViewerRules::new();
    for query in &cli.exclude {
        rules.add_exclude(query.clone());
    }
    for query in &cli.include {
        rules.add_include(query.clone());
    }

    let mut builder = FilteredViewBuilder::new();
    builder.update(&mut rules, Arc::clone(&snapshot));
    let view = builder.snapshot();

    if cli.count {
        println!("{}", view.row_count());
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => print_text(&view),
        OutputFormat::Table => print_table(&view),
        OutputFormat::Json => return print_json(&view),
    }

    if !cli.quiet {
        let errors = if view.error_count() > 0 {
            format!("{} errors", view.error_count()).red().to_string()
        } else {
            "0 errors".to_string()
        };
        eprintln!(
            "{} of {} rows shown, {}",
            view.row_count(),
            view.unfiltered_row_count(),
            errors
        );
    }

    Ok(())
}

/// Parses every query up front so a typo is reported with a caret and the
/// candidate tokens instead of silently matching nothing.
fn validate_queries(schema: &TableSchema, cli: &Cli) -> Result<()> {
    let parser = SelectorParser::new(schema);
    let mut failed = false;

    for query in cli.exclude.iter().chain(cli.include.iter()) {
        match parser.parse(query) {
            Ok(outcome) if outcome.is_ok() => {}
            Ok(outcome) => {
                report_parse_failure(query, &outcome);
                failed = true;
            }
            Err(FilterError::UnterminatedStringLiteral { start }) => {
                eprintln!("{} {}", "invalid query:".red().bold(), query);
                eprintln!("  unterminated string literal starting at offset {start}");
                failed = true;
            }
        }
    }

    if failed {
        bail!("one or more queries failed to parse");
    }
    Ok(())
}

fn report_parse_failure(query: &str, outcome: &ParseOutcome) {
    eprintln!("{}", "invalid query:".red().bold());
    eprintln!("  {query}");
    eprintln!(
        "  {}{}",
        " ".repeat(outcome.expected_offset),
        "^".yellow().bold()
    );

    let actual = outcome
        .actual_token
        .as_deref()
        .unwrap_or("end of input")
        .to_string();
    eprintln!(
        "  got {}, expected one of: {}",
        actual.yellow(),
        outcome.expected.join(", ")
    );
}

fn print_text(view: &FilteredSnapshot) {
    for row in 0..view.row_count() {
        let mut parts = Vec::new();
        for column in &view.schema().columns {
            if let Some(value) = view.column_string(row, column) {
                parts.push(value.into_owned());
            }
        }
        let line = parts.join(" ");
        let line = match view.row_level(row) {
            Some(level) if level.is_error() => line.red().to_string(),
            Some(UnifiedLevel::Warning) => line.yellow().to_string(),
            Some(UnifiedLevel::Verbose) => line.dimmed().to_string(),
            _ => line,
        };
        println!("{line}");
    }
}

fn print_table(view: &FilteredSnapshot) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(view.schema().columns.iter().map(|c| Cell::new(c.name())));

    for row in 0..view.row_count() {
        let cells: Vec<String> = view
            .schema()
            .columns
            .iter()
            .map(|column| {
                view.column_string(row, column)
                    .map_or_else(String::new, Cow::into_owned)
            })
            .collect();
        table.add_row(cells);
    }

    println!("{table}");
}

fn print_json(view: &FilteredSnapshot) -> Result<()> {
    let mut rows = Vec::with_capacity(view.row_count());
    for row in 0..view.row_count() {
        let mut object = serde_json::Map::new();
        for column in &view.schema().columns {
            let value = view
                .column_string(row, column)
                .map_or(serde_json::Value::Null, |s| {
                    serde_json::Value::String(s.into_owned())
                });
            object.insert(column.name().to_string(), value);
        }
        rows.push(serde_json::Value::Object(object));
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
