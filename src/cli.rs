use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// A tool to filter log files with typed column queries
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log file to filter
    pub file: PathBuf,

    /// Keep rows matching this query (repeatable, e.g. '@Level >= warning')
    #[arg(short = 'i', long = "include")]
    pub include: Vec<String>,

    /// Drop rows matching this query (repeatable, checked before includes)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print only the number of matching rows
    #[arg(short, long)]
    pub count: bool,

    /// Suppress the trailing summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Matching lines, colorized by level
    Text,
    /// Bordered table with one row per match
    Table,
    /// JSON array of matching rows
    Json,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
