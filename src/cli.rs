use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{connector::DatabaseType, loader::IfExists};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Profile spreadsheet exports, map them onto a typed schema, and load them into a database",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize a file's columns and suggest a target type for each
    Profile(ProfileArgs),
    /// Show detailed statistics for one column
    Stats(StatsArgs),
    /// List the target types a column can be mapped to
    DataTypes(DataTypesArgs),
    /// Write a starter load plan from profiler suggestions
    Plan(PlanArgs),
    /// Transform a file with a load plan and write it to the destination table
    Load(LoadArgs),
    /// Check that a destination database can be reached
    TestConnection(TestConnectionArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV/TSV file
    #[arg(short, long)]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8, then windows-1252)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Column to describe
    #[arg(short = 'C', long)]
    pub column: String,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DataTypesArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// SQLite database file the plan should target
    #[arg(short, long)]
    pub database: String,
    /// Destination table name (defaults to the snake-cased file name)
    #[arg(short, long)]
    pub table: Option<String>,
    /// Where to write the plan YAML (prints to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Load plan YAML describing the destination and column mappings
    #[arg(short, long)]
    pub plan: PathBuf,
    /// Override the plan's destination table
    #[arg(short, long)]
    pub table: Option<String>,
    /// Override the plan's policy for an existing table
    #[arg(long, value_enum)]
    pub if_exists: Option<IfExists>,
    /// Override the plan's insert batch size (1-10000)
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Override the plan's database (file path for sqlite)
    #[arg(short, long)]
    pub database: Option<String>,
    /// Print the transformation report before loading
    #[arg(long)]
    pub report: bool,
}

#[derive(Debug, Args)]
pub struct TestConnectionArgs {
    /// Destination engine
    #[arg(long, value_enum, default_value_t = DatabaseType::Sqlite)]
    pub db_type: DatabaseType,
    /// Database name, or file path for sqlite
    #[arg(short, long)]
    pub database: String,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
