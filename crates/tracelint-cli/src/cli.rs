//! CLI argument parsing using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tracelint - database regression detection from test-suite traces
#[derive(Parser, Debug)]
#[command(name = "tracelint")]
#[command(about = "Detect SQL antipattern regressions from trace data", long_about = None)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one run of span data and print the findings
    Analyze {
        /// Span data JSON file (array of span records)
        #[arg(short, long, value_name = "FILE")]
        spans: PathBuf,

        /// Metadata JSON file (EXPLAIN plans, index catalog)
        #[arg(short, long, value_name = "FILE")]
        metadata: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "markdown", value_enum)]
        format: OutputFormat,
    },

    /// Archive span data for a commit so later runs can compare against it
    Archive {
        /// Span data JSON file (array of span records)
        #[arg(short, long, value_name = "FILE")]
        spans: PathBuf,

        /// Metadata JSON file (EXPLAIN plans, index catalog)
        #[arg(short, long, value_name = "FILE")]
        metadata: Option<PathBuf>,

        /// Result store directory
        #[arg(long, value_name = "DIR")]
        store: PathBuf,

        /// Commit SHA the data belongs to
        #[arg(long, value_name = "SHA")]
        sha: String,
    },

    /// Compare two archived commits and report newly introduced findings
    Compare {
        /// Result store directory
        #[arg(long, value_name = "DIR")]
        store: PathBuf,

        /// Base commit SHA
        #[arg(long, value_name = "SHA")]
        base: String,

        /// Head commit SHA
        #[arg(long, value_name = "SHA")]
        head: String,

        /// Fresh head span data, bypassing the store fetch for the head side
        #[arg(long, value_name = "FILE")]
        head_spans: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "markdown", value_enum)]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}
