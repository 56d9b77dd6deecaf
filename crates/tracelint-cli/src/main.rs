//! tracelint CLI - database regression detection from test-suite traces.

mod cli;
mod commands;
mod input;
mod store;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(regressions_found) => {
            if regressions_found {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("tracelint: error: {e:#}");
            ExitCode::from(66)
        }
    }
}

fn run() -> Result<bool> {
    let args = Args::parse();

    match args.command {
        Command::Analyze {
            spans,
            metadata,
            format,
        } => commands::run_analyze(&spans, metadata.as_deref(), format),
        Command::Archive {
            spans,
            metadata,
            store,
            sha,
        } => commands::run_archive(&spans, metadata.as_deref(), &store, &sha),
        Command::Compare {
            store,
            base,
            head,
            head_spans,
            format,
        } => commands::run_compare(&store, &base, &head, head_spans.as_deref(), format),
    }
}
