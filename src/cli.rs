use clap::{Parser, ValueEnum};

use crate::diff::DiffGranularity;

/// Crawl course grades from the Dualis student portal.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Portal username; overrides DUALIS_USERNAME
    #[arg(long)]
    pub username: Option<String>,

    /// Semester/detail pages fetched in parallel; overrides DUALIS_CONCURRENCY
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// How changes against the last snapshot are detected
    #[arg(long, value_enum, default_value_t = DiffGranularity::Course)]
    pub diff: DiffGranularity,

    /// Only print the crawl result; don't read or write snapshots
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, compact output
    Pretty,
    /// One JSON object per event
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
