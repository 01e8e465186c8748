//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

/// Inventory GCP project resources into an Excel workbook and upload it to Cloud Storage
#[derive(Parser, Debug, Clone)]
#[command(name = "gcp-inventory", version, about, long_about = None)]
pub struct Args {
    /// GCP project id (or comma separated list)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Cloud Storage bucket to upload the workbook to
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Local output file (default gcp-inventory-<project>-<timestamp>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use Cloud Asset search instead of per-type listing
    #[arg(long)]
    pub use_asset: bool,

    /// Expand nested objects into dotted columns
    #[arg(long)]
    pub expand_nested: bool,

    /// Concurrent fetches
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Deadline for each API page request, in seconds
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Retries for rate-limited or unavailable responses
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}
