//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Path to the image to scan
    pub image: PathBuf,

    /// Run the check without writing the verified marker
    #[arg(long)]
    pub dry_run: bool,

    /// Output the outcome as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Spool directory to watch (defaults to the configured spool dir)
    pub dir: Option<PathBuf>,

    /// Override the poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
}

/// Lookup command arguments.
#[derive(Debug, Args)]
pub struct LookupCommand {
    /// The identifier to look up
    pub id: String,

    /// Output the entry as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Maximum number of records to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Filter by outcome label (e.g. verified, duplicate, not_found)
    #[arg(short, long)]
    pub outcome: Option<String>,

    /// Output records as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
