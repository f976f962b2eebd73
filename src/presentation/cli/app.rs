use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// floorwatch: telemetry and automatic root-cause analysis for line hosts
///
/// Samples CPU, memory and disk usage, raises threshold alerts, and asks an
/// analysis provider to explain them.
#[derive(Parser, Debug)]
#[command(name = "floorwatch")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `daemon`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start monitoring and automatic analysis until Ctrl+C
    #[command(alias = "d")]
    Daemon {
        /// Raise a `[TEST]` CPU alert for this many seconds after startup
        #[arg(long, value_name = "SECS")]
        test_alert: Option<u64>,
    },

    /// Show current resource usage and alerts
    #[command(alias = "s")]
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recorded analyses, newest first
    #[command(alias = "h")]
    History {
        /// Maximum number of records to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
