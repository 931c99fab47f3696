//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Focus session tracker.
///
/// Ingests finalized focus sessions, maintains per-user running statistics
/// (scores, streaks, best hours, milestones), and reports insights.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score finalized sessions and fold them into user stats.
    ///
    /// Accepts a single JSON session or a JSONL batch. Use "-" for stdin.
    Ingest {
        /// Input file with one session object, or one per line.
        file: PathBuf,
    },

    /// Show a user's aggregate stats.
    Stats {
        /// The user to report on.
        #[arg(long)]
        user: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a user's focus insights summary.
    Insights {
        /// The user to report on.
        #[arg(long)]
        user: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show tracked users and database info.
    Status,
}
