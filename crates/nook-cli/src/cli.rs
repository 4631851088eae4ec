use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "nook")]
#[command(about = "Keep the local Nook cache in sync with the cloud")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the CLI config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every local record, overwriting the remote copies
    Push,
    /// Replace local collections with the remote contents
    Pull,
    /// Push, then pull
    Sync,
    /// Create today's missing recurring task instances
    Generate {
        /// Date to generate for (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Task collection name
        #[arg(long, default_value = "tasks")]
        collection: String,
        /// Show what would be created without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync periodically and follow remote changes until interrupted
    Watch {
        /// Seconds between full syncs (overrides config)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Only run the periodic sync, without live collection polling
        #[arg(long)]
        no_live: bool,
    },
    /// Show local record counts and sync configuration
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record locally and remotely
    Delete {
        /// Collection the record belongs to
        collection: String,
        /// Record ID
        id: String,
    },
    /// Inspect CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration with secrets redacted
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}
