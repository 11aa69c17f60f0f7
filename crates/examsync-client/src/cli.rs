//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// examsync - Keep your exam schedule in your calendar
#[derive(Debug, Parser)]
#[command(name = "examsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EXAMSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synchronize scraped exams into the calendar
    Sync {
        /// JSON file with the scraped exams, or `-` for stdin
        input: String,

        /// Show what would change without touching the calendar
        #[arg(long)]
        dry_run: bool,
    },

    /// Credential commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Credential actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Show the stored credential
    Status,

    /// Exchange the refresh token for a new access token
    Refresh,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
