//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Tap endpoint to bind (overrides config)
    #[arg(short, long, value_name = "ADDR:PORT")]
    pub endpoint: Option<String>,

    /// Directory for the session log (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Receive timeout in milliseconds (overrides config)
    #[arg(short, long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

/// Inspect command arguments.
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Session log file to summarize
    pub file: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate (defaults to the standard path)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}
