//! Command-line interface for mavtap.
//!
//! This module provides the CLI structure for the `mavtap` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, InspectCommand, RunCommand};

/// mavtap - Tap a MAVLink stream and log it as line-delimited JSON
///
/// Attaches to a passive copy of a MAVLink telemetry stream (as duplicated
/// by an upstream relay such as MAVProxy) and records every decoded
/// message to a per-session JSONL log.
#[derive(Debug, Parser)]
#[command(name = "mavtap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a tap session until interrupted
    Run(RunCommand),

    /// Summarize an existing session log
    Inspect(InspectCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "mavtap");
    }

    #[test]
    fn test_verbosity_quiet() {
        let cli = Cli::try_parse_from(["mavtap", "-q", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::try_parse_from(["mavtap", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Normal);

        let cli = Cli::try_parse_from(["mavtap", "-v", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Verbose);

        let cli = Cli::try_parse_from(["mavtap", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["mavtap", "run"]).unwrap();
        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn test_parse_run_with_endpoint() {
        let cli = Cli::try_parse_from(["mavtap", "run", "--endpoint", "0.0.0.0:14552"]).unwrap();
        match cli.command {
            Command::Run(run) => assert_eq!(run.endpoint.as_deref(), Some("0.0.0.0:14552")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::try_parse_from(["mavtap", "inspect", "session.jsonl"]).unwrap();
        match cli.command {
            Command::Inspect(inspect) => {
                assert_eq!(inspect.file, PathBuf::from("session.jsonl"));
                assert!(!inspect.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["mavtap", "-c", "/custom/config.toml", "config", "path"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
