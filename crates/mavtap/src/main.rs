//! `mavtap` - CLI for the MAVLink stream tap
//!
//! This binary wires the tap controller to the operating environment:
//! loads configuration, starts a session, translates Ctrl-C into a stop
//! request, and drains the controller's event stream into tracing.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::collections::BTreeMap;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use mavtap::cli::{Cli, Command, ConfigCommand, InspectCommand, RunCommand};
use mavtap::{init_logging, Config, SystemClock, TapEvent, TapOptions, TapSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Run(run_cmd) => handle_run(config, run_cmd).await,
        Command::Inspect(inspect_cmd) => handle_inspect(&inspect_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_run(mut config: Config, cmd: RunCommand) -> anyhow::Result<()> {
    if let Some(endpoint) = cmd.endpoint {
        config.tap.endpoint = endpoint;
    }
    if let Some(log_dir) = cmd.log_dir {
        config.log.directory = Some(log_dir);
    }
    if let Some(timeout_ms) = cmd.timeout_ms {
        config.tap.receive_timeout_ms = timeout_ms;
    }
    config.validate().context("invalid run configuration")?;

    let endpoint = config.endpoint()?;
    let log_path = config.session_log_path(chrono::Utc::now());
    let options = TapOptions {
        receive_timeout: config.receive_timeout(),
        direction: config.direction(),
        clock: std::sync::Arc::new(SystemClock),
    };

    let (mut session, mut events) = TapSession::start(endpoint, &log_path, options)
        .await
        .context("failed to start tap session")?;
    info!("Tap listening on {}", session.local_addr());
    info!("Logging to {}", session.log_path().display());

    // The controller never logs; its events become operator-visible here.
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                TapEvent::StateChanged { from, to } => info!("Tap state: {from} -> {to}"),
                TapEvent::DecodeError { len, detail } => {
                    warn!("Dropped undecodable frame ({len} bytes): {detail}");
                }
                TapEvent::WriteError { detail } => error!("Record not persisted: {detail}"),
                TapEvent::SourceFailure { detail } => error!("Tap source failed: {detail}"),
                TapEvent::SessionEnded { summary } => {
                    info!(
                        "Session ended: {} records, {} decode errors, {} write errors",
                        summary.records, summary.decode_errors, summary.write_errors
                    );
                }
            }
        }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for interrupt")?;
            info!("Interrupt received, stopping tap");
        }
        () = session.finished() => {
            warn!("Capture ended before an operator stop");
        }
    }

    let summary = session.stop().await?;
    let _ = drain.await;

    println!("Captured {} records to {}", summary.records, log_path.display());
    if summary.decode_errors > 0 || summary.write_errors > 0 {
        println!(
            "  {} decode errors, {} write errors",
            summary.decode_errors, summary.write_errors
        );
    }
    Ok(())
}

fn handle_inspect(cmd: &InspectCommand) -> anyhow::Result<()> {
    let (records, skipped) = mavtap::read_records(&cmd.file)
        .with_context(|| format!("failed to read {}", cmd.file.display()))?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *counts.entry(record.msg_name.as_str()).or_default() += 1;
    }

    if cmd.json {
        let summary = serde_json::json!({
            "file": cmd.file,
            "records": records.len(),
            "skipped_lines": skipped,
            "messages": counts,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", cmd.file.display());
        println!("  Records:       {}", records.len());
        println!("  Skipped lines: {skipped}");
        if !counts.is_empty() {
            println!();
            for (name, count) in &counts {
                println!("  {name:<24} {count}");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Tap]");
                println!("  Endpoint:        {}", config.tap.endpoint);
                println!("  Receive timeout: {} ms", config.tap.receive_timeout_ms);
                println!("  Direction:       {}", config.tap.direction);
                println!();
                println!("[Log]");
                println!("  Directory:       {}", config.log_dir().display());
                println!("  File prefix:     {}", config.log.file_prefix);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
