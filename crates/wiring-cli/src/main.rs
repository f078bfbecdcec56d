//! Pathway Wiring CLI
//!
//! Loads a wiring file, validates it, diffs it against a live snapshot and
//! reconciles the snapshot through the in-memory endpoint.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pathway_config::{ApplyMode, PathwayKey, ReconcilerConfig};
use pathway_telemetry::{encode_metrics, init_telemetry, record_command, TelemetryConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pathway-wiring")]
#[command(about = "Validate, diff and apply cross-chain pathway security configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,
}

/// Where endpoints, the target configuration and live state come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Wiring configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// hardhat-deploy deployments directory
    #[arg(short, long)]
    pub deployments: Option<PathBuf>,

    /// Contract name looked up in the deployments directory
    #[arg(long, default_value = "thUSD")]
    pub contract: String,

    /// Extra endpoint as EID=ADDRESS (repeatable)
    #[arg(short, long = "endpoint", value_parser = commands::parse_endpoint)]
    pub endpoints: Vec<(pathway_config::EndpointId, pathway_config::Address)>,

    /// Live state snapshot (same shape as the wiring file); empty if missing
    #[arg(short, long)]
    pub live: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate every create/update against live state
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the transitions from live state to the target
    Diff {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Reconcile the live snapshot towards the target and write it back
    Apply {
        #[command(flatten)]
        source: SourceArgs,

        /// all-or-nothing or partial (default from PW_APPLY_MODE)
        #[arg(long)]
        mode: Option<ApplyMode>,

        /// Acknowledge every advisory finding
        #[arg(long)]
        ack_all: bool,

        /// Acknowledge advisories on one pathway, FROM->TO (repeatable)
        #[arg(long = "ack")]
        ack: Vec<PathwayKey>,

        /// Per-pathway confirmation timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List known networks and their endpoint ids
    Networks,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Diff { .. } => "diff",
            Commands::Apply { .. } => "apply",
            Commands::Networks => "networks",
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    let _guard = init_telemetry(telemetry).context("Failed to initialize telemetry")?;

    let config = ReconcilerConfig::from_env();
    let name = cli.command.name();

    let result = {
        let _timer = pathway_telemetry::time_command!(name);
        match cli.command {
            Commands::Validate { source } => commands::validate(&source, &config),
            Commands::Diff { source } => commands::diff(&source, &config),
            Commands::Apply {
                source,
                mode,
                ack_all,
                ack,
                timeout,
            } => {
                let request = commands::ApplyRequest {
                    mode: mode.unwrap_or(config.default_mode),
                    ack_all,
                    ack,
                    timeout_secs: timeout,
                };
                commands::apply(&source, &config, request).await
            }
            Commands::Networks => commands::networks(),
        }
    };
    record_command(name, matches!(result, Ok(true)));

    if cli.metrics {
        println!("{}", encode_metrics().context("Failed to encode metrics")?);
    }

    match result? {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::FAILURE),
    }
}
