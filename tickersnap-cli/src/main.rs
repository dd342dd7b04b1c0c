//! Tickersnap CLI — scheduled and one-shot ticker reference snapshots.
//!
//! Commands:
//! - `run` — fetch and load a snapshot every interval (default)
//! - `once` — a single snapshot run; non-zero exit status on failure
//! - `show-config` — print the effective configuration with secrets masked

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tickersnap_runner::{telemetry, Pipeline, Scheduler, SyncConfig};

#[derive(Parser)]
#[command(
    name = "tickersnap",
    about = "Tickersnap — periodic ticker reference snapshots to CSV or a warehouse table"
)]
struct Cli {
    /// TOML config file. Environment variables override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a fixed interval until interrupted.
    Run {
        /// Run once at startup instead of waiting a full interval.
        #[arg(long, default_value_t = false)]
        immediately: bool,

        /// Stop after this many runs.
        #[arg(long)]
        max_runs: Option<u64>,
    },
    /// Run the pipeline a single time.
    Once,
    /// Print the effective configuration (secrets redacted).
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();

    let config = SyncConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run {
        immediately: false,
        max_runs: None,
    }) {
        Commands::Run {
            immediately,
            max_runs,
        } => run_scheduled(&config, immediately, max_runs),
        Commands::Once => run_once(&config),
        Commands::ShowConfig => {
            print!("{}", config.to_redacted_toml()?);
            Ok(())
        }
    }
}

fn run_scheduled(config: &SyncConfig, immediately: bool, max_runs: Option<u64>) -> Result<()> {
    let pipeline = Pipeline::from_config(config).context("failed to build pipeline")?;
    let scheduler = Scheduler::new(
        config.schedule.interval(),
        immediately || config.schedule.run_immediately,
    );

    tracing::info!(
        sink = pipeline.sink_name(),
        interval_secs = config.schedule.interval_secs,
        "starting scheduled ticker snapshots"
    );

    // The process is stopped by signal; the flag only matters to library callers.
    let shutdown = AtomicBool::new(false);
    let mut failures = 0u64;
    let runs = scheduler.run(&shutdown, max_runs, |_| {
        let report = pipeline.run();
        report.log();
        if !report.is_success() {
            failures += 1;
        }
    });

    tracing::info!(runs, failures, "scheduler finished");
    Ok(())
}

fn run_once(config: &SyncConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config).context("failed to build pipeline")?;
    let report = pipeline.run();
    report.log();

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
