//! FieldBridge daemon
//!
//! `fieldbridge` (or `fieldbridge run`) runs both cron schedulers until
//! Ctrl-C. `fieldbridge run-once` performs one appointment pass over every
//! enabled location plus one quote poll, then exits.

use std::process::ExitCode;

use clap::Parser;
use fieldbridge_domain::Result;
use fieldbridge_lib::cli::{Cli, Command};
use fieldbridge_lib::{poll_due_locations, sync_all_locations, AppContext};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let loaded = match cli.config.clone() {
        Some(path) => fieldbridge_infra::config::load_from_file(Some(path)),
        None => fieldbridge_infra::config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fieldbridge: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = fieldbridge_infra::init_logging(&config.logging) {
        eprintln!("fieldbridge: {err}");
        return ExitCode::FAILURE;
    }

    match run(config, cli.command()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fieldbridge exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: fieldbridge_domain::Config, command: Command) -> Result<()> {
    let ctx = AppContext::new_with_config(config)?;
    ctx.health_check()?;

    if command == Command::RunOnce {
        let reports = sync_all_locations(&ctx).await?;
        let polls = poll_due_locations(&ctx).await?;
        info!(
            locations_synced = reports.len(),
            item_errors = reports.iter().map(|r| r.errors).sum::<usize>(),
            locations_polled = polls.iter().filter(|p| !p.skipped).count(),
            "single pass finished"
        );
        return Ok(());
    }

    ctx.start_schedulers().await?;
    info!("fieldbridge running, press Ctrl-C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    ctx.stop_schedulers().await
}
