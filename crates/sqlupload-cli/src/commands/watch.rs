//! Repeated synchronization passes

use std::time::Duration;

use colored::Colorize;
use sqlupload_core::{ConfiguredStore, SyncEngine};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::run::run_pass;
use super::{load_manifest, print_report};
use crate::error::{CliError, Result};

/// Run the watch command
///
/// The first pass starts immediately. A failed pass is logged and retried at
/// the next interval unless the failure is a configuration error.
pub async fn run_watch(
    config: Option<&str>,
    dry_run: bool,
    interval: u64,
    max_runs: Option<u64>,
) -> Result<()> {
    if interval == 0 {
        return Err(CliError::user("--interval must be at least 1 second"));
    }

    let manifest = load_manifest(config, dry_run)?;
    let mut engine = SyncEngine::new(&manifest)?;
    let connector = ConfiguredStore::new(manifest.store.clone(), manifest.sync.dry_run);

    let shutdown = engine.shutdown_handle();
    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping");
            shutdown.request();
            let _ = stop_tx.send(true);
        }
    });

    println!(
        "{} Watching every {}s (Ctrl-C to stop)",
        "=>".blue().bold(),
        interval
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = 0u64;

    loop {
        tokio::select! {
            biased;
            Ok(()) = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        match run_pass(&mut engine, &connector).await {
            Ok(report) => print_report(&report, false)?,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => tracing::error!(error = %e, "Pass failed, retrying at next interval"),
        }

        passes += 1;
        if engine.shutdown_handle().is_requested() || max_runs.is_some_and(|max| passes >= max) {
            break;
        }
    }

    println!("{} Stopped after {} pass(es)", "OK".green().bold(), passes);
    Ok(())
}
