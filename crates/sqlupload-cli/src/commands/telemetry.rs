//! Telemetry ingestion from stdin

use std::sync::Arc;

use colored::Colorize;
use sqlupload_core::{ConfiguredStore, StoreConnector, SyncPlan, TelemetryPacket, TelemetryUploader};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_manifest;
use crate::error::{CliError, Result};

/// Run the telemetry command
///
/// Reads one JSON packet per line until end of input or Ctrl-C. Malformed
/// lines and packets dropped by a full queue are counted, never fatal.
pub async fn run_telemetry(config: Option<&str>, dry_run: bool) -> Result<()> {
    let manifest = load_manifest(config, dry_run)?;
    SyncPlan::from_manifest(&manifest)?;
    if !manifest.sync.dry_run && manifest.store.database.is_none() {
        return Err(CliError::user("store.database is required for telemetry"));
    }

    let connector: Arc<dyn StoreConnector> = Arc::new(ConfiguredStore::new(
        manifest.store.clone(),
        manifest.sync.dry_run,
    ));
    let uploader = TelemetryUploader::spawn(connector);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;
    let (mut malformed, mut dropped) = (0usize, 0usize);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match TelemetryPacket::from_json(&line) {
            Ok(packet) => {
                if uploader.submit(packet).is_err() {
                    dropped += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed telemetry packet");
                malformed += 1;
            }
        }
    }

    let stats = if interrupted {
        uploader.shutdown().await
    } else {
        uploader.finish().await
    };

    println!(
        "{} Uploaded {} packet(s) ({} failed, {} dropped, {} malformed)",
        "OK".green().bold(),
        stats.uploaded,
        stats.failed,
        dropped,
        malformed
    );
    Ok(())
}
