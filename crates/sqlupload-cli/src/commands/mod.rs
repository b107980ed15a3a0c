//! Command implementations for sqlupload-cli

pub mod check;
pub mod run;
pub mod telemetry;
pub mod watch;

pub use check::run_check;
pub use run::run_sync;
pub use telemetry::run_telemetry;
pub use watch::run_watch;

use colored::Colorize;
use sqlupload_core::config::default_config_path;
use sqlupload_core::{ArtifactState, Manifest, RunReport};

use crate::error::{CliError, Result};

/// Locate and load the manifest, applying `--dry-run`.
pub fn load_manifest(config: Option<&str>, dry_run: bool) -> Result<Manifest> {
    let path = default_config_path(config).ok_or_else(|| {
        CliError::user("No configuration file found; pass --config or set SQLUPLOAD_CONFIG")
    })?;
    tracing::debug!(%path, "Using configuration");
    Ok(Manifest::load(&path)?.with_dry_run(dry_run))
}

/// Print a run report to stdout.
pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.failed > 0 {
        "DONE".yellow().bold()
    } else {
        "OK".green().bold()
    };
    println!("{} {}", status, report);

    for (id, state) in &report.artifacts {
        match state {
            ArtifactState::Processed {
                stored,
                shell,
                removed_original,
            } => {
                let mut notes = Vec::new();
                if *stored {
                    notes.push("stored".to_string());
                }
                if let Some(shell) = shell {
                    notes.push(format!("shell {}", shell));
                }
                if *removed_original {
                    notes.push("original removed".to_string());
                }
                if notes.is_empty() {
                    notes.push("unchanged payload".to_string());
                }
                println!("   {} {} ({})", "+".green(), id.cyan(), notes.join(", "));
            }
            ArtifactState::Skipped { reason } => {
                println!("   {} {} ({})", "-".dimmed(), id.dimmed(), reason);
            }
            ArtifactState::Failed { message } => {
                println!("   {} {}: {}", "!".red(), id.cyan(), message);
            }
        }
    }
    if report.interrupted {
        println!("{} Stopped early on shutdown request", "!".yellow());
    }
    Ok(())
}
