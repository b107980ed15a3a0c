//! Configuration check

use colored::Colorize;
use sqlupload_core::SyncPlan;

use super::load_manifest;
use crate::error::Result;

/// Run the check command
///
/// Validates the configuration the same way a run does and lists every
/// artifact with its resolved actions.
pub fn run_check(config: Option<&str>) -> Result<()> {
    let manifest = load_manifest(config, false)?;
    let plan = SyncPlan::from_manifest(&manifest)?;

    println!(
        "{} Configuration is valid ({} artifact(s) under {})",
        "OK".green().bold(),
        plan.artifacts.len(),
        plan.root
    );
    for artifact in &plan.artifacts {
        if artifact.enabled {
            println!(
                "   {} {} [{}] {}",
                "+".green(),
                artifact.id.cyan(),
                artifact.category,
                artifact.actions
            );
        } else {
            println!(
                "   {} {} {}",
                "-".dimmed(),
                artifact.id.dimmed(),
                "(disabled)".dimmed()
            );
        }
    }
    Ok(())
}
