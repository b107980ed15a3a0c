//! Single synchronization pass

use sqlupload_core::{ConfiguredStore, RunReport, StoreConnector, SyncEngine};

use super::{load_manifest, print_report};
use crate::error::Result;

/// Run the sync command
///
/// Per-artifact failures are reported but do not fail the command; only
/// configuration and store-preparation errors do.
pub async fn run_sync(config: Option<&str>, dry_run: bool, json: bool) -> Result<()> {
    let manifest = load_manifest(config, dry_run)?;
    let mut engine = SyncEngine::new(&manifest)?;
    let connector = ConfiguredStore::new(manifest.store.clone(), manifest.sync.dry_run);

    let shutdown = engine.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current artifact");
            shutdown.request();
        }
    });

    let report = run_pass(&mut engine, &connector).await?;
    print_report(&report, json)
}

/// Connect, run once and close.
pub async fn run_pass(
    engine: &mut SyncEngine,
    connector: &dyn StoreConnector,
) -> sqlupload_core::Result<RunReport> {
    let store = connector.connect().await?;
    engine.run(store.as_ref()).await
}
