//! SyncEngine implementation
//!
//! One run walks the configured artifacts in order. Each artifact is
//! skipped, processed or failed on its own; only configuration problems and a
//! failed first-run table preparation abort the whole run.
//!
//! Per artifact:
//!
//! 1. skip when disabled, when `run-once` and not the first run, or when the
//!    source is not newer than its last processed timestamp
//! 2. read and split by content category
//! 3. with `store`, update the row if the payload digest changed
//! 4. write the shell and remove the original per the extension mode
//! 5. record the processed timestamp and mark the transfer ledger
//!
//! All row updates share one transaction, committed at the end only when at
//! least one row was updated. Steps 4 and 5 of an artifact whose row was
//! updated wait for that commit: until the payload is in the store the
//! source stays untouched on disk. A source that already holds the
//! artifact's own shell is never split again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlupload_fs::{NormalizedPath, compute_content_checksum, io};
use sqlupload_split::{LinkTargets, SplitContext, SplitResult, mime};

use crate::config::{Action, Manifest, ResolvedArtifact, SyncPlan};
use crate::ledger::{SyncLedger, TransferLedger, processed_epoch};
use crate::store::{Record, RecordStore, StoreTransaction};
use crate::stub::{StubRenderer, with_charset};
use crate::targets::targets_for;
use crate::{Error, Result};

use super::report::{ArtifactState, RunReport, SkipReason};

/// Cooperative stop flag shared with signal handlers.
///
/// A requested shutdown stops a run before its next artifact; what was
/// already processed is still committed and saved.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Work held back until the run's transaction commits.
struct PendingCommit {
    digest: Option<String>,
    shell: Option<String>,
}

/// Result of processing one artifact before the commit.
enum Outcome {
    Done(ArtifactState),
    AwaitingCommit(PendingCommit),
}

/// Mutable state of one run.
struct RunState {
    first_run: bool,
    ledger: SyncLedger,
    transfer: Option<TransferLedger>,
    tx: Box<dyn StoreTransaction>,
}

/// Filesystem effect of one artifact.
#[derive(Debug, Default)]
struct FsChanges {
    shell: Option<NormalizedPath>,
    shell_digest: Option<String>,
    removed_original: bool,
}

/// Engine for synchronizing generated artifacts with the record store
pub struct SyncEngine {
    plan: SyncPlan,
    stubs: StubRenderer,
    runs: u64,
    shutdown: ShutdownHandle,
}

impl SyncEngine {
    /// Validate `manifest` and build an engine for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the manifest is incomplete.
    pub fn new(manifest: &Manifest) -> Result<Self> {
        Ok(Self::from_plan(SyncPlan::from_manifest(manifest)?))
    }

    pub fn from_plan(plan: SyncPlan) -> Self {
        Self {
            stubs: StubRenderer::new(plan.settings.bootstrap.clone()),
            plan,
            runs: 0,
            shutdown: ShutdownHandle::default(),
        }
    }

    pub fn plan(&self) -> &SyncPlan {
        &self.plan
    }

    /// Number of runs that got past store preparation.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run one synchronization pass against `store` and close it.
    ///
    /// # Errors
    ///
    /// Fails only when the store cannot be prepared or a transaction cannot
    /// be started. Per-artifact failures are reported in the [`RunReport`].
    pub async fn run(&mut self, store: &dyn RecordStore) -> Result<RunReport> {
        let result = self.run_inner(store).await;
        store.close().await;
        result
    }

    async fn run_inner(&mut self, store: &dyn RecordStore) -> Result<RunReport> {
        let started = Instant::now();
        let first_run = self.runs == 0;

        let ledger =
            SyncLedger::load(&self.plan.ledger_path).with_hashing(self.plan.settings.hash_payloads);
        let transfer = self
            .plan
            .transfer_ledger_path
            .as_ref()
            .map(TransferLedger::load);

        if first_run {
            store.prepare().await.inspect_err(|e| {
                tracing::error!(error = %e, "Cannot prepare record store, aborting run");
            })?;
        }
        let mut tx = store.begin().await?;

        if first_run {
            for artifact in self
                .plan
                .artifacts
                .iter()
                .filter(|a| a.enabled && a.has(Action::Store))
            {
                if let Err(e) = tx.ensure_row(&artifact.id).await {
                    tracing::warn!(id = %artifact.id, error = %e, "Cannot insert identity row");
                }
            }
        }
        self.runs += 1;

        if first_run {
            self.write_bootstrap();
        }

        let mut state = RunState {
            first_run,
            ledger,
            transfer,
            tx,
        };
        let mut report = RunReport::default();
        let mut outcomes = Vec::with_capacity(self.plan.artifacts.len());

        for artifact in &self.plan.artifacts {
            if self.shutdown.is_requested() {
                tracing::info!("Shutdown requested, stopping before '{}'", artifact.id);
                report.interrupted = true;
                break;
            }
            tracing::debug!(id = %artifact.id, file = %artifact.file, "Processing artifact");

            let outcome = match self.process(artifact, &mut state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.log_failure(artifact, &e);
                    Outcome::Done(failed(&e))
                }
            };
            outcomes.push((artifact, outcome));
        }

        let settings = &self.plan.settings;
        let RunState {
            mut ledger,
            mut transfer,
            tx,
            ..
        } = state;

        let awaiting = outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, Outcome::AwaitingCommit(_)));
        if awaiting {
            match tx.commit().await {
                Ok(()) => report.committed = true,
                Err(e) => {
                    tracing::error!(error = %e, "Commit failed, stored artifacts left untouched on disk");
                }
            }
        } else {
            drop(tx);
        }

        for (artifact, outcome) in outcomes {
            let state = match outcome {
                Outcome::Done(state) => state,
                Outcome::AwaitingCommit(pending) if report.committed => {
                    if let Some(digest) = pending.digest {
                        ledger.record(&artifact.id, digest);
                    }
                    let shell = pending.shell.as_deref();
                    self.finish(artifact, shell, true, &mut ledger, transfer.as_mut())
                        .unwrap_or_else(|e| {
                            self.log_failure(artifact, &e);
                            failed(&e)
                        })
                }
                Outcome::AwaitingCommit(_) => ArtifactState::Failed {
                    message: "store transaction was not committed".to_string(),
                },
            };
            report.record(&artifact.id, state);
        }

        if settings.dry_run {
            tracing::info!(path = %self.plan.ledger_path, "[dry-run] Would save sync ledger");
        } else {
            if let Err(e) = ledger.save(&self.plan.ledger_path) {
                tracing::warn!(error = %e, "Cannot save sync ledger");
            }
            if let Some(transfer) = transfer.as_mut()
                && let Err(e) = transfer.save()
            {
                tracing::warn!(error = %e, "Cannot save transfer ledger");
            }
        }

        report.elapsed = started.elapsed();
        if settings.log_success {
            tracing::info!(
                changed = report.changed,
                removed = report.removed,
                skipped = report.skipped,
                failed = report.failed,
                "{}",
                report.summary()
            );
        }
        Ok(report)
    }

    /// Write the shared bootstrap resource the stubs require.
    ///
    /// A failure is logged; the run goes on.
    fn write_bootstrap(&self) {
        let writes_shells = self
            .plan
            .artifacts
            .iter()
            .any(|a| a.enabled && a.has(Action::WriteShell));
        if !writes_shells {
            return;
        }

        let path = self.plan.root.join(self.stubs.bootstrap_path());
        let content = self.stubs.bootstrap(&self.plan.store);
        if self.plan.settings.dry_run {
            tracing::info!(path = %path, bytes = content.len(), "[dry-run] Would write bootstrap");
            return;
        }
        match io::write_text(&path, &content) {
            Ok(()) => tracing::debug!(path = %path, "Wrote bootstrap"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Cannot write bootstrap"),
        }
    }

    async fn process(&self, artifact: &ResolvedArtifact, state: &mut RunState) -> Result<Outcome> {
        if !artifact.enabled {
            return Ok(skipped(SkipReason::Disabled));
        }
        if artifact.has(Action::RunOnce) && !state.first_run {
            return Ok(skipped(SkipReason::RunOnce));
        }

        let source_key = artifact.source.as_str();
        let modified = io::modified_epoch(&artifact.source);
        if state.ledger.should_skip(source_key, modified) {
            tracing::debug!(id = %artifact.id, "Source unchanged, skipping");
            return Ok(skipped(SkipReason::Unchanged));
        }

        let raw = io::read_bytes(&artifact.source)?;
        if self.stubs.is_shell_of(artifact, &raw) {
            tracing::warn!(
                id = %artifact.id,
                path = %artifact.source,
                "Source already holds its shell, not splitting it again"
            );
            return Ok(skipped(SkipReason::AlreadyShell));
        }
        let mut split = self.split(artifact, &raw)?;
        if !artifact.has(Action::WriteShell) {
            split = split.without_shell();
        }

        if artifact.has(Action::Store) {
            let digest = state.ledger.digest(&split.payload);
            if state.ledger.needs_store(&artifact.id, &split.payload) {
                let content_type = with_charset(&split.content_type, &artifact.encoding);
                let record = Record {
                    id: &artifact.id,
                    payload: &split.payload,
                    content_type: &content_type,
                    modification_time: modified
                        .and_then(epoch_to_datetime)
                        .unwrap_or_else(Utc::now),
                };
                state.tx.update(&record).await?;
                tracing::debug!(
                    id = %artifact.id,
                    bytes = split.payload.len(),
                    content_type = %content_type,
                    "Stored payload"
                );
                return Ok(Outcome::AwaitingCommit(PendingCommit {
                    digest,
                    shell: split.shell,
                }));
            }
            if let Some(digest) = digest {
                tracing::debug!(id = %artifact.id, "Payload unchanged, not storing");
                state.ledger.record(&artifact.id, digest);
            }
        }

        let done = self.finish(
            artifact,
            split.shell.as_deref(),
            false,
            &mut state.ledger,
            state.transfer.as_mut(),
        )?;
        Ok(Outcome::Done(done))
    }

    /// Apply the filesystem changes, then record the processed timestamp
    /// and mark the transfer ledger.
    fn finish(
        &self,
        artifact: &ResolvedArtifact,
        shell: Option<&str>,
        stored: bool,
        ledger: &mut SyncLedger,
        transfer: Option<&mut TransferLedger>,
    ) -> Result<ArtifactState> {
        let source_key = artifact.source.as_str();
        let changes = self.apply_filesystem(artifact, shell)?;
        ledger.record_processed(source_key, processed_epoch(Utc::now()));

        if artifact.has(Action::SuppressDownstreamTransfer)
            && let Some(transfer) = transfer
        {
            match &changes.shell {
                Some(path) => transfer.mark(path.as_str(), changes.shell_digest.as_deref()),
                None => transfer.mark(source_key, None),
            }
        }

        Ok(ArtifactState::processed(
            stored,
            changes.shell.as_ref(),
            changes.removed_original,
        ))
    }

    fn split(&self, artifact: &ResolvedArtifact, raw: &[u8]) -> Result<SplitResult> {
        let none = LinkTargets::none();
        let inline = self.stubs.inline(artifact);
        let standalone = self.stubs.standalone(artifact);
        let ctx = SplitContext {
            extension: &artifact.extension,
            divider_tag: &artifact.divider_tag,
            targets: targets_for(artifact, &self.plan.targets, &none),
            inline_stub: &inline,
            standalone_stub: &standalone,
            declared_content_type: artifact.content_type.as_deref(),
        };
        artifact
            .category
            .split(raw, &ctx)
            .map_err(|source| Error::Split {
                id: artifact.id.clone(),
                source,
            })
    }

    /// Write the shell and remove the original.
    ///
    /// With `keep-original-extension` the shell replaces the source in place
    /// and nothing is removed. Otherwise the shell goes under the output
    /// extension and, with `delete-original`, the source is removed once the
    /// shell is in place. A failed removal is logged and ignored.
    fn apply_filesystem(
        &self,
        artifact: &ResolvedArtifact,
        shell: Option<&str>,
    ) -> Result<FsChanges> {
        let dry_run = self.plan.settings.dry_run;
        let output = artifact.output_path(self.plan.output_extension());
        let mut changes = FsChanges::default();

        if let Some(shell) = shell {
            if dry_run {
                tracing::info!(path = %output, bytes = shell.len(), "[dry-run] Would write shell");
            } else {
                io::write_text(&output, shell)?;
            }
            changes.shell_digest = Some(compute_content_checksum(shell));
            changes.shell = Some(output.clone());
        }

        if !artifact.keeps_extension()
            && artifact.has(Action::DeleteOriginal)
            && output != artifact.source
        {
            if dry_run {
                tracing::info!(path = %artifact.source, "[dry-run] Would remove original");
                changes.removed_original = true;
            } else {
                match io::remove_file(&artifact.source) {
                    Ok(()) => changes.removed_original = true,
                    Err(e) => {
                        tracing::warn!(path = %artifact.source, error = %e, "Cannot remove original")
                    }
                }
            }
        }

        Ok(changes)
    }

    fn log_failure(&self, artifact: &ResolvedArtifact, error: &Error) {
        if mime::is_image(&artifact.extension) {
            tracing::debug!(id = %artifact.id, error = %error, "Image artifact failed");
        } else if self.plan.settings.log_failure {
            tracing::error!(id = %artifact.id, file = %artifact.file, error = %error, "Artifact failed");
        }
    }
}

fn skipped(reason: SkipReason) -> Outcome {
    Outcome::Done(ArtifactState::Skipped { reason })
}

fn failed(error: &Error) -> ArtifactState {
    ArtifactState::Failed {
        message: error.to_string(),
    }
}

fn epoch_to_datetime(epoch: f64) -> Option<DateTime<Utc>> {
    let secs = epoch.trunc() as i64;
    let nanos = ((epoch - epoch.trunc()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos.min(999_999_999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_handle_is_shared() {
        let handle = ShutdownHandle::default();
        let clone = handle.clone();
        assert!(!handle.is_requested());
        clone.request();
        assert!(handle.is_requested());
    }

    #[test]
    fn epoch_conversion_keeps_subseconds() {
        let dt = epoch_to_datetime(1_700_000_000.5).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }
}
