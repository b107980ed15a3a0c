//! Run statistics

use serde::Serialize;
use sqlupload_fs::NormalizedPath;
use std::fmt;
use std::time::Duration;

/// Why an artifact was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Disabled,
    /// `run-once` artifact on a later run
    RunOnce,
    /// Source not modified since its output was last written
    Unchanged,
    /// Source already holds this artifact's shell
    AlreadyShell,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Disabled => "disabled",
            SkipReason::RunOnce => "run-once",
            SkipReason::Unchanged => "unchanged",
            SkipReason::AlreadyShell => "already-shell",
        })
    }
}

/// Terminal state of one artifact in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ArtifactState {
    Skipped { reason: SkipReason },
    Processed {
        /// A row update was issued
        stored: bool,
        /// Where the shell was written
        #[serde(skip_serializing_if = "Option::is_none")]
        shell: Option<String>,
        removed_original: bool,
    },
    Failed { message: String },
}

impl ArtifactState {
    pub fn processed(stored: bool, shell: Option<&NormalizedPath>, removed_original: bool) -> Self {
        Self::Processed {
            stored,
            shell: shell.map(|p| p.as_str().to_string()),
            removed_original,
        }
    }
}

/// Report from one sync run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Rows updated in the store
    pub uploaded: usize,
    /// Shells written to disk
    pub changed: usize,
    /// Originals removed after a rename
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Whether the run's transaction was committed
    pub committed: bool,
    /// Whether a shutdown request stopped the run early
    pub interrupted: bool,
    pub elapsed: Duration,
    /// Per-artifact outcome in processing order
    pub artifacts: Vec<(String, ArtifactState)>,
}

impl RunReport {
    pub fn record(&mut self, id: &str, state: ArtifactState) {
        match &state {
            ArtifactState::Skipped { .. } => self.skipped += 1,
            ArtifactState::Processed {
                stored,
                shell,
                removed_original,
            } => {
                self.uploaded += usize::from(*stored);
                self.changed += usize::from(shell.is_some());
                self.removed += usize::from(*removed_original);
            }
            ArtifactState::Failed { .. } => self.failed += 1,
        }
        self.artifacts.push((id.to_string(), state));
    }

    pub fn state_of(&self, id: &str) -> Option<&ArtifactState> {
        self.artifacts
            .iter()
            .find(|(artifact, _)| artifact == id)
            .map(|(_, state)| state)
    }

    /// Whether nothing was written anywhere.
    pub fn is_noop(&self) -> bool {
        self.uploaded == 0 && self.changed == 0 && self.removed == 0
    }

    /// `Uploaded 3 files in 0.12 seconds`
    pub fn summary(&self) -> String {
        format!(
            "Uploaded {} file{} in {:.2} seconds",
            self.uploaded,
            if self.uploaded == 1 { "" } else { "s" },
            self.elapsed.as_secs_f64()
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} changed, {} removed, {} skipped, {} failed)",
            self.summary(),
            self.changed,
            self.removed,
            self.skipped,
            self.failed
        )
    }
}
