//! Change-detection ledger
//!
//! Two independent records, persisted together as one JSON document:
//!
//! ```json
//! { "hash": { "index.html": "sha256:..." }, "timestamp": { "/srv/www/index.html": 1718000000 } }
//! ```
//!
//! `hash` maps an artifact id to the digest of its last stored payload.
//! `timestamp` maps an absolute source path to the epoch second at which its
//! output was last written. Loading never fails: a missing or unreadable
//! ledger is empty and everything is reprocessed.

mod transfer;

pub use transfer::TransferLedger;

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlupload_fs::{NormalizedPath, compute_bytes_checksum, io};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLedger {
    #[serde(default)]
    hash: BTreeMap<String, String>,

    #[serde(default)]
    timestamp: BTreeMap<String, i64>,

    #[serde(skip, default = "default_true")]
    hashing: bool,
}

impl Default for SyncLedger {
    fn default() -> Self {
        Self {
            hash: BTreeMap::new(),
            timestamp: BTreeMap::new(),
            hashing: true,
        }
    }
}

impl SyncLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger, treating a missing or malformed file as empty.
    pub fn load(path: &NormalizedPath) -> Self {
        let content = match io::read_text(path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                tracing::debug!(%path, "No sync ledger yet, starting empty");
                return Self::new();
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "Cannot read sync ledger, starting empty");
                return Self::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(%path, error = %e, "Malformed sync ledger, starting empty");
                Self::new()
            }
        }
    }

    /// Write the ledger atomically.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        io::write_atomic(path, content.as_bytes())?;
        tracing::debug!(
            %path,
            hashes = self.hash.len(),
            timestamps = self.timestamp.len(),
            "Saved sync ledger"
        );
        Ok(())
    }

    /// Enable or disable payload hashing. Without hashing every payload is
    /// stored.
    pub fn with_hashing(mut self, enabled: bool) -> Self {
        self.hashing = enabled;
        self
    }

    /// Whether `path` is unchanged since its output was last written.
    ///
    /// An unknown modification time never skips.
    pub fn should_skip(&self, path: &str, modified: Option<f64>) -> bool {
        match (modified, self.timestamp.get(path)) {
            (Some(modified), Some(&processed)) => modified <= processed as f64,
            _ => false,
        }
    }

    pub fn last_processed(&self, path: &str) -> Option<i64> {
        self.timestamp.get(path).copied()
    }

    /// Digest of `payload`, or `None` when hashing is disabled.
    pub fn digest(&self, payload: &[u8]) -> Option<String> {
        self.hashing.then(|| compute_bytes_checksum(payload))
    }

    pub fn stored_digest(&self, id: &str) -> Option<&str> {
        self.hash.get(id).map(String::as_str)
    }

    /// Whether `payload` differs from the last payload stored for `id`.
    pub fn needs_store(&self, id: &str, payload: &[u8]) -> bool {
        match self.digest(payload) {
            Some(digest) => self.stored_digest(id) != Some(digest.as_str()),
            None => true,
        }
    }

    pub fn record(&mut self, id: &str, digest: String) {
        self.hash.insert(id.to_string(), digest);
    }

    /// Record that the output for `path` was written at `epoch`.
    ///
    /// The stored value never decreases.
    pub fn record_processed(&mut self, path: &str, epoch: i64) {
        let entry = self.timestamp.entry(path.to_string()).or_insert(epoch);
        *entry = (*entry).max(epoch);
    }

    pub fn is_empty(&self) -> bool {
        self.hash.is_empty() && self.timestamp.is_empty()
    }
}

/// `now` rounded up to the next whole second.
pub fn processed_epoch(now: DateTime<Utc>) -> i64 {
    let secs = now.timestamp();
    if now.timestamp_subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn skip_is_inclusive_of_recorded_epoch() {
        let mut ledger = SyncLedger::new();
        ledger.record_processed("/srv/a.html", 1_700_000_000);

        assert!(ledger.should_skip("/srv/a.html", Some(1_700_000_000.0)));
        assert!(!ledger.should_skip("/srv/a.html", Some(1_700_000_001.0)));
        assert!(!ledger.should_skip("/srv/a.html", None));
        assert!(!ledger.should_skip("/srv/b.html", Some(0.0)));
    }

    #[test]
    fn record_processed_never_decreases() {
        let mut ledger = SyncLedger::new();
        ledger.record_processed("p", 20);
        ledger.record_processed("p", 10);
        assert_eq!(ledger.last_processed("p"), Some(20));
        ledger.record_processed("p", 30);
        assert_eq!(ledger.last_processed("p"), Some(30));
    }

    #[test]
    fn equal_payload_from_different_sources_is_not_stored_twice() {
        let mut ledger = SyncLedger::new();
        let payload = b"<body>21.3</body>";
        assert!(ledger.needs_store("index.html", payload));
        let digest = ledger.digest(payload).unwrap();
        ledger.record("index.html", digest);

        assert!(!ledger.needs_store("index.html", payload));
        assert!(ledger.needs_store("index.html", b"<body>21.4</body>"));
        assert!(ledger.needs_store("other.html", payload));
    }

    #[test]
    fn disabled_hashing_always_stores() {
        let mut ledger = SyncLedger::new().with_hashing(false);
        ledger.record("a", "sha256:00".into());
        assert!(ledger.digest(b"x").is_none());
        assert!(ledger.needs_store("a", b"x"));
    }

    #[test]
    fn epoch_rounds_up() {
        let exact = Utc.timestamp_opt(100, 0).unwrap();
        let later = Utc.timestamp_opt(100, 1).unwrap();
        assert_eq!(processed_epoch(exact), 100);
        assert_eq!(processed_epoch(later), 101);
    }

    #[test]
    fn load_is_tolerant() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("#SQLupload.last"));
        assert!(SyncLedger::load(&path).is_empty());

        std::fs::write(path.to_native(), "{ not json").unwrap();
        assert!(SyncLedger::load(&path).is_empty());
    }

    #[test]
    fn save_and_load_preserve_entries() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("ledger.json"));

        let mut ledger = SyncLedger::new();
        ledger.record("index.html", "sha256:ab".into());
        ledger.record_processed("/srv/index.html", 42);
        ledger.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path.to_native()).unwrap()).unwrap();
        assert_eq!(raw["hash"]["index.html"], "sha256:ab");
        assert_eq!(raw["timestamp"]["/srv/index.html"], 42);

        assert_eq!(SyncLedger::load(&path), ledger);
    }
}
