//! External transfer ledger
//!
//! The co-located transfer component keeps its own ledger of files it has
//! already uploaded. Marking a path there keeps it from uploading output this
//! crate has already placed. Entries are only ever added or updated; the
//! document is otherwise treated as opaque and never overwritten when it
//! cannot be parsed as a JSON object.

use crate::Result;
use serde_json::{Map, Value};
use sqlupload_fs::{NormalizedPath, io};

#[derive(Debug, Clone)]
pub struct TransferLedger {
    path: NormalizedPath,
    entries: Map<String, Value>,
    writable: bool,
    dirty: bool,
}

impl TransferLedger {
    /// Load the ledger at `path`.
    ///
    /// A missing file is an empty ledger. An unreadable or malformed file is
    /// kept read-only so the owner's data is never clobbered.
    pub fn load(path: &NormalizedPath) -> Self {
        let mut ledger = Self {
            path: path.clone(),
            entries: Map::new(),
            writable: true,
            dirty: false,
        };

        let content = match io::read_text(path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return ledger,
            Err(e) => {
                tracing::warn!(%path, error = %e, "Cannot read transfer ledger, leaving it untouched");
                ledger.writable = false;
                return ledger;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => ledger.entries = entries,
            Ok(_) | Err(_) => {
                tracing::warn!(%path, "Transfer ledger is not a JSON object, leaving it untouched");
                ledger.writable = false;
            }
        }
        ledger
    }

    /// Add or update the entry for an absolute path.
    pub fn mark(&mut self, path: &str, digest: Option<&str>) {
        let value = digest.map_or(Value::Null, |d| Value::String(d.to_string()));
        if self.entries.get(path) != Some(&value) {
            self.entries.insert(path.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist pending changes. Does nothing when there are none or the file
    /// could not be parsed at load time.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if !self.writable {
            tracing::warn!(path = %self.path, "Skipping update of unparseable transfer ledger");
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        io::write_atomic(&self.path, content.as_bytes())?;
        self.dirty = false;
        tracing::debug!(path = %self.path, entries = self.entries.len(), "Saved transfer ledger");
        Ok(())
    }
}
