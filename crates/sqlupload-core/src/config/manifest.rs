//! Manifest parsing for sqlupload configuration files
//!
//! A manifest has three parts: the `[sync]` table with run-wide defaults,
//! the `[store]` table naming the record store, and an ordered
//! `[[artifacts]]` array. Artifacts are processed in the order they appear.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlupload_fs::{ConfigStore, NormalizedPath};

use super::actions::ActionSet;

/// Record table used when `store.table_name` is not set.
pub const DEFAULT_TABLE_NAME: &str = "weewx_files";

fn default_true() -> bool {
    true
}

/// Run-wide settings and per-artifact defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Directory the report generator writes to. Required.
    pub target_path: Option<String>,

    /// Extension renamed shells are written under
    pub output_extension: String,

    /// Connection bootstrap resource, relative to `target_path`
    pub bootstrap: String,

    /// Sync ledger location, relative to `target_path` unless absolute
    pub ledger_file: String,

    /// Ledger of the co-located transfer component
    pub transfer_ledger: Option<String>,

    pub html_divide_tag: String,

    /// Default action list for artifacts that do not set their own
    pub actions: ActionSet,

    /// Legacy switch; `false` removes `write-shell` from every default
    pub write_shell: bool,

    /// Legacy switch; `false` adds `keep-original-extension`
    pub replace_extension: bool,

    pub content_type: Option<String>,
    pub encoding: String,
    pub dry_run: bool,
    pub log_success: bool,
    pub log_failure: bool,
    pub hash_payloads: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            target_path: None,
            output_extension: "php".to_string(),
            bootstrap: "sqlupload-connect.php".to_string(),
            ledger_file: "#SQLupload.last".to_string(),
            transfer_ledger: None,
            html_divide_tag: "html".to_string(),
            actions: ActionSet::standard(),
            write_shell: true,
            replace_extension: true,
            content_type: None,
            encoding: "utf-8".to_string(),
            dry_run: false,
            log_success: true,
            log_failure: true,
            hash_payloads: true,
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Database URL, e.g. `sqlite:///var/lib/weewx/sqlupload.sdb`
    pub database: Option<String>,
    pub table_name: Option<String>,
}

impl StoreSection {
    /// Configured table, or the default `weewx_files`.
    pub fn table(&self) -> &str {
        self.table_name.as_deref().unwrap_or(DEFAULT_TABLE_NAME)
    }
}

/// One `[[artifacts]]` entry. Absent keys inherit from [`SyncSection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSection {
    /// Stable identity, used as the record key
    pub id: String,

    /// Source file relative to `target_path`; defaults to `id`
    #[serde(default)]
    pub file: Option<String>,

    /// Replaces the global action list entirely when present
    #[serde(default)]
    pub actions: Option<ActionSet>,

    #[serde(default)]
    pub html_divide_tag: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub encoding: Option<String>,

    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default)]
    pub run_once: bool,

    #[serde(default)]
    pub write_shell: Option<bool>,

    #[serde(default)]
    pub replace_extension: Option<bool>,
}

impl ArtifactSection {
    /// A section with only an id; every other key inherits.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: None,
            actions: None,
            html_divide_tag: None,
            content_type: None,
            encoding: None,
            enable: true,
            run_once: false,
            write_shell: None,
            replace_extension: None,
        }
    }

    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or(&self.id)
    }
}

/// Parsed configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub artifacts: Vec<ArtifactSection>,
}

impl Manifest {
    /// Parse a manifest from TOML content
    ///
    /// ```
    /// use sqlupload_core::config::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [sync]
    /// target_path = "/var/www/html/weewx"
    ///
    /// [[artifacts]]
    /// id = "index.html"
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.artifacts.len(), 1);
    /// assert_eq!(manifest.sync.output_extension, "php");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Load a manifest from disk; the format follows the file extension.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_native(),
            });
        }
        tracing::debug!(%path, "Loading manifest");
        Ok(ConfigStore::new().load(path)?)
    }

    /// Apply command-line overrides.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.sync.dry_run |= dry_run;
        self
    }
}
