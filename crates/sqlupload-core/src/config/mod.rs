//! Configuration surface and action policy resolution
//!
//! A single manifest (TOML, or JSON/YAML by extension) drives a run:
//!
//! ```toml
//! [sync]
//! target_path = "/var/www/html/weewx"
//! html_divide_tag = "body"
//!
//! [store]
//! database = "sqlite:///var/lib/weewx/sqlupload.sdb"
//! table_name = "weewx_files"
//!
//! [[artifacts]]
//! id = "index.html"
//!
//! [[artifacts]]
//! id = "daytemp.png"
//! actions = ["store", "write-shell"]
//! ```
//!
//! [`SyncPlan::from_manifest`] validates the manifest and resolves every
//! artifact into a [`ResolvedArtifact`].

mod actions;
mod manifest;
mod resolver;

pub use actions::{Action, ActionSet};
pub use manifest::{ArtifactSection, DEFAULT_TABLE_NAME, Manifest, StoreSection, SyncSection};
pub use resolver::{ResolvedArtifact, SyncPlan, resolve, resolve_actions};

use sqlupload_fs::NormalizedPath;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SQLUPLOAD_CONFIG";

/// Locate the configuration file: explicit path, then `$SQLUPLOAD_CONFIG`,
/// then `<config_dir>/sqlupload/config.toml`.
pub fn default_config_path(explicit: Option<&str>) -> Option<NormalizedPath> {
    if let Some(path) = explicit {
        return Some(NormalizedPath::new(path));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return Some(NormalizedPath::new(path));
    }
    dirs::config_dir().map(|dir| NormalizedPath::new(dir.join("sqlupload").join("config.toml")))
}
