//! Action policy resolution
//!
//! Overlays each `[[artifacts]]` entry on the `[sync]` defaults. Every
//! artifact gets a freshly built [`ActionSet`]; the defaults are only read.

use crate::targets::build_link_targets;
use crate::{Error, Result};
use regex::Regex;
use sqlupload_fs::NormalizedPath;
use sqlupload_split::{ContentCategory, LinkTargets};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::actions::{Action, ActionSet};
use super::manifest::{ArtifactSection, Manifest, StoreSection, SyncSection};

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex"));

/// One artifact with its policy fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArtifact {
    pub id: String,
    /// Source file relative to the target directory
    pub file: String,
    /// Absolute source path
    pub source: NormalizedPath,
    /// Lowercase file-name extension, empty when there is none
    pub extension: String,
    pub category: ContentCategory,
    pub actions: ActionSet,
    pub divider_tag: String,
    pub content_type: Option<String>,
    pub encoding: String,
    pub enabled: bool,
}

impl ResolvedArtifact {
    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(action)
    }

    pub fn keeps_extension(&self) -> bool {
        self.has(Action::KeepOriginalExtension)
    }

    /// Whether references to this artifact must follow its rename.
    pub fn is_rewrite_target(&self) -> bool {
        self.enabled
            && self.has(Action::RewriteLinks)
            && self.has(Action::WriteShell)
            && !self.keeps_extension()
    }

    /// Where the shell ends up on disk.
    pub fn output_path(&self, output_extension: &str) -> NormalizedPath {
        if self.keeps_extension() {
            self.source.clone()
        } else {
            self.source.with_extension(output_extension)
        }
    }

    /// Directory depth of the source below the target directory.
    pub fn depth(&self) -> usize {
        NormalizedPath::new(&self.file).depth()
    }
}

/// Resolve the action set for one artifact.
///
/// A key present in `section` replaces the global value entirely. The legacy
/// switches are applied last: `write_shell = false` removes `write-shell`,
/// `replace_extension = false` adds `keep-original-extension`, and
/// `run_once = true` adds `run-once`.
pub fn resolve_actions(defaults: &SyncSection, section: &ArtifactSection) -> ActionSet {
    let mut actions = match &section.actions {
        Some(own) => own.clone(),
        None => defaults.actions.clone(),
    };

    if !section.write_shell.unwrap_or(defaults.write_shell) {
        actions.remove(Action::WriteShell);
    }
    if !section.replace_extension.unwrap_or(defaults.replace_extension) {
        actions.insert(Action::KeepOriginalExtension);
    }
    if section.run_once {
        actions.insert(Action::RunOnce);
    }
    actions
}

/// Resolve one artifact against the defaults and the target directory.
pub fn resolve(
    defaults: &SyncSection,
    root: &NormalizedPath,
    section: &ArtifactSection,
) -> ResolvedArtifact {
    let file = section.file().to_string();
    let source = root.join(&file);
    let extension = source
        .extension()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    ResolvedArtifact {
        id: section.id.clone(),
        category: ContentCategory::from_extension(&extension),
        actions: resolve_actions(defaults, section),
        divider_tag: section
            .html_divide_tag
            .clone()
            .unwrap_or_else(|| defaults.html_divide_tag.clone()),
        content_type: section
            .content_type
            .clone()
            .or_else(|| defaults.content_type.clone()),
        encoding: section
            .encoding
            .clone()
            .unwrap_or_else(|| defaults.encoding.clone()),
        enabled: section.enable,
        file,
        source,
        extension,
    }
}

/// Everything a run needs, derived from a validated manifest
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub settings: SyncSection,
    pub store: StoreSection,
    pub root: NormalizedPath,
    pub ledger_path: NormalizedPath,
    pub transfer_ledger_path: Option<NormalizedPath>,
    pub artifacts: Vec<ResolvedArtifact>,
    pub targets: LinkTargets,
}

impl SyncPlan {
    /// Validate `manifest` and resolve every artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for missing or inconsistent settings.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let settings = manifest.sync.clone();

        let root = match settings.target_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => NormalizedPath::new(expand_home(path)),
            _ => return Err(Error::config("sync.target_path is required")),
        };

        let output_extension = settings.output_extension.trim_start_matches('.');
        if output_extension.is_empty() {
            return Err(Error::config("sync.output_extension must not be empty"));
        }

        let mut seen = HashSet::new();
        for section in &manifest.artifacts {
            if section.id.trim().is_empty() {
                return Err(Error::config("artifact id must not be empty"));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(Error::config(format!("duplicate artifact id '{}'", section.id)));
            }
        }

        let artifacts: Vec<ResolvedArtifact> = manifest
            .artifacts
            .iter()
            .map(|section| resolve(&settings, &root, section))
            .collect();

        let stores = artifacts
            .iter()
            .any(|a| a.enabled && a.has(Action::Store));
        if stores && !settings.dry_run {
            let database = manifest.store.database.as_deref().unwrap_or("").trim();
            if database.is_empty() {
                return Err(Error::config("store.database is required"));
            }
            if manifest.store.table_name.is_none() {
                return Err(Error::config("store.table_name is required"));
            }
        }
        if let Some(table) = &manifest.store.table_name
            && !IDENTIFIER_REGEX.is_match(table)
        {
            return Err(Error::config(format!(
                "store.table_name '{table}' is not a plain SQL identifier"
            )));
        }

        let transfer_ledger_path = settings
            .transfer_ledger
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| root.join(p));
        if transfer_ledger_path.is_none()
            && let Some(artifact) = artifacts
                .iter()
                .find(|a| a.enabled && a.has(Action::SuppressDownstreamTransfer))
        {
            return Err(Error::config(format!(
                "artifact '{}' uses suppress-downstream-transfer but sync.transfer_ledger is not set",
                artifact.id
            )));
        }

        let targets = build_link_targets(&artifacts, output_extension);
        tracing::debug!(
            artifacts = artifacts.len(),
            targets = targets.len(),
            %root,
            "Resolved sync plan"
        );

        Ok(Self {
            ledger_path: root.join(&settings.ledger_file),
            store: manifest.store.clone(),
            root,
            transfer_ledger_path,
            artifacts,
            targets,
            settings,
        })
    }

    pub fn output_extension(&self) -> &str {
        self.targets.output_extension()
    }

    pub fn artifact(&self, id: &str) -> Option<&ResolvedArtifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest).to_string_lossy().into_owned();
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defaults() -> SyncSection {
        SyncSection {
            target_path: Some("/srv/www".into()),
            ..SyncSection::default()
        }
    }

    #[test]
    fn test_absent_keys_inherit() {
        let root = NormalizedPath::new("/srv/www");
        let artifact = resolve(&defaults(), &root, &ArtifactSection::new("NOAA/year.TXT"));
        assert_eq!(artifact.actions, ActionSet::standard());
        assert_eq!(artifact.divider_tag, "html");
        assert_eq!(artifact.extension, "txt");
        assert_eq!(artifact.source.as_str(), "/srv/www/NOAA/year.TXT");
        assert_eq!(artifact.depth(), 1);
    }

    #[test]
    fn test_output_path_follows_extension_mode() {
        let root = NormalizedPath::new("/srv/www");
        let mut section = ArtifactSection::new("index.html");
        let renamed = resolve(&defaults(), &root, &section);
        assert_eq!(renamed.output_path("php").as_str(), "/srv/www/index.php");

        section.replace_extension = Some(false);
        let kept = resolve(&defaults(), &root, &section);
        assert_eq!(kept.output_path("php").as_str(), "/srv/www/index.html");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/var/www"), "/var/www");
        assert_eq!(expand_home("rel/~/x"), "rel/~/x");
    }
}
