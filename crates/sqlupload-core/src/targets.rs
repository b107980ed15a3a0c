//! Link target set
//!
//! Built once per run from the resolved artifacts. An artifact is a target
//! when its shell is written under the output extension, so every reference
//! to it has to be renamed as well.

use crate::config::{Action, ResolvedArtifact};
use sqlupload_split::LinkTargets;

/// Collect the rewrite targets among `artifacts`.
pub fn build_link_targets(artifacts: &[ResolvedArtifact], output_extension: &str) -> LinkTargets {
    LinkTargets::new(
        artifacts
            .iter()
            .filter(|a| a.is_rewrite_target())
            .map(|a| a.file.clone()),
        output_extension,
    )
}

/// The targets an artifact rewrites its own references against.
///
/// Artifacts without `rewrite-links` leave their references alone.
pub fn targets_for<'a>(
    artifact: &ResolvedArtifact,
    targets: &'a LinkTargets,
    none: &'a LinkTargets,
) -> &'a LinkTargets {
    if artifact.has(Action::RewriteLinks) {
        targets
    } else {
        none
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactSection, SyncSection, resolve};
    use sqlupload_fs::NormalizedPath;

    fn resolved(section: ArtifactSection) -> ResolvedArtifact {
        resolve(
            &SyncSection::default(),
            &NormalizedPath::new("/srv"),
            &section,
        )
    }

    #[test]
    fn only_renamed_shells_are_targets() {
        let renamed = resolved(ArtifactSection::new("week.html"));

        let mut kept = ArtifactSection::new("month.html");
        kept.replace_extension = Some(false);

        let mut no_shell = ArtifactSection::new("year.html");
        no_shell.write_shell = Some(false);

        let mut disabled = ArtifactSection::new("day.html");
        disabled.enable = false;

        let mut no_links = ArtifactSection::new("chart.json");
        no_links.actions = Some([Action::Store, Action::WriteShell].into_iter().collect());

        let artifacts = vec![
            renamed,
            resolved(kept),
            resolved(no_shell),
            resolved(disabled),
            resolved(no_links),
        ];
        let targets = build_link_targets(&artifacts, "php");

        assert_eq!(targets.len(), 1);
        assert!(targets.contains("week.html"));
    }

    #[test]
    fn artifact_without_rewrite_links_gets_empty_set() {
        let all = LinkTargets::new(["a.html"], "php");
        let none = LinkTargets::none();

        let mut section = ArtifactSection::new("b.html");
        section.actions = Some([Action::Store].into_iter().collect());
        assert!(targets_for(&resolved(section), &all, &none).is_empty());
        assert!(!targets_for(&resolved(ArtifactSection::new("c.html")), &all, &none).is_empty());
    }
}
