//! Action vocabulary
//!
//! Every artifact resolves to an [`ActionSet`] drawn from this fixed list.
//! Action names are written in kebab-case in configuration files; unknown
//! names are rejected when the configuration is parsed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Write the payload to the record store
    Store,
    /// Materialize the shell on disk
    WriteShell,
    /// Be a rewrite target and rewrite outgoing references
    RewriteLinks,
    /// Tell the co-located transfer component the output is already in place
    SuppressDownstreamTransfer,
    /// Remove the source file when the output name differs from it
    DeleteOriginal,
    /// Write the shell over the source file under its original name
    KeepOriginalExtension,
    /// Only process on the first run after process start
    RunOnce,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Store,
        Action::WriteShell,
        Action::RewriteLinks,
        Action::SuppressDownstreamTransfer,
        Action::DeleteOriginal,
        Action::KeepOriginalExtension,
        Action::RunOnce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Store => "store",
            Action::WriteShell => "write-shell",
            Action::RewriteLinks => "rewrite-links",
            Action::SuppressDownstreamTransfer => "suppress-downstream-transfer",
            Action::DeleteOriginal => "delete-original",
            Action::KeepOriginalExtension => "keep-original-extension",
            Action::RunOnce => "run-once",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved set of actions for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The global default: store, write the shell, rewrite links and remove
    /// the renamed original.
    pub fn standard() -> Self {
        [
            Action::Store,
            Action::WriteShell,
            Action::RewriteLinks,
            Action::DeleteOriginal,
        ]
        .into_iter()
        .collect()
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn insert(&mut self, action: Action) -> bool {
        self.0.insert(action)
    }

    pub fn remove(&mut self, action: Action) -> bool {
        self.0.remove(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Action::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        actions: ActionSet,
    }

    #[test]
    fn parses_kebab_case_names() {
        let w: Wrapper =
            toml::from_str(r#"actions = ["store", "keep-original-extension", "run-once"]"#)
                .unwrap();
        assert!(w.actions.contains(Action::Store));
        assert!(w.actions.contains(Action::KeepOriginalExtension));
        assert!(w.actions.contains(Action::RunOnce));
        assert!(!w.actions.contains(Action::WriteShell));
    }

    #[test]
    fn rejects_unknown_action() {
        let result: Result<Wrapper, _> = toml::from_str(r#"actions = ["upload"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn names_match_serde() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn display_lists_sorted_names() {
        assert_eq!(
            ActionSet::standard().to_string(),
            "[store, write-shell, rewrite-links, delete-original]"
        );
    }
}
