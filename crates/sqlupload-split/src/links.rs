//! Link rewrite rule shared by the markup splitter and the script rewriter.
//!
//! An artifact whose on-disk name changes (its extension is replaced by the
//! fixed output extension) is a *rewrite target*. References to it from other
//! artifacts have to follow the rename, otherwise they would point at a file
//! that no longer exists.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Matches a leading URI scheme (`http:`, `mailto:`, `data:`) or a
/// protocol-relative `//host` prefix.
static ABSOLUTE_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*:|//)").expect("Invalid absolute link regex")
});

/// The set of artifact paths whose output file name changes, together with
/// the extension they change to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTargets {
    paths: BTreeSet<String>,
    output_extension: String,
}

impl LinkTargets {
    /// Create a target set.
    ///
    /// `output_extension` may be given with or without the leading dot.
    pub fn new<I, S>(paths: I, output_extension: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| {
                    let p: String = p.into();
                    strip_relative_prefixes(&p).to_string()
                })
                .filter(|p| !p.is_empty())
                .collect(),
            output_extension: output_extension.trim_start_matches('.').to_string(),
        }
    }

    /// An empty target set: nothing is rewritten.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// Whether `path` (after relative-prefix normalization) is a target.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(strip_relative_prefixes(path))
    }

    /// Iterate targets with the longest paths first.
    ///
    /// Textual replacement must try `daytemp.html` before `temp.html`.
    pub fn longest_first(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.paths.iter().map(String::as_str).collect();
        paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        paths
    }

    /// Replace the extension of the last path segment with the output extension.
    pub fn rename(&self, path: &str) -> String {
        let segment_start = path.rfind('/').map_or(0, |i| i + 1);
        match path[segment_start..].rfind('.') {
            Some(dot) if dot > 0 => format!(
                "{}.{}",
                &path[..segment_start + dot],
                self.output_extension
            ),
            _ => format!("{}.{}", path, self.output_extension),
        }
    }

    /// Rewrite an anchor `href` value.
    ///
    /// The value is split at its first `?`, or at its first `#` when there is
    /// no `?`. Returns `None` when the value is left untouched.
    pub fn rewrite_href(&self, value: &str) -> Option<String> {
        let separator = value.find('?').or_else(|| value.find('#'));
        self.rewrite_at(value, separator)
    }

    /// Rewrite a `src` value. Only a query string is split off.
    pub fn rewrite_src(&self, value: &str) -> Option<String> {
        self.rewrite_at(value, value.find('?'))
    }

    fn rewrite_at(&self, value: &str, separator: Option<usize>) -> Option<String> {
        if self.paths.is_empty() || value.is_empty() || is_absolute_link(value) {
            return None;
        }
        let (path, suffix) = match separator {
            Some(idx) => value.split_at(idx),
            None => (value, ""),
        };
        if path.is_empty() || !self.contains(path) {
            return None;
        }
        Some(format!("{}{}", self.rename(path), suffix))
    }
}

/// Whether a link begins with a URI scheme and therefore never points at a
/// local artifact.
pub fn is_absolute_link(value: &str) -> bool {
    ABSOLUTE_LINK_REGEX.is_match(value.trim_start())
}

/// Strip any leading `./` and `../` segments.
pub fn strip_relative_prefixes(path: &str) -> &str {
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else {
            return rest;
        }
    }
}
