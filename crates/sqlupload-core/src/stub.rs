//! PHP fetch stubs
//!
//! At serve time a stub looks up the artifact's row by id and streams the
//! stored payload. The connection details and the lookup itself live in the
//! shared bootstrap resource, so a stub only carries the id and a relative
//! path to that resource.
//!
//! The bootstrap defines two functions:
//!
//! - `sqlupload_echo($id)` prints the payload (used inside a markup shell,
//!   where headers have already been sent).
//! - `sqlupload_serve($id)` sets `Content-Type` from the row's `content_type`
//!   and `Last-Modified` from `modification_time`, then prints the payload.
//!
//! Every stub assigns `$sqlupload_id='<id>'`, which also identifies a file
//! that has already been replaced by its shell.

use crate::config::{ResolvedArtifact, StoreSection};

const BOOTSTRAP_TEMPLATE: &str = r#"<?php
// Generated by sqlupload. Rewritten on every start.

function sqlupload_row($id) {
  static $db = null;
  if ($db === null) {
    $db = new PDO('@DSN@');
    $db->setAttribute(PDO::ATTR_ERRMODE, PDO::ERRMODE_EXCEPTION);
  }
  $stmt = $db->prepare('SELECT text, content_type, modification_time FROM "@TABLE@" WHERE id=?');
  $stmt->execute(array($id));
  $row = $stmt->fetch(PDO::FETCH_ASSOC);
  return $row === false ? null : $row;
}

function sqlupload_echo($id) {
  $row = sqlupload_row($id);
  if ($row !== null) {
    echo $row['text'];
  }
}

function sqlupload_serve($id) {
  $row = sqlupload_row($id);
  if ($row === null) {
    http_response_code(404);
    return;
  }
  if (!empty($row['content_type'])) {
    header('Content-Type: ' . $row['content_type']);
  }
  if (!empty($row['modification_time'])) {
    $modified = strtotime($row['modification_time']);
    if ($modified !== false) {
      header('Last-Modified: ' . gmdate('D, d M Y H:i:s', $modified) . ' GMT');
    }
  }
  echo $row['text'];
}
"#;

/// Renders fetch stubs for one bootstrap location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubRenderer {
    bootstrap: String,
}

impl StubRenderer {
    /// `bootstrap` is relative to the target directory.
    pub fn new(bootstrap: impl Into<String>) -> Self {
        Self {
            bootstrap: bootstrap.into(),
        }
    }

    /// Target-relative location of the bootstrap resource.
    pub fn bootstrap_path(&self) -> &str {
        self.bootstrap.trim_start_matches('/')
    }

    /// Stub embedded in a markup shell at the start of the dynamic region.
    pub fn inline(&self, artifact: &ResolvedArtifact) -> String {
        format!(
            "<?php {}; require_once '{}'; sqlupload_echo($sqlupload_id); ?>",
            marker(&artifact.id),
            php_escape(&self.bootstrap_from(artifact.depth()))
        )
    }

    /// Stub that is the whole shell of a script or opaque artifact.
    pub fn standalone(&self, artifact: &ResolvedArtifact) -> String {
        format!(
            "<?php\n  {};\n  require_once '{}';\n  sqlupload_serve($sqlupload_id);\n?>\n",
            marker(&artifact.id),
            php_escape(&self.bootstrap_from(artifact.depth()))
        )
    }

    /// Whether `content` already embeds a stub for `artifact`.
    pub fn is_shell_of(&self, artifact: &ResolvedArtifact, content: &[u8]) -> bool {
        let marker = marker(&artifact.id);
        content
            .windows(marker.len())
            .any(|window| window == marker.as_bytes())
    }

    /// The bootstrap resource every stub requires.
    ///
    /// It opens the record database through PDO and defines
    /// `sqlupload_echo` and `sqlupload_serve`.
    pub fn bootstrap(&self, store: &StoreSection) -> String {
        let dsn = store.database.as_deref().map(pdo_dsn).unwrap_or_default();
        BOOTSTRAP_TEMPLATE
            .replace("@DSN@", &php_escape(&dsn))
            .replace("@TABLE@", store.table())
    }

    /// Relative path from a file `depth` directories down to the bootstrap.
    fn bootstrap_from(&self, depth: usize) -> String {
        format!("{}{}", "../".repeat(depth), self.bootstrap_path())
    }
}

fn marker(id: &str) -> String {
    format!("$sqlupload_id='{}'", php_escape(id))
}

/// PDO data source name for a `sqlite:` database URL.
fn pdo_dsn(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    format!("sqlite:{path}")
}

/// Escape for a single-quoted PHP string literal.
fn php_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Append `; charset=<encoding>` to textual content types.
pub fn with_charset(content_type: &str, encoding: &str) -> String {
    let textual = content_type.starts_with("text/")
        || matches!(
            content_type,
            "application/json" | "application/xml" | "application/rss+xml" | "image/svg+xml"
        );
    if textual && !encoding.is_empty() && !content_type.contains("charset=") {
        format!("{content_type}; charset={encoding}")
    } else {
        content_type.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactSection, SyncSection, resolve};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sqlupload_fs::NormalizedPath;

    fn artifact(id: &str) -> ResolvedArtifact {
        resolve(
            &SyncSection::default(),
            &NormalizedPath::new("/srv"),
            &ArtifactSection::new(id),
        )
    }

    #[test]
    fn inline_stub_is_one_line() {
        let stub = StubRenderer::new("connect.php").inline(&artifact("index.html"));
        assert_eq!(
            stub,
            "<?php $sqlupload_id='index.html'; require_once 'connect.php'; sqlupload_echo($sqlupload_id); ?>"
        );
    }

    #[test]
    fn nested_artifact_climbs_to_bootstrap() {
        let stub = StubRenderer::new("connect.php").standalone(&artifact("NOAA/NOAA-2024.txt"));
        assert!(stub.contains("require_once '../connect.php';"));
        assert!(stub.contains("sqlupload_serve($sqlupload_id);"));
    }

    #[test]
    fn id_is_escaped() {
        let stub = StubRenderer::new("c.php").inline(&artifact("it's\\x.html"));
        assert!(stub.contains(r"$sqlupload_id='it\'s\\x.html';"));
    }

    #[test]
    fn shell_is_recognized_by_its_marker() {
        let renderer = StubRenderer::new("connect.php");
        let index = artifact("index.html");
        let shell = format!("<html><body>{}</body></html>", renderer.inline(&index));

        assert!(renderer.is_shell_of(&index, shell.as_bytes()));
        assert!(renderer.is_shell_of(&index, renderer.standalone(&index).as_bytes()));
        assert!(!renderer.is_shell_of(&artifact("week.html"), shell.as_bytes()));
        assert!(!renderer.is_shell_of(&index, b"<p>21.3</p>"));
    }

    #[test]
    fn bootstrap_defines_lookup_for_configured_table() {
        let store = StoreSection {
            database: Some("sqlite:///var/lib/weewx/upload.sdb?mode=rwc".into()),
            table_name: Some("archive_files".into()),
        };
        let php = StubRenderer::new("/connect.php").bootstrap(&store);

        assert!(php.starts_with("<?php"));
        assert!(php.contains("new PDO('sqlite:/var/lib/weewx/upload.sdb')"));
        assert!(php.contains(
            r#"SELECT text, content_type, modification_time FROM "archive_files" WHERE id=?"#
        ));
        assert!(php.contains("function sqlupload_echo($id)"));
        assert!(php.contains("function sqlupload_serve($id)"));
        assert!(php.contains("header('Content-Type: '"));
        assert!(php.contains("header('Last-Modified: '"));
    }

    #[test]
    fn bootstrap_uses_default_table() {
        let php = StubRenderer::new("connect.php").bootstrap(&StoreSection::default());
        assert!(php.contains(r#"FROM "weewx_files""#));
    }

    #[rstest]
    #[case("sqlite:///srv/upload.sdb", "sqlite:/srv/upload.sdb")]
    #[case("sqlite://upload.sdb", "sqlite:upload.sdb")]
    #[case("sqlite:upload.sdb?mode=rwc", "sqlite:upload.sdb")]
    fn database_url_becomes_pdo_dsn(#[case] url: &str, #[case] dsn: &str) {
        assert_eq!(pdo_dsn(url), dsn);
    }

    #[test]
    fn charset_only_for_text() {
        assert_eq!(with_charset("text/html", "utf-8"), "text/html; charset=utf-8");
        assert_eq!(
            with_charset("application/json", "utf-8"),
            "application/json; charset=utf-8"
        );
        assert_eq!(with_charset("image/png", "utf-8"), "image/png");
        assert_eq!(
            with_charset("text/plain; charset=latin1", "utf-8"),
            "text/plain; charset=latin1"
        );
    }
}
