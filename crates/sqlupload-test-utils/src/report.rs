//! [`ReportTree`] builder for sync test scenarios.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

/// A temporary directory holding a generated report tree under `www/`,
/// plus room for a config file and a database next to it.
///
/// # Example
///
/// ```rust,no_run
/// use sqlupload_test_utils::ReportTree;
///
/// let tree = ReportTree::new();
/// tree.write("index.html", "<html><body>21.3</body></html>");
/// let config = tree.write_config("html_divide_tag = \"body\"", "[[artifacts]]\nid = \"index.html\"\n");
/// tree.assert_file_exists("index.html");
/// ```
pub struct ReportTree {
    temp_dir: TempDir,
}

impl Default for ReportTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportTree {
    /// Create an empty tree with its `www/` target directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("www")).unwrap();
        Self { temp_dir }
    }

    /// Root of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory the report files live in.
    pub fn target(&self) -> PathBuf {
        self.root().join("www")
    }

    /// Absolute path of a report file.
    pub fn path(&self, file: &str) -> PathBuf {
        self.target().join(file)
    }

    /// SQLite URL for a database file next to the tree.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.root().join("upload.sdb").display())
    }

    /// Write a report file, creating parent directories.
    pub fn write(&self, file: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Read a report file as text.
    pub fn read(&self, file: &str) -> String {
        let path = self.path(file);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path(file).exists()
    }

    /// Set a report file's modification time to `epoch` seconds.
    pub fn set_modified(&self, file: &str, epoch: u64) {
        let path = self.path(file);
        let handle = File::options().write(true).open(&path).unwrap();
        handle
            .set_modified(UNIX_EPOCH + Duration::from_secs(epoch))
            .unwrap();
    }

    /// Render a TOML config for this tree.
    ///
    /// `sync_extra` is appended to the `[sync]` table after `target_path`;
    /// `rest` follows as further tables.
    pub fn config(&self, sync_extra: &str, rest: &str) -> String {
        format!(
            "[sync]\ntarget_path = '{}'\n{}\n\n[store]\ndatabase = '{}'\ntable_name = \"weewx_files\"\n\n{}",
            self.target().display(),
            sync_extra,
            self.database_url(),
            rest
        )
    }

    /// Write [`config`](Self::config) to `config.toml` at the root.
    pub fn write_config(&self, sync_extra: &str, rest: &str) -> PathBuf {
        let path = self.root().join("config.toml");
        fs::write(&path, self.config(sync_extra, rest)).unwrap();
        path
    }

    /// Assert that `file` (relative to the target directory) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, file: &str) {
        let full_path = self.path(file);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `file` (relative to the target directory) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, file: &str) {
        let full_path = self.path(file);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `file` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, file: &str, content: &str) {
        let file_content = self.read(file);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            file,
            content,
            file_content
        );
    }
}
