//! [`DocumentDir`] builder for desired-state documents on disk.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory holding desired-state documents.
///
/// # Example
///
/// ```rust,no_run
/// use kvsync_test_utils::DocumentDir;
///
/// let docs = DocumentDir::new()
///     .with_file("10-acl.yml", "policies:\n  - name: web\n")
///     .with_file("20-kv.yml", "kv:\n  web/port: 80\n");
/// let doc = kvsync_core::load_path(docs.root()).unwrap();
/// ```
pub struct DocumentDir {
    temp_dir: TempDir,
}

impl Default for DocumentDir {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentDir {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of `name` inside the directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Write `content` to `name`, creating parent directories as needed.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Builder form of [`DocumentDir::write`].
    pub fn with_file(self, name: &str, content: &str) -> Self {
        self.write(name, content);
        self
    }
}
