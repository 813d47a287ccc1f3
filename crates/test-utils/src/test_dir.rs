//! Temporary directory management for tests.
//!
//! [`TestDir`] wraps [`tempfile::TempDir`] with helpers for the files tests
//! stage on disk: classifier staging directories and simulator configs.

// Test utilities are expected to panic on failure - that's their purpose
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A managed temporary directory for tests.
///
/// The directory is automatically cleaned up when this struct is dropped.
///
/// # Example
///
/// ```
/// use sollytch_ledger_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let config = dir.write_file("sim.toml", "[classifier]\ncache_enabled = true\n");
/// assert!(config.exists());
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Create a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Join a relative path to the temporary directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Writes `contents` to a file under the directory, creating parents.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_file<P: AsRef<Path>>(&self, path: P, contents: impl AsRef<[u8]>) -> PathBuf {
        let full = self.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent directories");
        }
        std::fs::write(&full, contents).expect("failed to write test file");
        full
    }

    /// Number of entries directly inside the directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be read.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        std::fs::read_dir(self.path()).expect("failed to read temp directory").count()
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
