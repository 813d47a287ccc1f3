//! Transaction-local staging of classifier artifacts.
//!
//! The runtime reads a classifier from a file. Decoded model bytes are written
//! to a uniquely named temporary file that is removed when the guard drops.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use sollytch_ledger_types::Purpose;

/// A staged classifier artifact, deleted on drop.
#[derive(Debug)]
pub struct StagedArtifact {
    file: NamedTempFile,
}

impl StagedArtifact {
    /// Writes `bytes` to a fresh temporary file in `dir`, or in the system
    /// temporary directory when `dir` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created or written.
    pub fn stage(purpose: Purpose, bytes: &[u8], dir: Option<&Path>) -> std::io::Result<Self> {
        let prefix = format!("{}-", purpose.key());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".tree");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;
        debug!(purpose = %purpose, path = %file.path().display(), len = bytes.len(), "Staged");
        Ok(Self { file })
    }

    /// Path of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
