//! On-disk artifact persistence
//!
//! Layout under the output root:
//! - `masks/<run_id>_<base>_mask.<ext>`
//! - `edited/<run_id>_<base>_edited.<ext>`
//! - `logs/<run_id>_<base>_forensic.json`
//!
//! Every file is written to a temporary sibling and then persisted under its
//! final name, so readers never observe a partial artifact.

use crate::{
    error::{PipelineError, Result},
    forensic::ForensicLog,
};
use std::io::Write;
use std::path::{Path, PathBuf};

const MASK_DIR: &str = "masks";
const EDITED_DIR: &str = "edited";
const LOG_DIR: &str = "logs";

/// Kinds of artifact the pipeline persists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Mask,
    Edited,
    ForensicLog,
}

impl ArtifactKind {
    fn directory(self) -> &'static str {
        match self {
            Self::Mask => MASK_DIR,
            Self::Edited => EDITED_DIR,
            Self::ForensicLog => LOG_DIR,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Mask => "mask",
            Self::Edited => "edited",
            Self::ForensicLog => "forensic",
        }
    }
}

/// Writes pipeline artifacts below one root directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of an artifact: `<root>/<dir>/<run_id>_<base>_<kind>.<ext>`
    #[must_use]
    pub fn artifact_path(&self, kind: ArtifactKind, run_id: &str, base: &str, ext: &str) -> PathBuf {
        self.root
            .join(kind.directory())
            .join(format!("{}_{}_{}.{}", run_id, base, kind.suffix(), ext))
    }

    /// Persist a mask, keeping the extension of its encoded format
    ///
    /// # Errors
    /// - Directory creation or write failure
    pub async fn write_mask(&self, run_id: &str, base: &str, bytes: Vec<u8>) -> Result<PathBuf> {
        let path = self.artifact_path(ArtifactKind::Mask, run_id, base, image_extension(&bytes));
        write_atomic(path, bytes).await
    }

    /// Persist the edited image, keeping the extension of its encoded format
    ///
    /// # Errors
    /// - Directory creation or write failure
    pub async fn write_edited(&self, run_id: &str, base: &str, bytes: Vec<u8>) -> Result<PathBuf> {
        let path = self.artifact_path(ArtifactKind::Edited, run_id, base, image_extension(&bytes));
        write_atomic(path, bytes).await
    }

    /// Persist a forensic log as pretty JSON
    ///
    /// # Errors
    /// - Serialization, directory creation or write failure
    pub async fn write_forensic_log(
        &self,
        run_id: &str,
        base: &str,
        log: &ForensicLog,
    ) -> Result<PathBuf> {
        let json = log.to_json()?;
        let path = self.artifact_path(ArtifactKind::ForensicLog, run_id, base, "json");
        write_atomic(path, json.into_bytes()).await
    }
}

/// Extension of the sniffed image format; png when unrecognised
fn image_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Write `bytes` to `path` via a temporary file on a blocking thread
async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes).map(|()| path))
        .await
        .map_err(|e| PipelineError::artifact_write(format!("Write task failed: {}", e)))?
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        PipelineError::artifact_write(format!("'{}' has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(dir)
        .map_err(|e| PipelineError::file_io_error("create artifact directory", dir, &e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| PipelineError::file_io_error("create temporary artifact", dir, &e))?;
    temp.write_all(bytes)
        .map_err(|e| PipelineError::file_io_error("write temporary artifact", temp.path(), &e))?;
    temp.persist(path).map_err(|e| {
        PipelineError::artifact_write(format!("Failed to persist '{}': {}", path.display(), e))
    })?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
