//! Core types passed between the pipeline controller and its callers

use crate::forensic::{ForensicLog, QaStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Listing context forwarded to every remote collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Project or listing identifier
    pub project_id: Option<String>,
    /// Item category, e.g. "sneakers" or "handbag"
    pub category: Option<String>,
    /// Requested backdrop, e.g. "warm beige studio"
    pub background_style: Option<String>,
    /// Free-form hints appended to the generation prompt
    pub hints: Vec<String>,
}

/// One image submitted to the pipeline
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Base filename used to name the artifacts
    pub name: String,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    pub context: ProjectContext,
}

impl PipelineInput {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            context: ProjectContext::default(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ProjectContext) -> Self {
        self.context = context;
        self
    }

    /// Read an input from disk, named after its file name
    ///
    /// # Errors
    /// - File cannot be read
    pub async fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path_ref = path.as_ref();
        let bytes = tokio::fs::read(path_ref).await.map_err(|e| {
            crate::PipelineError::file_io_error("read input image", path_ref, &e)
        })?;
        Ok(Self::new(input_name(path_ref), bytes))
    }

    /// Filename stem without extension or path separators
    #[must_use]
    pub fn base_name(&self) -> String {
        let stem = Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        stem.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

/// Input name for a file: its file name, or "image" when it has none
pub(crate) fn input_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}

/// Per-run options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Bypass Stage 3 and attach a stub forensic log
    pub skip_qa: bool,
}

/// Locations of the artifacts written for one image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub mask: Option<PathBuf>,
    pub edited: Option<PathBuf>,
    pub forensic_log: Option<PathBuf>,
}

/// Terminal value of one image's pipeline run
///
/// `success` reports whether the pipeline ran to completion. Whether the image
/// may be published is a separate question answered by [`PipelineResult::is_safe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub image_id: String,
    pub run_id: String,
    pub input_name: String,
    pub artifacts: ArtifactPaths,
    /// Absent only when the run aborted before Stage 3
    pub forensic_log: Option<ForensicLog>,
    pub total_time_ms: u64,
    pub cost_estimate_usd: f64,
    pub error: Option<String>,
}

impl PipelineResult {
    /// Completed run whose forensic log clears the publishing gate
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.success && self.forensic_log.as_ref().is_some_and(|log| log.vinted_safe)
    }

    #[must_use]
    pub fn qa_status(&self) -> Option<QaStatus> {
        self.forensic_log.as_ref().map(ForensicLog::qa_status)
    }
}
