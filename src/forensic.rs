//! Forensic log: the persisted, hash-anchored record of one processed image
//!
//! A `ForensicLog` is built once, either by the QA validator or as a stub when
//! QA is skipped, and is never mutated afterwards. The serialized field names
//! form the compliance artifact's schema and must stay stable.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Stage name for mask generation
pub const STAGE_MASK_GENERATION: &str = "mask_generation";
/// Stage name for background replacement
pub const STAGE_BACKGROUND_REPLACEMENT: &str = "background_replacement";
/// Stage name for QA validation
pub const STAGE_QA_VALIDATION: &str = "qa_validation";

/// Recommendation attached to a passing verdict
pub const RECOMMENDATION_PASS: &str =
    "Subject preserved. Edited image is safe to publish on the listing.";
/// Recommendation attached to a failing verdict
pub const RECOMMENDATION_FAIL: &str =
    "Subject may have been altered. Review manually or regenerate before publishing.";
/// Recommendation attached to a skipped verification
pub const RECOMMENDATION_SKIPPED: &str =
    "QA validation was skipped. Subject integrity was not verified.";

/// `sha256:<hex>` digest of raw bytes
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// QA verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaStatus {
    Pass,
    Fail,
    Skipped,
}

impl QaStatus {
    /// Inclusive threshold comparison
    #[must_use]
    pub fn from_score(ssim_score: f64, threshold: f64) -> Self {
        if ssim_score >= threshold {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

impl std::fmt::Display for QaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Whether the subject survived editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectIntegrity {
    Preserved,
    Modified,
}

/// Stage-1 summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStageOutput {
    pub mask_generation_time_ms: u64,
    pub success: bool,
}

/// Stage-2 summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementStageOutput {
    pub inpaint_time_ms: u64,
    pub model: String,
    pub smart_prompt: String,
    pub success: bool,
}

/// Stage-3 verdict block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaOutput {
    /// Percentage of subject pixels changed beyond noise; -1 on failure
    pub pixel_delta_percent: f64,
    /// Subject SSIM; -1 on failure
    pub ssim_score: f64,
    pub qa_status: QaStatus,
    pub subject_integrity: SubjectIntegrity,
    pub recommendation: String,
}

impl QaOutput {
    /// Verdict for a computed score
    #[must_use]
    pub fn scored(ssim_score: f64, pixel_delta_percent: f64, threshold: f64) -> Self {
        let qa_status = QaStatus::from_score(ssim_score, threshold);
        let (subject_integrity, recommendation) = match qa_status {
            QaStatus::Pass => (SubjectIntegrity::Preserved, RECOMMENDATION_PASS),
            _ => (SubjectIntegrity::Modified, RECOMMENDATION_FAIL),
        };
        Self {
            pixel_delta_percent,
            ssim_score,
            qa_status,
            subject_integrity,
            recommendation: recommendation.to_string(),
        }
    }

    /// Verdict when validation itself could not complete
    #[must_use]
    pub fn errored() -> Self {
        Self {
            pixel_delta_percent: -1.0,
            ssim_score: -1.0,
            qa_status: QaStatus::Fail,
            subject_integrity: SubjectIntegrity::Modified,
            recommendation: RECOMMENDATION_FAIL.to_string(),
        }
    }

    /// Placeholder verdict when QA is bypassed
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            pixel_delta_percent: 0.0,
            ssim_score: 1.0,
            qa_status: QaStatus::Skipped,
            subject_integrity: SubjectIntegrity::Preserved,
            recommendation: RECOMMENDATION_SKIPPED.to_string(),
        }
    }
}

/// Content digests of the compared images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentHashes {
    pub original: String,
    pub edited: String,
    pub mask: String,
}

impl ContentHashes {
    #[must_use]
    pub fn of(original: &[u8], edited: &[u8], mask: &[u8]) -> Self {
        Self {
            original: content_hash(original),
            edited: content_hash(edited),
            mask: content_hash(mask),
        }
    }
}

/// Timings and metadata reported by the upstream stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamTimings {
    pub mask_generation_ms: u64,
    pub replacement_ms: u64,
    pub model: String,
    pub prompt: String,
}

/// Immutable per-image compliance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicLog {
    pub image_id: String,
    pub timestamp_start: DateTime<Utc>,
    pub timestamp_end: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub original_hash: String,
    pub edited_hash: String,
    pub mask_hash: String,
    pub agents_executed: Vec<String>,
    #[serde(rename = "agent1_output")]
    pub mask_stage: MaskStageOutput,
    #[serde(rename = "agent2_output")]
    pub replacement_stage: ReplacementStageOutput,
    pub qa_output: QaOutput,
    pub vinted_safe: bool,
    pub audit_trail: Vec<String>,
}

/// Everything needed to assemble a `ForensicLog`
#[derive(Debug, Clone)]
pub(crate) struct ForensicRecord<'a> {
    pub(crate) image_id: &'a str,
    pub(crate) started: DateTime<Utc>,
    pub(crate) finished: DateTime<Utc>,
    pub(crate) qa_elapsed_ms: u64,
    pub(crate) hashes: ContentHashes,
    pub(crate) upstream: &'a UpstreamTimings,
    pub(crate) qa_executed: bool,
    pub(crate) qa_output: QaOutput,
    pub(crate) audit_trail: Vec<String>,
}

impl ForensicLog {
    pub(crate) fn assemble(record: ForensicRecord<'_>) -> Self {
        let mut agents_executed = vec![
            STAGE_MASK_GENERATION.to_string(),
            STAGE_BACKGROUND_REPLACEMENT.to_string(),
        ];
        if record.qa_executed {
            agents_executed.push(STAGE_QA_VALIDATION.to_string());
        }

        // Passing and skipped verdicts both clear the publishing gate.
        let vinted_safe = matches!(
            record.qa_output.qa_status,
            QaStatus::Pass | QaStatus::Skipped
        );

        Self {
            image_id: record.image_id.to_string(),
            timestamp_start: record.started,
            timestamp_end: record.finished,
            processing_time_ms: record.upstream.mask_generation_ms
                + record.upstream.replacement_ms
                + record.qa_elapsed_ms,
            original_hash: record.hashes.original,
            edited_hash: record.hashes.edited,
            mask_hash: record.hashes.mask,
            agents_executed,
            mask_stage: MaskStageOutput {
                mask_generation_time_ms: record.upstream.mask_generation_ms,
                success: true,
            },
            replacement_stage: ReplacementStageOutput {
                inpaint_time_ms: record.upstream.replacement_ms,
                model: record.upstream.model.clone(),
                smart_prompt: record.upstream.prompt.clone(),
                success: true,
            },
            qa_output: record.qa_output,
            vinted_safe,
            audit_trail: record.audit_trail,
        }
    }

    /// Stub log for a run whose QA stage was bypassed
    #[must_use]
    pub fn skipped(image_id: &str, upstream: &UpstreamTimings) -> Self {
        let now = Utc::now();
        Self::assemble(ForensicRecord {
            image_id,
            started: now,
            finished: now,
            qa_elapsed_ms: 0,
            hashes: ContentHashes::default(),
            upstream,
            qa_executed: false,
            qa_output: QaOutput::skipped(),
            audit_trail: vec![
                format!("Mask generated in {}ms", upstream.mask_generation_ms),
                format!(
                    "Background replaced with {} in {}ms",
                    upstream.model, upstream.replacement_ms
                ),
                "QA validation skipped on request; subject integrity not verified".to_string(),
            ],
        })
    }

    #[must_use]
    pub fn qa_status(&self) -> QaStatus {
        self.qa_output.qa_status
    }

    /// Pretty JSON form of the log
    ///
    /// # Errors
    /// - Serialization failure
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a log previously produced by [`ForensicLog::to_json`]
    ///
    /// # Errors
    /// - Malformed JSON or missing fields
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a persisted log
    ///
    /// # Errors
    /// - File cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            crate::error::PipelineError::file_io_error("read forensic log", path_ref, &e)
        })?;
        Self::from_json(&content)
    }
}
