//! Subject-integrity validation of an edited image against its original

use crate::{
    config::QaConfig,
    error::{PipelineError, Result},
    forensic::{ContentHashes, ForensicLog, ForensicRecord, QaOutput, UpstreamTimings},
    qa::{ssim::SampleStatistics, subject::SubjectExtractor},
};
use chrono::Utc;
use image::{imageops::FilterType, GrayImage};
use instant::Instant;
use tracing::{debug, info, instrument, warn};

/// Result of one validation call
///
/// Always structurally complete: when validation could not run, `success` is
/// false, `error` carries the reason and the embedded log holds a failing verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct QaOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub forensic_log: ForensicLog,
}

impl QaOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.forensic_log.vinted_safe
    }
}

/// Original, edited and mask reduced to one resolution and to grayscale
#[derive(Debug, Clone)]
pub struct NormalizedImages {
    pub original: GrayImage,
    pub edited: GrayImage,
    pub mask: GrayImage,
}

impl NormalizedImages {
    /// Decode and bring `edited` and `mask` to the original's resolution
    ///
    /// The original is never resampled.
    ///
    /// # Errors
    /// - Any input fails to decode
    /// - Any input has a zero dimension
    pub fn decode(original: &[u8], edited: &[u8], mask: &[u8]) -> Result<Self> {
        let original = image::load_from_memory(original)
            .map_err(|e| PipelineError::decode_error("original", &e))?
            .to_luma8();
        let edited = image::load_from_memory(edited)
            .map_err(|e| PipelineError::decode_error("edited", &e))?
            .to_luma8();
        let mask = image::load_from_memory(mask)
            .map_err(|e| PipelineError::decode_error("mask", &e))?
            .to_luma8();

        for (role, img) in [("original", &original), ("edited", &edited), ("mask", &mask)] {
            if img.width() == 0 || img.height() == 0 {
                return Err(PipelineError::malformed_input(format!(
                    "The {} image has zero width or height",
                    role
                )));
            }
        }

        let (width, height) = original.dimensions();
        let edited = if edited.dimensions() == (width, height) {
            edited
        } else {
            image::imageops::resize(&edited, width, height, FilterType::Triangle)
        };
        // Nearest keeps the mask two-tone.
        let mask = if mask.dimensions() == (width, height) {
            mask
        } else {
            image::imageops::resize(&mask, width, height, FilterType::Nearest)
        };

        Ok(Self {
            original,
            edited,
            mask,
        })
    }
}

/// Computes the subject SSIM verdict and assembles the forensic log
#[derive(Debug, Clone, Copy)]
pub struct QaValidator {
    config: QaConfig,
    extractor: SubjectExtractor,
}

impl QaValidator {
    #[must_use]
    pub fn new(config: QaConfig) -> Self {
        Self {
            config,
            extractor: SubjectExtractor::new(config.mask_threshold),
        }
    }

    #[must_use]
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Validate `edited` against `original` inside the subject region of `mask`
    ///
    /// Never fails: every fault is folded into a failing outcome.
    #[instrument(skip_all, fields(image_id = %image_id))]
    pub fn validate(
        &self,
        original: &[u8],
        edited: &[u8],
        mask: &[u8],
        image_id: &str,
        upstream: &UpstreamTimings,
    ) -> QaOutcome {
        let started = Utc::now();
        let clock = Instant::now();
        let mut audit_trail = vec![
            format!("Mask generated in {}ms", upstream.mask_generation_ms),
            format!(
                "Background replaced with {} in {}ms using prompt: {}",
                upstream.model, upstream.replacement_ms, upstream.prompt
            ),
        ];

        let (hashes, qa_output, error) =
            match self.evaluate(original, edited, mask, &mut audit_trail) {
                Ok((hashes, qa_output)) => (hashes, qa_output, None),
                Err(e) => {
                    warn!(error = %e, "QA validation could not complete");
                    audit_trail.push(format!("QA validation failed: {}", e));
                    (ContentHashes::default(), QaOutput::errored(), Some(e.to_string()))
                },
            };

        let forensic_log = ForensicLog::assemble(ForensicRecord {
            image_id,
            started,
            finished: Utc::now(),
            qa_elapsed_ms: clock.elapsed().as_millis() as u64,
            hashes,
            upstream,
            qa_executed: true,
            qa_output,
            audit_trail,
        });

        info!(
            qa_status = %forensic_log.qa_output.qa_status,
            ssim = forensic_log.qa_output.ssim_score,
            "QA validation finished"
        );

        QaOutcome {
            success: error.is_none(),
            error,
            forensic_log,
        }
    }

    fn evaluate(
        &self,
        original: &[u8],
        edited: &[u8],
        mask: &[u8],
        audit_trail: &mut Vec<String>,
    ) -> Result<(ContentHashes, QaOutput)> {
        let hashes = ContentHashes::of(original, edited, mask);
        audit_trail.push(format!(
            "Computed content digests: original {}, edited {}, mask {}",
            hashes.original, hashes.edited, hashes.mask
        ));

        let images = NormalizedImages::decode(original, edited, mask)?;
        let (width, height) = images.original.dimensions();
        audit_trail.push(format!(
            "Normalized edited image and mask to {}x{} grayscale",
            width, height
        ));

        let samples = self
            .extractor
            .extract(&images.original, &images.edited, &images.mask)?;
        audit_trail.push(format!(
            "Extracted {} subject pixels ({:.2}% of frame) with mask threshold {}",
            samples.subject_pixels(),
            samples.subject_ratio() * 100.0,
            self.extractor.threshold()
        ));
        debug!(subject_pixels = samples.subject_pixels(), "Subject region extracted");

        let stats = SampleStatistics::compute(&samples.original, &samples.edited)?;
        let ssim_score = stats.ssim();
        audit_trail.push(format!(
            "Subject SSIM {:.4} (means {:.2}/{:.2}, variances {:.2}/{:.2})",
            ssim_score, stats.mean_x, stats.mean_y, stats.variance_x, stats.variance_y
        ));

        let pixel_delta_percent = samples.pixel_delta_percent(self.config.noise_threshold)?;
        audit_trail.push(format!(
            "Pixel delta {:.2}% of subject pixels beyond noise threshold {}",
            pixel_delta_percent, self.config.noise_threshold
        ));

        let qa_output =
            QaOutput::scored(ssim_score, pixel_delta_percent, self.config.ssim_threshold);
        audit_trail.push(format!(
            "Verdict {} at threshold {} (subject {:?})",
            qa_output.qa_status, self.config.ssim_threshold, qa_output.subject_integrity
        ));
        audit_trail.push(format!("Recommendation: {}", qa_output.recommendation));

        Ok((hashes, qa_output))
    }
}

impl Default for QaValidator {
    fn default() -> Self {
        Self::new(QaConfig::default())
    }
}
