//! Configuration types for the background replacement pipeline

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SSIM score at or above which the subject counts as preserved
pub const DEFAULT_SSIM_THRESHOLD: f64 = 0.92;

/// Mask luminance below which a pixel belongs to the subject
pub const DEFAULT_MASK_THRESHOLD: u8 = 128;

/// Absolute intensity difference above which a subject pixel counts as changed
pub const DEFAULT_NOISE_THRESHOLD: u8 = 10;

/// Default number of images processed concurrently in a batch
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default timeout for a single remote call
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Stage-2 strategy used to replace the background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStrategy {
    /// Fill the masked background region only
    Inpaint,
    /// Inpaint, then extend the canvas to the target aspect ratio
    FixedOutpaint,
    /// Inpaint, then extend the canvas sized from the subject's bounding box
    AdaptiveOutpaint,
    /// Inpaint guided by a style reference image
    StyleReference,
}

impl Default for ReplacementStrategy {
    fn default() -> Self {
        Self::AdaptiveOutpaint
    }
}

impl std::fmt::Display for ReplacementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inpaint => write!(f, "inpaint"),
            Self::FixedOutpaint => write!(f, "fixed_outpaint"),
            Self::AdaptiveOutpaint => write!(f, "adaptive_outpaint"),
            Self::StyleReference => write!(f, "style_reference"),
        }
    }
}

/// Thresholds used by the QA validator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Inclusive pass threshold for the subject SSIM score
    pub ssim_threshold: f64,
    /// Mask luminance below which a pixel is subject
    pub mask_threshold: u8,
    /// Per-pixel difference counted by the pixel delta metric
    pub noise_threshold: u8,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            ssim_threshold: DEFAULT_SSIM_THRESHOLD,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

/// Canvas extension parameters for the outpaint strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutpaintConfig {
    /// Fraction of the final frame the subject's dominant extent should occupy
    pub target_subject_fraction: f64,
    /// Lower clamp on the canvas scale factor
    pub min_scale: f64,
    /// Upper clamp on the canvas scale factor
    pub max_scale: f64,
    /// Target height / width ratio of the final canvas (1.5 = 2:3 portrait)
    pub target_aspect_ratio: f64,
}

impl Default for OutpaintConfig {
    fn default() -> Self {
        Self {
            target_subject_fraction: 0.85,
            min_scale: 1.1,
            max_scale: 2.0,
            target_aspect_ratio: 1.5,
        }
    }
}

/// Static per-call cost model in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub mask_generation: f64,
    pub inpaint: f64,
    pub outpaint: f64,
    pub qa_validation: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            mask_generation: 0.002,
            inpaint: 0.03,
            outpaint: 0.03,
            qa_validation: 0.0,
        }
    }
}

/// Remote collaborator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint returning a two-tone mask for an uploaded image
    pub mask_endpoint: String,
    /// Endpoint filling the white region of a mask
    pub inpaint_endpoint: String,
    /// Endpoint filling the white region of an extension mask
    pub outpaint_endpoint: String,
    /// Model name recorded in the forensic log
    pub model: String,
    /// Environment variable holding the bearer token, if any
    pub api_key_env: Option<String>,
    /// Timeout applied to every remote call
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mask_endpoint: "http://localhost:7860/v1/mask".to_string(),
            inpaint_endpoint: "http://localhost:7860/v1/inpaint".to_string(),
            outpaint_endpoint: "http://localhost:7860/v1/outpaint".to_string(),
            model: "generative-fill".to_string(),
            api_key_env: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Timeout as a `Duration`
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub qa: QaConfig,
    pub outpaint: OutpaintConfig,
    pub cost: CostModel,
    pub remote: RemoteConfig,
    /// Stage-2 strategy
    pub strategy: ReplacementStrategy,
    /// Style reference image (required by the style reference strategy)
    pub style_reference: Option<PathBuf>,
    /// Root directory for masks, edited images and forensic logs
    pub output_dir: PathBuf,
    /// Images processed concurrently in a batch
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            qa: QaConfig::default(),
            outpaint: OutpaintConfig::default(),
            cost: CostModel::default(),
            remote: RemoteConfig::default(),
            strategy: ReplacementStrategy::default(),
            style_reference: None,
            output_dir: PathBuf::from("output"),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgswap::{PipelineConfig, ReplacementStrategy};
    ///
    /// let config = PipelineConfig::builder()
    ///     .strategy(ReplacementStrategy::Inpaint)
    ///     .concurrency(2)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.concurrency, 2);
    /// ```
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - JSON is malformed
    /// - Values fail validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| PipelineError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - SSIM threshold outside 0-1
    /// - Mask threshold of 0 (no pixel could be subject)
    /// - Concurrency outside 1-64
    /// - Timeout outside 1-600 seconds
    /// - Inconsistent outpaint scale bounds, fraction or aspect ratio
    /// - Negative or non-finite unit costs
    /// - Style reference strategy without a reference image
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.qa.ssim_threshold) {
            return Err(PipelineError::config_value_error(
                "SSIM threshold",
                self.qa.ssim_threshold,
                "0.0-1.0",
                Some(DEFAULT_SSIM_THRESHOLD),
            ));
        }
        if self.qa.mask_threshold == 0 {
            return Err(PipelineError::config_value_error(
                "mask threshold",
                self.qa.mask_threshold,
                "1-255",
                Some(DEFAULT_MASK_THRESHOLD),
            ));
        }
        if !(1..=64).contains(&self.concurrency) {
            return Err(PipelineError::config_value_error(
                "concurrency",
                self.concurrency,
                "1-64",
                Some(DEFAULT_CONCURRENCY),
            ));
        }
        if !(1..=600).contains(&self.remote.timeout_secs) {
            return Err(PipelineError::config_value_error(
                "remote timeout (seconds)",
                self.remote.timeout_secs,
                "1-600",
                Some(DEFAULT_TIMEOUT_SECS),
            ));
        }

        let outpaint = &self.outpaint;
        if outpaint.min_scale < 1.0 || outpaint.max_scale < outpaint.min_scale {
            return Err(PipelineError::invalid_config(format!(
                "Outpaint scale bounds must satisfy 1.0 <= min_scale <= max_scale (got {}..{})",
                outpaint.min_scale, outpaint.max_scale
            )));
        }
        if !(outpaint.target_subject_fraction > 0.0 && outpaint.target_subject_fraction <= 1.0) {
            return Err(PipelineError::config_value_error(
                "target subject fraction",
                outpaint.target_subject_fraction,
                "(0.0, 1.0]",
                Some(0.85),
            ));
        }
        if !(outpaint.target_aspect_ratio.is_finite() && outpaint.target_aspect_ratio > 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "Target aspect ratio must be positive (got {})",
                outpaint.target_aspect_ratio
            )));
        }

        let cost = &self.cost;
        for (name, value) in [
            ("mask_generation", cost.mask_generation),
            ("inpaint", cost.inpaint),
            ("outpaint", cost.outpaint),
            ("qa_validation", cost.qa_validation),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::invalid_config(format!(
                    "Unit cost '{}' must be a non-negative number (got {})",
                    name, value
                )));
            }
        }

        if self.strategy == ReplacementStrategy::StyleReference && self.style_reference.is_none()
        {
            return Err(PipelineError::invalid_config(
                "The style_reference strategy requires a style reference image",
            ));
        }

        Ok(())
    }
}

/// Builder for `PipelineConfig`
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration (e.g. one loaded from a file)
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn ssim_threshold(mut self, threshold: f64) -> Self {
        self.config.qa.ssim_threshold = threshold;
        self
    }

    #[must_use]
    pub fn mask_threshold(mut self, threshold: u8) -> Self {
        self.config.qa.mask_threshold = threshold;
        self
    }

    #[must_use]
    pub fn noise_threshold(mut self, threshold: u8) -> Self {
        self.config.qa.noise_threshold = threshold;
        self
    }

    #[must_use]
    pub fn outpaint(mut self, outpaint: OutpaintConfig) -> Self {
        self.config.outpaint = outpaint;
        self
    }

    #[must_use]
    pub fn cost(mut self, cost: CostModel) -> Self {
        self.config.cost = cost;
        self
    }

    #[must_use]
    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.remote = remote;
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: ReplacementStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    #[must_use]
    pub fn style_reference<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.style_reference = Some(path.into());
        self
    }

    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// Any failure reported by [`PipelineConfig::validate`]
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
