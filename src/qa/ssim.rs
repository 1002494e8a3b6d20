//! Global structural similarity over subject pixel samples
//!
//! The whole subject region is scored as a single window: mean, variance and
//! covariance are population statistics over every sampled pixel. This is not
//! the canonical sliding-window SSIM. The pass threshold in [`crate::config::QaConfig`]
//! is calibrated against this single-window form, so the two must change together.

use crate::error::{PipelineError, Result};

/// Dynamic range of 8-bit intensities
pub const DYNAMIC_RANGE: f64 = 255.0;

const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Population statistics of two corresponding samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStatistics {
    pub mean_x: f64,
    pub mean_y: f64,
    pub variance_x: f64,
    pub variance_y: f64,
    pub covariance: f64,
}

impl SampleStatistics {
    /// Compute means, variances and covariance over two equal-length samples
    ///
    /// # Errors
    /// - Samples differ in length
    /// - Samples are empty
    pub fn compute(x: &[u8], y: &[u8]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PipelineError::malformed_input(format!(
                "Pixel samples must have equal length for SSIM (got {} and {})",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(PipelineError::malformed_input(
                "Cannot compute SSIM over an empty subject region (mask matched no subject pixels)",
            ));
        }

        let n = x.len() as f64;
        let sum_x: u64 = x.iter().map(|&v| u64::from(v)).sum();
        let sum_y: u64 = y.iter().map(|&v| u64::from(v)).sum();
        let mean_x = sum_x as f64 / n;
        let mean_y = sum_y as f64 / n;

        let mut variance_x = 0.0;
        let mut variance_y = 0.0;
        let mut covariance = 0.0;
        for (&px, &py) in x.iter().zip(y) {
            let dx = f64::from(px) - mean_x;
            let dy = f64::from(py) - mean_y;
            variance_x += dx * dx;
            variance_y += dy * dy;
            covariance += dx * dy;
        }

        Ok(Self {
            mean_x,
            mean_y,
            variance_x: variance_x / n,
            variance_y: variance_y / n,
            covariance: covariance / n,
        })
    }

    /// SSIM from these statistics with the standard stabilization constants
    #[must_use]
    pub fn ssim(&self) -> f64 {
        let c1 = (K1 * DYNAMIC_RANGE) * (K1 * DYNAMIC_RANGE);
        let c2 = (K2 * DYNAMIC_RANGE) * (K2 * DYNAMIC_RANGE);

        let numerator = (2.0 * self.mean_x * self.mean_y + c1) * (2.0 * self.covariance + c2);
        let denominator = (self.mean_x * self.mean_x + self.mean_y * self.mean_y + c1)
            * (self.variance_x + self.variance_y + c2);

        numerator / denominator
    }
}

/// Single-window SSIM between two corresponding grayscale samples
///
/// Returns 1.0 for identical samples and lower values as structure diverges.
///
/// # Errors
/// - Samples differ in length
/// - Samples are empty
pub fn structural_similarity(x: &[u8], y: &[u8]) -> Result<f64> {
    Ok(SampleStatistics::compute(x, y)?.ssim())
}
