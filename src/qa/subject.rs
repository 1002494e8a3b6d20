//! Subject region extraction from binary masks

use crate::error::{PipelineError, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Box covering a whole `width` x `height` frame
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Centre point in fractional pixel coordinates
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }
}

/// Subject placement within the frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectGeometry {
    /// Minimal box enclosing every subject pixel (full frame when there is none)
    pub bbox: BoundingBox,
    /// Frame dimensions the box was measured in
    pub frame: (u32, u32),
    /// Number of subject pixels
    pub subject_pixels: u64,
    /// Bounding box area / frame area
    pub area_ratio: f64,
    /// Larger of bbox width / frame width and bbox height / frame height
    pub dominant_extent: f64,
    /// No subject pixel was found
    pub degenerate: bool,
}

/// Corresponding subject-only intensities from two images
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSamples {
    pub original: Vec<u8>,
    pub edited: Vec<u8>,
    pub total_pixels: usize,
}

impl SubjectSamples {
    #[must_use]
    pub fn subject_pixels(&self) -> usize {
        self.original.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Share of the frame covered by subject pixels (0..1)
    #[must_use]
    pub fn subject_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.subject_pixels() as f64 / self.total_pixels as f64
    }

    /// Percentage of subject pixels whose intensity changed by more than `noise_threshold`
    ///
    /// # Errors
    /// - Samples are empty
    pub fn pixel_delta_percent(&self, noise_threshold: u8) -> Result<f64> {
        if self.is_empty() {
            return Err(PipelineError::malformed_input(
                "Cannot compute pixel delta over an empty subject region",
            ));
        }
        let changed = self
            .original
            .iter()
            .zip(&self.edited)
            .filter(|&(&a, &b)| a.abs_diff(b) > noise_threshold)
            .count();
        Ok(changed as f64 / self.subject_pixels() as f64 * 100.0)
    }
}

/// Partitions pixels into subject and background using a luminance mask
#[derive(Debug, Clone, Copy)]
pub struct SubjectExtractor {
    threshold: u8,
}

impl SubjectExtractor {
    /// Pixels with mask luminance strictly below `threshold` are subject
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    #[must_use]
    pub fn is_subject(&self, mask_value: u8) -> bool {
        mask_value < self.threshold
    }

    /// Collect subject intensities from both images in row-major order
    ///
    /// # Errors
    /// - Any of the three images differs in dimensions
    pub fn extract(
        &self,
        original: &GrayImage,
        edited: &GrayImage,
        mask: &GrayImage,
    ) -> Result<SubjectSamples> {
        let dims = original.dimensions();
        if edited.dimensions() != dims || mask.dimensions() != dims {
            return Err(PipelineError::malformed_input(format!(
                "Dimension mismatch: original {}x{}, edited {}x{}, mask {}x{}",
                dims.0,
                dims.1,
                edited.width(),
                edited.height(),
                mask.width(),
                mask.height()
            )));
        }

        let mut original_sample = Vec::new();
        let mut edited_sample = Vec::new();
        for ((o, e), m) in original.pixels().zip(edited.pixels()).zip(mask.pixels()) {
            if self.is_subject(m[0]) {
                original_sample.push(o[0]);
                edited_sample.push(e[0]);
            }
        }

        Ok(SubjectSamples {
            original: original_sample,
            edited: edited_sample,
            total_pixels: (u64::from(dims.0) * u64::from(dims.1)) as usize,
        })
    }

    /// Bounding box and area ratio of the subject, scanned at full resolution
    #[must_use]
    pub fn geometry(&self, mask: &GrayImage) -> SubjectGeometry {
        let (width, height) = mask.dimensions();
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut subject_pixels = 0u64;

        for (x, y, pixel) in mask.enumerate_pixels() {
            if self.is_subject(pixel[0]) {
                subject_pixels += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        let degenerate = subject_pixels == 0;
        let bbox = if degenerate {
            BoundingBox::full_frame(width, height)
        } else {
            BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            }
        };

        let frame_area = u64::from(width) * u64::from(height);
        let area_ratio = if frame_area == 0 {
            1.0
        } else {
            bbox.area() as f64 / frame_area as f64
        };
        let dominant_extent = if width == 0 || height == 0 {
            1.0
        } else {
            (f64::from(bbox.width) / f64::from(width))
                .max(f64::from(bbox.height) / f64::from(height))
        };

        SubjectGeometry {
            bbox,
            frame: (width, height),
            subject_pixels,
            area_ratio,
            dominant_extent,
            degenerate,
        }
    }
}

impl Default for SubjectExtractor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MASK_THRESHOLD)
    }
}
