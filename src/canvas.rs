//! Canvas extension planning for the outpaint strategies
//!
//! A plan decides how large the extended canvas is, where the original image
//! sits inside it, and which region the generative model must fill.

use crate::{config::OutpaintConfig, qa::SubjectGeometry};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Fill used for the not-yet-generated part of a composed canvas
const CANVAS_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Placement of an image inside an extended canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasPlan {
    /// Dimensions of the image being extended
    pub source: (u32, u32),
    /// Dimensions of the extended canvas
    pub canvas: (u32, u32),
    /// Top-left corner of the source inside the canvas
    pub offset: (u32, u32),
    /// Scale factor applied before aspect correction
    pub scale: f64,
}

impl CanvasPlan {
    /// Aspect-only extension with the image centred
    #[must_use]
    pub fn fixed(width: u32, height: u32, config: &OutpaintConfig) -> Self {
        let canvas = fit_aspect(width, height, config.target_aspect_ratio);
        let offset = ((canvas.0 - width) / 2, (canvas.1 - height) / 2);
        Self {
            source: (width, height),
            canvas,
            offset,
            scale: 1.0,
        }
    }

    /// Extension sized so the subject occupies the configured share of the frame
    ///
    /// The scale is clamped to `[min_scale, max_scale]`, then exactly one of
    /// width or height grows to reach the target aspect ratio. The subject's
    /// centre lands as close to the canvas centre as the source bounds allow.
    #[must_use]
    pub fn adaptive(geometry: &SubjectGeometry, config: &OutpaintConfig) -> Self {
        let (width, height) = geometry.frame;
        let scale = (geometry.dominant_extent / config.target_subject_fraction)
            .clamp(config.min_scale, config.max_scale);

        let scaled_width = ((f64::from(width) * scale).round() as u32).max(width);
        let scaled_height = ((f64::from(height) * scale).round() as u32).max(height);
        let canvas = fit_aspect(scaled_width, scaled_height, config.target_aspect_ratio);

        let (center_x, center_y) = geometry.bbox.center();
        let offset = (
            centred_offset(canvas.0, width, center_x),
            centred_offset(canvas.1, height, center_y),
        );

        Self {
            source: (width, height),
            canvas,
            offset,
            scale,
        }
    }

    /// Whether the plan adds any canvas at all
    #[must_use]
    pub fn extends(&self) -> bool {
        self.canvas != self.source
    }

    /// Height / width of the planned canvas
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.canvas.1) / f64::from(self.canvas.0)
    }

    /// Place `image` on a blank canvas of the planned size
    #[must_use]
    pub fn compose(&self, image: &DynamicImage) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.canvas.0, self.canvas.1, CANVAS_FILL);
        image::imageops::replace(
            &mut canvas,
            &image.to_rgb8(),
            i64::from(self.offset.0),
            i64::from(self.offset.1),
        );
        canvas
    }

    /// Black over the kept source region, white over the region to generate
    #[must_use]
    pub fn extension_mask(&self) -> GrayImage {
        let (ox, oy) = self.offset;
        let (sw, sh) = self.source;
        GrayImage::from_fn(self.canvas.0, self.canvas.1, |x, y| {
            let kept = x >= ox && x < ox + sw && y >= oy && y < oy + sh;
            Luma([if kept { 0 } else { 255 }])
        })
    }
}

/// Grow exactly one dimension so height / width reaches `aspect`
fn fit_aspect(width: u32, height: u32, aspect: f64) -> (u32, u32) {
    let target_height = (f64::from(width) * aspect).round() as u32;
    if target_height > height {
        return (width, target_height);
    }
    let target_width = (f64::from(height) / aspect).round() as u32;
    if target_width > width {
        return (target_width, height);
    }
    (width, height)
}

/// Offset placing `center` at the middle of `canvas`, kept inside bounds
fn centred_offset(canvas: u32, source: u32, center: f64) -> u32 {
    let slack = canvas.saturating_sub(source);
    let ideal = f64::from(canvas) / 2.0 - center;
    ideal.round().clamp(0.0, f64::from(slack)) as u32
}
