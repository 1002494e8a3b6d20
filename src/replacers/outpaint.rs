//! Canvas-extending strategies
//!
//! Both modes first inpaint the background at the original framing (that
//! result is kept as the pre-extension image QA compares against), then
//! outpaint an enlarged canvas around it.

use super::{encode_png, inpaint::inpaint_with};
use crate::{
    canvas::CanvasPlan,
    config::{OutpaintConfig, ReplacementStrategy},
    error::{PipelineError, Result},
    prompt::PromptBuilder,
    qa::SubjectExtractor,
    remote::{BackgroundReplacer, GenerationRequest, GenerativeModel, RemoteStage, Replacement},
    types::ProjectContext,
};
use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info};

/// How the extended canvas is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutpaintMode {
    /// Aspect correction only
    Fixed,
    /// Sized from the subject's bounding box
    Adaptive,
}

pub struct OutpaintReplacer {
    model: Arc<dyn GenerativeModel>,
    mode: OutpaintMode,
    config: OutpaintConfig,
    extractor: SubjectExtractor,
}

impl OutpaintReplacer {
    #[must_use]
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        mode: OutpaintMode,
        config: OutpaintConfig,
        mask_threshold: u8,
    ) -> Self {
        Self {
            model,
            mode,
            config,
            extractor: SubjectExtractor::new(mask_threshold),
        }
    }

    /// Plan the canvas for an image of the given size and its mask
    ///
    /// # Errors
    /// - Mask cannot be decoded
    pub fn plan(&self, width: u32, height: u32, mask: &[u8]) -> Result<CanvasPlan> {
        match self.mode {
            OutpaintMode::Fixed => Ok(CanvasPlan::fixed(width, height, &self.config)),
            OutpaintMode::Adaptive => {
                let mut mask = image::load_from_memory(mask)
                    .map_err(|e| PipelineError::decode_error("mask", &e))?
                    .to_luma8();
                if mask.dimensions() != (width, height) {
                    mask = image::imageops::resize(&mask, width, height, FilterType::Nearest);
                }
                let geometry = self.extractor.geometry(&mask);
                debug!(
                    dominant_extent = geometry.dominant_extent,
                    area_ratio = geometry.area_ratio,
                    degenerate = geometry.degenerate,
                    "Subject geometry measured"
                );
                Ok(CanvasPlan::adaptive(&geometry, &self.config))
            },
        }
    }
}

#[async_trait]
impl BackgroundReplacer for OutpaintReplacer {
    async fn replace(
        &self,
        image: &[u8],
        mask: &[u8],
        context: &ProjectContext,
    ) -> Result<Replacement> {
        let start = Instant::now();
        let inpainted = inpaint_with(self.model.as_ref(), image, mask, context, None).await?;

        let (width, height) = image::load_from_memory(image)
            .map_err(|e| PipelineError::decode_error("original", &e))
            .map(|img| (img.width(), img.height()))?;
        let plan = self.plan(width, height, mask)?;
        if !plan.extends() {
            debug!("Canvas already at target framing; skipping outpaint");
            return Ok(Replacement {
                timing_ms: start.elapsed().as_millis() as u64,
                canvas: Some(plan),
                ..inpainted
            });
        }

        let framed = image::load_from_memory(&inpainted.edited)
            .map_err(|e| PipelineError::decode_error("inpainted", &e))?;
        let framed = if framed.width() == width && framed.height() == height {
            framed
        } else {
            framed.resize_exact(width, height, FilterType::Triangle)
        };

        let request = GenerationRequest {
            image: encode_png(&DynamicImage::ImageRgb8(plan.compose(&framed)))?,
            mask: encode_png(&DynamicImage::ImageLuma8(plan.extension_mask()))?,
            prompt: PromptBuilder::build_extension(context),
            style_reference: None,
        };
        info!(
            canvas_width = plan.canvas.0,
            canvas_height = plan.canvas.1,
            scale = plan.scale,
            "Extending canvas"
        );
        let edited = self.model.outpaint(&request).await?;

        Ok(Replacement {
            edited,
            pre_extension: Some(inpainted.edited),
            prompt_used: inpainted.prompt_used,
            model: inpainted.model,
            timing_ms: start.elapsed().as_millis() as u64,
            canvas: Some(plan),
        })
    }

    fn strategy(&self) -> ReplacementStrategy {
        match self.mode {
            OutpaintMode::Fixed => ReplacementStrategy::FixedOutpaint,
            OutpaintMode::Adaptive => ReplacementStrategy::AdaptiveOutpaint,
        }
    }

    fn remote_stages(&self) -> Vec<RemoteStage> {
        vec![RemoteStage::Inpaint, RemoteStage::Outpaint]
    }
}
