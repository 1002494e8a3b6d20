//! Stage-2 background replacement strategies
//!
//! Every strategy implements [`BackgroundReplacer`] on top of a shared
//! [`GenerativeModel`]. The strategy is chosen from configuration through a
//! [`ReplacerFactory`].

mod inpaint;
mod outpaint;

pub use inpaint::{InpaintReplacer, StyleReferenceReplacer};
pub use outpaint::{OutpaintMode, OutpaintReplacer};

use crate::{
    config::{PipelineConfig, ReplacementStrategy},
    error::{PipelineError, Result},
    remote::{BackgroundReplacer, GenerativeModel, TimedModel},
};
use image::DynamicImage;
use std::sync::Arc;

/// Factory trait for creating replacers from configuration
pub trait ReplacerFactory: Send + Sync {
    /// Create the replacer for `config.strategy`
    ///
    /// # Errors
    /// - Strategy requirements are not met (e.g. missing style reference)
    fn create_replacer(
        &self,
        config: &PipelineConfig,
        model: Arc<dyn GenerativeModel>,
    ) -> Result<Arc<dyn BackgroundReplacer>>;

    /// Strategies this factory can build
    fn available_strategies(&self) -> Vec<ReplacementStrategy>;
}

/// Factory covering every built-in strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReplacerFactory;

impl ReplacerFactory for DefaultReplacerFactory {
    fn create_replacer(
        &self,
        config: &PipelineConfig,
        model: Arc<dyn GenerativeModel>,
    ) -> Result<Arc<dyn BackgroundReplacer>> {
        log::debug!("Creating {} replacer", config.strategy);
        let model: Arc<dyn GenerativeModel> =
            Arc::new(TimedModel::new(model, config.remote.timeout()));
        let replacer: Arc<dyn BackgroundReplacer> = match config.strategy {
            ReplacementStrategy::Inpaint => Arc::new(InpaintReplacer::new(model)),
            ReplacementStrategy::FixedOutpaint => Arc::new(OutpaintReplacer::new(
                model,
                OutpaintMode::Fixed,
                config.outpaint,
                config.qa.mask_threshold,
            )),
            ReplacementStrategy::AdaptiveOutpaint => Arc::new(OutpaintReplacer::new(
                model,
                OutpaintMode::Adaptive,
                config.outpaint,
                config.qa.mask_threshold,
            )),
            ReplacementStrategy::StyleReference => {
                let path = config.style_reference.as_ref().ok_or_else(|| {
                    PipelineError::invalid_config(
                        "The style_reference strategy requires a style reference image",
                    )
                })?;
                let reference = std::fs::read(path).map_err(|e| {
                    PipelineError::file_io_error("read style reference", path, &e)
                })?;
                Arc::new(StyleReferenceReplacer::new(model, reference))
            },
        };
        Ok(replacer)
    }

    fn available_strategies(&self) -> Vec<ReplacementStrategy> {
        vec![
            ReplacementStrategy::Inpaint,
            ReplacementStrategy::FixedOutpaint,
            ReplacementStrategy::AdaptiveOutpaint,
            ReplacementStrategy::StyleReference,
        ]
    }
}

/// Build the configured replacer with the default factory
///
/// Every model request is bounded by the configured remote timeout.
///
/// # Errors
/// - See [`ReplacerFactory::create_replacer`]
pub fn build_replacer(
    config: &PipelineConfig,
    model: Arc<dyn GenerativeModel>,
) -> Result<Arc<dyn BackgroundReplacer>> {
    DefaultReplacerFactory.create_replacer(config, model)
}

pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
    Ok(buffer)
}
