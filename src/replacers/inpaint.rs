//! Same-frame strategies: plain inpainting and style-guided inpainting

use crate::{
    config::ReplacementStrategy,
    error::Result,
    prompt::PromptBuilder,
    remote::{BackgroundReplacer, GenerationRequest, GenerativeModel, RemoteStage, Replacement},
    types::ProjectContext,
};
use async_trait::async_trait;
use instant::Instant;
use std::sync::Arc;
use tracing::debug;

/// Fills the masked background at the original framing
pub struct InpaintReplacer {
    model: Arc<dyn GenerativeModel>,
}

impl InpaintReplacer {
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl BackgroundReplacer for InpaintReplacer {
    async fn replace(
        &self,
        image: &[u8],
        mask: &[u8],
        context: &ProjectContext,
    ) -> Result<Replacement> {
        inpaint_with(self.model.as_ref(), image, mask, context, None).await
    }

    fn strategy(&self) -> ReplacementStrategy {
        ReplacementStrategy::Inpaint
    }

    fn remote_stages(&self) -> Vec<RemoteStage> {
        vec![RemoteStage::Inpaint]
    }
}

/// Inpaints with a reference image steering the background's look
pub struct StyleReferenceReplacer {
    model: Arc<dyn GenerativeModel>,
    reference: Vec<u8>,
}

impl StyleReferenceReplacer {
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>, reference: Vec<u8>) -> Self {
        Self { model, reference }
    }
}

#[async_trait]
impl BackgroundReplacer for StyleReferenceReplacer {
    async fn replace(
        &self,
        image: &[u8],
        mask: &[u8],
        context: &ProjectContext,
    ) -> Result<Replacement> {
        inpaint_with(
            self.model.as_ref(),
            image,
            mask,
            context,
            Some(self.reference.clone()),
        )
        .await
    }

    fn strategy(&self) -> ReplacementStrategy {
        ReplacementStrategy::StyleReference
    }

    fn remote_stages(&self) -> Vec<RemoteStage> {
        vec![RemoteStage::Inpaint]
    }
}

pub(super) async fn inpaint_with(
    model: &dyn GenerativeModel,
    image: &[u8],
    mask: &[u8],
    context: &ProjectContext,
    style_reference: Option<Vec<u8>>,
) -> Result<Replacement> {
    let start = Instant::now();
    let prompt = PromptBuilder::build(context);
    debug!(prompt = %prompt, styled = style_reference.is_some(), "Requesting inpaint");

    let request = GenerationRequest {
        image: image.to_vec(),
        mask: mask.to_vec(),
        prompt,
        style_reference,
    };
    let edited = model.inpaint(&request).await?;

    Ok(Replacement {
        edited,
        pre_extension: None,
        prompt_used: request.prompt,
        model: model.model_name().to_string(),
        timing_ms: start.elapsed().as_millis() as u64,
        canvas: None,
    })
}
