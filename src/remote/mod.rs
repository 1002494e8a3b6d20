//! Remote collaborator interfaces
//!
//! The pipeline talks to three collaborators, each behind an async trait so
//! the controller can hold them as `Arc<dyn Trait>`:
//! - [`MaskGenerator`]: produces the two-tone subject mask (Stage 1)
//! - [`BackgroundReplacer`]: produces the edited image (Stage 2)
//! - [`GenerativeModel`]: the inpaint/outpaint service used by replacer strategies
//!
//! [`http`] provides `reqwest` implementations of the generator and the model.

pub mod http;

#[cfg(test)]
pub mod test_utils;

use crate::{
    canvas::CanvasPlan,
    config::{CostModel, ReplacementStrategy},
    error::{PipelineError, Result},
    types::ProjectContext,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A billable remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStage {
    MaskGeneration,
    Inpaint,
    Outpaint,
    QaValidation,
}

impl RemoteStage {
    /// Unit cost of this call under `cost`
    #[must_use]
    pub fn unit_cost(self, cost: &CostModel) -> f64 {
        match self {
            Self::MaskGeneration => cost.mask_generation,
            Self::Inpaint => cost.inpaint,
            Self::Outpaint => cost.outpaint,
            Self::QaValidation => cost.qa_validation,
        }
    }
}

impl fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaskGeneration => "mask_generation",
            Self::Inpaint => "inpaint",
            Self::Outpaint => "outpaint",
            Self::QaValidation => "qa_validation",
        };
        write!(f, "{}", name)
    }
}

/// Stage 1 output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutput {
    /// Encoded two-tone mask; black marks the subject
    pub mask: Vec<u8>,
    pub timing_ms: u64,
}

/// Stage 2 output
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// Final encoded image, possibly on an extended canvas
    pub edited: Vec<u8>,
    /// Edited image at the original framing, before any canvas extension
    pub pre_extension: Option<Vec<u8>>,
    pub prompt_used: String,
    pub model: String,
    pub timing_ms: u64,
    /// Canvas plan applied by outpainting strategies
    pub canvas: Option<CanvasPlan>,
}

impl Replacement {
    /// The bytes QA should compare against the original
    #[must_use]
    pub fn qa_candidate(&self) -> &[u8] {
        self.pre_extension.as_deref().unwrap_or(&self.edited)
    }
}

/// Request sent to a [`GenerativeModel`]
///
/// White mask pixels mark the region to generate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub image: Vec<u8>,
    pub mask: Vec<u8>,
    pub prompt: String,
    /// Encoded image whose look the generated background should follow
    pub style_reference: Option<Vec<u8>>,
}

/// Produces a subject mask for an image
#[async_trait]
pub trait MaskGenerator: Send + Sync {
    /// Generate a two-tone mask (subject black, background white)
    ///
    /// # Errors
    /// - Remote failure or empty response
    async fn generate(&self, image: &[u8], context: &ProjectContext) -> Result<MaskOutput>;

    /// Name recorded in logs
    fn name(&self) -> &str;
}

/// Replaces the background of an image given its mask
#[async_trait]
pub trait BackgroundReplacer: Send + Sync {
    /// # Errors
    /// - Remote failure, empty response or undecodable input
    async fn replace(
        &self,
        image: &[u8],
        mask: &[u8],
        context: &ProjectContext,
    ) -> Result<Replacement>;

    fn strategy(&self) -> ReplacementStrategy;

    /// Billable remote calls one `replace` performs
    fn remote_stages(&self) -> Vec<RemoteStage>;
}

/// Inpaint/outpaint service
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Fill the masked region of an image at its own resolution
    ///
    /// # Errors
    /// - Remote failure or empty response
    async fn inpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>>;

    /// Fill the masked region of an extended canvas
    ///
    /// # Errors
    /// - Remote failure or empty response
    async fn outpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>>;

    /// Model name recorded in the forensic log
    fn model_name(&self) -> &str;
}

/// Bounds every inpaint and outpaint request by its own timeout
///
/// A strategy issuing several requests gets the full budget for each one.
pub struct TimedModel {
    inner: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl TimedModel {
    #[must_use]
    pub fn new(inner: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<F>(&self, stage: RemoteStage, call: F) -> Result<Vec<u8>>
    where
        F: Future<Output = Result<Vec<u8>>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::remote_call(
                stage.to_string(),
                format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}

#[async_trait]
impl GenerativeModel for TimedModel {
    async fn inpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.bounded(RemoteStage::Inpaint, self.inner.inpaint(request))
            .await
    }

    async fn outpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.bounded(RemoteStage::Outpaint, self.inner.outpaint(request))
            .await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
