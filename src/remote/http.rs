//! HTTP collaborators built on `reqwest`
//!
//! Every call uploads the image (and mask) as multipart form parts and expects
//! the encoded result image as the response body.

use crate::{
    config::RemoteConfig,
    error::{PipelineError, Result},
    remote::{GenerationRequest, GenerativeModel, MaskGenerator, MaskOutput, RemoteStage},
    types::ProjectContext,
};
use async_trait::async_trait;
use instant::Instant;
use reqwest::{
    multipart::{Form, Part},
    Client,
};

/// Shared transport: one `reqwest::Client` plus the bearer key
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    api_key: Option<String>,
}

impl RemoteClient {
    /// Build a client carrying the configured timeout
    ///
    /// # Errors
    /// - `api_key_env` names a variable that is not set
    /// - Failed to create HTTP client
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                PipelineError::invalid_config(format!(
                    "API key environment variable '{}' is not set",
                    var
                ))
            })?),
            None => None,
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                PipelineError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, api_key })
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST `form` to `endpoint` and return the non-empty response body
    async fn post_form(&self, stage: RemoteStage, endpoint: &str, form: Form) -> Result<Vec<u8>> {
        log::debug!("POST {} ({})", endpoint, stage);
        let mut request = self.client.post(endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::remote_call(stage.to_string(), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::remote_call(
                stage.to_string(),
                format!("HTTP {} from {}", status, endpoint),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::remote_call(stage.to_string(), e.to_string()))?;
        if body.is_empty() {
            return Err(PipelineError::remote_call(
                stage.to_string(),
                format!("Empty response from {}", endpoint),
            ));
        }
        Ok(body.to_vec())
    }
}

/// Multipart part for an encoded image, typed by sniffing its format
fn image_part(name: &str, bytes: Vec<u8>) -> Result<Part> {
    let mime = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    Part::bytes(bytes)
        .file_name(format!("{}.bin", name))
        .mime_str(mime)
        .map_err(PipelineError::from)
}

/// Add the non-empty context fields to a form
fn with_context(mut form: Form, context: &ProjectContext) -> Form {
    if let Some(project_id) = &context.project_id {
        form = form.text("project_id", project_id.clone());
    }
    if let Some(category) = &context.category {
        form = form.text("category", category.clone());
    }
    if let Some(style) = &context.background_style {
        form = form.text("background_style", style.clone());
    }
    form
}

/// Mask generation over HTTP
#[derive(Debug, Clone)]
pub struct HttpMaskGenerator {
    remote: RemoteClient,
    endpoint: String,
}

impl HttpMaskGenerator {
    /// # Errors
    /// - See [`RemoteClient::new`]
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            remote: RemoteClient::new(config)?,
            endpoint: config.mask_endpoint.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MaskGenerator for HttpMaskGenerator {
    async fn generate(&self, image: &[u8], context: &ProjectContext) -> Result<MaskOutput> {
        let start = Instant::now();
        let form = Form::new().part("image", image_part("image", image.to_vec())?);
        let form = with_context(form, context);
        let mask = self
            .remote
            .post_form(RemoteStage::MaskGeneration, &self.endpoint, form)
            .await?;
        Ok(MaskOutput {
            mask,
            timing_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &str {
        "http-mask-generator"
    }
}

/// Inpaint/outpaint service over HTTP
#[derive(Debug, Clone)]
pub struct HttpGenerativeModel {
    remote: RemoteClient,
    inpaint_endpoint: String,
    outpaint_endpoint: String,
    model: String,
}

impl HttpGenerativeModel {
    /// # Errors
    /// - See [`RemoteClient::new`]
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            remote: RemoteClient::new(config)?,
            inpaint_endpoint: config.inpaint_endpoint.clone(),
            outpaint_endpoint: config.outpaint_endpoint.clone(),
            model: config.model.clone(),
        })
    }

    fn form(&self, request: &GenerationRequest) -> Result<Form> {
        let mut form = Form::new()
            .part("image", image_part("image", request.image.clone())?)
            .part("mask", image_part("mask", request.mask.clone())?)
            .text("prompt", request.prompt.clone())
            .text("model", self.model.clone());
        if let Some(reference) = &request.style_reference {
            form = form.part("style_reference", image_part("style_reference", reference.clone())?);
        }
        Ok(form)
    }
}

#[async_trait]
impl GenerativeModel for HttpGenerativeModel {
    async fn inpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        let form = self.form(request)?;
        self.remote
            .post_form(RemoteStage::Inpaint, &self.inpaint_endpoint, form)
            .await
    }

    async fn outpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        let form = self.form(request)?;
        self.remote
            .post_form(RemoteStage::Outpaint, &self.outpaint_endpoint, form)
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
