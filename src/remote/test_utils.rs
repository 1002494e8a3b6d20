//! Fake collaborators for unit tests
//!
//! The fakes answer instantly with canned bytes and record every call so
//! tests can assert on the order and number of remote requests.

use crate::{
    error::{PipelineError, Result},
    remote::{GenerationRequest, GenerativeModel, MaskGenerator, MaskOutput},
    types::ProjectContext,
};
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Encode an image as PNG
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// Textured product photo
pub fn product_photo(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    });
    encode_png(&DynamicImage::ImageRgb8(image))
}

/// Mask with the subject (black) on the centred half of the frame
pub fn centre_mask(width: u32, height: u32) -> Vec<u8> {
    let mask = GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= width / 4 && x < width * 3 / 4 && y >= height / 4 && y < height * 3 / 4;
        Luma([if inside { 0 } else { 255 }])
    });
    encode_png(&DynamicImage::ImageLuma8(mask))
}

/// Mask generator returning a fixed mask
#[derive(Debug, Clone)]
pub struct FakeMaskGenerator {
    mask: Vec<u8>,
    delay: Option<Duration>,
    should_fail: bool,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl FakeMaskGenerator {
    #[must_use]
    pub fn new(mask: Vec<u8>) -> Self {
        Self {
            mask,
            delay: None,
            should_fail: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn new_failing() -> Self {
        let mut generator = Self::new(Vec::new());
        generator.should_fail = true;
        generator
    }

    /// Generator that sleeps before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaskGenerator for FakeMaskGenerator {
    async fn generate(&self, image: &[u8], _context: &ProjectContext) -> Result<MaskOutput> {
        self.call_history
            .lock()
            .unwrap()
            .push(format!("generate({} bytes)", image.len()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(PipelineError::remote_call("mask_generation", "simulated outage"));
        }
        Ok(MaskOutput {
            mask: self.mask.clone(),
            timing_ms: 5,
        })
    }

    fn name(&self) -> &str {
        "fake-mask-generator"
    }
}

/// Generative model that echoes the request image or returns canned bytes
#[derive(Debug, Clone, Default)]
pub struct FakeGenerativeModel {
    /// Returned instead of the request image when set
    output: Option<Vec<u8>>,
    delay: Option<Duration>,
    should_fail: bool,
    call_history: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl FakeGenerativeModel {
    /// Model returning the image it was sent
    #[must_use]
    pub fn echo() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn returning(output: Vec<u8>) -> Self {
        Self {
            output: Some(output),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Model that sleeps before every answer
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn respond(&self, call: &str, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.call_history.lock().unwrap().push(call.to_string());
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(PipelineError::remote_call(call, "simulated outage"));
        }
        Ok(self.output.clone().unwrap_or_else(|| request.image.clone()))
    }
}

#[async_trait]
impl GenerativeModel for FakeGenerativeModel {
    async fn inpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.respond("inpaint", request).await
    }

    async fn outpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.respond("outpaint", request).await
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
