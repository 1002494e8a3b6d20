//! Shared fixtures and fake collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bgswap::{
    error::{PipelineError, Result},
    GenerationRequest, GenerativeModel, MaskGenerator, MaskOutput, ProjectContext,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered record of fake collaborator events
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer
}

/// Textured RGB product photo
pub fn product_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x * y) % 256) as u8])
    })
}

/// Mask with value 0 inside `rect` (x, y, width, height) and 255 elsewhere
pub fn rectangle_mask(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> GrayImage {
    let (rx, ry, rw, rh) = rect;
    GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= rx && x < rx + rw && y >= ry && y < ry + rh;
        Luma([if inside { 0 } else { 255 }])
    })
}

/// Centred subject covering half of each dimension
pub fn centre_mask(width: u32, height: u32) -> GrayImage {
    rectangle_mask(width, height, (width / 4, height / 4, width / 2, height / 2))
}

/// Mask generator keyed on `ProjectContext::project_id`
///
/// Records `start:<id>` and `end:<id>` around a short sleep and fails for the
/// configured ids.
#[derive(Clone)]
pub struct RecordingMaskGenerator {
    mask: Vec<u8>,
    delay: Duration,
    failing_ids: Vec<String>,
    events: EventLog,
}

impl RecordingMaskGenerator {
    pub fn new(mask: Vec<u8>, events: EventLog) -> Self {
        Self {
            mask,
            delay: Duration::from_millis(5),
            failing_ids: Vec::new(),
            events,
        }
    }

    pub fn failing_for(mut self, id: &str) -> Self {
        self.failing_ids.push(id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl MaskGenerator for RecordingMaskGenerator {
    async fn generate(&self, _image: &[u8], context: &ProjectContext) -> Result<MaskOutput> {
        let id = context.project_id.clone().unwrap_or_default();
        self.events.lock().unwrap().push(format!("start:{}", id));
        tokio::time::sleep(self.delay).await;
        self.events.lock().unwrap().push(format!("end:{}", id));

        if self.failing_ids.contains(&id) {
            return Err(PipelineError::remote_call(
                "mask_generation",
                format!("service rejected {}", id),
            ));
        }
        Ok(MaskOutput {
            mask: self.mask.clone(),
            timing_ms: self.delay.as_millis() as u64,
        })
    }

    fn name(&self) -> &str {
        "recording-mask-generator"
    }
}

/// Generative model that echoes the submitted image and counts calls
#[derive(Clone, Default)]
pub struct EchoModel {
    calls: Arc<Mutex<Vec<String>>>,
    inpaint_delay: Duration,
    outpaint_delay: Duration,
}

impl EchoModel {
    /// Sleep this long inside every inpaint and outpaint call respectively
    pub fn with_delays(mut self, inpaint: Duration, outpaint: Duration) -> Self {
        self.inpaint_delay = inpaint;
        self.outpaint_delay = outpaint;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for EchoModel {
    async fn inpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push("inpaint".to_string());
        tokio::time::sleep(self.inpaint_delay).await;
        Ok(request.image.clone())
    }

    async fn outpaint(&self, request: &GenerationRequest) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push("outpaint".to_string());
        tokio::time::sleep(self.outpaint_delay).await;
        Ok(request.image.clone())
    }

    fn model_name(&self) -> &str {
        "echo-model"
    }
}
