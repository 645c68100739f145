use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use image::{Rgba, RgbaImage};
use tracing::warn;

use super::{ImageBackend, ImageGenerationRequest, ImageGenerationResult};
use crate::error::GenerationError;
use crate::pipeline::composition::{
    draw_centered_lines, encode_png, wrap_text, TextMeasure, Typeface,
};

const DEFAULT_EDGE: u32 = 1024;
const MAX_EDGE: u32 = 4096;
const MAX_PROMPT_LINES: usize = 6;
/// 1x1 transparent PNG.
const MINIMAL_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Last link of every fallback chain: a local gradient with the prompt drawn
/// on it. Output depends only on the request.
#[derive(Debug, Clone)]
pub struct PlaceholderImageBackend {
    typeface: Arc<Typeface>,
}

impl Default for PlaceholderImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderImageBackend {
    pub const NAME: &'static str = "placeholder";

    pub fn new() -> Self {
        Self {
            typeface: Arc::new(Typeface::builtin()),
        }
    }

    pub fn with_typeface(typeface: Arc<Typeface>) -> Self {
        Self { typeface }
    }

    pub fn name(&self) -> &str {
        Self::NAME
    }

    pub fn render(&self, request: &ImageGenerationRequest) -> ImageGenerationResult {
        let width = clamp_edge(request.width);
        let height = clamp_edge(request.height);
        let seed = prompt_seed(request.prompt.as_str()) ^ request.seed.unwrap_or(0);
        let mut canvas = gradient(width, height, seed);
        self.draw_prompt(&mut canvas, request.prompt.as_str());

        let bytes = match encode_png(&canvas) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "placeholder encode failed; using minimal image");
                BASE64_STANDARD
                    .decode(MINIMAL_PNG_B64.as_bytes())
                    .unwrap_or_else(|_| vec![0x89, b'P', b'N', b'G'])
            }
        };
        let mut result = ImageGenerationResult::succeeded(Self::NAME, request, bytes);
        result.style = Some(String::from("placeholder"));
        result
    }

    fn draw_prompt(&self, canvas: &mut RgbaImage, prompt: &str) {
        let width = canvas.width();
        let size = (width as f32 * 0.045).max(12.0);
        let mut lines = wrap_text(prompt, self.typeface.as_ref(), size, (width as f32 * 0.8) as u32);
        lines.truncate(MAX_PROMPT_LINES);
        if lines.is_empty() {
            return;
        }
        let spacing = (size * 0.25) as u32;
        let line_height = self.typeface.line_height(size);
        let block = lines.len() as u32 * (line_height + spacing);
        let top = canvas.height().saturating_sub(block) / 2;
        draw_centered_lines(canvas, self.typeface.as_ref(), lines.as_slice(), top, size, spacing);
    }
}

#[async_trait]
impl ImageBackend for PlaceholderImageBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResult, GenerationError> {
        Ok(self.render(request))
    }
}

fn clamp_edge(value: u32) -> u32 {
    if value == 0 {
        DEFAULT_EDGE
    } else {
        value.min(MAX_EDGE)
    }
}

/// FNV-1a; stable across runs and platforms.
fn prompt_seed(prompt: &str) -> u64 {
    prompt.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn gradient(width: u32, height: u32, seed: u64) -> RgbaImage {
    let channel = |shift: u32| ((seed >> shift) & 0xff) as f32;
    // Keep both ends mid-dark so white text stays readable.
    let start = [0, 8, 16].map(|s| 30.0 + channel(s) * 0.45);
    let end = [24, 32, 40].map(|s| 60.0 + channel(s) * 0.55);
    let span = (width + height).saturating_sub(2).max(1) as f32;

    RgbaImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / span;
        let mix = |i: usize| (start[i] + (end[i] - start[i]) * t).round().clamp(0.0, 255.0) as u8;
        Rgba([mix(0), mix(1), mix(2), 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_deterministic_per_prompt() {
        let backend = PlaceholderImageBackend::new();
        let request = ImageGenerationRequest::new("beach scene", 80, 60);

        let first = backend.render(&request);
        let second = backend.render(&request);
        let other = backend.render(&ImageGenerationRequest::new("city at night", 80, 60));

        assert!(first.success);
        assert_eq!(first.backend_used, "placeholder");
        assert_eq!(first.image_bytes, second.image_bytes);
        assert_ne!(first.image_bytes, other.image_bytes);
        assert_eq!((first.width, first.height), (80, 60));
    }

    #[test]
    fn zero_sized_requests_get_a_default_canvas() {
        let result = PlaceholderImageBackend::new().render(&ImageGenerationRequest::new("", 0, 0));
        assert!(result.success);
        assert_eq!((result.width, result.height), (DEFAULT_EDGE, DEFAULT_EDGE));
    }
}
