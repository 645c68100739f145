//! Image generation backends behind one normalized contract, plus the ordered
//! fallback chain that always ends in a local placeholder renderer.

mod openai;
mod placeholder;
mod stability;

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;

pub use openai::{OpenAiImageBackend, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_IMAGE_MODEL};
pub use placeholder::PlaceholderImageBackend;
pub use stability::{StabilityImageBackend, DEFAULT_STABILITY_ENDPOINT};

const SUPPORTED_ASPECT_RATIOS: [(&str, f64); 6] = [
    ("1:1", 1.0),
    ("4:3", 4.0 / 3.0),
    ("3:4", 3.0 / 4.0),
    ("16:9", 16.0 / 9.0),
    ("9:16", 9.0 / 16.0),
    ("21:9", 21.0 / 9.0),
];
const ASPECT_RATIO_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            width,
            height,
            negative_prompt: None,
            style: None,
            seed: None,
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        aspect_ratio_for(self.width, self.height)
    }
}

/// Normalized outcome every backend reports, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationResult {
    pub success: bool,
    pub generated_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_prompt: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub backend_used: String,
}

impl ImageGenerationResult {
    pub fn succeeded(
        backend: &str,
        request: &ImageGenerationRequest,
        image_bytes: Vec<u8>,
    ) -> Self {
        let (width, height) =
            probe_dimensions(image_bytes.as_slice()).unwrap_or((request.width, request.height));
        Self {
            success: true,
            generated_id: uuid::Uuid::new_v4().to_string(),
            url: None,
            image_bytes,
            width,
            height,
            original_prompt: request.prompt.clone(),
            style: request.style.clone(),
            error: None,
            backend_used: backend.to_string(),
        }
    }

    pub fn failed(backend: &str, request: &ImageGenerationRequest, error: impl Into<String>) -> Self {
        Self {
            success: false,
            generated_id: String::new(),
            url: None,
            image_bytes: Vec::new(),
            width: request.width,
            height: request.height,
            original_prompt: request.prompt.clone(),
            style: request.style.clone(),
            error: Some(error.into()),
            backend_used: backend.to_string(),
        }
    }

    /// Backends download any hosted URL themselves; a result the adapter can
    /// persist always carries bytes.
    pub fn has_payload(&self) -> bool {
        !self.image_bytes.is_empty()
    }
}

#[async_trait]
pub trait ImageBackend: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// `Ok` with `success == false` is a provider-reported refusal; `Err` is a
    /// transport or decoding failure. The chain treats both as "try the next one".
    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResult, GenerationError>;
}

pub type SharedImageBackend = Arc<dyn ImageBackend>;

/// Ordered backends terminated by a placeholder renderer that cannot fail.
#[derive(Clone)]
pub struct ImageFallbackChain {
    backends: Vec<SharedImageBackend>,
    terminal: PlaceholderImageBackend,
}

impl ImageFallbackChain {
    pub fn new(backends: Vec<SharedImageBackend>) -> Self {
        Self {
            backends,
            terminal: PlaceholderImageBackend::new(),
        }
    }

    pub fn placeholder_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_terminal(mut self, terminal: PlaceholderImageBackend) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|b| b.name().to_string())
            .chain(std::iter::once(self.terminal.name().to_string()))
            .collect()
    }

    pub async fn generate(&self, request: &ImageGenerationRequest) -> ImageGenerationResult {
        for backend in self.backends.iter() {
            match backend.generate(request).await {
                Ok(result) if result.success && result.has_payload() => {
                    info!(
                        backend = backend.name(),
                        width = result.width,
                        height = result.height,
                        "image backend succeeded"
                    );
                    return result;
                }
                Ok(result) => {
                    warn!(
                        backend = backend.name(),
                        error = result.error.as_deref().unwrap_or("empty payload"),
                        "image backend reported failure; falling back"
                    );
                }
                Err(error) => {
                    warn!(backend = backend.name(), %error, "image backend errored; falling back");
                }
            }
        }
        self.terminal.render(request)
    }
}

/// Nearest supported ratio within the tolerance band; outside every band, the
/// nearer of the two supported ratios bracketing `width / height`.
pub fn aspect_ratio_for(width: u32, height: u32) -> &'static str {
    if width == 0 || height == 0 {
        return "1:1";
    }
    let ratio = f64::from(width) / f64::from(height);
    let distance = |candidate: f64| (ratio - candidate).abs();

    let in_band = SUPPORTED_ASPECT_RATIOS
        .iter()
        .filter(|(_, r)| distance(*r) <= ASPECT_RATIO_TOLERANCE)
        .min_by(|a, b| distance(a.1).total_cmp(&distance(b.1)));
    if let Some((label, _)) = in_band {
        return label;
    }

    let below = SUPPORTED_ASPECT_RATIOS
        .iter()
        .filter(|(_, r)| *r <= ratio)
        .max_by(|a, b| a.1.total_cmp(&b.1));
    let above = SUPPORTED_ASPECT_RATIOS
        .iter()
        .filter(|(_, r)| *r >= ratio)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    match (below, above) {
        (Some(lo), Some(hi)) if distance(hi.1) < distance(lo.1) => hi.0,
        (Some(lo), _) => lo.0,
        (None, Some(hi)) => hi.0,
        (None, None) => "1:1",
    }
}

pub(crate) fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.is_empty() {
        return None;
    }
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
