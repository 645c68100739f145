use std::path::PathBuf;

use tracing::info;

use crate::assets::{target_dimensions, AssetSpecification, BrandContext, GeneratedImage, VisualConcept};
use crate::error::GenerationError;
use crate::pipeline::image_backends::{ImageFallbackChain, ImageGenerationRequest};
use crate::pipeline::pathing::{write_output, OutputSuffix};

pub const DEFAULT_NEGATIVE_PROMPT: &str =
    "text, words, letters, watermark, logo, signature, blurry, low quality, distorted, deformed";
const NO_TEXT_CLAUSE: &str = "No text or lettering anywhere in the image.";

/// Sizes the request for the target platform, assembles the prompt, runs the
/// fallback chain and persists whatever it returns.
#[derive(Clone)]
pub struct ImageAdapter {
    chain: ImageFallbackChain,
    output_dir: PathBuf,
}

impl ImageAdapter {
    pub fn new(chain: ImageFallbackChain, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            chain,
            output_dir: output_dir.into(),
        }
    }

    pub fn chain(&self) -> &ImageFallbackChain {
        &self.chain
    }

    pub fn build_request(
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
    ) -> ImageGenerationRequest {
        let (width, height) = target_dimensions(specification.kind, specification.platform);
        let mut request =
            ImageGenerationRequest::new(assemble_prompt(&specification.visual, brand), width, height);
        request.negative_prompt = Some(String::from(DEFAULT_NEGATIVE_PROMPT));
        request.style = specification
            .visual
            .style
            .as_deref()
            .and_then(non_empty)
            .map(String::from);
        request
    }

    pub async fn generate(
        &self,
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
    ) -> Result<GeneratedImage, GenerationError> {
        let request = Self::build_request(specification, brand);
        let result = self.chain.generate(&request).await;
        if result.image_bytes.is_empty() {
            return Err(GenerationError::backend(
                result.backend_used.as_str(),
                "result carried no image bytes",
            ));
        }
        let suffix = image::guess_format(result.image_bytes.as_slice())
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .map(OutputSuffix::from_image_format)
            .unwrap_or(OutputSuffix::Png);
        let file = write_output(self.output_dir.as_path(), suffix, result.image_bytes.as_slice()).await?;
        info!(
            backend = result.backend_used.as_str(),
            file = file.filename.as_str(),
            "image persisted"
        );
        Ok(GeneratedImage {
            filename: file.filename,
            path: file.path,
            width: result.width,
            height: result.height,
            prompt: result.original_prompt,
            backend: result.backend_used,
        })
    }
}

/// Description first, then the styling attributes that are present, brand
/// palette hints and a closing no-text instruction.
pub fn assemble_prompt(visual: &VisualConcept, brand: Option<&BrandContext>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = non_empty(visual.description.as_str()) {
        parts.push(format!("{}.", description.trim_end_matches('.')));
    }
    let mut attributes = Vec::new();
    if let Some(style) = visual.style.as_deref().and_then(non_empty) {
        attributes.push(format!("{style} style"));
    }
    if let Some(mood) = visual.mood.as_deref().and_then(non_empty) {
        attributes.push(format!("{mood} mood"));
    }
    if let Some(composition) = visual.composition.as_deref().and_then(non_empty) {
        attributes.push(format!("{composition} composition"));
    }
    if !attributes.is_empty() {
        parts.push(format!("{}.", attributes.join(", ")));
    }
    let keywords: Vec<&str> = visual
        .keywords
        .iter()
        .filter_map(|k| non_empty(k.as_str()))
        .collect();
    if !keywords.is_empty() {
        parts.push(format!("Keywords: {}.", keywords.join(", ")));
    }
    if let Some(brand) = brand {
        let palette: Vec<&str> = [brand.primary_color.as_deref(), brand.secondary_color.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(non_empty)
            .collect();
        if !palette.is_empty() {
            parts.push(format!("Color palette accents: {}.", palette.join(" and ")));
        }
    }
    parts.push(String::from(NO_TEXT_CLAUSE));
    parts.join(" ")
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
