use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use serde::Deserialize;

use super::{ImageBackend, ImageGenerationRequest, ImageGenerationResult};
use crate::error::GenerationError;
use crate::pipeline::http_support::{build_client, describe_failure, transport_error};

pub const DEFAULT_STABILITY_ENDPOINT: &str =
    "https://api.stability.ai/v2beta/stable-image/generate/core";

#[derive(Debug, Deserialize)]
struct StabilityErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Multipart text-to-image endpoint answering with raw image bytes.
#[derive(Debug, Clone)]
pub struct StabilityImageBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    output_format: String,
}

impl StabilityImageBackend {
    pub const NAME: &'static str = "stability";

    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            api_key: api_key.into(),
            endpoint: String::from(DEFAULT_STABILITY_ENDPOINT),
            output_format: String::from("png"),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = output_format.into();
        self
    }

    fn form_for(&self, request: &ImageGenerationRequest) -> multipart::Form {
        let mut form = multipart::Form::new()
            .text("prompt", request.prompt.clone())
            .text("aspect_ratio", request.aspect_ratio())
            .text("output_format", self.output_format.clone());
        if let Some(seed) = request.seed {
            form = form.text("seed", seed.to_string());
        }
        if let Some(negative) = request
            .negative_prompt
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            form = form.text("negative_prompt", negative.to_string());
        }
        if let Some(style) = request.style.as_deref().filter(|v| !v.trim().is_empty()) {
            form = form.text("style_preset", style.to_string());
        }
        form
    }
}

#[async_trait]
impl ImageBackend for StabilityImageBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResult, GenerationError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(self.api_key.as_str())
            .header(header::ACCEPT, "image/*")
            .multipart(self.form_for(request))
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;

        let status = response.status();
        let is_image = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("image/"))
            .unwrap_or(false);

        if status.is_success() && is_image {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(Self::NAME, e))?;
            return Ok(ImageGenerationResult::succeeded(
                Self::NAME,
                request,
                bytes.to_vec(),
            ));
        }

        if status.is_success() {
            return Ok(ImageGenerationResult::failed(
                Self::NAME,
                request,
                "response was not an image",
            ));
        }

        let description = describe_failure(response).await;
        let message = description
            .split_once(": ")
            .and_then(|(_, body)| serde_json::from_str::<StabilityErrorBody>(body).ok())
            .map(|body| {
                let detail = body.errors.join("; ");
                match body.name {
                    Some(name) if !detail.is_empty() => format!("{name}: {detail}"),
                    Some(name) => name,
                    None => detail,
                }
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(description);
        Ok(ImageGenerationResult::failed(Self::NAME, request, message))
    }
}
