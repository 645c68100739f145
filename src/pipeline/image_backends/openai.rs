use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ImageBackend, ImageGenerationRequest, ImageGenerationResult};
use crate::error::GenerationError;
use crate::pipeline::http_support::{build_client, describe_failure, join_url, transport_error};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_IMAGE_MODEL: &str = "gpt-image-1";

#[derive(Debug, Serialize)]
struct OpenAiImagesRequest<'a> {
    model: &'a str,
    prompt: String,
    size: &'static str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiImagesResponse {
    #[serde(default)]
    data: Vec<OpenAiImagesResponseItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImagesResponseItem {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiImageBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiImageBackend {
    pub const NAME: &'static str = "openai-images";

    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_OPENAI_BASE_URL),
            model: String::from(DEFAULT_OPENAI_IMAGE_MODEL),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// The images endpoint only accepts three sizes; pick by orientation.
pub(crate) fn openai_size_for(width: u32, height: u32) -> &'static str {
    if width > height {
        "1536x1024"
    } else if height > width {
        "1024x1536"
    } else {
        "1024x1024"
    }
}

fn prompt_with_negative(request: &ImageGenerationRequest) -> String {
    match request
        .negative_prompt
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(negative) => format!("{}\n\nAvoid: {negative}", request.prompt),
        None => request.prompt.clone(),
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn generate(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResult, GenerationError> {
        let body = OpenAiImagesRequest {
            model: self.model.as_str(),
            prompt: prompt_with_negative(request),
            size: openai_size_for(request.width, request.height),
            n: 1,
        };
        let response = self
            .client
            .post(join_url(self.base_url.as_str(), "/v1/images/generations"))
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        if !response.status().is_success() {
            let message = describe_failure(response).await;
            return Ok(ImageGenerationResult::failed(Self::NAME, request, message));
        }

        let payload: OpenAiImagesResponse = response.json().await.map_err(|e| {
            GenerationError::backend(Self::NAME, format!("JSON decode failed: {e}"))
        })?;
        let Some(item) = payload.data.into_iter().next() else {
            return Ok(ImageGenerationResult::failed(
                Self::NAME,
                request,
                "API returned no image payload",
            ));
        };

        match (item.b64_json, item.url) {
            (Some(b64), _) => {
                let bytes = BASE64_STANDARD.decode(b64.as_bytes()).map_err(|e| {
                    GenerationError::backend(Self::NAME, format!("image base64 decode failed: {e}"))
                })?;
                Ok(ImageGenerationResult::succeeded(Self::NAME, request, bytes))
            }
            (None, Some(url)) => {
                let bytes = self
                    .client
                    .get(url.as_str())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| transport_error(Self::NAME, e))?
                    .bytes()
                    .await
                    .map_err(|e| transport_error(Self::NAME, e))?;
                let mut result =
                    ImageGenerationResult::succeeded(Self::NAME, request, bytes.to_vec());
                result.url = Some(url);
                Ok(result)
            }
            (None, None) => Ok(ImageGenerationResult::failed(
                Self::NAME,
                request,
                "API returned no image payload",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_orientation() {
        assert_eq!(openai_size_for(1200, 630), "1536x1024");
        assert_eq!(openai_size_for(1080, 1920), "1024x1536");
        assert_eq!(openai_size_for(1080, 1080), "1024x1024");
    }

    #[test]
    fn negative_prompt_is_folded_into_prompt() {
        let mut request = ImageGenerationRequest::new("beach scene", 1080, 1080);
        assert_eq!(prompt_with_negative(&request), "beach scene");

        request.negative_prompt = Some(String::from("text, watermark"));
        assert_eq!(
            prompt_with_negative(&request),
            "beach scene\n\nAvoid: text, watermark"
        );
    }
}
