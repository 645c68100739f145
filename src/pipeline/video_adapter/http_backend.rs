use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{JobStatus, VideoBackend, VideoGenerationRequest, VideoSubmission};
use crate::error::GenerationError;
use crate::pipeline::http_support::{build_client, describe_failure, join_url, transport_error};

const GENERATIONS_PATH: &str = "/v1/video/generations";

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    duration: u32,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmitAccepted {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    output: Option<StatusOutput>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusOutput {
    #[serde(default)]
    video_url: Option<String>,
}

/// JSON submit / status / download against a generic video generation API.
#[derive(Debug, Clone)]
pub struct HttpVideoBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: Option<String>,
}

impl HttpVideoBackend {
    pub const NAME: &'static str = "video-http";

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: None,
        })
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            join_url(self.base_url.as_str(), url)
        }
    }
}

pub(crate) fn parse_job_status(body: StatusBodyView<'_>) -> JobStatus {
    match body.status.trim().to_ascii_lowercase().as_str() {
        "completed" | "succeeded" | "success" => match body.video_url {
            Some(url) if !url.trim().is_empty() => JobStatus::Completed {
                video_url: url.to_string(),
            },
            _ => JobStatus::Failed {
                message: String::from("job completed without output.video_url"),
            },
        },
        "failed" | "error" | "cancelled" | "canceled" => JobStatus::Failed {
            message: body
                .error
                .map(str::to_string)
                .unwrap_or_else(|| String::from("video job failed")),
        },
        _ => JobStatus::Pending,
    }
}

pub(crate) struct StatusBodyView<'a> {
    pub status: &'a str,
    pub video_url: Option<&'a str>,
    pub error: Option<&'a str>,
}

#[async_trait]
impl VideoBackend for HttpVideoBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn submit(&self, request: &VideoGenerationRequest) -> Result<VideoSubmission, GenerationError> {
        let body = SubmitBody {
            prompt: request.prompt.as_str(),
            image: request.image.as_deref(),
            duration: request.duration,
            aspect_ratio: request.aspect_ratio.as_str(),
            model: self.model.as_deref(),
        };
        let response = self
            .client
            .post(join_url(self.base_url.as_str(), GENERATIONS_PATH))
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        if !response.status().is_success() {
            return Err(GenerationError::backend(Self::NAME, describe_failure(response).await));
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        if !is_json {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(Self::NAME, e))?;
            return Ok(VideoSubmission::Immediate(bytes.to_vec()));
        }

        let accepted: SubmitAccepted = response.json().await.map_err(|e| {
            GenerationError::backend(Self::NAME, format!("submit JSON decode failed: {e}"))
        })?;
        accepted
            .request_id
            .or(accepted.id)
            .filter(|id| !id.trim().is_empty())
            .map(|request_id| VideoSubmission::Job { request_id })
            .ok_or_else(|| GenerationError::backend(Self::NAME, "submit response had no request_id"))
    }

    async fn poll(&self, request_id: &str) -> Result<JobStatus, GenerationError> {
        let response = self
            .client
            .get(join_url(
                self.base_url.as_str(),
                format!("{GENERATIONS_PATH}/{request_id}").as_str(),
            ))
            .bearer_auth(self.api_key.as_str())
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        if !response.status().is_success() {
            return Err(GenerationError::backend(Self::NAME, describe_failure(response).await));
        }
        let body: StatusBody = response.json().await.map_err(|e| {
            GenerationError::backend(Self::NAME, format!("status JSON decode failed: {e}"))
        })?;
        debug!(job_id = request_id, status = body.status.as_str(), "video status");
        Ok(parse_job_status(StatusBodyView {
            status: body.status.as_str(),
            video_url: body.output.as_ref().and_then(|o| o.video_url.as_deref()),
            error: body.error.as_deref(),
        }))
    }

    async fn fetch(&self, video_url: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .get(self.resolve_url(video_url))
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        if !response.status().is_success() {
            return Err(GenerationError::backend(Self::NAME, describe_failure(response).await));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a>(status: &'a str, url: Option<&'a str>, error: Option<&'a str>) -> StatusBodyView<'a> {
        StatusBodyView {
            status,
            video_url: url,
            error,
        }
    }

    #[test]
    fn maps_provider_statuses() {
        assert_eq!(parse_job_status(view("pending", None, None)), JobStatus::Pending);
        assert_eq!(parse_job_status(view("IN_PROGRESS", None, None)), JobStatus::Pending);
        assert_eq!(
            parse_job_status(view("completed", Some("https://cdn/x.mp4"), None)),
            JobStatus::Completed {
                video_url: String::from("https://cdn/x.mp4")
            }
        );
        assert_eq!(
            parse_job_status(view("failed", None, Some("quota exceeded"))),
            JobStatus::Failed {
                message: String::from("quota exceeded")
            }
        );
    }

    #[test]
    fn completed_without_url_is_a_failure() {
        assert!(matches!(
            parse_job_status(view("completed", Some(" "), None)),
            JobStatus::Failed { .. }
        ));
    }
}
