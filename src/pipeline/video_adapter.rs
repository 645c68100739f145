//! Image-to-video generation. Backends either answer with the finished clip or
//! hand back a job id that [`JobPoller`] drives to a terminal state; both paths
//! end in the same [`GeneratedVideo`].

mod http_backend;
mod polling;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assets::{target_dimensions, AssetSpecification, GeneratedImage, GeneratedVideo};
use crate::error::GenerationError;
use crate::pipeline::image_backends::aspect_ratio_for;
use crate::pipeline::pathing::{mime_for_path, write_output, OutputSuffix};

pub use http_backend::HttpVideoBackend;
pub use polling::{JobPoller, PollPolicy, PollState};

pub const DEFAULT_VIDEO_DURATION_SECS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    /// `data:<mime>;base64,<payload>` of the source frame.
    #[serde(default)]
    pub image: Option<String>,
    pub duration: u32,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSubmission {
    Immediate(Vec<u8>),
    Job { request_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed { video_url: String },
    Failed { message: String },
}

#[async_trait]
pub trait VideoBackend: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn submit(&self, request: &VideoGenerationRequest) -> Result<VideoSubmission, GenerationError>;
    async fn poll(&self, request_id: &str) -> Result<JobStatus, GenerationError>;
    async fn fetch(&self, video_url: &str) -> Result<Vec<u8>, GenerationError>;
}

pub type SharedVideoBackend = Arc<dyn VideoBackend>;

#[derive(Clone)]
pub struct VideoAdapter {
    backend: SharedVideoBackend,
    poller: JobPoller,
    output_dir: PathBuf,
}

impl VideoAdapter {
    pub fn new(backend: SharedVideoBackend, poller: JobPoller, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            poller,
            output_dir: output_dir.into(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn generate(
        &self,
        specification: &AssetSpecification,
        source: &GeneratedImage,
    ) -> Result<GeneratedVideo, GenerationError> {
        let request = build_video_request(specification, Some(encode_source_image(source).await?));
        let backend = self.backend.name().to_string();

        let (bytes, job_id) = match self.backend.submit(&request).await? {
            VideoSubmission::Immediate(bytes) => (bytes, None),
            VideoSubmission::Job { request_id } => {
                info!(backend = backend.as_str(), job_id = request_id.as_str(), "video job submitted");
                let bytes = self.await_job(request_id.as_str()).await?;
                (bytes, Some(request_id))
            }
        };

        let file = write_output(self.output_dir.as_path(), OutputSuffix::Mp4, bytes.as_slice()).await?;
        info!(backend = backend.as_str(), file = file.filename.as_str(), "video persisted");
        Ok(GeneratedVideo {
            filename: file.filename,
            path: file.path,
            duration_seconds: f64::from(request.duration),
            aspect_ratio: request.aspect_ratio,
            prompt: request.prompt,
            backend,
            job_id,
            source_image: Some(source.filename.clone()),
        })
    }

    async fn await_job(&self, request_id: &str) -> Result<Vec<u8>, GenerationError> {
        match self.poller.run(self.backend.as_ref(), request_id).await? {
            PollState::Completed { video_url, .. } => self.backend.fetch(video_url.as_str()).await,
            PollState::Failed { message, .. } => {
                warn!(job_id = request_id, message = message.as_str(), "video job failed");
                Err(GenerationError::backend(self.backend.name(), message))
            }
            PollState::TimedOut { waited, .. } => Err(GenerationError::Timeout {
                job_id: request_id.to_string(),
                waited_secs: waited.as_secs(),
            }),
            // `run` only returns terminal states.
            PollState::Pending { .. } => Err(GenerationError::backend(
                self.backend.name(),
                "poller stopped before a terminal state",
            )),
        }
    }
}

pub fn build_video_request(
    specification: &AssetSpecification,
    image: Option<String>,
) -> VideoGenerationRequest {
    let (width, height) = target_dimensions(specification.kind, specification.platform);
    VideoGenerationRequest {
        prompt: video_prompt(specification),
        image,
        duration: specification
            .video_duration_seconds
            .unwrap_or(DEFAULT_VIDEO_DURATION_SECS),
        aspect_ratio: aspect_ratio_for(width, height).to_string(),
    }
}

fn video_prompt(specification: &AssetSpecification) -> String {
    let visual = &specification.visual;
    let mut prompt = visual.description.trim().trim_end_matches('.').to_string();
    if let Some(mood) = visual.mood.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        prompt.push_str(format!(", {mood} atmosphere").as_str());
    }
    prompt.push_str(". Smooth cinematic camera motion, subtle natural movement.");
    prompt
}

async fn encode_source_image(source: &GeneratedImage) -> Result<String, GenerationError> {
    let bytes = tokio::fs::read(source.path.as_path()).await?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for_path(source.path.as_path()),
        BASE64_STANDARD.encode(bytes)
    ))
}
