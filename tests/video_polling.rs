use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use assetsmith_core::assets::{AssetKind, AssetSpecification, GeneratedImage, Platform};
use assetsmith_core::error::GenerationError;
use assetsmith_core::pipeline::clock::ManualClock;
use assetsmith_core::pipeline::pathing::{write_output, OutputSuffix};
use assetsmith_core::pipeline::video_adapter::{
    JobPoller, JobStatus, PollPolicy, VideoAdapter, VideoBackend, VideoGenerationRequest,
    VideoSubmission,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

const CLIP: &[u8] = b"\x00\x00\x00\x18ftypmp42clip";

fn temp_output_dir(label: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("assetsmith_video_{label}_{stamp}"))
}

/// Answers `submit` with a fixed submission and `poll` from a script; once the
/// script runs out every poll reports pending.
struct ScriptedVideoBackend {
    submission: VideoSubmission,
    statuses: Mutex<VecDeque<JobStatus>>,
    polls: Mutex<u32>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedVideoBackend {
    fn new(submission: VideoSubmission, statuses: Vec<JobStatus>) -> Self {
        Self {
            submission,
            statuses: Mutex::new(statuses.into()),
            polls: Mutex::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn polls(&self) -> u32 {
        *self.polls.lock().expect("polls lock")
    }
}

#[async_trait]
impl VideoBackend for ScriptedVideoBackend {
    fn name(&self) -> &str {
        "scripted-video"
    }

    async fn submit(
        &self,
        _request: &VideoGenerationRequest,
    ) -> Result<VideoSubmission, GenerationError> {
        Ok(self.submission.clone())
    }

    async fn poll(&self, _request_id: &str) -> Result<JobStatus, GenerationError> {
        *self.polls.lock().expect("polls lock") += 1;
        Ok(self
            .statuses
            .lock()
            .expect("statuses lock")
            .pop_front()
            .unwrap_or(JobStatus::Pending))
    }

    async fn fetch(&self, video_url: &str) -> Result<Vec<u8>, GenerationError> {
        self.fetched
            .lock()
            .expect("fetched lock")
            .push(video_url.to_string());
        Ok(CLIP.to_vec())
    }
}

async fn source_image(dir: &std::path::Path) -> GeneratedImage {
    let file = write_output(dir, OutputSuffix::Png, b"\x89PNG\r\n\x1a\nfake")
        .await
        .expect("source image written");
    GeneratedImage {
        filename: file.filename,
        path: file.path,
        width: 1080,
        height: 1920,
        prompt: String::from("city at dusk"),
        backend: String::from("placeholder"),
    }
}

fn short_video() -> AssetSpecification {
    let mut spec = AssetSpecification::new(AssetKind::ShortVideo, Platform::Tiktok);
    spec.visual.description = String::from("city at dusk");
    spec.video_duration_seconds = Some(6);
    spec
}

fn adapter(backend: Arc<ScriptedVideoBackend>, clock: &ManualClock, dir: &std::path::Path) -> VideoAdapter {
    let poller = JobPoller::new(Arc::new(clock.clone()), PollPolicy::default());
    VideoAdapter::new(backend, poller, dir)
}

#[tokio::test]
async fn immediate_and_polled_submissions_share_one_shape() {
    let dir = temp_output_dir("shape");
    let image = source_image(dir.as_path()).await;

    let immediate_clock = ManualClock::new();
    let immediate_backend = Arc::new(ScriptedVideoBackend::new(
        VideoSubmission::Immediate(CLIP.to_vec()),
        Vec::new(),
    ));
    let immediate = adapter(immediate_backend.clone(), &immediate_clock, dir.as_path())
        .generate(&short_video(), &image)
        .await
        .expect("immediate video");

    let polled_clock = ManualClock::new();
    let polled_backend = Arc::new(ScriptedVideoBackend::new(
        VideoSubmission::Job {
            request_id: String::from("job-42"),
        },
        vec![
            JobStatus::Pending,
            JobStatus::Completed {
                video_url: String::from("https://cdn.example/job-42.mp4"),
            },
        ],
    ));
    let polled = adapter(polled_backend.clone(), &polled_clock, dir.as_path())
        .generate(&short_video(), &image)
        .await
        .expect("polled video");

    assert_eq!(immediate_backend.polls(), 0);
    assert_eq!(immediate.job_id, None);
    assert_eq!(polled.job_id.as_deref(), Some("job-42"));
    assert_eq!(polled_backend.polls(), 2);
    assert_eq!(polled_clock.slept(), Duration::from_secs(10));
    assert_eq!(
        polled_backend.fetched.lock().expect("fetched lock").as_slice(),
        ["https://cdn.example/job-42.mp4"]
    );

    for video in [&immediate, &polled] {
        assert_eq!(video.aspect_ratio, "9:16");
        assert_eq!(video.duration_seconds, 6.0);
        assert_eq!(video.backend, "scripted-video");
        assert_eq!(video.source_image.as_deref(), Some(image.filename.as_str()));
        assert!(video.filename.ends_with(".mp4"));
        assert_eq!(std::fs::read(video.path.as_path()).expect("clip on disk"), CLIP);
    }
    assert_ne!(immediate.filename, polled.filename);
}

#[tokio::test]
async fn completion_on_first_poll_never_sleeps() {
    let dir = temp_output_dir("first_poll");
    let image = source_image(dir.as_path()).await;
    let clock = ManualClock::new();
    let backend = Arc::new(ScriptedVideoBackend::new(
        VideoSubmission::Job {
            request_id: String::from("fast"),
        },
        vec![JobStatus::Completed {
            video_url: String::from("/files/fast.mp4"),
        }],
    ));

    adapter(backend.clone(), &clock, dir.as_path())
        .generate(&short_video(), &image)
        .await
        .expect("video ready on first poll");

    assert_eq!(backend.polls(), 1);
    assert_eq!(clock.sleep_count(), 0);
    assert_eq!(clock.slept(), Duration::ZERO);
}

#[tokio::test]
async fn never_finishing_job_times_out_after_the_budget() {
    let dir = temp_output_dir("timeout");
    let image = source_image(dir.as_path()).await;
    let clock = ManualClock::new();
    let backend = Arc::new(ScriptedVideoBackend::new(
        VideoSubmission::Job {
            request_id: String::from("slow"),
        },
        Vec::new(),
    ));

    let err = adapter(backend.clone(), &clock, dir.as_path())
        .generate(&short_video(), &image)
        .await
        .expect_err("job should time out");

    match err {
        GenerationError::Timeout {
            job_id,
            waited_secs,
        } => {
            assert_eq!(job_id, "slow");
            assert_eq!(waited_secs, 600);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(backend.polls(), 61);
    assert_eq!(clock.slept(), Duration::from_secs(600));
    assert!(backend.fetched.lock().expect("fetched lock").is_empty());
}

#[tokio::test]
async fn provider_failure_surfaces_its_message() {
    let dir = temp_output_dir("failed");
    let image = source_image(dir.as_path()).await;
    let clock = ManualClock::new();
    let backend = Arc::new(ScriptedVideoBackend::new(
        VideoSubmission::Job {
            request_id: String::from("doomed"),
        },
        vec![
            JobStatus::Pending,
            JobStatus::Pending,
            JobStatus::Failed {
                message: String::from("nsfw content detected"),
            },
        ],
    ));

    let err = adapter(backend.clone(), &clock, dir.as_path())
        .generate(&short_video(), &image)
        .await
        .expect_err("job should fail");

    assert_eq!(
        err.to_string(),
        "backend 'scripted-video' failed: nsfw content detected"
    );
    assert_eq!(clock.sleep_count(), 2);
}
