//! Wires resolved settings and provider keys into an [`AssetOrchestrator`].

use std::sync::Arc;

use tracing::info;

use crate::error::GenerationError;
use crate::pipeline::audio_adapter::{AudioAdapter, ElevenLabsSpeechBackend};
use crate::pipeline::clock::TokioClock;
use crate::pipeline::composition::{CompositionStage, Typeface};
use crate::pipeline::copy_adapter::{CopyAdapter, OpenAiChatCopyBackend, SharedCopyBackend};
use crate::pipeline::credentials::ProviderCredentials;
use crate::pipeline::image_adapter::ImageAdapter;
use crate::pipeline::image_backends::{
    ImageFallbackChain, OpenAiImageBackend, PlaceholderImageBackend, SharedImageBackend,
    StabilityImageBackend,
};
use crate::pipeline::orchestrator::AssetOrchestrator;
use crate::pipeline::settings_layer::GenerationSettings;
use crate::pipeline::video_adapter::{HttpVideoBackend, JobPoller, PollPolicy, VideoAdapter};

/// Image chain order is Stability, then OpenAI images, then the placeholder.
/// Backends without a key are left out; video and audio stay unset so that
/// kinds needing them fail configuration up front.
pub fn build_orchestrator(
    settings: &GenerationSettings,
    credentials: &ProviderCredentials,
) -> Result<AssetOrchestrator, GenerationError> {
    let output_dir = settings.output_dir.clone();
    let typeface = Typeface::load(settings.font_path.as_deref());

    let mut image_backends: Vec<SharedImageBackend> = Vec::new();
    if let Some(key) = credentials.stability.as_deref() {
        image_backends.push(Arc::new(
            StabilityImageBackend::new(key)?
                .with_endpoint(settings.image.stability_endpoint.as_str())
                .with_output_format(settings.image.output_format.as_str()),
        ));
    }
    if let Some(key) = credentials.openai.as_deref() {
        image_backends.push(Arc::new(
            OpenAiImageBackend::new(key)?
                .with_base_url(settings.image.openai_base_url.as_str())
                .with_model(settings.image.openai_model.as_str()),
        ));
    }
    let chain = ImageFallbackChain::new(image_backends)
        .with_terminal(PlaceholderImageBackend::with_typeface(Arc::new(typeface.clone())));

    let video = match (settings.video.base_url.as_deref(), credentials.video.as_deref()) {
        (Some(base_url), Some(key)) => {
            let backend = HttpVideoBackend::new(base_url, key)?.with_model(settings.video.model.clone());
            let poller = JobPoller::new(
                Arc::new(TokioClock::new()),
                PollPolicy {
                    interval: settings.poll_interval,
                    budget: settings.poll_budget,
                },
            );
            Some(VideoAdapter::new(Arc::new(backend), poller, output_dir.clone()))
        }
        _ => None,
    };

    let audio = match credentials.elevenlabs.as_deref() {
        Some(key) => {
            let backend = ElevenLabsSpeechBackend::new(key)?
                .with_base_url(settings.audio.base_url.as_str())
                .with_model_id(settings.audio.model_id.as_str());
            Some(AudioAdapter::new(Arc::new(backend), output_dir.clone()))
        }
        None => None,
    };

    let copy_backend: Option<SharedCopyBackend> = match credentials.openai.as_deref() {
        Some(key) => Some(Arc::new(
            OpenAiChatCopyBackend::new(key, settings.copy.base_url.as_str())?
                .with_model(settings.copy.model.as_str()),
        )),
        None => None,
    };

    info!(
        image_chain = ?chain.backend_names(),
        video = video.is_some(),
        audio = audio.is_some(),
        copy_backend = copy_backend.is_some(),
        builtin_font = typeface.is_builtin(),
        "generation backends wired"
    );

    Ok(AssetOrchestrator::builder(output_dir.clone())
        .copy(CopyAdapter::new(copy_backend))
        .image(ImageAdapter::new(chain, output_dir.clone()))
        .video(video)
        .audio(audio)
        .composition(CompositionStage::new(output_dir, typeface).with_options(settings.composition))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_means_placeholder_only_and_no_media_backends() {
        let orchestrator = build_orchestrator(&GenerationSettings::default(), &ProviderCredentials::default())
            .expect("wiring without keys succeeds");
        assert!(!orchestrator.has_video_backend());
        assert!(!orchestrator.has_audio_backend());
    }

    #[test]
    fn video_needs_both_endpoint_and_key() {
        let credentials = ProviderCredentials {
            video: Some(String::from("vid-key")),
            elevenlabs: Some(String::from("xi-key")),
            ..ProviderCredentials::default()
        };
        let orchestrator = build_orchestrator(&GenerationSettings::default(), &credentials)
            .expect("wiring succeeds");
        assert!(!orchestrator.has_video_backend());
        assert!(orchestrator.has_audio_backend());

        let mut settings = GenerationSettings::default();
        settings.video.base_url = Some(String::from("http://127.0.0.1:9"));
        let orchestrator = build_orchestrator(&settings, &credentials).expect("wiring succeeds");
        assert!(orchestrator.has_video_backend());
    }
}
