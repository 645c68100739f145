//! Voiceover synthesis: pick a voice, turn copy into a speakable script,
//! synthesize and persist. Durations are word-count estimates.

mod elevenlabs;
mod speech_text;
mod voices;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::assets::{AssetSpecification, BrandContext, CopyFormat, GeneratedAudio, GeneratedCopy};
use crate::error::GenerationError;
use crate::pipeline::pathing::{write_output, OutputSuffix};

pub use elevenlabs::ElevenLabsSpeechBackend;
pub use speech_text::{estimate_duration_secs, normalize_for_speech, LONG_PAUSE, SHORT_PAUSE, WORDS_PER_MINUTE};
pub use voices::{resolve_voice, ResolvedVoice, VoicePreset, VoiceSettings, VoiceSource};

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub settings: VoiceSettings,
}

#[async_trait]
pub trait SpeechBackend: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, GenerationError>;
}

pub type SharedSpeechBackend = Arc<dyn SpeechBackend>;

#[derive(Clone)]
pub struct AudioAdapter {
    backend: SharedSpeechBackend,
    output_dir: PathBuf,
}

impl AudioAdapter {
    pub fn new(backend: SharedSpeechBackend, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn generate(
        &self,
        specification: &AssetSpecification,
        copy: &GeneratedCopy,
        brand: Option<&BrandContext>,
    ) -> Result<GeneratedAudio, GenerationError> {
        let script = voiceover_script(copy, specification).ok_or_else(|| {
            GenerationError::Validation(String::from("no copy available for a voiceover script"))
        })?;
        let voice = resolve_voice(specification.voice.as_ref(), brand);
        let request = SpeechRequest {
            text: normalize_for_speech(script.as_str()),
            voice_id: voice.voice_id.clone(),
            settings: voice.settings,
        };

        let bytes = self.backend.synthesize(&request).await?;
        let file = write_output(self.output_dir.as_path(), OutputSuffix::Mp3, bytes.as_slice()).await?;
        info!(
            backend = self.backend.name(),
            voice_id = voice.voice_id.as_str(),
            file = file.filename.as_str(),
            "voiceover persisted"
        );
        Ok(GeneratedAudio {
            filename: file.filename,
            path: file.path,
            duration_seconds: estimate_duration_secs(script.as_str()),
            duration_is_estimate: true,
            text: script,
            voice_id: voice.voice_id,
            backend: self.backend.name().to_string(),
        })
    }
}

/// An explicit voiceover script wins; otherwise headline, subheadline, body and
/// CTA are read in that order as separate sentences.
pub fn voiceover_script(copy: &GeneratedCopy, specification: &AssetSpecification) -> Option<String> {
    fn trimmed(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(script) = trimmed(copy.piece(CopyFormat::VoiceoverScript)) {
        return Some(script.to_string());
    }
    let cta = trimmed(specification.effective_call_to_action())
        .or_else(|| trimmed(copy.piece(CopyFormat::CallToAction)));
    let sentences: Vec<String> = [
        trimmed(copy.piece(CopyFormat::Headline)),
        trimmed(copy.piece(CopyFormat::Subheadline)),
        trimmed(copy.piece(CopyFormat::Body)),
        cta,
    ]
    .into_iter()
    .flatten()
    .map(|s| {
        if s.ends_with(['.', '!', '?']) {
            s.to_string()
        } else {
            format!("{s}.")
        }
    })
    .collect();
    (!sentences.is_empty()).then(|| sentences.join(" "))
}
