use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;

use super::{SpeechBackend, SpeechRequest};
use crate::error::GenerationError;
use crate::pipeline::http_support::{build_client, describe_failure, join_url, transport_error};
use crate::pipeline::settings_layer::{DEFAULT_ELEVENLABS_BASE_URL, DEFAULT_ELEVENLABS_MODEL_ID};

#[derive(Debug, Serialize)]
struct VoiceSettingsBody {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettingsBody,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSpeechBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl ElevenLabsSpeechBackend {
    pub const NAME: &'static str = "elevenlabs";

    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_client(Self::NAME)?,
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_ELEVENLABS_BASE_URL),
            model_id: String::from(DEFAULT_ELEVENLABS_MODEL_ID),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsSpeechBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, GenerationError> {
        let url = join_url(
            self.base_url.as_str(),
            format!(
                "/v1/text-to-speech/{}?output_format=mp3_44100_128",
                request.voice_id
            )
            .as_str(),
        );
        let body = SynthesisBody {
            text: request.text.as_str(),
            model_id: self.model_id.as_str(),
            voice_settings: VoiceSettingsBody {
                stability: request.settings.stability,
                similarity_boost: request.settings.similarity_boost,
                style: request.settings.style,
                use_speaker_boost: true,
            },
        };
        let response = self
            .client
            .post(url)
            .header("xi-api-key", self.api_key.as_str())
            .header(header::ACCEPT, "audio/mpeg")
            .json(&body)
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
