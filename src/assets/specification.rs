use serde::{Deserialize, Serialize};

use super::kind::{AssetKind, Platform};
use crate::error::GenerationError;

pub const MAX_VIDEO_DURATION_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyFormat {
    Headline,
    Subheadline,
    Body,
    CallToAction,
    Caption,
    Hashtags,
    VoiceoverScript,
    #[serde(other)]
    Other,
}

impl CopyFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Headline => "headline",
            Self::Subheadline => "subheadline",
            Self::Body => "body",
            Self::CallToAction => "call_to_action",
            Self::Caption => "caption",
            Self::Hashtags => "hashtags",
            Self::VoiceoverScript => "voiceover_script",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPiece {
    pub format: CopyFormat,
    pub content: String,
}

impl CopyPiece {
    pub fn new(format: CopyFormat, content: impl Into<String>) -> Self {
        Self {
            format,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualConcept {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Female,
    Male,
}

/// Caller-side voice preference; resolution order is id, preset, then brand tone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceSelection {
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub gender: Option<VoiceGender>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpecification {
    pub kind: AssetKind,
    pub platform: Platform,
    #[serde(default)]
    pub copy: Vec<CopyPiece>,
    #[serde(default)]
    pub visual: VisualConcept,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub video_duration_seconds: Option<u32>,
    #[serde(default)]
    pub voice: Option<VoiceSelection>,
}

impl AssetSpecification {
    pub fn new(kind: AssetKind, platform: Platform) -> Self {
        Self {
            kind,
            platform,
            copy: Vec::new(),
            visual: VisualConcept::default(),
            call_to_action: None,
            video_duration_seconds: None,
            voice: None,
        }
    }

    pub fn first_copy(&self, format: CopyFormat) -> Option<&str> {
        self.copy
            .iter()
            .find(|piece| piece.format == format)
            .map(|piece| piece.content.trim())
            .filter(|v| !v.is_empty())
    }

    /// Explicit CTA field wins over a `call_to_action` copy piece.
    pub fn effective_call_to_action(&self) -> Option<&str> {
        self.call_to_action
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| self.first_copy(CopyFormat::CallToAction))
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        let caps = self.kind.capabilities();
        if caps.needs_image && self.visual.description.trim().is_empty() {
            return Err(GenerationError::Validation(format!(
                "'{}' requires a visual description to prompt image generation",
                self.kind.as_str()
            )));
        }
        for (idx, piece) in self.copy.iter().enumerate() {
            if piece.content.trim().is_empty() {
                return Err(GenerationError::Validation(format!(
                    "copy[{idx}] ({}) has empty content",
                    piece.format.as_str()
                )));
            }
        }
        if let Some(secs) = self.video_duration_seconds {
            if secs == 0 || secs > MAX_VIDEO_DURATION_SECS {
                return Err(GenerationError::Validation(format!(
                    "video_duration_seconds must be within 1..={MAX_VIDEO_DURATION_SECS}, got {secs}"
                )));
            }
        }
        if let Some(voice) = self.voice.as_ref() {
            if voice
                .voice_id
                .as_deref()
                .is_some_and(|id| id.trim().is_empty())
            {
                return Err(GenerationError::Validation(String::from(
                    "voice.voice_id must not be blank when present",
                )));
            }
        }
        Ok(())
    }
}
