use serde::{Deserialize, Serialize};

use crate::assets::{BrandContext, VoiceGender, VoiceSelection};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicePreset {
    Professional,
    Friendly,
    Energetic,
    Luxury,
    Conversational,
}

const TONE_KEYWORDS: [(&str, VoicePreset); 24] = [
    ("professional", VoicePreset::Professional),
    ("corporate", VoicePreset::Professional),
    ("authoritative", VoicePreset::Professional),
    ("trustworthy", VoicePreset::Professional),
    ("expert", VoicePreset::Professional),
    ("formal", VoicePreset::Professional),
    ("friendly", VoicePreset::Friendly),
    ("warm", VoicePreset::Friendly),
    ("approachable", VoicePreset::Friendly),
    ("caring", VoicePreset::Friendly),
    ("energetic", VoicePreset::Energetic),
    ("exciting", VoicePreset::Energetic),
    ("bold", VoicePreset::Energetic),
    ("playful", VoicePreset::Energetic),
    ("dynamic", VoicePreset::Energetic),
    ("luxury", VoicePreset::Luxury),
    ("luxurious", VoicePreset::Luxury),
    ("premium", VoicePreset::Luxury),
    ("elegant", VoicePreset::Luxury),
    ("sophisticated", VoicePreset::Luxury),
    ("conversational", VoicePreset::Conversational),
    ("casual", VoicePreset::Conversational),
    ("relaxed", VoicePreset::Conversational),
    ("authentic", VoicePreset::Conversational),
];

impl VoicePreset {
    pub const ALL: [Self; 5] = [
        Self::Professional,
        Self::Friendly,
        Self::Energetic,
        Self::Luxury,
        Self::Conversational,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Energetic => "energetic",
            Self::Luxury => "luxury",
            Self::Conversational => "conversational",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(value))
    }

    /// Premade ElevenLabs voices.
    pub fn voice_id(self, gender: VoiceGender) -> &'static str {
        match (self, gender) {
            (Self::Professional, VoiceGender::Female) => "21m00Tcm4TlvDq8ikWAM",
            (Self::Professional, VoiceGender::Male) => "pNInz6obpgDQGcFmaJgB",
            (Self::Friendly, VoiceGender::Female) => "EXAVITQu4vr4xnSDxMaL",
            (Self::Friendly, VoiceGender::Male) => "ErXwobaYiN019PkySvjV",
            (Self::Energetic, VoiceGender::Female) => "AZnzlk1XvdvUeBnXmlld",
            (Self::Energetic, VoiceGender::Male) => "TxGEqnHWrfWFTfGW9XjX",
            (Self::Luxury, VoiceGender::Female) => "XB0fDUnXU5powFXDhCwa",
            (Self::Luxury, VoiceGender::Male) => "onwK4e9ZLuTAKqWW03F9",
            (Self::Conversational, VoiceGender::Female) => "MF3mGyEYCl7XYWbV9V6O",
            (Self::Conversational, VoiceGender::Male) => "yoZ06aMxZJJ28mfd3POQ",
        }
    }

    pub fn settings(self) -> VoiceSettings {
        let (stability, similarity_boost, style) = match self {
            Self::Professional => (0.75, 0.75, 0.0),
            Self::Friendly => (0.5, 0.75, 0.3),
            Self::Energetic => (0.35, 0.75, 0.6),
            Self::Luxury => (0.8, 0.85, 0.2),
            Self::Conversational => (0.45, 0.7, 0.35),
        };
        VoiceSettings {
            stability,
            similarity_boost,
            style,
        }
    }

    /// First brand tone containing a known keyword decides the preset.
    pub fn from_brand_tone(tones: &[String]) -> Option<Self> {
        tones.iter().find_map(|tone| {
            let lowered = tone.to_lowercase();
            lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .find_map(|word| {
                    TONE_KEYWORDS
                        .iter()
                        .find(|(keyword, _)| *keyword == word)
                        .map(|(_, preset)| *preset)
                })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSource {
    Explicit,
    Preset,
    BrandTone,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVoice {
    pub voice_id: String,
    pub preset: Option<VoicePreset>,
    pub settings: VoiceSettings,
    pub source: VoiceSource,
}

/// Explicit id, then named preset, then brand tone, then `professional`.
pub fn resolve_voice(selection: Option<&VoiceSelection>, brand: Option<&BrandContext>) -> ResolvedVoice {
    let gender = selection
        .and_then(|s| s.gender)
        .unwrap_or(VoiceGender::Female);
    let named_preset = selection
        .and_then(|s| s.preset.as_deref())
        .and_then(VoicePreset::parse);

    if let Some(voice_id) = selection
        .and_then(|s| s.voice_id.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        let preset = named_preset.unwrap_or(VoicePreset::Professional);
        return ResolvedVoice {
            voice_id: voice_id.to_string(),
            preset: named_preset,
            settings: preset.settings(),
            source: VoiceSource::Explicit,
        };
    }

    let (preset, source) = match named_preset {
        Some(preset) => (preset, VoiceSource::Preset),
        None => match brand.and_then(|b| VoicePreset::from_brand_tone(b.voice_tone.as_slice())) {
            Some(preset) => (preset, VoiceSource::BrandTone),
            None => (VoicePreset::Professional, VoiceSource::Default),
        },
    };
    ResolvedVoice {
        voice_id: preset.voice_id(gender).to_string(),
        preset: Some(preset),
        settings: preset.settings(),
        source,
    }
}
