use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::specification::{CopyFormat, CopyPiece};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyVariation {
    pub label: String,
    pub pieces: Vec<CopyPiece>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCopy {
    pub pieces: Vec<CopyPiece>,
    #[serde(default)]
    pub variations: Vec<CopyVariation>,
    pub backend: String,
}

impl GeneratedCopy {
    pub fn piece(&self, format: CopyFormat) -> Option<&str> {
        self.pieces
            .iter()
            .find(|piece| piece.format == format)
            .map(|piece| piece.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub filename: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub prompt: String,
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    pub filename: String,
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub aspect_ratio: String,
    pub prompt: String,
    pub backend: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub source_image: Option<String>,
}

/// `duration_seconds` is derived from the script's word count at a nominal
/// speaking rate, not measured from the encoded audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAudio {
    pub filename: String,
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub duration_is_estimate: bool,
    pub text: String,
    pub voice_id: String,
    pub backend: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayElementKind {
    Headline,
    Subheadline,
    CallToAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayElement {
    pub kind: OverlayElementKind,
    pub lines: Vec<String>,
    pub top: u32,
    pub height: u32,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub elements: Vec<OverlayElement>,
}

impl OverlayLayout {
    pub fn order(&self) -> Vec<OverlayElementKind> {
        self.elements.iter().map(|e| e.kind).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionResult {
    pub image: GeneratedImage,
    pub text_overlay_applied: bool,
    pub color_graded: bool,
    pub layout: OverlayLayout,
}
