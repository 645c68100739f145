use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generated::{
    GeneratedAudio, GeneratedCopy, GeneratedImage, GeneratedVideo, OverlayLayout,
};
use super::kind::{AssetKind, Platform};
use super::specification::AssetSpecification;
use crate::error::{ErrorKind, GenerationError};

/// State of one component of a [`CompleteAsset`].
///
/// `NotRequested` and `Failed` are separate states: callers must be able to
/// tell "this kind never produces video" from "video generation broke".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentOutcome<T> {
    NotRequested,
    Failed { kind: ErrorKind, reason: String },
    Produced { value: T },
}

impl<T> Default for ComponentOutcome<T> {
    fn default() -> Self {
        Self::NotRequested
    }
}

impl<T> ComponentOutcome<T> {
    pub fn failed(error: &GenerationError) -> Self {
        Self::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    pub fn from_result(result: Result<T, GenerationError>) -> Self {
        match result {
            Ok(value) => Self::Produced { value },
            Err(error) => Self::failed(&error),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Produced { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produced { .. })
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self, Self::NotRequested)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionSummary {
    pub text_overlay_applied: bool,
    pub color_graded: bool,
    pub source_image: String,
    pub layout: OverlayLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteAsset {
    pub asset_id: Uuid,
    pub kind: AssetKind,
    pub platform: Platform,
    pub copy: ComponentOutcome<GeneratedCopy>,
    pub image: ComponentOutcome<GeneratedImage>,
    pub video: ComponentOutcome<GeneratedVideo>,
    pub audio: ComponentOutcome<GeneratedAudio>,
    pub composition: ComponentOutcome<CompositionSummary>,
    pub created_at: DateTime<Utc>,
    pub specification: AssetSpecification,
}

impl CompleteAsset {
    pub fn text_overlay_applied(&self) -> bool {
        self.composition
            .value()
            .map(|c| c.text_overlay_applied)
            .unwrap_or(false)
    }

    /// Every requested component was produced.
    pub fn is_complete(&self) -> bool {
        let settled = |requested: bool, produced: bool| !requested || produced;
        settled(self.copy.is_requested(), self.copy.is_produced())
            && settled(self.image.is_requested(), self.image.is_produced())
            && settled(self.video.is_requested(), self.video.is_produced())
            && settled(self.audio.is_requested(), self.audio.is_produced())
            && settled(
                self.composition.is_requested(),
                self.composition.is_produced(),
            )
    }
}

/// Collects per-task results; each setter owns exactly one field.
#[derive(Debug)]
pub struct CompleteAssetBuilder {
    asset_id: Uuid,
    specification: AssetSpecification,
    copy: ComponentOutcome<GeneratedCopy>,
    image: ComponentOutcome<GeneratedImage>,
    video: ComponentOutcome<GeneratedVideo>,
    audio: ComponentOutcome<GeneratedAudio>,
    composition: ComponentOutcome<CompositionSummary>,
}

impl CompleteAssetBuilder {
    pub fn new(asset_id: Uuid, specification: &AssetSpecification) -> Self {
        Self {
            asset_id,
            specification: specification.clone(),
            copy: ComponentOutcome::NotRequested,
            image: ComponentOutcome::NotRequested,
            video: ComponentOutcome::NotRequested,
            audio: ComponentOutcome::NotRequested,
            composition: ComponentOutcome::NotRequested,
        }
    }

    pub fn copy(&mut self, outcome: ComponentOutcome<GeneratedCopy>) -> &mut Self {
        self.copy = outcome;
        self
    }

    pub fn image(&mut self, outcome: ComponentOutcome<GeneratedImage>) -> &mut Self {
        self.image = outcome;
        self
    }

    pub fn video(&mut self, outcome: ComponentOutcome<GeneratedVideo>) -> &mut Self {
        self.video = outcome;
        self
    }

    pub fn audio(&mut self, outcome: ComponentOutcome<GeneratedAudio>) -> &mut Self {
        self.audio = outcome;
        self
    }

    pub fn composition(&mut self, outcome: ComponentOutcome<CompositionSummary>) -> &mut Self {
        self.composition = outcome;
        self
    }

    pub fn build(self) -> CompleteAsset {
        CompleteAsset {
            asset_id: self.asset_id,
            kind: self.specification.kind,
            platform: self.specification.platform,
            copy: self.copy,
            image: self.image,
            video: self.video,
            audio: self.audio,
            composition: self.composition,
            created_at: Utc::now(),
            specification: self.specification,
        }
    }
}
