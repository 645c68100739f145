//! Turns one [`AssetSpecification`] into a [`CompleteAsset`].
//!
//! Copy and image run together; video waits on the image, voiceover on the
//! copy; composition runs last and swaps in a new image. A task failure is
//! recorded on its component and never aborts the others. Only validation and
//! missing-backend configuration errors are returned as `Err`.

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assets::{
    AssetSpecification, BrandContext, CompleteAsset, CompleteAssetBuilder, ComponentOutcome,
    CompositionSummary, GeneratedCopy, GeneratedImage,
};
use crate::error::{ErrorKind, GenerationError};
use crate::pipeline::audio_adapter::AudioAdapter;
use crate::pipeline::composition::{CompositionStage, OverlayText, Typeface};
use crate::pipeline::copy_adapter::CopyAdapter;
use crate::pipeline::image_adapter::ImageAdapter;
use crate::pipeline::image_backends::ImageFallbackChain;
use crate::pipeline::video_adapter::VideoAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Every specification at once, unbounded.
    #[default]
    Concurrent,
    Sequential,
}

impl BatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "concurrent",
            Self::Sequential => "sequential",
        }
    }
}

#[derive(Clone)]
pub struct AssetOrchestrator {
    copy: CopyAdapter,
    image: ImageAdapter,
    video: Option<VideoAdapter>,
    audio: Option<AudioAdapter>,
    composition: CompositionStage,
}

pub struct OrchestratorBuilder {
    output_dir: PathBuf,
    copy: Option<CopyAdapter>,
    image: Option<ImageAdapter>,
    video: Option<VideoAdapter>,
    audio: Option<AudioAdapter>,
    composition: Option<CompositionStage>,
}

impl OrchestratorBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            copy: None,
            image: None,
            video: None,
            audio: None,
            composition: None,
        }
    }

    pub fn copy(mut self, adapter: CopyAdapter) -> Self {
        self.copy = Some(adapter);
        self
    }

    pub fn image(mut self, adapter: ImageAdapter) -> Self {
        self.image = Some(adapter);
        self
    }

    pub fn video(mut self, adapter: Option<VideoAdapter>) -> Self {
        self.video = adapter;
        self
    }

    pub fn audio(mut self, adapter: Option<AudioAdapter>) -> Self {
        self.audio = adapter;
        self
    }

    pub fn composition(mut self, stage: CompositionStage) -> Self {
        self.composition = Some(stage);
        self
    }

    /// Unset image and composition fall back to the placeholder chain and the
    /// built-in font, both writing under the builder's output directory.
    pub fn build(self) -> AssetOrchestrator {
        let output_dir = self.output_dir;
        AssetOrchestrator {
            copy: self.copy.unwrap_or_default(),
            image: self.image.unwrap_or_else(|| {
                ImageAdapter::new(ImageFallbackChain::placeholder_only(), output_dir.clone())
            }),
            video: self.video,
            audio: self.audio,
            composition: self
                .composition
                .unwrap_or_else(|| CompositionStage::new(output_dir, Typeface::builtin())),
        }
    }
}

impl AssetOrchestrator {
    pub fn builder(output_dir: impl Into<PathBuf>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(output_dir)
    }

    pub fn has_video_backend(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio_backend(&self) -> bool {
        self.audio.is_some()
    }

    /// Rejects a specification whose kind needs a backend this orchestrator lacks.
    pub fn check_configuration(&self, specification: &AssetSpecification) -> Result<(), GenerationError> {
        let caps = specification.kind.capabilities();
        if caps.needs_video && self.video.is_none() {
            return Err(GenerationError::Configuration(format!(
                "'{}' needs video but no video backend is configured",
                specification.kind.as_str()
            )));
        }
        if caps.needs_voiceover && self.audio.is_none() {
            return Err(GenerationError::Configuration(format!(
                "'{}' needs a voiceover but no speech backend is configured",
                specification.kind.as_str()
            )));
        }
        if specification.copy.is_empty() && !self.copy.has_backend() {
            return Err(GenerationError::Configuration(String::from(
                "specification has no copy and no copy backend is configured",
            )));
        }
        Ok(())
    }

    pub async fn generate(
        &self,
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
        variations: bool,
    ) -> Result<CompleteAsset, GenerationError> {
        specification.validate()?;
        self.check_configuration(specification)?;

        let asset_id = Uuid::new_v4();
        let span = info_span!(
            "asset",
            asset_id = %asset_id,
            kind = specification.kind.as_str(),
            platform = specification.platform.as_str()
        );
        let asset = self
            .run_tasks(asset_id, specification, brand, variations)
            .instrument(span)
            .await;
        Ok(asset)
    }

    async fn run_tasks(
        &self,
        asset_id: Uuid,
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
        variations: bool,
    ) -> CompleteAsset {
        let caps = specification.kind.capabilities();

        let copy_task = async { settle("copy", self.copy.generate(specification, brand, variations).await) };
        let image_task = async {
            if caps.needs_image {
                settle("image", self.image.generate(specification, brand).await)
            } else {
                ComponentOutcome::NotRequested
            }
        };
        let (copy, image) = tokio::join!(copy_task, image_task);

        let video_task = async {
            let Some(adapter) = self.video.as_ref().filter(|_| caps.needs_video) else {
                return ComponentOutcome::NotRequested;
            };
            match image.value() {
                Some(source) => settle("video", adapter.generate(specification, source).await),
                None => prerequisite_failed("video", "image", &image),
            }
        };
        let audio_task = async {
            let Some(adapter) = self.audio.as_ref().filter(|_| caps.needs_voiceover) else {
                return ComponentOutcome::NotRequested;
            };
            match copy.value() {
                Some(text) => settle("audio", adapter.generate(specification, text, brand).await),
                None => prerequisite_failed("audio", "copy", &copy),
            }
        };
        let (video, audio) = tokio::join!(video_task, audio_task);

        let (image, composition) = if caps.needs_text_overlay {
            self.compose(specification, brand, image, &copy).await
        } else {
            (image, ComponentOutcome::NotRequested)
        };

        let mut builder = CompleteAssetBuilder::new(asset_id, specification);
        builder
            .copy(copy)
            .image(image)
            .video(video)
            .audio(audio)
            .composition(composition);
        let asset = builder.build();
        info!(complete = asset.is_complete(), "asset assembled");
        asset
    }

    /// Returns the image outcome to keep plus the composition outcome. The
    /// composed image replaces the original only when composition succeeds.
    async fn compose(
        &self,
        specification: &AssetSpecification,
        brand: Option<&BrandContext>,
        image: ComponentOutcome<GeneratedImage>,
        copy: &ComponentOutcome<GeneratedCopy>,
    ) -> (ComponentOutcome<GeneratedImage>, ComponentOutcome<CompositionSummary>) {
        let (source, text) = match (image.value(), copy.value()) {
            (Some(source), Some(text)) => (source, OverlayText::from_copy(text, specification)),
            (None, _) => {
                let failed = prerequisite_failed("composition", "image", &image);
                return (image, failed);
            }
            (Some(_), None) => {
                let failed = prerequisite_failed("composition", "copy", copy);
                return (image, failed);
            }
        };

        match self.composition.compose(source, text, brand).await {
            Ok(result) => {
                info!(
                    task = "composition",
                    source = source.filename.as_str(),
                    output = result.image.filename.as_str(),
                    "task produced"
                );
                let summary = CompositionSummary {
                    text_overlay_applied: result.text_overlay_applied,
                    color_graded: result.color_graded,
                    source_image: source.filename.clone(),
                    layout: result.layout,
                };
                (
                    ComponentOutcome::Produced { value: result.image },
                    ComponentOutcome::Produced { value: summary },
                )
            }
            Err(error) => {
                warn!(task = "composition", %error, "task failed; keeping un-composed image");
                let failed = ComponentOutcome::failed(&error);
                (image, failed)
            }
        }
    }

    /// Results come back in input order whatever the mode.
    pub async fn generate_batch(
        &self,
        specifications: &[AssetSpecification],
        brand: Option<&BrandContext>,
        variations: bool,
        mode: BatchMode,
    ) -> Vec<Result<CompleteAsset, GenerationError>> {
        info!(count = specifications.len(), mode = mode.as_str(), "batch started");
        match mode {
            BatchMode::Concurrent => {
                join_all(
                    specifications
                        .iter()
                        .map(|specification| self.generate(specification, brand, variations)),
                )
                .await
            }
            BatchMode::Sequential => {
                let mut results = Vec::with_capacity(specifications.len());
                for specification in specifications {
                    results.push(self.generate(specification, brand, variations).await);
                }
                results
            }
        }
    }
}

fn settle<T>(task: &'static str, result: Result<T, GenerationError>) -> ComponentOutcome<T> {
    match result {
        Ok(value) => {
            info!(task, "task produced");
            ComponentOutcome::Produced { value }
        }
        Err(error) => {
            warn!(task, kind = ?error.kind(), %error, "task failed");
            ComponentOutcome::failed(&error)
        }
    }
}

fn prerequisite_failed<T, P>(task: &'static str, prerequisite: &str, outcome: &ComponentOutcome<P>) -> ComponentOutcome<T> {
    let (kind, cause) = match outcome {
        ComponentOutcome::Failed { kind, reason } => (*kind, reason.as_str()),
        _ => (ErrorKind::Backend, "not produced"),
    };
    warn!(task, prerequisite, "skipped: prerequisite failed");
    ComponentOutcome::Failed {
        kind,
        reason: format!("prerequisite {prerequisite} failed: {cause}"),
    }
}
