pub mod brand;
pub mod complete;
pub mod generated;
pub mod kind;
pub mod specification;

pub use brand::{parse_hex_color, BrandContext, VocabularyConstraints};
pub use complete::{CompleteAsset, CompleteAssetBuilder, ComponentOutcome, CompositionSummary};
pub use generated::{
    CompositionResult, CopyVariation, GeneratedAudio, GeneratedCopy, GeneratedImage,
    GeneratedVideo, OverlayElement, OverlayElementKind, OverlayLayout,
};
pub use kind::{target_dimensions, AssetKind, Capabilities, Platform};
pub use specification::{
    AssetSpecification, CopyFormat, CopyPiece, VisualConcept, VoiceGender, VoiceSelection,
};
