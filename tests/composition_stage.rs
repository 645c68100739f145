use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use assetsmith_core::assets::{BrandContext, GeneratedImage, OverlayElementKind};
use assetsmith_core::pipeline::composition::{
    CompositionOptions, CompositionStage, OverlayText, TextPosition, Typeface,
};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

fn temp_output_dir(label: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("assetsmith_compose_{label}_{stamp}"))
}

fn write_source(dir: &Path, width: u32, height: u32) -> GeneratedImage {
    std::fs::create_dir_all(dir).expect("output dir");
    let path = dir.join("source.png");
    RgbaImage::from_pixel(width, height, Rgba([40, 120, 200, 255]))
        .save(path.as_path())
        .expect("source image saved");
    GeneratedImage {
        filename: String::from("source.png"),
        path,
        width,
        height,
        prompt: String::from("beach scene"),
        backend: String::from("placeholder"),
    }
}

fn full_text() -> OverlayText {
    OverlayText {
        headline: Some(String::from("Summer Sale")),
        subheadline: Some(String::from("Everything on the boardwalk is half price this weekend")),
        call_to_action: Some(String::from("Shop now")),
    }
}

#[tokio::test]
async fn composing_twice_gives_same_layout_and_new_files() {
    let dir = temp_output_dir("twice");
    let source = write_source(dir.as_path(), 1080, 1080);
    let stage = CompositionStage::new(dir.as_path(), Typeface::builtin());

    let first = stage
        .compose(&source, full_text(), None)
        .await
        .expect("first composition");
    let second = stage
        .compose(&source, full_text(), None)
        .await
        .expect("second composition");

    assert_eq!(first.layout, second.layout);
    assert_eq!(
        first.layout.order(),
        vec![
            OverlayElementKind::Headline,
            OverlayElementKind::Subheadline,
            OverlayElementKind::CallToAction,
        ]
    );
    assert_ne!(first.image.filename, second.image.filename);
    assert_ne!(first.image.filename, source.filename);
    assert!(first.image.path.is_file() && second.image.path.is_file());
    assert!(source.path.is_file(), "source image is never replaced on disk");
    assert_eq!(first.image.backend, "placeholder");
    assert_eq!((first.image.width, first.image.height), (1080, 1080));
    assert!(first.text_overlay_applied);
}

#[tokio::test]
async fn elements_are_stacked_without_overlap_at_every_position() {
    let dir = temp_output_dir("positions");
    let source = write_source(dir.as_path(), 1200, 628);

    for position in [TextPosition::Top, TextPosition::Center, TextPosition::Bottom] {
        let stage = CompositionStage::new(dir.as_path(), Typeface::builtin()).with_options(
            CompositionOptions {
                position,
                ..CompositionOptions::default()
            },
        );
        let result = stage
            .compose(&source, full_text(), None)
            .await
            .expect("composition succeeds");

        let elements = &result.layout.elements;
        assert_eq!(elements.len(), 3, "{position:?}");
        for pair in elements.windows(2) {
            assert!(
                pair[0].top + pair[0].height <= pair[1].top,
                "{position:?}: {:?} overlaps {:?}",
                pair[0].kind,
                pair[1].kind
            );
        }
        let last = &elements[elements.len() - 1];
        assert!(last.top + last.height <= 628, "{position:?} runs off the canvas");
    }
}

#[tokio::test]
async fn brand_grade_is_reported_and_can_be_disabled() {
    let dir = temp_output_dir("grade");
    let source = write_source(dir.as_path(), 640, 640);
    let brand = BrandContext {
        primary_color: Some(String::from("#FF0066")),
        ..BrandContext::default()
    };

    let graded = CompositionStage::new(dir.as_path(), Typeface::builtin())
        .compose(&source, full_text(), Some(&brand))
        .await
        .expect("graded composition");
    assert!(graded.color_graded);

    let plain = CompositionStage::new(dir.as_path(), Typeface::builtin())
        .with_options(CompositionOptions {
            brand_grade: false,
            ..CompositionOptions::default()
        })
        .compose(&source, full_text(), Some(&brand))
        .await
        .expect("plain composition");
    assert!(!plain.color_graded);
    assert_eq!(plain.layout, graded.layout);
}

#[tokio::test]
async fn empty_overlay_text_still_writes_a_new_image() {
    let dir = temp_output_dir("empty");
    let source = write_source(dir.as_path(), 512, 512);

    let result = CompositionStage::new(dir.as_path(), Typeface::builtin())
        .compose(&source, OverlayText::default(), None)
        .await
        .expect("composition without text");

    assert!(!result.text_overlay_applied);
    assert!(result.layout.elements.is_empty());
    assert_ne!(result.image.filename, source.filename);
}
