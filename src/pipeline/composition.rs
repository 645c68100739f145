//! Text overlay and brand grade applied to a generated image. Every run writes a
//! new file; the source image is never touched.

mod backdrop;
mod bitmap_font;
mod color_grade;
mod text_layout;
mod typeface;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::{
    AssetSpecification, BrandContext, CompositionResult, CopyFormat, GeneratedCopy,
    GeneratedImage, OverlayElement, OverlayElementKind, OverlayLayout,
};
use crate::error::GenerationError;
use crate::pipeline::pathing::{write_output, OutputSuffix};

pub use backdrop::{apply_backdrop, TextPosition};
pub use bitmap_font::BitmapFont;
pub use color_grade::{apply_brand_grade, ColorGradeError, DEFAULT_GRADE_INTENSITY};
pub use text_layout::{wrap_text, TextMeasure};
pub use typeface::Typeface;

pub const DEFAULT_ACCENT: [u8; 3] = [0xFF, 0x6B, 0x35];
pub const SHADOW_OFFSET: i32 = 2;

const STAGE: &str = "composition";
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 180]);
const EDGE_MARGIN: f32 = 0.08;
const LINE_SPACING: f32 = 0.25;
const CTA_PAD_X: f32 = 0.8;
const CTA_PAD_Y: f32 = 0.45;

struct Tier {
    kind: OverlayElementKind,
    size_factor: f32,
    min_size: f32,
    width_factor: f32,
}

const TIERS: [Tier; 3] = [
    Tier {
        kind: OverlayElementKind::Headline,
        size_factor: 0.075,
        min_size: 18.0,
        width_factor: 0.85,
    },
    Tier {
        kind: OverlayElementKind::Subheadline,
        size_factor: 0.045,
        min_size: 14.0,
        width_factor: 0.80,
    },
    Tier {
        kind: OverlayElementKind::CallToAction,
        size_factor: 0.038,
        min_size: 12.0,
        width_factor: 0.60,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionOptions {
    pub position: TextPosition,
    pub brand_grade: bool,
    pub grade_intensity: f32,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            position: TextPosition::Bottom,
            brand_grade: true,
            grade_intensity: DEFAULT_GRADE_INTENSITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayText {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub call_to_action: Option<String>,
}

impl OverlayText {
    /// The CTA comes from the specification when it names one, else from copy.
    pub fn from_copy(copy: &GeneratedCopy, specification: &AssetSpecification) -> Self {
        let owned = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        Self {
            headline: owned(copy.piece(CopyFormat::Headline)),
            subheadline: owned(copy.piece(CopyFormat::Subheadline)),
            call_to_action: owned(
                specification
                    .effective_call_to_action()
                    .or_else(|| copy.piece(CopyFormat::CallToAction)),
            ),
        }
    }

    fn for_tier(&self, kind: OverlayElementKind) -> Option<&str> {
        match kind {
            OverlayElementKind::Headline => self.headline.as_deref(),
            OverlayElementKind::Subheadline => self.subheadline.as_deref(),
            OverlayElementKind::CallToAction => self.call_to_action.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedOverlay {
    pub canvas: RgbaImage,
    pub layout: OverlayLayout,
    pub color_graded: bool,
}

#[derive(Debug, Clone)]
pub struct CompositionStage {
    typeface: Arc<Typeface>,
    output_dir: PathBuf,
    options: CompositionOptions,
}

impl CompositionStage {
    pub fn new(output_dir: impl Into<PathBuf>, typeface: Typeface) -> Self {
        Self {
            typeface: Arc::new(typeface),
            output_dir: output_dir.into(),
            options: CompositionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_path()
    }

    pub async fn compose(
        &self,
        image: &GeneratedImage,
        text: OverlayText,
        brand: Option<&BrandContext>,
    ) -> Result<CompositionResult, GenerationError> {
        let source = image.path.clone();
        let typeface = Arc::clone(&self.typeface);
        let options = self.options;
        let brand_rgb = brand.and_then(BrandContext::primary_rgb);

        let (bytes, rendered) = tokio::task::spawn_blocking(move || {
            let base = image::open(source.as_path()).map_err(|e| {
                GenerationError::backend(STAGE, format!("open '{}': {e}", source.display()))
            })?;
            let rendered = render_overlay(base.to_rgba8(), &text, &options, &typeface, brand_rgb);
            let bytes = encode_png(&rendered.canvas)
                .map_err(|e| GenerationError::backend(STAGE, format!("encode failed: {e}")))?;
            Ok::<_, GenerationError>((bytes, rendered))
        })
        .await
        .map_err(|e| GenerationError::backend(STAGE, format!("render task failed: {e}")))??;

        let file = write_output(self.output_dir.as_path(), OutputSuffix::Png, bytes.as_slice()).await?;
        debug!(
            source = %image.filename,
            output = %file.filename,
            elements = rendered.layout.elements.len(),
            "composition written"
        );
        Ok(CompositionResult {
            image: GeneratedImage {
                filename: file.filename,
                path: file.path,
                width: rendered.canvas.width(),
                height: rendered.canvas.height(),
                prompt: image.prompt.clone(),
                backend: image.backend.clone(),
            },
            text_overlay_applied: !rendered.layout.elements.is_empty(),
            color_graded: rendered.color_graded,
            layout: rendered.layout,
        })
    }
}

/// Backdrop, text tiers top to bottom, then the optional brand grade over the
/// finished canvas. A failed grade leaves the overlaid canvas as drawn.
pub fn render_overlay(
    base: RgbaImage,
    text: &OverlayText,
    options: &CompositionOptions,
    typeface: &Typeface,
    brand_rgb: Option<[u8; 3]>,
) -> RenderedOverlay {
    let mut canvas = base;
    let planned = plan_layout(canvas.width(), canvas.height(), text, options.position, typeface);
    if !planned.is_empty() {
        apply_backdrop(&mut canvas, options.position);
    }
    let accent = brand_rgb.unwrap_or(DEFAULT_ACCENT);
    for element in planned.iter() {
        draw_element(&mut canvas, element, typeface, accent);
    }

    let mut color_graded = false;
    if let Some(rgb) = brand_rgb.filter(|_| options.brand_grade) {
        match apply_brand_grade(&canvas, rgb, options.grade_intensity) {
            Ok(graded) => {
                canvas = graded;
                color_graded = true;
            }
            Err(error) => warn!(%error, "brand grade skipped"),
        }
    }

    let layout = OverlayLayout {
        elements: planned
            .into_iter()
            .map(|p| OverlayElement {
                kind: p.kind,
                lines: p.lines,
                top: p.top,
                height: p.height,
                font_size: p.size.round() as u32,
            })
            .collect(),
    };
    RenderedOverlay {
        canvas,
        layout,
        color_graded,
    }
}

#[derive(Debug, Clone)]
struct PlannedElement {
    kind: OverlayElementKind,
    lines: Vec<String>,
    size: f32,
    line_height: u32,
    spacing: u32,
    pad_x: u32,
    pad_y: u32,
    top: u32,
    height: u32,
}

fn plan_layout(
    width: u32,
    height: u32,
    text: &OverlayText,
    position: TextPosition,
    measure: &dyn TextMeasure,
) -> Vec<PlannedElement> {
    let w = width as f32;
    let mut planned = Vec::new();
    for tier in TIERS.iter() {
        let Some(content) = text.for_tier(tier.kind) else {
            continue;
        };
        let size = (w * tier.size_factor).max(tier.min_size);
        let is_cta = tier.kind == OverlayElementKind::CallToAction;
        let (pad_x, pad_y) = if is_cta {
            ((size * CTA_PAD_X) as u32, (size * CTA_PAD_Y) as u32)
        } else {
            (0, 0)
        };
        let max_width = ((w * tier.width_factor) as u32).saturating_sub(pad_x * 2);
        let lines = wrap_text(content, measure, size, max_width);
        if lines.is_empty() {
            continue;
        }
        let line_height = measure.line_height(size);
        let spacing = (size * LINE_SPACING) as u32;
        let count = lines.len() as u32;
        let text_height = count * line_height + (count - 1) * spacing;
        planned.push(PlannedElement {
            kind: tier.kind,
            lines,
            size,
            line_height,
            spacing,
            pad_x,
            pad_y,
            top: 0,
            height: text_height + pad_y * 2,
        });
    }
    if planned.is_empty() {
        return planned;
    }

    let gap = ((w * 0.02) as u32).max(8);
    let total: u32 =
        planned.iter().map(|p| p.height).sum::<u32>() + gap * (planned.len() as u32 - 1);
    let margin = (height as f32 * EDGE_MARGIN) as u32;
    let mut cursor = match position {
        TextPosition::Top => margin,
        TextPosition::Center => height.saturating_sub(total) / 2,
        TextPosition::Bottom => height.saturating_sub(total + margin),
    };
    for element in planned.iter_mut() {
        element.top = cursor;
        cursor += element.height + gap;
    }
    planned
}

fn draw_element(canvas: &mut RgbaImage, element: &PlannedElement, typeface: &Typeface, accent: [u8; 3]) {
    let width = canvas.width();
    let mut text_top = element.top + element.pad_y;
    if element.kind == OverlayElementKind::CallToAction {
        let widest = element
            .lines
            .iter()
            .map(|line| typeface.text_width(line, element.size))
            .max()
            .unwrap_or(0);
        let box_width = widest + element.pad_x * 2;
        let box_x = width.saturating_sub(box_width) / 2;
        fill_rounded_rect(
            canvas,
            box_x as i32,
            element.top as i32,
            box_width,
            element.height,
            element.pad_y,
            Rgba([accent[0], accent[1], accent[2], 255]),
        );
        for line in element.lines.iter() {
            let x = centered_x(width, typeface.text_width(line, element.size));
            typeface.draw(canvas, line, x, text_top as i32, element.size, TEXT_COLOR);
            text_top += element.line_height + element.spacing;
        }
        return;
    }
    draw_centered_lines(
        canvas,
        typeface,
        element.lines.as_slice(),
        text_top,
        element.size,
        element.spacing,
    );
}

/// Shadow copy first at [`SHADOW_OFFSET`], then the white line on top.
pub(crate) fn draw_centered_lines(
    canvas: &mut RgbaImage,
    typeface: &Typeface,
    lines: &[String],
    top: u32,
    size: f32,
    spacing: u32,
) {
    let width = canvas.width();
    let line_height = typeface.line_height(size);
    let mut y = top as i32;
    for line in lines.iter() {
        let x = centered_x(width, typeface.text_width(line, size));
        typeface.draw(canvas, line, x + SHADOW_OFFSET, y + SHADOW_OFFSET, size, SHADOW_COLOR);
        typeface.draw(canvas, line, x, y, size, TEXT_COLOR);
        y += (line_height + spacing) as i32;
    }
}

fn centered_x(canvas_width: u32, line_width: u32) -> i32 {
    (canvas_width.saturating_sub(line_width) / 2) as i32
}

fn fill_rounded_rect(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    radius: u32,
    color: Rgba<u8>,
) {
    if width == 0 || height == 0 {
        return;
    }
    let r = radius.min(width / 2).min(height / 2);
    if r == 0 {
        draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width, height), color);
        return;
    }
    if width > 2 * r {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x + r as i32, y).of_size(width - 2 * r, height),
            color,
        );
    }
    if height > 2 * r {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x, y + r as i32).of_size(width, height - 2 * r),
            color,
        );
    }
    let ri = r as i32;
    let right = x + width as i32 - 1 - ri;
    let bottom = y + height as i32 - 1 - ri;
    for center in [(x + ri, y + ri), (right, y + ri), (x + ri, bottom), (right, bottom)] {
        draw_filled_circle_mut(canvas, center, ri, color);
    }
}

pub(crate) fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> OverlayText {
        OverlayText {
            headline: Some(String::from("Summer Sale")),
            subheadline: Some(String::from("Everything must go")),
            call_to_action: Some(String::from("Shop now")),
        }
    }

    fn canvas() -> RgbaImage {
        RgbaImage::from_pixel(400, 400, Rgba([90, 140, 200, 255]))
    }

    #[test]
    fn elements_stack_in_tier_order_without_overlap() {
        let rendered = render_overlay(
            canvas(),
            &sample_text(),
            &CompositionOptions::default(),
            &Typeface::builtin(),
            None,
        );
        let elements = rendered.layout.elements.as_slice();

        assert_eq!(
            rendered.layout.order(),
            vec![
                OverlayElementKind::Headline,
                OverlayElementKind::Subheadline,
                OverlayElementKind::CallToAction
            ]
        );
        for pair in elements.windows(2) {
            assert!(pair[0].top + pair[0].height <= pair[1].top);
        }
        assert!(elements[0].font_size > elements[1].font_size);
        assert!(elements[1].font_size > elements[2].font_size);
    }

    #[test]
    fn position_moves_the_block() {
        let typeface = Typeface::builtin();
        let top_of = |position| {
            let options = CompositionOptions {
                position,
                ..CompositionOptions::default()
            };
            render_overlay(canvas(), &sample_text(), &options, &typeface, None)
                .layout
                .elements[0]
                .top
        };
        let top = top_of(TextPosition::Top);
        let center = top_of(TextPosition::Center);
        let bottom = top_of(TextPosition::Bottom);

        assert!(top < center);
        assert!(center < bottom);
    }

    #[test]
    fn cta_button_uses_default_accent_without_brand() {
        let options = CompositionOptions {
            position: TextPosition::Top,
            brand_grade: false,
            ..CompositionOptions::default()
        };
        let text = OverlayText {
            call_to_action: Some(String::from("Go")),
            ..OverlayText::default()
        };
        let rendered = render_overlay(canvas(), &text, &options, &Typeface::builtin(), None);
        let cta = &rendered.layout.elements[0];

        // Left padding of the button, below the rounded corner.
        let widest = Typeface::builtin().text_width("Go", cta.font_size as f32);
        let pad_x = (cta.font_size as f32 * CTA_PAD_X) as u32;
        let box_x = (400 - (widest + 2 * pad_x)) / 2;
        let px = rendered.canvas.get_pixel(box_x + 2, cta.top + cta.height / 2);
        assert_eq!(px, &Rgba([0xFF, 0x6B, 0x35, 255]));
    }

    fn cta_fill_point(rendered: &RenderedOverlay, label: &str) -> (u32, u32) {
        let cta = &rendered.layout.elements[0];
        let widest = Typeface::builtin().text_width(label, cta.font_size as f32);
        let pad_x = (cta.font_size as f32 * CTA_PAD_X) as u32;
        let box_x = (400 - (widest + 2 * pad_x)) / 2;
        (box_x + 2, cta.top + cta.height / 2)
    }

    #[test]
    fn grade_tints_the_cta_button_drawn_before_it() {
        let brand = [0x0A, 0x7C, 0xFF];
        let options = CompositionOptions {
            position: TextPosition::Top,
            ..CompositionOptions::default()
        };
        let text = OverlayText {
            call_to_action: Some(String::from("Go")),
            ..OverlayText::default()
        };
        let rendered = render_overlay(canvas(), &text, &options, &Typeface::builtin(), Some(brand));
        assert!(rendered.color_graded);

        let expected = apply_brand_grade(
            &RgbaImage::from_pixel(1, 1, Rgba([brand[0], brand[1], brand[2], 255])),
            brand,
            options.grade_intensity,
        )
        .expect("grade a single pixel");
        let (x, y) = cta_fill_point(&rendered, "Go");
        assert_eq!(rendered.canvas.get_pixel(x, y), expected.get_pixel(0, 0));
        assert_ne!(rendered.canvas.get_pixel(x, y), &Rgba([brand[0], brand[1], brand[2], 255]));
    }

    #[test]
    fn failed_grade_keeps_the_overlay() {
        let brand = [0x0A, 0x7C, 0xFF];
        let options = CompositionOptions {
            position: TextPosition::Top,
            grade_intensity: 2.0,
            ..CompositionOptions::default()
        };
        let text = OverlayText {
            call_to_action: Some(String::from("Go")),
            ..OverlayText::default()
        };
        let rendered = render_overlay(canvas(), &text, &options, &Typeface::builtin(), Some(brand));

        assert!(!rendered.color_graded);
        assert_eq!(rendered.layout.order(), vec![OverlayElementKind::CallToAction]);
        let (x, y) = cta_fill_point(&rendered, "Go");
        assert_eq!(rendered.canvas.get_pixel(x, y), &Rgba([brand[0], brand[1], brand[2], 255]));
    }

    #[test]
    fn grade_failure_keeps_pre_grade_image() {
        let options = CompositionOptions {
            brand_grade: true,
            grade_intensity: 2.0,
            ..CompositionOptions::default()
        };
        let rendered = render_overlay(
            canvas(),
            &OverlayText::default(),
            &options,
            &Typeface::builtin(),
            Some([10, 20, 30]),
        );

        assert!(!rendered.color_graded);
        assert!(rendered.layout.elements.is_empty());
        assert_eq!(rendered.canvas.get_pixel(0, 0), &Rgba([90, 140, 200, 255]));
    }

    #[test]
    fn grade_applies_with_brand_color() {
        let rendered = render_overlay(
            canvas(),
            &OverlayText::default(),
            &CompositionOptions::default(),
            &Typeface::builtin(),
            Some([255, 0, 0]),
        );
        assert!(rendered.color_graded);
        assert_ne!(rendered.canvas.get_pixel(0, 0), &Rgba([90, 140, 200, 255]));
    }

    #[test]
    fn explicit_cta_overrides_copy() {
        let copy = GeneratedCopy {
            pieces: vec![
                crate::assets::CopyPiece::new(CopyFormat::Headline, "Hello"),
                crate::assets::CopyPiece::new(CopyFormat::CallToAction, "From copy"),
            ],
            variations: Vec::new(),
            backend: String::from("specification"),
        };
        let mut spec = AssetSpecification::new(
            crate::assets::AssetKind::SocialPost,
            crate::assets::Platform::Instagram,
        );
        spec.call_to_action = Some(String::from("Explicit"));

        let text = OverlayText::from_copy(&copy, &spec);
        assert_eq!(text.headline.as_deref(), Some("Hello"));
        assert_eq!(text.call_to_action.as_deref(), Some("Explicit"));
        assert_eq!(text.subheadline, None);
    }
}
