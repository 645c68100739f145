use image::{Rgba, RgbaImage};
use thiserror::Error;

pub const DEFAULT_GRADE_INTENSITY: f32 = 0.15;
const MAX_GRADE_INTENSITY: f32 = 0.6;

#[derive(Debug, Error, PartialEq)]
pub enum ColorGradeError {
    #[error("grade intensity must be within (0, 0.6], got {0}")]
    Intensity(f32),
    #[error("cannot grade an empty image")]
    EmptyImage,
}

/// Tints toward `brand_rgb` by blending a solid layer at `intensity`, then
/// stretches contrast back by `1 / (1 - intensity)` around mid-grey.
pub fn apply_brand_grade(
    image: &RgbaImage,
    brand_rgb: [u8; 3],
    intensity: f32,
) -> Result<RgbaImage, ColorGradeError> {
    if !intensity.is_finite() || intensity <= 0.0 || intensity > MAX_GRADE_INTENSITY {
        return Err(ColorGradeError::Intensity(intensity));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(ColorGradeError::EmptyImage);
    }
    let mut out = image.clone();
    blend_solid_in_place(&mut out, brand_rgb, intensity);
    apply_contrast_in_place(&mut out, 1.0 / (1.0 - intensity));
    Ok(out)
}

fn blend_solid_in_place(image: &mut RgbaImage, rgb: [u8; 3], alpha: f32) {
    for pixel in image.pixels_mut() {
        for i in 0..3 {
            let v = f32::from(pixel[i]);
            pixel[i] = clamp_u8(v * (1.0 - alpha) + f32::from(rgb[i]) * alpha);
        }
    }
}

fn apply_contrast_in_place(image: &mut RgbaImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for i in 0..3 {
            let centered = f32::from(pixel[i]) - 128.0;
            pixel[i] = clamp_u8(centered * factor + 128.0);
        }
    }
}

/// Source-over blend of `color` onto one pixel; out-of-bounds writes are dropped.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let alpha = f32::from(color[3]) / 255.0;
    let pixel = canvas.get_pixel_mut(x, y);
    for i in 0..3 {
        pixel[i] = clamp_u8(f32::from(pixel[i]) * (1.0 - alpha) + f32::from(color[i]) * alpha);
    }
    pixel[3] = pixel[3].max(color[3]);
}

pub(crate) fn clamp_u8(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 255.0).round() as u8
}
