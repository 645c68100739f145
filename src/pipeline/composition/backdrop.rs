use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::color_grade::clamp_u8;

const MAX_BACKDROP_ALPHA: f32 = 0.65;
const GRADIENT_COVERAGE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl TextPosition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "center" | "centre" | "middle" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Darkens the text side of the image: a vertical alpha ramp for top and
/// bottom placement, a radial vignette that is darkest at the center otherwise.
pub fn apply_backdrop(canvas: &mut RgbaImage, position: TextPosition) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let h = height as f32;
    let span = (h * GRADIENT_COVERAGE).max(1.0);
    let cx = width as f32 / 2.0;
    let cy = h / 2.0;
    let reach = (cx * cx + cy * cy).sqrt().max(1.0);

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let alpha = match position {
            TextPosition::Top => ramp(1.0 - y as f32 / span),
            TextPosition::Bottom => ramp(1.0 - (h - 1.0 - y as f32) / span),
            TextPosition::Center => {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                ramp(1.0 - (dx * dx + dy * dy).sqrt() / reach)
            }
        };
        if alpha <= 0.0 {
            continue;
        }
        for i in 0..3 {
            pixel[i] = clamp_u8(f32::from(pixel[i]) * (1.0 - alpha));
        }
    }
}

fn ramp(weight: f32) -> f32 {
    weight.clamp(0.0, 1.0) * MAX_BACKDROP_ALPHA
}
