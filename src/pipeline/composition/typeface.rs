use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use super::bitmap_font::BitmapFont;
use super::text_layout::TextMeasure;

const SYSTEM_FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Clone)]
pub enum Typeface {
    TrueType { font: FontArc, source: PathBuf },
    Bitmap(BitmapFont),
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrueType { source, .. } => f.debug_tuple("TrueType").field(source).finish(),
            Self::Bitmap(_) => f.write_str("Bitmap"),
        }
    }
}

impl Typeface {
    pub fn builtin() -> Self {
        Self::Bitmap(BitmapFont)
    }

    /// Configured path first, then common system fonts, then the built-in face.
    pub fn load(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(face) => return face,
                Err(error) => warn!(path = %path.display(), %error, "configured font unusable"),
            }
        }
        for candidate in SYSTEM_FONT_CANDIDATES.iter().map(Path::new) {
            if !candidate.is_file() {
                continue;
            }
            if let Ok(face) = Self::from_file(candidate) {
                debug!(path = %candidate.display(), "using system font");
                return face;
            }
        }
        debug!("no TrueType font found; using built-in bitmap font");
        Self::builtin()
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("read '{}': {e}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| format!("parse '{}': {e}", path.display()))?;
        Ok(Self::TrueType {
            font,
            source: path.to_path_buf(),
        })
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Bitmap(_))
    }

    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        match self {
            Self::TrueType { font, .. } => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text)
            }
            Self::Bitmap(bitmap) => bitmap.draw(canvas, text, x, y, size, color),
        }
    }
}

impl TextMeasure for Typeface {
    fn text_width(&self, text: &str, size: f32) -> u32 {
        match self {
            Self::TrueType { font, .. } => text_size(PxScale::from(size), font, text).0,
            Self::Bitmap(bitmap) => bitmap.text_width(text, size),
        }
    }

    fn line_height(&self, size: f32) -> u32 {
        match self {
            Self::TrueType { font, .. } => font.as_scaled(PxScale::from(size)).height().ceil() as u32,
            Self::Bitmap(bitmap) => bitmap.line_height(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_configured_font_falls_back() {
        let face = Typeface::load(Some(Path::new("/definitely/not/a/font.ttf")));
        // Either a system font or the built-in face; never a panic.
        assert!(face.text_width("abc", 16.0) > 0);
    }

    #[test]
    fn builtin_measures_like_bitmap_font() {
        let face = Typeface::builtin();
        assert!(face.is_builtin());
        assert_eq!(face.text_width("AB", 16.0), BitmapFont.text_width("AB", 16.0));
    }
}
