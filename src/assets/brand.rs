use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VocabularyConstraints {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub banned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrandContext {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub voice_tone: Vec<String>,
    #[serde(default)]
    pub vocabulary: Option<VocabularyConstraints>,
}

impl BrandContext {
    pub fn primary_rgb(&self) -> Option<[u8; 3]> {
        self.primary_color.as_deref().and_then(parse_hex_color)
    }

    pub fn secondary_rgb(&self) -> Option<[u8; 3]> {
        self.secondary_color.as_deref().and_then(parse_hex_color)
    }

    /// Banned terms found in `text`, matched case-insensitively on word boundaries.
    pub fn banned_terms_in(&self, text: &str) -> Vec<String> {
        let Some(vocabulary) = self.vocabulary.as_ref() else {
            return Vec::new();
        };
        let words = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect::<Vec<_>>();
        let lowered = text.to_lowercase();
        vocabulary
            .banned
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .filter(|term| {
                let term = term.to_lowercase();
                if term.contains(' ') {
                    lowered.contains(term.as_str())
                } else {
                    words.iter().any(|w| *w == term)
                }
            })
            .map(str::to_string)
            .collect()
    }
}

/// Accepts `#rrggbb`, `rrggbb` and `#rgb`.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b])
        }
        3 => {
            let mut out = [0_u8; 3];
            for (i, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some(out)
        }
        _ => None,
    }
}
