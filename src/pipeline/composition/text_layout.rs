pub trait TextMeasure {
    fn text_width(&self, text: &str, size: f32) -> u32;
    fn line_height(&self, size: f32) -> u32;
}

/// Greedy word wrap. No returned line is wider than `max_width`: words that do
/// not fit on an empty line are broken by character, and a single glyph wider
/// than `max_width` is dropped.
pub fn wrap_text(text: &str, measure: &dyn TextMeasure, size: f32, max_width: u32) -> Vec<String> {
    let fits = |candidate: &str| measure.text_width(candidate, size) <= max_width;
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if fits(candidate.as_str()) {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if fits(word) {
            line = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let mut candidate = line.clone();
            candidate.push(ch);
            if fits(candidate.as_str()) {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let single = ch.to_string();
            if fits(single.as_str()) {
                line = single;
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
