pub const LONG_PAUSE: &str = "<break time=\"0.8s\"/>";
pub const SHORT_PAUSE: &str = "<break time=\"0.3s\"/>";
pub const WORDS_PER_MINUTE: f64 = 150.0;

const SYMBOL_WORDS: [(char, &str); 4] = [
    ('™', " trademark"),
    ('®', " registered"),
    ('%', " percent"),
    ('&', " and "),
];

/// Expands symbols to words and inserts pause markers after sentence-ending
/// periods (long) and exclamation marks (short). Decimal points are left alone
/// and nothing is appended after the final sentence.
pub fn normalize_for_speech(text: &str) -> String {
    let mut expanded = String::with_capacity(text.len());
    for ch in text.chars() {
        match SYMBOL_WORDS.iter().find(|(symbol, _)| *symbol == ch) {
            Some((_, word)) => expanded.push_str(word),
            None => expanded.push(ch),
        }
    }
    let words: Vec<&str> = expanded.split_whitespace().collect();

    let mut out = String::with_capacity(expanded.len() + words.len() * 4);
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        out.push_str(word);
        if index + 1 == words.len() {
            break;
        }
        if word.ends_with('!') {
            out.push(' ');
            out.push_str(SHORT_PAUSE);
        } else if ends_sentence(word) {
            out.push(' ');
            out.push_str(LONG_PAUSE);
        }
    }
    out
}

fn ends_sentence(word: &str) -> bool {
    let Some(stem) = word.strip_suffix('.') else {
        return false;
    };
    // "e.g." and "..." are not sentence ends.
    !stem.is_empty() && !stem.ends_with('.') && !stem.contains('.')
}

/// Nominal duration at [`WORDS_PER_MINUTE`]; an estimate, not a measurement.
pub fn estimate_duration_secs(script: &str) -> f64 {
    let words = script.split_whitespace().count() as f64;
    (words * 60.0 / WORDS_PER_MINUTE * 10.0).round() / 10.0
}
