//! Wrapping never produces a line wider than the requested maximum.

use assetsmith_core::pipeline::composition::{wrap_text, TextMeasure, Typeface};
use proptest::prelude::*;

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn wrapped_lines_never_exceed_max_width() {
    let typeface = Typeface::builtin();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[A-Za-z0-9 !?.,'-]{0,160}", 6.0f32..96.0, 0u32..1200),
            |(text, size, max_width)| {
                let lines = wrap_text(text.as_str(), &typeface, size, max_width);
                for line in lines.iter() {
                    let width = typeface.text_width(line.as_str(), size);
                    prop_assert!(
                        width <= max_width,
                        "line {line:?} is {width}px, max {max_width}px"
                    );
                    prop_assert!(!line.is_empty());
                    prop_assert_eq!(line.trim(), line.as_str());
                }
                Ok(())
            },
        )
        .expect("wrap width property");
}

#[test]
fn wrapping_keeps_every_glyph_when_a_single_glyph_fits() {
    let typeface = Typeface::builtin();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[A-Za-z0-9 !?.,]{0,160}", 6.0f32..64.0, 0u32..900),
            |(text, size, max_width)| {
                prop_assume!(typeface.text_width("W", size) <= max_width);
                let lines = wrap_text(text.as_str(), &typeface, size, max_width);
                prop_assert_eq!(non_whitespace(lines.concat().as_str()), non_whitespace(text.as_str()));
                Ok(())
            },
        )
        .expect("wrap preservation property");
}

#[test]
fn words_that_fit_are_never_split() {
    let typeface = Typeface::builtin();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec("[A-Z]{1,8}", 1..20), 200u32..800),
            |(words, max_width)| {
                let size = 16.0;
                prop_assume!(words
                    .iter()
                    .all(|w| typeface.text_width(w.as_str(), size) <= max_width));
                let text = words.join(" ");
                let lines = wrap_text(text.as_str(), &typeface, size, max_width);
                let rejoined: Vec<String> = lines
                    .iter()
                    .flat_map(|line| line.split(' ').map(String::from))
                    .collect();
                prop_assert_eq!(rejoined, words);
                Ok(())
            },
        )
        .expect("whole-word property");
}
