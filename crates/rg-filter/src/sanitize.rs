use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Normalizes user text before it is stored.
///
/// Trims the ends. A whitespace run without newlines becomes one space; a
/// run with newlines keeps them, capped at two (one blank line).
pub fn sanitize_content(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(text.trim(), |caps: &Captures<'_>| {
            match caps[0].matches('\n').count() {
                0 => " ".to_string(),
                1 => "\n".to_string(),
                _ => "\n\n".to_string(),
            }
        })
        .into_owned()
}
