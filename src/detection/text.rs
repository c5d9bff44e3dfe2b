//! Tokenization and normalization helpers shared by the detectors

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A word token with its byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Splits text into word tokens on non-word boundaries
///
/// Word characters are Unicode alphanumerics and `_`, so accented letters
/// stay inside words.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (is_word_char(c), current) {
            (true, None) => current = Some(idx),
            (false, Some(start)) => {
                tokens.push(Token {
                    text: &text[start..idx],
                    start,
                    end: idx,
                });
                current = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current {
        tokens.push(Token {
            text: &text[start..],
            start,
            end: text.len(),
        });
    }

    tokens
}

/// Lower-cases and strips diacritics: `"João"` becomes `"joao"`
pub fn normalize_token(token: &str) -> String {
    token
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Lower-cases, trims and collapses internal whitespace
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Slice of `text` reaching `radius` characters on each side of `start..end`
///
/// Offsets are byte offsets on char boundaries, as returned by regex matches.
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());
    &text[from..to]
}

/// Truncates to at most `max_chars` characters, appending `...` when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
