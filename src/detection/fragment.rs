//! Overlapping word-window fragmentation
//!
//! Fragments bound the pattern search for evidence localization and the
//! context sent to external models. A fragment covers `window` word tokens;
//! consecutive fragments share `overlap` tokens and the last fragment always
//! ends at the final token.
//!
//! A fragment's text is the slice of the source between the whitespace
//! boundaries enclosing its first and last tokens, so punctuation inside and
//! directly around the words (`(11) 98765-4321`, `a@b.com`) is preserved.
//! The widening stops at the neighbouring tokens, so the text never holds
//! more than `window` tokens.

use super::text::{tokenize, Token};
use crate::domain::{PiiError, Result};
use serde::{Deserialize, Serialize};

/// Validated window/overlap pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentConfig {
    window: usize,
    overlap: usize,
}

impl FragmentConfig {
    pub const DEFAULT_WINDOW: usize = 35;
    pub const DEFAULT_OVERLAP: usize = 12;

    /// Creates a config; fails unless `window > overlap`
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window <= overlap {
            return Err(PiiError::InvalidFragmentConfig { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily fragments `text`
    pub fn fragments<'a>(&self, text: &'a str) -> Fragments<'a> {
        Fragments::new(text, *self)
    }
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}

/// Fragments `text` with the given window and overlap
///
/// # Errors
///
/// Returns [`PiiError::InvalidFragmentConfig`] when `window <= overlap`.
pub fn fragment(text: &str, window: usize, overlap: usize) -> Result<Fragments<'_>> {
    Ok(FragmentConfig::new(window, overlap)?.fragments(text))
}

/// One window of a record's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Sequence index within the record
    pub index: usize,
    pub text: &'a str,
    /// Index of the first token covered
    pub first_token: usize,
    /// One past the last token covered
    pub end_token: usize,
}

impl Fragment<'_> {
    pub fn token_count(&self) -> usize {
        self.end_token - self.first_token
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Lazy, finite fragment sequence; clone it to restart
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    text: &'a str,
    tokens: Vec<Token<'a>>,
    config: FragmentConfig,
    next_start: Option<usize>,
    index: usize,
}

impl<'a> Fragments<'a> {
    fn new(text: &'a str, config: FragmentConfig) -> Self {
        Self {
            text,
            tokens: tokenize(text),
            config,
            next_start: Some(0),
            index: 0,
        }
    }

    fn slice(&self, first: usize, end: usize) -> &'a str {
        let text = self.text;
        let floor = first.checked_sub(1).map_or(0, |prev| self.tokens[prev].end);
        let ceiling = self.tokens.get(end).map_or(text.len(), |next| next.start);

        let mut from = self.tokens[first].start;
        while from > floor {
            match text[..from].chars().next_back() {
                Some(c) if !c.is_whitespace() => from -= c.len_utf8(),
                _ => break,
            }
        }
        let mut to = self.tokens[end - 1].end;
        while to < ceiling {
            match text[to..].chars().next() {
                Some(c) if !c.is_whitespace() => to += c.len_utf8(),
                _ => break,
            }
        }
        &text[from..to]
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start.take()?;
        let index = self.index;
        self.index += 1;

        // An empty text still yields one unit to scan.
        if self.tokens.is_empty() {
            return Some(Fragment {
                index,
                text: "",
                first_token: 0,
                end_token: 0,
            });
        }

        let len = self.tokens.len();
        let end = (start + self.config.window).min(len);
        if end < len {
            self.next_start = Some(end.saturating_sub(self.config.overlap));
        }

        Some(Fragment {
            index,
            text: self.slice(start, end),
            first_token: start,
            end_token: end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::lorem::en::Words;
    use fake::Fake;
    use rand::Rng;

    #[test]
    fn test_rejects_window_not_greater_than_overlap() {
        assert!(matches!(
            FragmentConfig::new(12, 12),
            Err(PiiError::InvalidFragmentConfig { window: 12, overlap: 12 })
        ));
        assert!(fragment("texto", 5, 8).is_err());
    }

    #[test]
    fn test_empty_text_yields_single_empty_fragment() {
        let fragments: Vec<_> = fragment("", 35, 12).unwrap().collect();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].is_empty());

        let fragments: Vec<_> = fragment(" ... !! ", 35, 12).unwrap().collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "");
    }

    #[test]
    fn test_short_text_single_fragment() {
        let fragments: Vec<_> = fragment("Meu CPF é 529.982.247-25.", 35, 12)
            .unwrap()
            .collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Meu CPF é 529.982.247-25.");
    }

    #[test]
    fn test_windows_advance_by_window_minus_overlap() {
        let text = "a b c d e f g h i j";
        let fragments: Vec<_> = fragment(text, 4, 1).unwrap().collect();
        let texts: Vec<&str> = fragments.iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["a b c d", "d e f g", "g h i j"]);
        assert_eq!(fragments[2].index, 2);
    }

    #[test]
    fn test_last_fragment_clamped_to_final_token() {
        let text = "um dois tres quatro cinco seis";
        let fragments: Vec<_> = fragment(text, 4, 2).unwrap().collect();
        let last = fragments.last().unwrap();
        assert_eq!(last.end_token, 6);
        assert_eq!(last.text, "tres quatro cinco seis");
    }

    #[test]
    fn test_punctuation_around_words_is_kept() {
        let text = "Contato: (11) 98765-4321, obrigado";
        let fragments: Vec<_> = fragment(text, 35, 12).unwrap().collect();
        assert!(fragments[0].text.contains("(11) 98765-4321"));
    }

    #[test]
    fn test_punctuation_joined_words_stay_within_window() {
        let text = "joao,maria,pedro,ana,carla,bruno";
        let fragments: Vec<_> = fragment(text, 2, 0).unwrap().collect();
        let texts: Vec<&str> = fragments.iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["joao,maria,", ",pedro,ana,", ",carla,bruno"]);
        for f in &fragments {
            assert!(tokenize(f.text).len() <= 2, "{:?}", f.text);
        }
    }

    #[test]
    fn test_restartable_by_clone() {
        let fragments = fragment("a b c d e f", 3, 1).unwrap();
        let first: Vec<_> = fragments.clone().collect();
        let second: Vec<_> = fragments.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_coverage_property_on_random_texts() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let words: Vec<String> = Words(1..80).fake();
            let text = words.join(" ");
            let overlap = rng.gen_range(0..10);
            let window = overlap + rng.gen_range(1..15);

            let token_count = tokenize(&text).len();
            let fragments: Vec<_> = fragment(&text, window, overlap).unwrap().collect();

            let mut covered = vec![false; token_count];
            for f in &fragments {
                assert!(f.token_count() <= window);
                assert_eq!(tokenize(f.text).len(), f.token_count());
                for slot in covered.iter_mut().take(f.end_token).skip(f.first_token) {
                    *slot = true;
                }
            }
            assert!(covered.iter().all(|c| *c), "text {text:?} not fully covered");
            if token_count > 0 {
                assert_eq!(fragments.last().unwrap().end_token, token_count);
            }
        }
    }
}
