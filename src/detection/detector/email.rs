//! Email detector with optional de-obfuscation

use super::FieldDetector;
use crate::domain::{FieldKind, Result};
use regex::Regex;

/// Matches `local@domain.tld`, optionally after rewriting spelled-out
/// separators ("maria arroba exemplo ponto com")
pub struct EmailDetector {
    pattern: Regex,
    at_word: Regex,
    dot_word: Regex,
    spaced_at: Regex,
    spaced_dot: Regex,
    deobfuscate: bool,
}

impl EmailDetector {
    /// Creates a detector with de-obfuscation enabled
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            at_word: Regex::new(r"(?i)\s*[\[(]?\s*\b(?:at|arroba)\b\s*[\])]?\s*")?,
            dot_word: Regex::new(r"(?i)\s*[\[(]?\s*\b(?:dot|ponto)\b\s*[\])]?\s*")?,
            spaced_at: Regex::new(r"\s*@\s*")?,
            spaced_dot: Regex::new(r"\s*\.\s*")?,
            deobfuscate: true,
        })
    }

    /// Enables or disables the de-obfuscation pass
    pub fn with_deobfuscation(mut self, enabled: bool) -> Self {
        self.deobfuscate = enabled;
        self
    }

    fn normalize_obfuscated(&self, text: &str) -> String {
        let text = self.at_word.replace_all(text, "@");
        let text = self.dot_word.replace_all(&text, ".");
        let text = self.spaced_at.replace_all(&text, "@");
        self.spaced_dot.replace_all(&text, ".").into_owned()
    }
}

impl FieldDetector for EmailDetector {
    fn kind(&self) -> FieldKind {
        FieldKind::Email
    }

    fn detect(&self, text: &str) -> Option<String> {
        if let Some(m) = self.pattern.find(text) {
            return Some(m.as_str().to_string());
        }
        if !self.deobfuscate {
            return None;
        }
        let normalized = self.normalize_obfuscated(text);
        if normalized == text {
            return None;
        }
        self.pattern
            .find(&normalized)
            .map(|m| m.as_str().to_string())
    }
}
