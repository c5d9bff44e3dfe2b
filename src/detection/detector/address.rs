//! Address detector
//!
//! The strong form (postal code, or a street-type keyword next to a number)
//! is a field detector in its own right. The weak form only reports that a
//! street-type keyword is present and serves as corroborating evidence.

use super::FieldDetector;
use crate::domain::{FieldKind, Result};
use regex::Regex;

pub struct AddressDetector {
    postal_code: Regex,
    street_number: Regex,
    street_keyword: Regex,
}

impl AddressDetector {
    pub fn new() -> Result<Self> {
        let keywords = r"rua|avenida|av|rodovia|travessa|quadra|lote|bloco|apto|apartamento|conjunto|condom[ií]nio";
        Ok(Self {
            postal_code: Regex::new(r"\b\d{5}-\d{3}\b")?,
            street_number: Regex::new(&format!(r"(?i)\b(?:{keywords})\b\.?\s*[,\-]?\s*\d+"))?,
            street_keyword: Regex::new(&format!(r"(?i)\b(?:{keywords})\b"))?,
        })
    }

    /// Keyword-only match
    pub fn detect_weak(&self, text: &str) -> Option<String> {
        self.street_keyword
            .find(text)
            .map(|m| m.as_str().to_string())
    }
}

impl FieldDetector for AddressDetector {
    fn kind(&self) -> FieldKind {
        FieldKind::Address
    }

    fn detect(&self, text: &str) -> Option<String> {
        self.postal_code
            .find(text)
            .or_else(|| self.street_number.find(text))
            .map(|m| m.as_str().to_string())
    }
}
