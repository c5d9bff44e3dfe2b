//! Brazilian phone number detector
//!
//! The general form needs an area code (two digits, first not zero) either in
//! parentheses or followed by a separator, then a local number whose first
//! digit is 2-9. Unseparated numbers and the toll-free `0800` form only count
//! after a contact label. Texts that mention a process number without any
//! contact label never yield a phone.

use super::FieldDetector;
use crate::domain::{FieldKind, Result};
use fancy_regex::Regex as FancyRegex;
use regex::Regex;

pub struct PhoneDetector {
    general: FancyRegex,
    labeled_compact: Regex,
    toll_free: Regex,
    process_mention: Regex,
    contact_label: Regex,
}

impl PhoneDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            general: FancyRegex::new(
                r"(?<!\d)(?:(?:\+?55\s*)?\([1-9]\d\)\s*|(?:\+?55\s*)?[1-9]\d[\s-]+)(?:[2-9]\d{4}[\s-]?\d{4}|[2-9]\d{3}[\s-]?\d{4}|[2-9]\d{7,8})(?![\d-])",
            )?,
            labeled_compact: Regex::new(
                r"(?i)\b(?:tel(?:efone)?|cel(?:ular)?|whats(?:app)?|contato)\b[^\d]{0,6}(?:\+?55\s*)?\(?[1-9]\d\)?\s*[2-9]\d{7,8}\b",
            )?,
            toll_free: Regex::new(
                r"(?i)\b(?:tel(?:efone)?|contato)\b[^\d]{0,6}0?800[\s-]?\d{3}[\s-]?\d{4}\b",
            )?,
            process_mention: Regex::new(r"(?i)\b(?:processo|sei)\b")?,
            contact_label: Regex::new(
                r"(?i)\b(?:tel|telefone|cel|celular|whats|whatsapp|contato)\b",
            )?,
        })
    }

    fn find_general(&self, text: &str) -> Option<String> {
        // Backtracking-limit errors count as no match.
        match self.general.find(text) {
            Ok(Some(m)) => Some(m.as_str().trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Phone pattern evaluation aborted");
                None
            }
        }
    }
}

impl FieldDetector for PhoneDetector {
    fn kind(&self) -> FieldKind {
        FieldKind::Phone
    }

    fn detect(&self, text: &str) -> Option<String> {
        if self.process_mention.is_match(text) && !self.contact_label.is_match(text) {
            return None;
        }

        self.find_general(text)
            .or_else(|| {
                self.labeled_compact
                    .find(text)
                    .map(|m| m.as_str().to_string())
            })
            .or_else(|| self.toll_free.find(text).map(|m| m.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn detector() -> PhoneDetector {
        PhoneDetector::new().unwrap()
    }

    #[test_case("(11) 98765-4321" ; "mobile with parentheses")]
    #[test_case("Contato (61) 3456-7890" ; "landline")]
    #[test_case("(21)912345678" ; "no separators")]
    #[test_case("+55 11 98765-4321" ; "country code")]
    #[test_case("Telefone: (11) 98765-4321" ; "labelled")]
    #[test_case("whatsapp 61987654321" ; "labelled compact")]
    #[test_case("Telefone 0800 123 4567" ; "toll free with label")]
    fn test_detects(text: &str) {
        assert!(detector().detect(text).is_some(), "expected phone in {text:?}");
    }

    #[test_case("Telefone: 98765-4321" ; "missing area code")]
    #[test_case("0800 123 456" ; "toll free without label")]
    #[test_case("Tel: 12345-6789" ; "local number starting with one")]
    #[test_case("(00) 91234-5678" ; "area code zero")]
    #[test_case("Cartao SUS (CNS) 898001160220176" ; "health card")]
    #[test_case("CEP 01310-000 Sao Paulo SP" ; "postal code")]
    #[test_case("Veiculo placa ABC1D23 estacionado" ; "licence plate")]
    #[test_case("61987654321" ; "compact without label")]
    fn test_rejects(text: &str) {
        assert_eq!(detector().detect(text), None, "unexpected phone in {text:?}");
    }

    #[test]
    fn test_process_number_without_contact_label() {
        assert_eq!(detector().detect("Processo SEI 61 3456-7890"), None);
        assert!(detector()
            .detect("Processo SEI, telefone 61 3456-7890")
            .is_some());
    }

    #[test]
    fn test_span_is_trimmed() {
        assert_eq!(
            detector().detect("ligue (11) 98765-4321 hoje").as_deref(),
            Some("(11) 98765-4321")
        );
    }
}
