//! CPF (Brazilian tax ID) detector
//!
//! Labeled numbers (`CPF: ...`) may be formatted or raw; unlabeled numbers
//! must use the canonical `###.###.###-##` punctuation so protocol numbers
//! and other 11-digit codes do not match. Every candidate must pass the
//! check-digit validation.

use super::FieldDetector;
use crate::domain::{FieldKind, Result};
use regex::Regex;

pub struct CpfDetector {
    labeled: Regex,
    formatted: Regex,
}

impl CpfDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            labeled: Regex::new(
                r"(?i)\bcpf\s*[:\-]?\s*(\d{3}[.\s-]?\d{3}[.\s-]?\d{3}[.\s-]?\d{2}|\d{11})\b",
            )?,
            formatted: Regex::new(r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b")?,
        })
    }
}

/// Validates the two CPF check digits
///
/// Non-digit characters are ignored; anything other than 11 digits, or 11
/// identical digits, is rejected.
pub fn is_valid_cpf(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    for position in 9..11 {
        let sum: u32 = digits[..position]
            .iter()
            .enumerate()
            .map(|(idx, d)| d * (position as u32 + 1 - idx as u32))
            .sum();
        let remainder = sum % 11;
        let check = if remainder < 2 { 0 } else { 11 - remainder };
        if digits[position] != check {
            return false;
        }
    }
    true
}

impl FieldDetector for CpfDetector {
    fn kind(&self) -> FieldKind {
        FieldKind::Cpf
    }

    fn detect(&self, text: &str) -> Option<String> {
        let labeled = self
            .labeled
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str());
        let formatted = self.formatted.find_iter(text).map(|m| m.as_str());

        labeled
            .chain(formatted)
            .find(|candidate| is_valid_cpf(candidate))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn detector() -> CpfDetector {
        CpfDetector::new().unwrap()
    }

    #[test_case("52998224725" ; "raw")]
    #[test_case("529.982.247-25" ; "formatted")]
    #[test_case("123.456.789-09" ; "sequential base")]
    #[test_case("111.444.777-35" ; "textbook example")]
    fn test_valid_checksums(value: &str) {
        assert!(is_valid_cpf(value));
    }

    #[test]
    fn test_all_identical_digits_rejected() {
        for d in 0..=9 {
            let value = d.to_string().repeat(11);
            assert!(!is_valid_cpf(&value), "{value} should be rejected");
        }
    }

    #[test]
    fn test_wrong_check_digit_rejected() {
        assert!(!is_valid_cpf("529.982.247-26"));
        assert!(!is_valid_cpf("5299822472"));
    }

    #[test_case("CPF: 123.456.789-09" ; "label colon")]
    #[test_case("Doc 123.456.789-09" ; "unlabelled formatted")]
    #[test_case("CPF-123.456.789-09" ; "label dash")]
    #[test_case("CPF 12345678909" ; "label raw digits")]
    #[test_case("Meu CPF é 529.982.247-25 para cadastro." ; "sentence")]
    fn test_detects(text: &str) {
        assert!(detector().detect(text).is_some());
    }

    #[test_case("Protocolo 12345678901" ; "unlabelled raw digits")]
    #[test_case("Documento 00000000000" ; "identical digits")]
    #[test_case("CPF 123.456.789-00" ; "invalid checksum")]
    #[test_case("Processo 00012.345678/2023-11" ; "process number")]
    fn test_rejects(text: &str) {
        assert_eq!(detector().detect(text), None);
    }

    #[test]
    fn test_first_valid_candidate_wins() {
        let text = "cpf 123.456.789-00 ou 529.982.247-25";
        assert_eq!(detector().detect(text).as_deref(), Some("529.982.247-25"));
    }
}
