//! Identity and registration number detector (RG and related registries)

use super::FieldDetector;
use crate::detection::text::context_window;
use crate::domain::{FieldKind, Result};
use regex::Regex;

/// Characters inspected on each side of a `matricula` match
const PROPERTY_CONTEXT_CHARS: usize = 40;

/// Matches RG numbers, OAB registrations, personal `matricula` codes,
/// `##-####-####` identity serials and NIS numbers
pub struct RegistrationDetector {
    rg: Regex,
    oab: Regex,
    serial: Regex,
    nis: Regex,
    matricula: Regex,
    property_context: Regex,
}

impl RegistrationDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rg: Regex::new(r"(?i)\brg\s*[:\-]?\s*\d[\d.\-]+")?,
            oab: Regex::new(r"(?i)\boab\s*(?:/[a-z]{2})?[ -]?\d[\d.\-]{3,}")?,
            serial: Regex::new(
                r"(?i)\b(?:rg|registro|identidade)\b[\w\s:.-]{0,10}?\d{2}-\d{4}-\d{4}\b",
            )?,
            nis: Regex::new(r"(?i)\bnis\s*[:=]?\s*\d{5,}\b")?,
            matricula: Regex::new(r"(?i)\bmatr[ií]cul[ao]\b\s*[:=]?\s*([\w][\w.\-/]{3,})")?,
            property_context: Regex::new(r"(?i)\bim[oó]ve(?:l|is)\b|imobili[aá]ri")?,
        })
    }

    /// Personal `matricula` codes; property registrations are skipped
    fn find_matricula(&self, text: &str) -> Option<String> {
        for caps in self.matricula.captures_iter(text) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !code.as_str().chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            let context = context_window(text, whole.start(), whole.end(), PROPERTY_CONTEXT_CHARS);
            if self.property_context.is_match(context) {
                continue;
            }
            return Some(whole.as_str().to_string());
        }
        None
    }
}

impl FieldDetector for RegistrationDetector {
    fn kind(&self) -> FieldKind {
        FieldKind::Rg
    }

    fn detect(&self, text: &str) -> Option<String> {
        [&self.rg, &self.oab, &self.serial, &self.nis]
            .iter()
            .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
            .or_else(|| self.find_matricula(text))
    }
}
