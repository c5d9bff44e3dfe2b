//! Field detectors
//!
//! Each detector is a pure pattern-plus-validation rule over a whole text or a
//! fragment. Detectors never fail on well-formed text: an ambiguous candidate
//! resolves to "no match".

pub mod address;
pub mod cpf;
pub mod email;
pub mod phone;
pub mod registration;

pub use address::AddressDetector;
pub use cpf::CpfDetector;
pub use email::EmailDetector;
pub use phone::PhoneDetector;
pub use registration::RegistrationDetector;

use crate::domain::FieldKind;

/// Trait for synchronous field detectors
pub trait FieldDetector: Send + Sync {
    /// Field this detector reports
    fn kind(&self) -> FieldKind;

    /// Returns the matched span, if any
    fn detect(&self, text: &str) -> Option<String>;

    /// Absent input yields no match
    fn detect_opt(&self, text: Option<&str>) -> Option<String> {
        text.and_then(|t| self.detect(t))
    }
}
