//! Input record model

use super::flags::FieldKind;
use std::collections::BTreeMap;

/// One free-text record to classify
///
/// Identifiers are expected to be unique but this is not enforced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: String,
    pub text: Option<String>,
    /// Per-field values already present in the input, before coercion
    pub precomputed: BTreeMap<FieldKind, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, text: Option<String>) -> Self {
        Self {
            id: id.into(),
            text,
            precomputed: BTreeMap::new(),
        }
    }

    /// Record with text
    pub fn with_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Some(text.into()))
    }

    /// Attaches a pre-computed per-field value
    pub fn with_precomputed(mut self, kind: FieldKind, value: impl Into<String>) -> Self {
        self.precomputed.insert(kind, value.into());
        self
    }

    /// Text to scan; an absent text scans as empty
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
