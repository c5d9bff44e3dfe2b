//! Detection flags, evidence and per-record classification output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of personal data a detector looks for
///
/// Serialized names match the output column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "cpf")]
    Cpf,
    #[serde(rename = "telefone")]
    Phone,
    #[serde(rename = "rg")]
    Rg,
    #[serde(rename = "nome")]
    Name,
    #[serde(rename = "endereco")]
    Address,
}

impl FieldKind {
    /// Fixed priority order used by the priority policies
    pub const PRIORITY: [FieldKind; 5] = [
        FieldKind::Email,
        FieldKind::Cpf,
        FieldKind::Phone,
        FieldKind::Rg,
        FieldKind::Name,
    ];

    /// Per-field output columns, in output order
    pub const OUTPUT_ORDER: [FieldKind; 6] = [
        FieldKind::Cpf,
        FieldKind::Email,
        FieldKind::Phone,
        FieldKind::Address,
        FieldKind::Rg,
        FieldKind::Name,
    ];

    /// Column name for this field
    pub fn column(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::Cpf => "cpf",
            FieldKind::Phone => "telefone",
            FieldKind::Rg => "rg",
            FieldKind::Name => "nome",
            FieldKind::Address => "endereco",
        }
    }

    /// Parses a column name (case-insensitive)
    pub fn from_column(column: &str) -> Option<Self> {
        match column.trim().to_lowercase().as_str() {
            "email" => Some(FieldKind::Email),
            "cpf" => Some(FieldKind::Cpf),
            "telefone" => Some(FieldKind::Phone),
            "rg" => Some(FieldKind::Rg),
            "nome" => Some(FieldKind::Name),
            "endereco" => Some(FieldKind::Address),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One positive detector firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub span: String,
    pub fragment_idx: usize,
}

impl Evidence {
    pub fn new(kind: FieldKind, span: impl Into<String>, fragment_idx: usize) -> Self {
        Self {
            kind,
            span: span.into(),
            fragment_idx,
        }
    }
}

/// Per-record flags
///
/// Built by the aggregator and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFlags {
    pub email: bool,
    pub cpf: bool,
    pub telefone: bool,
    pub rg: bool,
    pub nome: bool,
    pub endereco: bool,
    pub nao_publico: bool,
    pub detector_prioritario: Option<FieldKind>,
}

impl DetectionFlags {
    pub fn get(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Email => self.email,
            FieldKind::Cpf => self.cpf,
            FieldKind::Phone => self.telefone,
            FieldKind::Rg => self.rg,
            FieldKind::Name => self.nome,
            FieldKind::Address => self.endereco,
        }
    }

    pub fn set(&mut self, kind: FieldKind, value: bool) {
        let slot = match kind {
            FieldKind::Email => &mut self.email,
            FieldKind::Cpf => &mut self.cpf,
            FieldKind::Phone => &mut self.telefone,
            FieldKind::Rg => &mut self.rg,
            FieldKind::Name => &mut self.nome,
            FieldKind::Address => &mut self.endereco,
        };
        *slot = value;
    }

    /// Per-field values as 0/1, keyed by column name
    pub fn as_binary(&self) -> BTreeMap<&'static str, u8> {
        FieldKind::OUTPUT_ORDER
            .iter()
            .map(|kind| (kind.column(), u8::from(self.get(*kind))))
            .collect()
    }

    /// Fields currently set, in priority order
    pub fn positives(&self) -> Vec<FieldKind> {
        FieldKind::PRIORITY
            .iter()
            .copied()
            .chain(std::iter::once(FieldKind::Address))
            .filter(|kind| self.get(*kind))
            .collect()
    }
}

/// Full classification outcome for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub id: String,
    pub flags: DetectionFlags,
    pub evidence: Vec<Evidence>,
    /// True when the generative-model fallback decided the outcome
    pub used_llm: bool,
}

impl Classification {
    pub fn new(id: impl Into<String>, flags: DetectionFlags, evidence: Vec<Evidence>) -> Self {
        Self {
            id: id.into(),
            flags,
            evidence,
            used_llm: false,
        }
    }

    /// All-zero result, used for rows past the processing limit
    pub fn skipped(id: impl Into<String>) -> Self {
        Self::new(id, DetectionFlags::default(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kind_serializes_as_column() {
        let json = serde_json::to_string(&FieldKind::Phone).unwrap();
        assert_eq!(json, "\"telefone\"");
        let kind: FieldKind = serde_json::from_str("\"nome\"").unwrap();
        assert_eq!(kind, FieldKind::Name);
    }

    #[test]
    fn test_from_column() {
        assert_eq!(FieldKind::from_column(" Email "), Some(FieldKind::Email));
        assert_eq!(FieldKind::from_column("endereco"), Some(FieldKind::Address));
        assert_eq!(FieldKind::from_column("nao_publico"), None);
    }

    #[test]
    fn test_flags_get_set() {
        let mut flags = DetectionFlags::default();
        flags.set(FieldKind::Rg, true);
        assert!(flags.get(FieldKind::Rg));
        assert!(!flags.get(FieldKind::Cpf));
        assert_eq!(flags.positives(), vec![FieldKind::Rg]);
    }

    #[test]
    fn test_as_binary_has_every_column() {
        let mut flags = DetectionFlags::default();
        flags.set(FieldKind::Email, true);
        let binary = flags.as_binary();
        assert_eq!(binary.len(), 6);
        assert_eq!(binary["email"], 1);
        assert_eq!(binary["endereco"], 0);
    }

    #[test]
    fn test_evidence_type_field_name() {
        let evidence = Evidence::new(FieldKind::Cpf, "529.982.247-25", 0);
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["type"], "cpf");
        assert_eq!(json["fragment_idx"], 0);
    }
}
