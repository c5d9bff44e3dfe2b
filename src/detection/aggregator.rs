//! Combines per-field detector outputs into one sensitive-data decision
//!
//! # Policies
//!
//! - [`AggregationPolicy::PriorityStop`]: detectors run over the whole text in
//!   the fixed order email, cpf, telefone, rg, nome and stop at the first
//!   positive.
//! - [`AggregationPolicy::PriorityLabel`]: every detector runs; all positives
//!   are flagged and the first one in order becomes the dominant detector.
//! - [`AggregationPolicy::Evidence`]: the text is fragmented once. A strong
//!   pass looks for cpf, email, telefone, a strong address and rg fragment by
//!   fragment and returns on the first hit. Otherwise a weak pass collects
//!   names and address keywords over every fragment; only a name sets the
//!   aggregate. Every firing is recorded as [`Evidence`].
//!
//! # Examples
//!
//! ```no_run
//! use pii_detector::detection::{AggregationPolicy, Aggregator, NameDetector, NameScorer};
//! use pii_detector::detection::name::{EnrichmentPipeline, NameThresholds, WeightStore};
//! use pii_detector::detection::fragment::FragmentConfig;
//! use pii_detector::domain::Record;
//! use std::sync::Arc;
//!
//! # async fn example() -> pii_detector::domain::Result<()> {
//! let store = Arc::new(WeightStore::open("data/name_weights.csv"));
//! let scorer = NameScorer::new(
//!     Arc::new(EnrichmentPipeline::disabled(store)),
//!     NameThresholds::default(),
//! )?;
//! let aggregator = Aggregator::new(
//!     AggregationPolicy::PriorityStop,
//!     FragmentConfig::default(),
//!     NameDetector::new(scorer)?,
//! )?;
//!
//! let record = Record::with_text("1", "Meu CPF é 529.982.247-25 para cadastro.");
//! let result = aggregator.classify(&record).await;
//! assert!(result.flags.nao_publico);
//! # Ok(())
//! # }
//! ```

use super::binary::BinaryCoercer;
use super::detector::{
    AddressDetector, CpfDetector, EmailDetector, FieldDetector, PhoneDetector,
    RegistrationDetector,
};
use super::fragment::FragmentConfig;
use super::name::NameDetector;
use crate::domain::{Classification, DetectionFlags, Evidence, FieldKind, PiiError, Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Order of the strong pass under the evidence policy
pub const STRONG_ORDER: [FieldKind; 5] = [
    FieldKind::Cpf,
    FieldKind::Email,
    FieldKind::Phone,
    FieldKind::Address,
    FieldKind::Rg,
];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Fixed priority order, stop at the first positive
    PriorityStop,
    /// Fixed priority order, every detector runs
    PriorityLabel,
    /// Fragment scan with strong and weak passes and evidence
    #[default]
    Evidence,
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::PriorityStop => "priority-stop",
            AggregationPolicy::PriorityLabel => "priority-label",
            AggregationPolicy::Evidence => "evidence",
        }
    }

    /// True for the two fixed-order policies
    pub fn is_priority(&self) -> bool {
        !matches!(self, AggregationPolicy::Evidence)
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "priority-stop" | "stop" => Ok(AggregationPolicy::PriorityStop),
            "priority-label" | "label" => Ok(AggregationPolicy::PriorityLabel),
            "evidence" => Ok(AggregationPolicy::Evidence),
            other => Err(format!(
                "Unknown aggregation policy '{other}' (expected priority-stop, priority-label or evidence)"
            )),
        }
    }
}

/// Builds flags from per-field 0/1 values in priority order
///
/// # Errors
///
/// Returns [`PiiError::MissingColumn`] naming the first priority field
/// without a value.
pub fn aggregate_precomputed(values: &BTreeMap<FieldKind, u8>) -> Result<DetectionFlags> {
    let mut flags = DetectionFlags::default();
    for kind in FieldKind::PRIORITY {
        let value = values
            .get(&kind)
            .copied()
            .ok_or_else(|| PiiError::MissingColumn(kind.column().to_string()))?;
        if value == 1 {
            flags.set(kind, true);
            if !flags.nao_publico {
                flags.nao_publico = true;
                flags.detector_prioritario = Some(kind);
            }
        }
    }
    if let Some(value) = values.get(&FieldKind::Address) {
        flags.endereco = *value == 1;
    }
    Ok(flags)
}

pub struct Aggregator {
    policy: AggregationPolicy,
    fragments: FragmentConfig,
    email: EmailDetector,
    cpf: CpfDetector,
    phone: PhoneDetector,
    rg: RegistrationDetector,
    address: AddressDetector,
    name: NameDetector,
    coercer: BinaryCoercer,
}

impl Aggregator {
    pub fn new(
        policy: AggregationPolicy,
        fragments: FragmentConfig,
        name: NameDetector,
    ) -> Result<Self> {
        Ok(Self {
            policy,
            fragments,
            email: EmailDetector::new()?,
            cpf: CpfDetector::new()?,
            phone: PhoneDetector::new()?,
            rg: RegistrationDetector::new()?,
            address: AddressDetector::new()?,
            name,
            coercer: BinaryCoercer::new(),
        })
    }

    /// Toggles recognition of spelled-out e-mail addresses
    pub fn with_email_deobfuscation(mut self, enabled: bool) -> Self {
        self.email = self.email.with_deobfuscation(enabled);
        self
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    pub fn fragment_config(&self) -> FragmentConfig {
        self.fragments
    }

    pub fn name_detector(&self) -> &NameDetector {
        &self.name
    }

    fn field(&self, kind: FieldKind) -> Option<&dyn FieldDetector> {
        match kind {
            FieldKind::Email => Some(&self.email),
            FieldKind::Cpf => Some(&self.cpf),
            FieldKind::Phone => Some(&self.phone),
            FieldKind::Rg => Some(&self.rg),
            FieldKind::Address => Some(&self.address),
            FieldKind::Name => None,
        }
    }

    /// Runs one detector over `text`
    pub async fn detect(&self, kind: FieldKind, text: &str) -> Option<String> {
        match self.field(kind) {
            Some(detector) => detector.detect(text),
            None => self.name.detect(text).await,
        }
    }

    /// Classifies one record under the configured policy
    pub async fn classify(&self, record: &Record) -> Classification {
        let Some(text) = record.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Classification::skipped(record.id.clone());
        };
        let (flags, evidence) = match self.policy {
            AggregationPolicy::PriorityStop => (self.priority(text, true).await, Vec::new()),
            AggregationPolicy::PriorityLabel => (self.priority(text, false).await, Vec::new()),
            AggregationPolicy::Evidence => self.evidence(text).await,
        };
        if let Some(kind) = flags.detector_prioritario {
            tracing::debug!(record_id = %record.id, detector = %kind, "Record flagged");
        }
        Classification::new(record.id.clone(), flags, evidence)
    }

    /// Classifies a record reusing its pre-computed per-field values
    ///
    /// Present values are coerced to 0/1; absent ones are computed from the
    /// text. The priority order then decides the aggregate.
    pub async fn classify_reusing(&self, record: &Record) -> Result<Classification> {
        let mut values = BTreeMap::new();
        for kind in FieldKind::PRIORITY {
            let value = match record.precomputed.get(&kind) {
                Some(raw) => self.coercer.coerce(kind.column(), Some(raw)),
                None => u8::from(self.detect(kind, record.text()).await.is_some()),
            };
            values.insert(kind, value);
        }
        if let Some(raw) = record.precomputed.get(&FieldKind::Address) {
            values.insert(
                FieldKind::Address,
                self.coercer.coerce(FieldKind::Address.column(), Some(raw)),
            );
        }
        let flags = aggregate_precomputed(&values)?;
        Ok(Classification::new(record.id.clone(), flags, Vec::new()))
    }

    async fn priority(&self, text: &str, stop: bool) -> DetectionFlags {
        let mut flags = DetectionFlags::default();
        for kind in FieldKind::PRIORITY {
            if self.detect(kind, text).await.is_none() {
                continue;
            }
            flags.set(kind, true);
            if flags.detector_prioritario.is_none() {
                flags.detector_prioritario = Some(kind);
                flags.nao_publico = true;
            }
            if stop {
                break;
            }
        }
        flags
    }

    async fn evidence(&self, text: &str) -> (DetectionFlags, Vec<Evidence>) {
        let mut flags = DetectionFlags::default();
        let mut evidence = Vec::new();

        for fragment in self.fragments.fragments(text) {
            for kind in STRONG_ORDER {
                if let Some(span) = self.detect(kind, fragment.text).await {
                    flags.set(kind, true);
                    flags.nao_publico = true;
                    flags.detector_prioritario = Some(kind);
                    evidence.push(Evidence::new(kind, span, fragment.index));
                    return (flags, evidence);
                }
            }
        }

        for fragment in self.fragments.fragments(text) {
            if let Some(span) = self.name.detect(fragment.text).await {
                flags.nome = true;
                evidence.push(Evidence::new(FieldKind::Name, span, fragment.index));
            }
            if let Some(span) = self.address.detect_weak(fragment.text) {
                flags.endereco = true;
                evidence.push(Evidence::new(FieldKind::Address, span, fragment.index));
            }
        }
        if flags.nome {
            flags.nao_publico = true;
            flags.detector_prioritario = Some(FieldKind::Name);
        }
        (flags, evidence)
    }
}
