//! Per-run classification report
//!
//! Counts how many records were processed and flagged, which fields fired,
//! which detector dominated, how often the generative fallback decided, and
//! which external sources were consulted.

use crate::domain::{Classification, FieldKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Identifies the run in logs and saved reports
    pub run_id: Option<Uuid>,
    pub records_processed: usize,
    /// Rows past the row limit, emitted with all-zero flags
    pub records_skipped: usize,
    pub sensitive_records: usize,
    pub field_counts: BTreeMap<FieldKind, usize>,
    pub dominant_detectors: BTreeMap<FieldKind, usize>,
    pub llm_decided: usize,
    pub external_sources: Vec<String>,
    pub new_weights: usize,
    pub elapsed_ms: u64,
    pub warnings: Vec<String>,
}

impl ClassificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn add(&mut self, classification: &Classification) {
        self.records_processed += 1;
        let flags = &classification.flags;
        if flags.nao_publico {
            self.sensitive_records += 1;
        }
        for kind in flags.positives() {
            *self.field_counts.entry(kind).or_insert(0) += 1;
        }
        if let Some(kind) = flags.detector_prioritario {
            *self.dominant_detectors.entry(kind).or_insert(0) += 1;
        }
        if classification.used_llm {
            self.llm_decided += 1;
        }
    }

    pub fn add_skipped(&mut self) {
        self.records_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Share of processed records flagged as sensitive
    pub fn sensitive_rate(&self) -> f64 {
        if self.records_processed == 0 {
            0.0
        } else {
            self.sensitive_records as f64 / self.records_processed as f64
        }
    }

    pub fn format_console(&self) -> String {
        let rule = "───────────────────────────────────────────────────────────────\n";
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                   CLASSIFICATION REPORT                       \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n\n");

        output.push_str("📊 SUMMARY\n");
        output.push_str(rule);
        if let Some(run_id) = self.run_id {
            output.push_str(&format!("  Run:                 {run_id}\n"));
        }
        output.push_str(&format!("  Records Processed:   {}\n", self.records_processed));
        output.push_str(&format!("  Records Skipped:     {}\n", self.records_skipped));
        output.push_str(&format!(
            "  Sensitive Records:   {} ({:.1}%)\n",
            self.sensitive_records,
            self.sensitive_rate() * 100.0
        ));
        output.push_str(&format!("  Decided by LLM:      {}\n", self.llm_decided));
        output.push_str(&format!("  New Name Weights:    {}\n", self.new_weights));
        output.push_str(&format!("  Elapsed:             {} ms\n\n", self.elapsed_ms));

        if !self.field_counts.is_empty() {
            output.push_str("🔍 FIELDS DETECTED\n");
            output.push_str(rule);
            for kind in FieldKind::OUTPUT_ORDER {
                if let Some(count) = self.field_counts.get(&kind) {
                    output.push_str(&format!("  {:30} {:>5}\n", kind.column(), count));
                }
            }
            output.push('\n');
        }

        if !self.dominant_detectors.is_empty() {
            output.push_str("🏷️  DOMINANT DETECTOR\n");
            output.push_str(rule);
            let mut dominant: Vec<_> = self.dominant_detectors.iter().collect();
            dominant.sort_by(|a, b| b.1.cmp(a.1));
            for (kind, count) in dominant {
                output.push_str(&format!("  {:30} {:>5}\n", kind.column(), count));
            }
            output.push('\n');
        }

        if !self.external_sources.is_empty() {
            output.push_str("🌐 EXTERNAL SOURCES USED\n");
            output.push_str(rule);
            for source in &self.external_sources {
                output.push_str(&format!("  • {source}\n"));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str(rule);
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> crate::domain::Result<()> {
        std::fs::write(path, self.format_json()?)?;
        Ok(())
    }
}
