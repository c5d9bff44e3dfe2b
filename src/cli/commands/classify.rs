//! Classify command implementation
//!
//! Reads a CSV of requests, runs the detectors and writes the input back
//! with the classification columns appended.

use crate::adapters::tabular::{default_output_path, load_records, read_table, write_classified};
use crate::config::{load_config, PiiDetectorConfig};
use crate::core::{ClassificationEngine, EvidenceLog};
use crate::detection::AggregationPolicy;
use crate::log_error_with_context;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Input CSV with `ID` and `Texto Mascarado` columns
    #[arg(short, long)]
    pub input: String,

    /// Output CSV (defaults to `<input stem>_classificado.csv`)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write per-record evidence as JSON lines to this file
    #[arg(long)]
    pub evidence: Option<String>,

    /// Override the aggregation policy
    #[arg(long, value_enum)]
    pub policy: Option<AggregationPolicy>,

    /// Only classify the first N rows; the rest get all-zero flags
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Ask the generative model about records with no deterministic match
    #[arg(long)]
    pub llm: bool,

    /// Reuse per-field columns already present in the input
    #[arg(long)]
    pub reuse_existing: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<String>,
}

impl ClassifyArgs {
    /// Applies command-line overrides on top of the file configuration
    pub fn apply_overrides(&self, config: &mut PiiDetectorConfig) {
        if let Some(policy) = self.policy {
            tracing::info!(policy = %policy, "Overriding aggregation policy from CLI");
            config.detection.policy = policy;
        }
        if self.max_rows.is_some() {
            config.detection.max_rows = self.max_rows;
        }
        if self.llm {
            config.llm.enabled = true;
        }
        if self.reuse_existing {
            config.detection.reuse_existing = true;
        }
        if let Some(path) = &self.evidence {
            config.output.evidence_path = Some(path.clone());
        }
        if let Some(path) = &self.report {
            config.output.report_path = Some(path.clone());
        }
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => PathBuf::from(path),
            None => default_output_path(Path::new(&self.input)),
        }
    }

    /// Execute the classify command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input, "Starting classify command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("❌ Configuration validation failed: {e}");
            return Ok(2);
        }

        let table = match read_table(&self.input) {
            Ok(t) => t,
            Err(e) => {
                log_error_with_context!(&e, "Failed to read input");
                eprintln!("❌ Failed to read {}: {e}", self.input);
                return Ok(1);
            }
        };
        let records = match load_records(&table, config.detection.reuse_existing) {
            Ok(r) => r,
            Err(e) => {
                log_error_with_context!(&e, "Input is missing required columns");
                eprintln!("❌ {e}");
                return Ok(e.exit_code());
            }
        };

        let engine = match ClassificationEngine::from_config(&config) {
            Ok(engine) => engine,
            Err(e) => {
                log_error_with_context!(&e, "Failed to build the classifier");
                eprintln!("❌ {e}");
                return Ok(e.exit_code());
            }
        };

        let evidence = match &config.output.evidence_path {
            Some(path) => Some(EvidenceLog::create(path, config.output.hash_spans)?),
            None => None,
        };

        println!(
            "🔍 Classifying {} records from {} (policy: {})",
            records.len(),
            self.input,
            config.detection.policy
        );
        if uses_external_services(&config) {
            println!("⚠️  External enrichment is enabled; use only with synthetic data");
        }

        let outcome = match engine.run(&records, evidence.as_ref()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log_error_with_context!(&e, "Classification failed");
                eprintln!("❌ Classification failed: {e}");
                return Ok(e.exit_code());
            }
        };

        let output = self.output_path();
        if let Err(e) = write_classified(&output, &table, &outcome.classifications) {
            log_error_with_context!(&e, "Failed to write output");
            eprintln!("❌ Failed to write {}: {e}", output.display());
            return Ok(5);
        }

        let report = outcome.report;
        match config.output.report_format.as_str() {
            "json" => println!("{}", report.format_json()?),
            _ => println!("{}", report.format_console()),
        }
        if let Some(path) = &config.output.report_path {
            report.write_to_file(Path::new(path))?;
            println!("📄 Report written to {path}");
        }
        if let Some(log) = &evidence {
            println!("🧾 Evidence written to {}", log.path().display());
        }
        println!("✅ Output written to {}", output.display());

        Ok(0)
    }
}

fn uses_external_services(config: &PiiDetectorConfig) -> bool {
    config.enrichment.genderize.enabled || config.enrichment.openai.enabled || config.llm.enabled
}
