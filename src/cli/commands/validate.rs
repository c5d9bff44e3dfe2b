//! Validate config command implementation

use crate::config::{load_config, PiiDetectorConfig};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Human-readable configuration summary; never prints key material
pub fn summarize(config: &PiiDetectorConfig) -> String {
    let mut lines = vec![
        "Configuration Summary:".to_string(),
        format!("  Log Level: {}", config.application.log_level),
        format!("  Workers: {}", config.application.workers),
        format!("  Policy: {}", config.detection.policy),
        format!(
            "  Fragments: window {} / overlap {}",
            config.detection.window, config.detection.overlap
        ),
        format!("  Weight Table: {}", config.name.weights_path),
        format!(
            "  Name Thresholds: multi {} / single {}",
            config.name.min_multi, config.name.min_single
        ),
        format!("  Lexicon: {}", on_off(config.enrichment.lexicon)),
        format!("  Genderize: {}", on_off(config.enrichment.genderize.enabled)),
        format!("  OpenAI Enrichment: {}", on_off(config.enrichment.openai.enabled)),
        format!("  LLM Fallback: {}", on_off(config.llm.enabled)),
    ];
    if config.enrichment.openai.enabled || config.llm.enabled {
        lines.push(format!("  OpenAI Model: {}", config.enrichment.openai.model));
    }
    if let Some(path) = &config.output.evidence_path {
        lines.push(format!("  Evidence Log: {path}"));
    }
    if let Some(rows) = config.detection.max_rows {
        lines.push(format!("  Max Rows: {rows}"));
    }
    lines.join("\n")
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as well; a failure here covers both
        match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!();
                println!("{}", summarize(&config));
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}
