//! Init command implementation
//!
//! Writes a starter `pii-detector.toml`.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pii-detector.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing PII Detector configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Optional remote enrichment: set OPENAI_API_KEY or GENDERIZE_API_KEY in .env");
                println!("     (only with synthetic data)");
                println!("  3. Validate configuration: pii-detector validate-config");
                println!("  4. Classify: pii-detector classify --input pedidos.csv");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> String {
        r#"# PII Detector configuration

[application]
log_level = "info"
workers = 8

[detection]
policy = "evidence"   # evidence | priority-stop | priority-label
window = 35
overlap = 12

[name]
weights_path = "data/name_weights.csv"

[enrichment]
lexicon = true

[output]
# evidence_path = "saida/evidencias.jsonl"
report_format = "console"
"#
        .to_string()
    }

    fn generate_config_with_examples() -> String {
        r#"# PII Detector configuration
#
# Every value below is the default. Any key may be overridden from the
# environment as PII_<SECTION>_<KEY>, e.g. PII_DETECTION_POLICY=priority-stop.
# ${VAR} references are expanded when the file is loaded.

# ============================================================================
# Application
# ============================================================================
[application]
# trace | debug | info | warn | error
log_level = "info"

# Records classified concurrently
workers = 8

# ============================================================================
# Detection
# ============================================================================
[detection]
# evidence:       strong detectors first, then names and weak addresses
# priority-stop:  fixed order, stop at the first positive detector
# priority-label: run every detector, label with the first positive one
policy = "evidence"

# Fragment size and overlap in tokens (window must exceed overlap)
window = 35
overlap = 12

# Accept "fulano [at] dominio [dot] com" style addresses
email_deobfuscation = true

# Reuse per-field columns already present in the input (priority policies only)
reuse_existing = false

# Classify only the first N rows
# max_rows = 1000

# ============================================================================
# Name scorer
# ============================================================================
[name]
weights_path = "data/name_weights.csv"

# Minimum score for a multi-token span and for a lone first name
min_multi = 0.6
min_single = 1.1

max_single_tokens = 4
max_fallback_tokens = 4
min_single_len = 3

# ============================================================================
# Enrichment of unknown tokens
# ============================================================================
[enrichment]
# Built-in first-name list
lexicon = true

# Extra first-name lists, one name per line
lexicon_files = []

# Weight assigned to names discovered by any provider
name_weight = 1.2

[enrichment.genderize]
# Sends tokens to a third-party service; use only with synthetic data
enabled = false
# api_key = "${GENDERIZE_API_KEY}"
base_url = "https://api.genderize.io"
timeout_seconds = 5
min_probability = 0.6
max_retries = 2

[enrichment.openai]
# Sends text context to a third-party service; use only with synthetic data
enabled = false
# api_key = "${OPENAI_API_KEY}"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
timeout_seconds = 20
max_retries = 2
initial_delay_ms = 500
max_delay_ms = 4000

# ============================================================================
# Generative fallback for records left clean (uses [enrichment.openai])
# ============================================================================
[llm]
enabled = false
max_fragments = 3
cache_path = "data/llm_cache.json"
prompt_version = "v1"

# ============================================================================
# Output
# ============================================================================
[output]
# evidence_path = "saida/evidencias.jsonl"
hash_spans = false
report_format = "console"   # console | json
# report_path = "saida/relatorio.json"

# ============================================================================
# Logging
# ============================================================================
[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"   # daily | hourly | never
"#
        .to_string()
    }
}
