//! Configuration schema types
//!
//! Every section and every field has a default, so an absent configuration
//! file is equivalent to an empty one.

use crate::config::SecretString;
use crate::detection::AggregationPolicy;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Root configuration, mapped from `pii-detector.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PiiDetectorConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Field detection and aggregation
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Name scorer thresholds and weight table
    #[serde(default)]
    pub name: NameConfig,

    /// Token enrichment providers
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Generative-model record fallback
    #[serde(default)]
    pub llm: LlmConfig,

    /// Output files
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PiiDetectorConfig {
    /// Validates every section
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.detection.validate()?;
        self.name.validate()?;
        self.enrichment.validate()?;
        self.llm.validate(&self.enrichment.openai)?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Records classified concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        if self.workers == 0 {
            return Err("application.workers must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            workers: default_workers(),
        }
    }
}

/// Field detection and aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Aggregation policy (evidence, priority-stop, priority-label)
    #[serde(default)]
    pub policy: AggregationPolicy,

    /// Fragment size in tokens
    #[serde(default = "default_window")]
    pub window: usize,

    /// Tokens shared by consecutive fragments
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Recognize `nome arroba dominio ponto com` style emails
    #[serde(default = "default_true")]
    pub email_deobfuscation: bool,

    /// Reuse per-field columns already present in the input
    #[serde(default)]
    pub reuse_existing: bool,

    /// Classify at most this many rows; the rest get all-zero flags
    #[serde(default)]
    pub max_rows: Option<usize>,
}

impl DetectionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("detection.window must be > 0".to_string());
        }
        if self.window <= self.overlap {
            return Err(format!(
                "detection.window ({}) must be greater than detection.overlap ({})",
                self.window, self.overlap
            ));
        }
        if self.reuse_existing && self.policy == AggregationPolicy::Evidence {
            return Err(
                "detection.reuse_existing requires a priority policy (priority-stop or priority-label)"
                    .to_string(),
            );
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            policy: AggregationPolicy::default(),
            window: default_window(),
            overlap: default_overlap(),
            email_deobfuscation: true,
            reuse_existing: false,
            max_rows: None,
        }
    }
}

/// Name scorer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameConfig {
    /// Token weight table (`token,weight` CSV)
    #[serde(default = "default_weights_path")]
    pub weights_path: String,

    /// Minimum score when two or more tokens are positive
    #[serde(default = "default_min_multi")]
    pub min_multi: f64,

    /// Minimum score when a single token is positive
    #[serde(default = "default_min_single")]
    pub min_single: f64,

    /// Longest sequence accepted on a single positive token
    #[serde(default = "default_max_tokens")]
    pub max_single_tokens: usize,

    /// Longest sequence accepted by the empty-table heuristic
    #[serde(default = "default_max_tokens")]
    pub max_fallback_tokens: usize,

    /// Minimum length of an unknown labelled single name
    #[serde(default = "default_min_single_len")]
    pub min_single_len: usize,
}

impl NameConfig {
    fn validate(&self) -> Result<(), String> {
        if self.weights_path.trim().is_empty() {
            return Err("name.weights_path cannot be empty".to_string());
        }
        if !self.min_multi.is_finite() || !self.min_single.is_finite() {
            return Err("name.min_multi and name.min_single must be finite".to_string());
        }
        if self.max_single_tokens == 0 || self.max_fallback_tokens == 0 {
            return Err(
                "name.max_single_tokens and name.max_fallback_tokens must be > 0".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            weights_path: default_weights_path(),
            min_multi: default_min_multi(),
            min_single: default_min_single(),
            max_single_tokens: default_max_tokens(),
            max_fallback_tokens: default_max_tokens(),
            min_single_len: default_min_single_len(),
        }
    }
}

/// Token enrichment providers, consulted in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Use the bundled first-name lexicon
    #[serde(default = "default_true")]
    pub lexicon: bool,

    /// Extra name lists, one name per line
    #[serde(default)]
    pub lexicon_files: Vec<String>,

    /// Weight assigned to lexicon and demographic-service hits
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    /// Remote demographic service
    #[serde(default)]
    pub genderize: GenderizeConfig,

    /// Generative-model token weighting
    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl EnrichmentConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.name_weight.is_finite() || self.name_weight <= 0.0 {
            return Err("enrichment.name_weight must be a positive number".to_string());
        }
        if self.lexicon_files.iter().any(|f| f.trim().is_empty()) {
            return Err("enrichment.lexicon_files cannot contain empty paths".to_string());
        }
        self.genderize.validate()?;
        self.openai.validate("enrichment.openai")?;
        Ok(())
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            lexicon: true,
            lexicon_files: Vec::new(),
            name_weight: default_name_weight(),
            genderize: GenderizeConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Genderize.io settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderizeConfig {
    /// Explicit opt-in; sends name tokens over the network
    #[serde(default)]
    pub enabled: bool,

    /// API key (falls back to `GENDERIZE_API_KEY`)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_genderize_url")]
    pub base_url: String,

    #[serde(default = "default_genderize_timeout")]
    pub timeout_seconds: u64,

    /// Minimum reported probability for a gendered answer
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl GenderizeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && !has_key(&self.api_key) {
            return Err(
                "enrichment.genderize.enabled requires an api_key (or GENDERIZE_API_KEY)"
                    .to_string(),
            );
        }
        validate_url("enrichment.genderize.base_url", &self.base_url)?;
        if self.timeout_seconds == 0 {
            return Err("enrichment.genderize.timeout_seconds must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err("enrichment.genderize.min_probability must be within 0..=1".to_string());
        }
        Ok(())
    }
}

impl Default for GenderizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: default_genderize_url(),
            timeout_seconds: default_genderize_timeout(),
            min_probability: default_min_probability(),
            max_retries: default_max_retries(),
        }
    }
}

/// OpenAI-compatible chat completion settings
///
/// Shared by token weighting and the record fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Explicit opt-in for token weighting
    #[serde(default)]
    pub enabled: bool,

    /// API key (falls back to `OPENAI_API_KEY`)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl OpenAiConfig {
    fn validate(&self, section: &str) -> Result<(), String> {
        if self.enabled && !has_key(&self.api_key) {
            return Err(format!(
                "{section}.enabled requires an api_key (or OPENAI_API_KEY)"
            ));
        }
        self.validate_connection(section)
    }

    fn validate_connection(&self, section: &str) -> Result<(), String> {
        validate_url(&format!("{section}.base_url"), &self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(format!("{section}.model cannot be empty"));
        }
        if self.timeout_seconds == 0 {
            return Err(format!("{section}.timeout_seconds must be > 0"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(format!(
                "{section}.initial_delay_ms must not exceed max_delay_ms"
            ));
        }
        Ok(())
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: default_openai_url(),
            model: default_openai_model(),
            timeout_seconds: default_openai_timeout(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Record-level fallback through the generative model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Explicit opt-in; uses the `[enrichment.openai]` connection
    #[serde(default)]
    pub enabled: bool,

    /// Suspect fragments sent per record
    #[serde(default = "default_max_fragments")]
    pub max_fragments: usize,

    /// Result cache file
    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Stored with cached answers
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,
}

impl LlmConfig {
    fn validate(&self, openai: &OpenAiConfig) -> Result<(), String> {
        if self.max_fragments == 0 {
            return Err("llm.max_fragments must be > 0".to_string());
        }
        if self.cache_path.trim().is_empty() {
            return Err("llm.cache_path cannot be empty".to_string());
        }
        if self.enabled {
            if !has_key(&openai.api_key) {
                return Err(
                    "llm.enabled requires enrichment.openai.api_key (or OPENAI_API_KEY)"
                        .to_string(),
                );
            }
            openai.validate_connection("enrichment.openai")?;
        }
        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_fragments: default_max_fragments(),
            cache_path: default_cache_path(),
            prompt_version: default_prompt_version(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Evidence log (JSONL); disabled when absent
    #[serde(default)]
    pub evidence_path: Option<String>,

    /// Replace evidence spans with their SHA-256 digest
    #[serde(default)]
    pub hash_spans: bool,

    /// Run report format (console, json)
    #[serde(default = "default_report_format")]
    pub report_format: String,

    /// Where the JSON report is written
    #[serde(default)]
    pub report_path: Option<String>,
}

impl OutputConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_formats = ["console", "json"];
        if !valid_formats.contains(&self.report_format.as_str()) {
            return Err(format!(
                "Invalid output.report_format '{}'. Must be one of: {}",
                self.report_format,
                valid_formats.join(", ")
            ));
        }
        if let Some(path) = &self.evidence_path {
            if path.trim().is_empty() {
                return Err("output.evidence_path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            evidence_path: None,
            hash_spans: false,
            report_format: default_report_format(),
            report_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn has_key(key: &Option<SecretString>) -> bool {
    key.as_ref()
        .map(|k| !k.expose_secret().as_ref().trim().is_empty())
        .unwrap_or(false)
}

fn validate_url(field: &str, value: &str) -> Result<(), String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{field} must use http or https"));
    }
    Ok(())
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_window() -> usize {
    35
}

fn default_overlap() -> usize {
    12
}

fn default_weights_path() -> String {
    "data/name_weights.csv".to_string()
}

fn default_min_multi() -> f64 {
    0.6
}

fn default_min_single() -> f64 {
    1.1
}

fn default_max_tokens() -> usize {
    4
}

fn default_min_single_len() -> usize {
    3
}

fn default_name_weight() -> f64 {
    1.2
}

fn default_genderize_url() -> String {
    "https://api.genderize.io".to_string()
}

fn default_genderize_timeout() -> u64 {
    5
}

fn default_min_probability() -> f64 {
    0.6
}

fn default_max_retries() -> usize {
    2
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_timeout() -> u64 {
    20
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    4000
}

fn default_max_fragments() -> usize {
    3
}

fn default_cache_path() -> String {
    "data/llm_cache.json".to_string()
}

fn default_prompt_version() -> String {
    "v1".to_string()
}

fn default_report_format() -> String {
    "console".to_string()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
