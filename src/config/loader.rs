//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::PiiDetectorConfig;
use super::secret_string;
use crate::detection::AggregationPolicy;
use crate::domain::errors::PiiError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file (a missing file means all defaults)
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`PiiDetectorConfig`]
/// 4. Applies environment variable overrides (`PII_*` prefix)
/// 5. Fills API keys from `OPENAI_API_KEY` / `GENDERIZE_API_KEY`
/// 6. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pii_detector::config::loader::load_config;
///
/// let config = load_config("pii-detector.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PiiDetectorConfig> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let contents = fs::read_to_string(path).map_err(|e| {
            PiiError::Configuration(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let contents = substitute_env_vars(&contents)?;
        toml::from_str(&contents)
            .map_err(|e| PiiError::Configuration(format!("Failed to parse TOML: {e}")))?
    } else {
        tracing::debug!(
            path = %path.display(),
            "Configuration file not found; using defaults"
        );
        PiiDetectorConfig::default()
    };

    apply_env_overrides(&mut config)?;
    apply_api_key_fallbacks(&mut config);

    config.validate().map_err(|e| {
        PiiError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PiiError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            PiiError::Configuration(format!("Invalid value '{val}' for environment variable {name}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the `PII_<SECTION>_<KEY>` pattern
///
/// For example: `PII_DETECTION_POLICY`, `PII_NAME_WEIGHTS_PATH`
fn apply_env_overrides(config: &mut PiiDetectorConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("PII_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(workers) = env_parse("PII_APPLICATION_WORKERS")? {
        config.application.workers = workers;
    }

    // Detection overrides
    if let Some(policy) = env_parse::<AggregationPolicy>("PII_DETECTION_POLICY")? {
        config.detection.policy = policy;
    }
    if let Some(window) = env_parse("PII_DETECTION_WINDOW")? {
        config.detection.window = window;
    }
    if let Some(overlap) = env_parse("PII_DETECTION_OVERLAP")? {
        config.detection.overlap = overlap;
    }
    if let Some(enabled) = env_parse("PII_DETECTION_EMAIL_DEOBFUSCATION")? {
        config.detection.email_deobfuscation = enabled;
    }
    if let Some(reuse) = env_parse("PII_DETECTION_REUSE_EXISTING")? {
        config.detection.reuse_existing = reuse;
    }
    if let Some(max_rows) = env_parse("PII_DETECTION_MAX_ROWS")? {
        config.detection.max_rows = Some(max_rows);
    }

    // Name scorer overrides
    if let Ok(val) = std::env::var("PII_NAME_WEIGHTS_PATH") {
        config.name.weights_path = val;
    }
    if let Some(score) = env_parse("PII_NAME_MIN_MULTI")? {
        config.name.min_multi = score;
    }
    if let Some(score) = env_parse("PII_NAME_MIN_SINGLE")? {
        config.name.min_single = score;
    }
    if let Some(tokens) = env_parse("PII_NAME_MAX_SINGLE_TOKENS")? {
        config.name.max_single_tokens = tokens;
    }
    if let Some(tokens) = env_parse("PII_NAME_MAX_FALLBACK_TOKENS")? {
        config.name.max_fallback_tokens = tokens;
    }

    // Enrichment overrides
    if let Some(enabled) = env_parse("PII_ENRICHMENT_LEXICON")? {
        config.enrichment.lexicon = enabled;
    }
    if let Some(enabled) = env_parse("PII_ENRICHMENT_GENDERIZE_ENABLED")? {
        config.enrichment.genderize.enabled = enabled;
    }
    if let Ok(val) = std::env::var("PII_ENRICHMENT_GENDERIZE_BASE_URL") {
        config.enrichment.genderize.base_url = val;
    }
    if let Some(enabled) = env_parse("PII_ENRICHMENT_OPENAI_ENABLED")? {
        config.enrichment.openai.enabled = enabled;
    }
    if let Ok(val) = std::env::var("PII_ENRICHMENT_OPENAI_BASE_URL") {
        config.enrichment.openai.base_url = val;
    }
    if let Ok(val) = std::env::var("PII_ENRICHMENT_OPENAI_MODEL") {
        config.enrichment.openai.model = val;
    }

    // Record fallback overrides
    if let Some(enabled) = env_parse("PII_LLM_ENABLED")? {
        config.llm.enabled = enabled;
    }
    if let Ok(val) = std::env::var("PII_LLM_CACHE_PATH") {
        config.llm.cache_path = val;
    }

    // Output overrides
    if let Ok(val) = std::env::var("PII_OUTPUT_EVIDENCE_PATH") {
        config.output.evidence_path = Some(val);
    }
    if let Some(hash) = env_parse("PII_OUTPUT_HASH_SPANS")? {
        config.output.hash_spans = hash;
    }
    if let Ok(val) = std::env::var("PII_OUTPUT_REPORT_FORMAT") {
        config.output.report_format = val;
    }

    // Logging overrides
    if let Some(enabled) = env_parse("PII_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("PII_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

/// Keys set in the file win over the conventional variables
fn apply_api_key_fallbacks(config: &mut PiiDetectorConfig) {
    if config.enrichment.openai.api_key.is_none() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                config.enrichment.openai.api_key = Some(secret_string(key));
            }
        }
    }
    if config.enrichment.genderize.api_key.is_none() {
        if let Ok(key) = std::env::var("GENDERIZE_API_KEY") {
            if !key.trim().is_empty() {
                config.enrichment.genderize.api_key = Some(secret_string(key));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Environment variables are process-wide.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_substitute_env_vars() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var("PII_TEST_SUBST", "value");
        let result = substitute_env_vars("weights_path = \"${PII_TEST_SUBST}\"").unwrap();
        assert_eq!(result, "weights_path = \"value\"\n");
        std::env::remove_var("PII_TEST_SUBST");
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("PII_TEST_UNSET");
        let result = substitute_env_vars("# api_key = \"${PII_TEST_UNSET}\"").unwrap();
        assert!(result.contains("${PII_TEST_UNSET}"));
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("PII_TEST_MISSING");
        let result = substitute_env_vars("api_key = \"${PII_TEST_MISSING}\"");
        assert!(matches!(result, Err(PiiError::Configuration(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let config = load_config("definitely-not-here.toml").unwrap();
        assert_eq!(config.detection.window, 35);
    }

    #[test]
    fn test_env_override_and_key_fallback() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[detection]\nwindow = 20\noverlap = 4\n").unwrap();
        file.flush().unwrap();

        std::env::set_var("PII_DETECTION_POLICY", "priority-stop");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let config = load_config(file.path());
        std::env::remove_var("PII_DETECTION_POLICY");
        std::env::remove_var("OPENAI_API_KEY");

        let config = config.unwrap();
        assert_eq!(config.detection.window, 20);
        assert_eq!(config.detection.policy, AggregationPolicy::PriorityStop);
        assert_eq!(
            config
                .enrichment
                .openai
                .api_key
                .as_ref()
                .unwrap()
                .expose_secret()
                .as_ref(),
            "sk-test"
        );
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var("PII_DETECTION_WINDOW", "wide");
        let result = load_config("definitely-not-here.toml");
        std::env::remove_var("PII_DETECTION_WINDOW");
        assert!(matches!(result, Err(PiiError::Configuration(_))));
    }

    #[test]
    fn test_validation_failure() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[detection]\nwindow = 5\noverlap = 5\n").unwrap();
        file.flush().unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("window"));
    }
}
