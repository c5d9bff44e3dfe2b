//! Integration tests for configuration loading and validation

use pii_detector::config::load_config;
use pii_detector::detection::AggregationPolicy;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Environment variables are process-wide.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "PII_APPLICATION_LOG_LEVEL",
        "PII_APPLICATION_WORKERS",
        "PII_DETECTION_POLICY",
        "PII_DETECTION_WINDOW",
        "PII_LLM_ENABLED",
        "OPENAI_API_KEY",
        "GENDERIZE_API_KEY",
        "TEST_GENDERIZE_KEY",
    ] {
        std::env::remove_var(var);
    }
}

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_GENDERIZE_KEY", "gz-from-env");

    let file = toml_file(
        r#"
[application]
log_level = "debug"
workers = 2

[detection]
policy = "priority-label"
window = 20
overlap = 5
email_deobfuscation = false
max_rows = 500

[name]
weights_path = "/tmp/pesos.csv"
min_multi = 0.8

[enrichment]
lexicon_files = ["nomes_extra.txt"]

[enrichment.genderize]
enabled = true
# comments may mention ${UNSET_VARIABLE} freely
api_key = "${TEST_GENDERIZE_KEY}"

[output]
evidence_path = "saida/evidencias.jsonl"
hash_spans = true
report_format = "json"

[logging]
local_enabled = true
local_path = "/tmp/pii-logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path());
    cleanup_env_vars();
    let config = config.unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.workers, 2);
    assert_eq!(config.detection.policy, AggregationPolicy::PriorityLabel);
    assert_eq!((config.detection.window, config.detection.overlap), (20, 5));
    assert!(!config.detection.email_deobfuscation);
    assert_eq!(config.detection.max_rows, Some(500));
    assert_eq!(config.name.weights_path, "/tmp/pesos.csv");
    assert_eq!(config.name.min_multi, 0.8);
    assert_eq!(config.name.min_single, 1.1);
    assert_eq!(config.enrichment.lexicon_files, vec!["nomes_extra.txt".to_string()]);
    assert_eq!(
        config
            .enrichment
            .genderize
            .api_key
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_ref(),
        "gz-from-env"
    );
    assert!(config.output.hash_spans);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_environment_overrides_file_values() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let file = toml_file("[detection]\npolicy = \"evidence\"\nwindow = 30\n");

    std::env::set_var("PII_DETECTION_POLICY", "priority_stop");
    std::env::set_var("PII_DETECTION_WINDOW", "40");
    std::env::set_var("PII_APPLICATION_WORKERS", "3");
    let config = load_config(file.path());
    cleanup_env_vars();

    let config = config.unwrap();
    assert_eq!(config.detection.policy, AggregationPolicy::PriorityStop);
    assert_eq!(config.detection.window, 40);
    assert_eq!(config.application.workers, 3);
}

#[test]
fn test_llm_without_key_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let file = toml_file("[llm]\nenabled = true\n");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("validation failed"), "{err}");

    std::env::set_var("OPENAI_API_KEY", "sk-env");
    let config = load_config(file.path());
    cleanup_env_vars();
    assert!(config.unwrap().llm.enabled);
}

#[test]
fn test_unset_variable_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::remove_var("PII_SURELY_UNSET");
    let file = toml_file("[enrichment.openai]\napi_key = \"${PII_SURELY_UNSET}\"\n");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("PII_SURELY_UNSET"), "{err}");
}

#[test]
fn test_malformed_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let file = toml_file("[detection\nwindow = ");
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_reuse_existing_with_evidence_policy_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let file = toml_file("[detection]\nreuse_existing = true\n");
    assert!(load_config(file.path()).is_err());
}
