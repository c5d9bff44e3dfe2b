//! Integration tests for logging functionality
//!
//! The global subscriber can be installed once per process, so a single test
//! installs it and the others only exercise failure paths that return early.

use pii_detector::config::LoggingConfig;
use pii_detector::detection::name::WeightStore;
use pii_detector::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_settings_fail_before_install() {
    let config = LoggingConfig {
        local_enabled: true,
        local_path: "unused".to_string(),
        local_rotation: "weekly".to_string(),
    };
    assert!(init_logging("info", &config).is_err());
    assert!(init_logging("chatty", &LoggingConfig::default()).is_err());
}

#[test]
fn test_file_layer_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.is_dir());

    // a missing weight table is reported at warn level by the library
    let store = WeightStore::open(temp_dir.path().join("absent.csv"));
    assert!(store.is_empty());
    drop(guard);

    let contents = std::fs::read_to_string(log_path.join("pii-detector.log")).unwrap();
    let warning = contents
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|event| {
            event["fields"]["message"]
                .as_str()
                .is_some_and(|m| m.contains("Token weight file not found"))
        })
        .expect("warning missing from log file");
    assert_eq!(warning["level"], "WARN");
}
