//! Shared fixtures for integration tests

#![allow(dead_code)]

use pii_detector::config::PiiDetectorConfig;
use std::path::{Path, PathBuf};

/// Copies the bundled weight table into `dir` so runs can append to it
pub fn weights_copy(dir: &Path) -> PathBuf {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/name_weights.csv");
    let target = dir.join("name_weights.csv");
    std::fs::copy(source, &target).unwrap();
    target
}

/// Default configuration writing only under `dir`
pub fn config_in(dir: &Path) -> PiiDetectorConfig {
    let mut config = PiiDetectorConfig::default();
    config.name.weights_path = weights_copy(dir).display().to_string();
    config.llm.cache_path = dir.join("llm_cache.json").display().to_string();
    config
}

/// Reads a CSV written by the classifier into headers and rows
pub fn read_csv(path: &Path, delimiter: u8) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

pub fn column(headers: &[String], name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {name} in {headers:?}"))
}
