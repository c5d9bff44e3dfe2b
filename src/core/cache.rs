//! Persistent cache for generative-model verdicts
//!
//! Entries are keyed by [`text_key`] and never expire. Every stored payload is
//! a JSON object stamped with a `timestamp` field. The backing file is a
//! single JSON object; a missing file starts empty and an unreadable one
//! starts empty with a warning.
//!
//! Saving re-reads the file under a lock and merges: keys written by another
//! process since the cache was opened are kept.

use super::digest::text_key;
use crate::domain::{PiiError, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// One cached payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Map<String, Value>,
}

impl CacheEntry {
    /// Decodes the payload into a typed value, ignoring the timestamp
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.payload.clone()))?)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.payload.get("timestamp").and_then(Value::as_str)
    }
}

pub struct ResultCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, Map<String, Value>>>,
    write_lock: Mutex<()>,
}

impl ResultCache {
    /// Opens the cache file, tolerating absence and corruption
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Cache file unreadable; starting empty");
            BTreeMap::new()
        });
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
            write_lock: Mutex::new(()),
        }
    }

    /// Cache that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, text: &str) -> Option<CacheEntry> {
        let key = text_key(text);
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).map(|payload| CacheEntry {
            key: key.clone(),
            payload: payload.clone(),
        })
    }

    /// Stores `payload` for `text`, replacing any in-memory entry
    ///
    /// # Errors
    ///
    /// Returns [`PiiError::Serialization`] when the payload does not
    /// serialize to a JSON object.
    pub fn set<T: Serialize>(&self, text: &str, payload: &T) -> Result<CacheEntry> {
        let Value::Object(mut payload) = serde_json::to_value(payload)? else {
            return Err(PiiError::Serialization(
                "cache payload must be a JSON object".to_string(),
            ));
        };
        payload.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        let key = text_key(text);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), payload.clone());
        Ok(CacheEntry { key, payload })
    }

    /// Writes the cache to disk, merging with what is already there
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut merged = match read_entries(path) {
            Ok(on_disk) => on_disk,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Overwriting unreadable cache file");
                BTreeMap::new()
            }
        };
        {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            for (key, payload) in entries.iter() {
                merged.insert(key.clone(), payload.clone());
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&merged)?)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), entries = merged.len(), "Cache saved");
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, Map<String, Value>>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}
