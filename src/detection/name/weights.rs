//! Append-only token weight table
//!
//! The table maps normalized tokens (lower-cased, diacritics stripped) to a
//! signed weight. It is loaded lazily on first use and only grows: a token
//! that already has a weight keeps it forever, both in memory and on disk.
//!
//! Persistence is a `token,weight` CSV. Writers hold a lock while they re-read
//! the file, adopt the stored weight for every token already on disk and
//! append only the new rows, so concurrent additions from other writers are
//! never clobbered and memory agrees with disk.

use crate::detection::text::normalize_token;
use crate::domain::{PiiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

/// Institutional and subject terms that never form a personal name
pub const INSTITUTIONAL_TOKENS: &[&str] = &[
    "concurso",
    "edital",
    "protocolo",
    "processo",
    "prefeitura",
    "secretaria",
    "governo",
    "departamento",
    "diretoria",
    "coordenacao",
    "ministerio",
    "instituto",
    "universidade",
    "hospital",
    "escola",
    "bairro",
    "rua",
    "avenida",
    "setor",
];

/// Weight seeded for institutional terms once a table has been loaded
pub const INSTITUTIONAL_WEIGHT: f64 = -0.6;

#[derive(Debug, Serialize, Deserialize)]
struct WeightRow {
    token: String,
    weight: Option<f64>,
}

/// True for normalized tokens in [`INSTITUTIONAL_TOKENS`]
pub fn is_institutional(normalized: &str) -> bool {
    INSTITUTIONAL_TOKENS.contains(&normalized)
}

/// Shared token weight table
///
/// Pass it around as `Arc<WeightStore>`; all methods take `&self`.
pub struct WeightStore {
    path: Option<PathBuf>,
    table: OnceLock<RwLock<HashMap<String, f64>>>,
    write_lock: Mutex<()>,
}

impl WeightStore {
    /// Store backed by a CSV file, loaded on first access
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            table: OnceLock::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// In-memory store with initial contents, never persisted
    pub fn in_memory(weights: HashMap<String, f64>) -> Self {
        let table = weights
            .into_iter()
            .map(|(token, weight)| (normalize_token(&token), weight))
            .collect();
        let cell = OnceLock::new();
        let _ = cell.set(RwLock::new(table));
        Self {
            path: None,
            table: cell,
            write_lock: Mutex::new(()),
        }
    }

    /// Empty in-memory store (heuristic mode until something is merged)
    pub fn empty() -> Self {
        Self::in_memory(HashMap::new())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn table(&self) -> &RwLock<HashMap<String, f64>> {
        self.table.get_or_init(|| {
            let weights = match &self.path {
                Some(path) => load_table(path),
                None => HashMap::new(),
            };
            RwLock::new(weights)
        })
    }

    /// Weight for a token, normalizing it first
    pub fn weight(&self, token: &str) -> Option<f64> {
        let key = normalize_token(token);
        self.table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.weight(token).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Adds new weights, keeping every existing entry untouched
    ///
    /// Tokens another writer already stored take the stored weight. Returns
    /// the tokens this call added. An unreadable file fails before the
    /// in-memory table changes; a failed append is returned after it.
    pub fn merge(&self, discovered: HashMap<String, f64>) -> Result<Vec<String>> {
        if discovered.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let on_disk = match &self.path {
            Some(path) if path.exists() => read_rows(path)?,
            _ => HashMap::new(),
        };

        let mut added = Vec::new();
        {
            let mut table = self.table().write().unwrap_or_else(PoisonError::into_inner);
            for (token, weight) in discovered {
                let key = normalize_token(&token);
                if key.is_empty() || !weight.is_finite() || table.contains_key(&key) {
                    continue;
                }
                match on_disk.get(&key) {
                    Some(stored) => {
                        tracing::debug!(token = %key, "Token stored by another writer; adopting its weight");
                        table.insert(key, *stored);
                    }
                    None => {
                        table.insert(key.clone(), weight);
                        added.push((key, weight));
                    }
                }
            }
        }

        if added.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(path) = &self.path {
            append_rows(path, &added)?;
        }

        tracing::debug!(added = added.len(), "Merged new token weights");
        Ok(added.into_iter().map(|(token, _)| token).collect())
    }
}

/// Reads the table; a missing or unreadable file yields an empty table
fn load_table(path: &Path) -> HashMap<String, f64> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Token weight file not found; name detection will use heuristics only"
        );
        return HashMap::new();
    }

    match read_rows(path) {
        Ok(mut weights) => {
            for token in INSTITUTIONAL_TOKENS {
                weights
                    .entry((*token).to_string())
                    .or_insert(INSTITUTIONAL_WEIGHT);
            }
            tracing::info!(
                path = %path.display(),
                tokens = weights.len(),
                "Token weights loaded"
            );
            weights
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not read token weight file; name detection will use heuristics only"
            );
            HashMap::new()
        }
    }
}

fn read_rows(path: &Path) -> Result<HashMap<String, f64>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut weights = HashMap::new();
    for row in reader.deserialize::<WeightRow>() {
        let row = row?;
        let key = normalize_token(&row.token);
        if key.is_empty() {
            continue;
        }
        if let Some(weight) = row.weight {
            // First occurrence wins so later duplicates cannot override.
            weights.entry(key).or_insert(weight);
        }
    }
    Ok(weights)
}

/// True when the file is non-empty and its last byte is not a newline
fn needs_line_break(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn append_rows(path: &Path, rows: &[(String, f64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            PiiError::Io(format!(
                "Failed to open token weight file {}: {e}",
                path.display()
            ))
        })?;
    let write_header = file.metadata()?.len() == 0;
    if needs_line_break(&mut file)? {
        file.write_all(b"\n")?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if write_header {
        writer.write_record(["token", "weight"])?;
    }
    for (token, weight) in rows {
        writer.write_record([token.as_str(), &weight.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
