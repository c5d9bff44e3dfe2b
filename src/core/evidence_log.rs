//! JSONL evidence log, one line per classified record

use super::digest::sha256_hex;
use crate::domain::{Classification, Evidence, FieldKind, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Serialize)]
struct EvidenceLine<'a> {
    id: &'a str,
    nao_publico: u8,
    detector_prioritario: Option<FieldKind>,
    flags: BTreeMap<&'static str, u8>,
    evidence: Vec<Evidence>,
    used_llm: bool,
}

/// Writes evidence lines to a file, truncating it on creation
///
/// With `hash_spans` every span is replaced by its SHA-256 digest so the log
/// never holds the matched personal data in clear text.
pub struct EvidenceLog {
    path: PathBuf,
    hash_spans: bool,
    writer: Mutex<BufWriter<File>>,
}

impl EvidenceLog {
    pub fn create(path: impl Into<PathBuf>, hash_spans: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            hash_spans,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, classification: &Classification) -> Result<()> {
        let evidence = classification
            .evidence
            .iter()
            .map(|e| {
                let mut e = e.clone();
                if self.hash_spans {
                    e.span = sha256_hex(&e.span);
                }
                e
            })
            .collect();
        let line = EvidenceLine {
            id: &classification.id,
            nao_publico: u8::from(classification.flags.nao_publico),
            detector_prioritario: classification.flags.detector_prioritario,
            flags: classification.flags.as_binary(),
            evidence,
            used_llm: classification.used_llm,
        };
        let json = serde_json::to_string(&line)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{json}")?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}
