//! Local first-name lexicons
//!
//! The bundled list holds common Brazilian first names that are not also
//! ordinary Portuguese words. Extra lists can be loaded from plain-text files
//! with one name per line (`#` starts a comment).

use super::TokenClassifier;
use crate::detection::text::normalize_token;
use crate::domain::{PiiError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const BUILTIN_NAMES: &str = include_str!("../../../../data/first_names.txt");

pub struct LexiconClassifier {
    source: String,
    names: HashSet<String>,
    weight: f64,
}

impl LexiconClassifier {
    /// Parses a name list, normalizing every entry
    pub fn from_list(source: impl Into<String>, list: &str, weight: f64) -> Self {
        let names = list
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .map(normalize_token)
            .collect();
        Self {
            source: source.into(),
            names,
            weight,
        }
    }

    /// The bundled first-name list
    pub fn builtin(weight: f64) -> Self {
        Self::from_list("builtin-lexicon", BUILTIN_NAMES, weight)
    }

    /// A name list read from disk
    pub fn from_file(path: impl AsRef<Path>, weight: f64) -> Result<Self> {
        let path = path.as_ref();
        let list = std::fs::read_to_string(path).map_err(|e| {
            PiiError::Configuration(format!(
                "Failed to read name list {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_list(
            format!("lexicon:{}", path.display()),
            &list,
            weight,
        ))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.names.contains(&normalize_token(token))
    }
}

#[async_trait]
impl TokenClassifier for LexiconClassifier {
    fn source(&self) -> &str {
        &self.source
    }

    async fn classify(&self, _context: &str, tokens: &[String]) -> Result<HashMap<String, f64>> {
        Ok(tokens
            .iter()
            .map(|token| normalize_token(token))
            .filter(|token| self.names.contains(token))
            .map(|token| (token, self.weight))
            .collect())
    }
}
