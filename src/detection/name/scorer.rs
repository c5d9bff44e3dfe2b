//! Weighted-token decision rules for personal names
//!
//! A candidate is a short run of words. Connector words ("da", "de", ...) are
//! ignored; the remaining content tokens are looked up in the weight table,
//! unknown ones are first offered to the enrichment pipeline, and the summed
//! weights decide.

use super::enrichment::EnrichmentPipeline;
use super::weights::{is_institutional, WeightStore};
use crate::config::NameConfig;
use crate::detection::text::normalize_token;
use crate::domain::Result;
use regex::Regex;
use std::sync::Arc;

/// Letters (accented included), then letters, apostrophes or hyphens
pub const NAME_TOKEN: &str = r"[A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ'-]{1,}";

/// Words that join name parts without being scored
pub const CONNECTORS: [&str; 6] = ["da", "de", "do", "dos", "das", "e"];

/// First tokens that never open a personal name
pub const BLOCKED_OPENERS: [&str; 1] = ["lei"];

/// Decision thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameThresholds {
    pub min_multi: f64,
    pub min_single: f64,
    pub max_single_tokens: usize,
    pub max_fallback_tokens: usize,
    pub min_single_len: usize,
}

impl Default for NameThresholds {
    fn default() -> Self {
        Self::from(&NameConfig::default())
    }
}

impl From<&NameConfig> for NameThresholds {
    fn from(config: &NameConfig) -> Self {
        Self {
            min_multi: config.min_multi,
            min_single: config.min_single,
            max_single_tokens: config.max_single_tokens,
            max_fallback_tokens: config.max_fallback_tokens,
            min_single_len: config.min_single_len,
        }
    }
}

pub fn is_connector(normalized: &str) -> bool {
    CONNECTORS.contains(&normalized)
}

pub struct NameScorer {
    enrichment: Arc<EnrichmentPipeline>,
    thresholds: NameThresholds,
    token: Regex,
}

impl NameScorer {
    pub fn new(enrichment: Arc<EnrichmentPipeline>, thresholds: NameThresholds) -> Result<Self> {
        Ok(Self {
            enrichment,
            thresholds,
            token: Regex::new(NAME_TOKEN)?,
        })
    }

    pub fn thresholds(&self) -> &NameThresholds {
        &self.thresholds
    }

    pub fn store(&self) -> &WeightStore {
        self.enrichment.store()
    }

    /// Non-connector tokens in order, as `(raw, normalized)`
    pub fn content_tokens<'a>(&self, text: &'a str) -> Vec<(&'a str, String)> {
        self.token
            .find_iter(text)
            .map(|m| (m.as_str(), normalize_token(m.as_str())))
            .filter(|(_, normalized)| !is_connector(normalized))
            .collect()
    }

    /// Prefix of `text` holding at most `max` content tokens
    pub fn truncate<'a>(&self, text: &'a str, max: usize) -> &'a str {
        let mut count = 0;
        for m in self.token.find_iter(text) {
            if is_connector(&normalize_token(m.as_str())) {
                continue;
            }
            count += 1;
            if count == max {
                return &text[..m.end()];
            }
        }
        text
    }

    /// Resolves unknown tokens through the enrichment pipeline
    async fn enrich_unknown(&self, context: &str, tokens: &[(&str, String)]) {
        let store = self.store();
        let unknown: Vec<String> = tokens
            .iter()
            .filter(|(_, normalized)| !store.contains(normalized))
            .map(|(raw, _)| (*raw).to_string())
            .collect();
        if !unknown.is_empty() {
            self.enrichment.enrich(context, &unknown).await;
        }
    }

    /// Multi-token rule
    pub async fn is_name(&self, candidate: &str) -> bool {
        let tokens = self.content_tokens(candidate);
        if tokens.len() < 2 {
            return false;
        }
        if BLOCKED_OPENERS.contains(&tokens[0].1.as_str()) {
            return false;
        }

        self.enrich_unknown(candidate, &tokens).await;
        let normalized: Vec<&str> = tokens.iter().map(|(_, n)| n.as_str()).collect();
        self.decide(&normalized)
    }

    /// Score rule over normalized content tokens, without enrichment
    pub fn decide(&self, tokens: &[&str]) -> bool {
        let store = self.store();
        let t = &self.thresholds;

        if store.is_empty() {
            if tokens.iter().any(|token| is_institutional(token)) {
                return false;
            }
            return tokens.len() <= t.max_fallback_tokens;
        }

        let weights: Vec<f64> = tokens
            .iter()
            .map(|token| store.weight(token).unwrap_or(0.0))
            .collect();
        let score: f64 = weights.iter().sum();
        let pos_hits = weights.iter().filter(|w| **w > 0.0).count();

        if score <= 0.0 {
            return false;
        }
        if pos_hits >= 2 && score >= t.min_multi {
            return true;
        }
        pos_hits >= 1 && score >= t.min_single && tokens.len() <= t.max_single_tokens
    }

    /// Single-token rule, for a name right after an explicit label
    pub fn is_single_name(&self, candidate: &str) -> bool {
        let tokens = self.content_tokens(candidate);
        let [(_, token)] = tokens.as_slice() else {
            return false;
        };
        if is_institutional(token) {
            return false;
        }
        match self.store().weight(token) {
            Some(weight) => weight > 0.0,
            None => token.chars().count() >= self.thresholds.min_single_len,
        }
    }

    /// True when the first content token is a known (or discovered) name
    pub async fn opens_with_name(&self, candidate: &str) -> bool {
        let tokens = self.content_tokens(candidate);
        let Some(first) = tokens.first() else {
            return false;
        };
        if is_institutional(&first.1) || BLOCKED_OPENERS.contains(&first.1.as_str()) {
            return false;
        }
        self.enrich_unknown(candidate, &tokens[..1]).await;
        self.store().weight(&first.1).is_some_and(|w| w > 0.0)
    }
}
