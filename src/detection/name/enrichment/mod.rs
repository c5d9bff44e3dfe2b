//! Token enrichment for the name scorer
//!
//! Unknown tokens are offered to an ordered list of [`TokenClassifier`]s. The
//! first classifier that returns any weight wins; its weights are merged into
//! the shared [`WeightStore`] and nothing further is consulted. Classifier
//! failures are logged and treated as "no result".
//!
//! Concurrent requests for the same unknown token are de-duplicated: the first
//! caller runs the classifiers, later callers wait for it to finish and then
//! read the store.

pub mod generative;
pub mod genderize;
pub mod lexicon;

pub use generative::GenerativeClassifier;
pub use genderize::GenderizeClassifier;
pub use lexicon::LexiconClassifier;

use super::weights::WeightStore;
use crate::detection::text::normalize_token;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// A source of token weights
#[async_trait]
pub trait TokenClassifier: Send + Sync {
    /// Name used in logs and reports
    fn source(&self) -> &str;

    /// Remote sources send tokens off the machine
    fn is_remote(&self) -> bool {
        false
    }

    /// Weights for the tokens this source recognizes, keyed by normalized token
    ///
    /// `context` is the text the tokens came from; `tokens` are the raw
    /// (un-normalized) unknown tokens.
    async fn classify(&self, context: &str, tokens: &[String]) -> Result<HashMap<String, f64>>;
}

/// Ordered enrichment sources over a shared weight store
pub struct EnrichmentPipeline {
    classifiers: Vec<Arc<dyn TokenClassifier>>,
    store: Arc<WeightStore>,
    in_flight: Mutex<HashMap<String, watch::Receiver<bool>>>,
    announced: Mutex<BTreeSet<String>>,
}

/// Releases claimed tokens even if the owning future is dropped
struct Claim<'a> {
    pipeline: &'a EnrichmentPipeline,
    tokens: Vec<String>,
    done: watch::Sender<bool>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .pipeline
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for token in &self.tokens {
            in_flight.remove(token);
        }
        let _ = self.done.send(true);
    }
}

impl EnrichmentPipeline {
    pub fn new(store: Arc<WeightStore>, classifiers: Vec<Arc<dyn TokenClassifier>>) -> Self {
        Self {
            classifiers,
            store,
            in_flight: Mutex::new(HashMap::new()),
            announced: Mutex::new(BTreeSet::new()),
        }
    }

    /// Pipeline with no sources
    pub fn disabled(store: Arc<WeightStore>) -> Self {
        Self::new(store, Vec::new())
    }

    pub fn store(&self) -> &Arc<WeightStore> {
        &self.store
    }

    pub fn is_enabled(&self) -> bool {
        !self.classifiers.is_empty()
    }

    /// Remote sources that have been consulted so far
    pub fn remote_sources_used(&self) -> Vec<String> {
        self.announced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn announce(&self, classifier: &dyn TokenClassifier) {
        if !classifier.is_remote() {
            return;
        }
        let mut announced = self.announced.lock().unwrap_or_else(PoisonError::into_inner);
        if announced.insert(classifier.source().to_string()) {
            tracing::warn!(
                source = classifier.source(),
                "External lookup enabled; use only with synthetic data"
            );
        }
    }

    /// Resolves unknown tokens, returning how many new weights were stored
    pub async fn enrich(&self, context: &str, tokens: &[String]) -> usize {
        if self.classifiers.is_empty() {
            return 0;
        }

        // Split into tokens we resolve ourselves and tokens someone else is resolving.
        let mut owned: Vec<(String, String)> = Vec::new();
        let mut waiting: Vec<watch::Receiver<bool>> = Vec::new();
        let (done_tx, done_rx) = watch::channel(false);
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let mut seen = HashSet::new();
            for raw in tokens {
                let key = normalize_token(raw);
                if key.is_empty() || !seen.insert(key.clone()) || self.store.contains(&key) {
                    continue;
                }
                match in_flight.get(&key) {
                    Some(rx) => waiting.push(rx.clone()),
                    None => {
                        in_flight.insert(key.clone(), done_rx.clone());
                        owned.push((key, raw.clone()));
                    }
                }
            }
        }

        let mut added = 0;
        if !owned.is_empty() {
            let claim = Claim {
                pipeline: self,
                tokens: owned.iter().map(|(key, _)| key.clone()).collect(),
                done: done_tx,
            };
            let raw_tokens: Vec<String> = owned.iter().map(|(_, raw)| raw.clone()).collect();
            added = self.run_classifiers(context, &raw_tokens, &claim.tokens).await;
            drop(claim);
        }

        for mut rx in waiting {
            // A closed channel means the owner is gone; the store is final either way.
            let _ = rx.wait_for(|done| *done).await;
        }

        added
    }

    async fn run_classifiers(&self, context: &str, raw: &[String], keys: &[String]) -> usize {
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();

        for classifier in &self.classifiers {
            self.announce(classifier.as_ref());

            let weights = match classifier.classify(context, raw).await {
                Ok(weights) => weights,
                Err(e) => {
                    tracing::warn!(
                        source = classifier.source(),
                        error = %e,
                        "Token enrichment failed; continuing without it"
                    );
                    continue;
                }
            };

            let weights: HashMap<String, f64> = weights
                .into_iter()
                .map(|(token, weight)| (normalize_token(&token), weight))
                .filter(|(token, weight)| wanted.contains(token.as_str()) && weight.is_finite())
                .collect();
            if weights.is_empty() {
                continue;
            }

            tracing::debug!(
                source = classifier.source(),
                tokens = weights.len(),
                "Token weights discovered"
            );
            return match self.store.merge(weights) {
                Ok(added) => added.len(),
                Err(e) => {
                    tracing::warn!(
                        source = classifier.source(),
                        error = %e,
                        "Could not persist token weights; keeping them in memory"
                    );
                    0
                }
            };
        }

        0
    }
}
