//! Classification run orchestration
//!
//! The engine wires the weight store, the enrichment sources, the name
//! detector and the aggregator from configuration, then classifies records
//! with bounded concurrency. Output order always follows input order.

use super::cache::ResultCache;
use super::evidence_log::EvidenceLog;
use super::llm_review::LlmReviewer;
use super::report::ClassificationReport;
use crate::adapters::genderize::GenderizeClient;
use crate::adapters::openai::OpenAiClient;
use crate::config::PiiDetectorConfig;
use crate::detection::fragment::FragmentConfig;
use crate::detection::name::enrichment::genderize::GenderizeClassifier;
use crate::detection::name::enrichment::generative::GenerativeClassifier;
use crate::detection::name::enrichment::lexicon::LexiconClassifier;
use crate::detection::name::{
    EnrichmentPipeline, NameDetector, NameScorer, NameThresholds, TokenClassifier, WeightStore,
};
use crate::detection::Aggregator;
use crate::domain::{Classification, Record, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Classifications in input order plus the run report
#[derive(Debug)]
pub struct RunOutcome {
    pub classifications: Vec<Classification>,
    pub report: ClassificationReport,
}

/// Saves fetched verdicts when a run ends early
///
/// Covers fatal record errors and cancellation (the run future being
/// dropped). A completed run disarms it and saves explicitly.
struct VerdictCacheGuard<'a> {
    cache: Option<&'a ResultCache>,
}

impl<'a> VerdictCacheGuard<'a> {
    fn new(cache: Option<&'a ResultCache>) -> Self {
        Self { cache }
    }

    fn disarm(&mut self) -> Option<&'a ResultCache> {
        self.cache.take()
    }
}

impl Drop for VerdictCacheGuard<'_> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.take() {
            match cache.save() {
                Ok(()) => tracing::info!(entries = cache.len(), "Verdict cache saved after an interrupted run"),
                Err(e) => tracing::warn!(error = %e, "Failed to persist the verdict cache"),
            }
        }
    }
}

pub struct ClassificationEngine {
    aggregator: Aggregator,
    enrichment: Arc<EnrichmentPipeline>,
    reviewer: Option<LlmReviewer>,
    workers: usize,
    max_rows: Option<usize>,
    reuse_existing: bool,
}

/// Enrichment sources in precedence order
pub fn build_classifiers(config: &PiiDetectorConfig) -> Result<Vec<Arc<dyn TokenClassifier>>> {
    let enrichment = &config.enrichment;
    let mut classifiers: Vec<Arc<dyn TokenClassifier>> = Vec::new();

    if enrichment.lexicon {
        classifiers.push(Arc::new(LexiconClassifier::builtin(enrichment.name_weight)));
        for file in &enrichment.lexicon_files {
            classifiers.push(Arc::new(LexiconClassifier::from_file(
                file,
                enrichment.name_weight,
            )?));
        }
    }
    if enrichment.genderize.enabled {
        let client = GenderizeClient::new(&enrichment.genderize)?;
        classifiers.push(Arc::new(GenderizeClassifier::new(
            client,
            enrichment.name_weight,
        )));
    }
    if enrichment.openai.enabled {
        let client = OpenAiClient::new(&enrichment.openai)?;
        classifiers.push(Arc::new(GenerativeClassifier::new(client)));
    }
    Ok(classifiers)
}

impl ClassificationEngine {
    pub fn new(aggregator: Aggregator, enrichment: Arc<EnrichmentPipeline>) -> Self {
        Self {
            aggregator,
            enrichment,
            reviewer: None,
            workers: 1,
            max_rows: None,
            reuse_existing: false,
        }
    }

    /// Builds every component from configuration
    pub fn from_config(config: &PiiDetectorConfig) -> Result<Self> {
        let store = Arc::new(WeightStore::open(&config.name.weights_path));
        let enrichment = Arc::new(EnrichmentPipeline::new(
            store,
            build_classifiers(config)?,
        ));
        let scorer = NameScorer::new(enrichment.clone(), NameThresholds::from(&config.name))?;
        let fragments = FragmentConfig::new(config.detection.window, config.detection.overlap)?;
        let aggregator = Aggregator::new(
            config.detection.policy,
            fragments,
            NameDetector::new(scorer)?,
        )?
        .with_email_deobfuscation(config.detection.email_deobfuscation);

        let reviewer = if config.llm.enabled {
            let client = OpenAiClient::new(&config.enrichment.openai)?;
            let cache = Arc::new(ResultCache::open(&config.llm.cache_path));
            Some(LlmReviewer::new(
                client,
                cache,
                fragments,
                config.llm.max_fragments,
                config.llm.prompt_version.clone(),
            ))
        } else {
            None
        };

        let mut engine = Self::new(aggregator, enrichment)
            .with_workers(config.application.workers)
            .with_max_rows(config.detection.max_rows)
            .with_reuse_existing(config.detection.reuse_existing);
        engine.reviewer = reviewer;
        Ok(engine)
    }

    pub fn with_reviewer(mut self, reviewer: LlmReviewer) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_reuse_existing(mut self, reuse_existing: bool) -> Self {
        self.reuse_existing = reuse_existing;
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn weight_store(&self) -> &Arc<WeightStore> {
        self.enrichment.store()
    }

    /// Classifies one record, consulting the generative fallback when enabled
    pub async fn classify_one(&self, record: &Record) -> Result<Classification> {
        let classification = if self.reuse_existing {
            self.aggregator.classify_reusing(record).await?
        } else {
            self.aggregator.classify(record).await
        };
        Ok(match &self.reviewer {
            Some(reviewer) => reviewer.review(record, classification).await,
            None => classification,
        })
    }

    /// Classifies every record in order
    ///
    /// Records past the row limit get all-zero flags without running any
    /// detector. Each classification is written to `evidence` as it
    /// completes.
    pub async fn run(&self, records: &[Record], evidence: Option<&EvidenceLog>) -> Result<RunOutcome> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let weights_before = self.weight_store().len();
        let limit = self.max_rows.unwrap_or(usize::MAX).min(records.len());
        let (active, skipped) = records.split_at(limit);

        tracing::info!(
            run_id = %run_id,
            records = records.len(),
            skipped = skipped.len(),
            policy = %self.aggregator.policy(),
            workers = self.workers,
            "Starting classification"
        );

        let mut report = ClassificationReport::new().with_run_id(run_id);
        let mut verdict_guard =
            VerdictCacheGuard::new(self.reviewer.as_ref().map(|r| &**r.cache()));
        let mut classifications: Vec<Classification> = stream::iter(active)
            .map(|record| self.classify_one(record))
            .buffered(self.workers)
            .try_collect()
            .await?;

        for classification in &classifications {
            report.add(classification);
        }
        for record in skipped {
            classifications.push(Classification::skipped(record.id.clone()));
            report.add_skipped();
        }

        if let Some(log) = evidence {
            for classification in &classifications {
                log.record(classification)?;
            }
            log.flush()?;
        }

        if let Some(cache) = verdict_guard.disarm() {
            if let Err(e) = cache.save() {
                tracing::warn!(error = %e, "Failed to persist the verdict cache");
                report.add_warning(format!("Verdict cache not saved: {e}"));
            }
        }

        report.external_sources = self.enrichment.remote_sources_used();
        report.new_weights = self.weight_store().len().saturating_sub(weights_before);
        let report = report.with_duration(start.elapsed());

        tracing::info!(
            run_id = %run_id,
            processed = report.records_processed,
            sensitive = report.sensitive_records,
            elapsed_ms = report.elapsed_ms,
            "Classification finished"
        );
        Ok(RunOutcome {
            classifications,
            report,
        })
    }
}
