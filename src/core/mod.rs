//! Run orchestration around the detection pipeline.
//!
//! # Modules
//!
//! - [`engine`] - builds the pipeline from configuration and classifies records
//! - [`llm_review`] - generative-model fallback for records left clean
//! - [`cache`] - persistent verdict cache keyed by normalized text
//! - [`digest`] - SHA-256 helpers for cache keys and hashed spans
//! - [`evidence_log`] - JSONL evidence output
//! - [`report`] - per-run summary
//!
//! # Classification Workflow
//!
//! 1. **Load**: read the input table and build [`Record`](crate::domain::Record)s
//! 2. **Classify**: run the aggregator over each record, in parallel
//! 3. **Review** (optional): ask the generative model about clean records
//! 4. **Write**: classified table, evidence log and report
//!
//! # Example
//!
//! ```rust,no_run
//! use pii_detector::config::load_config;
//! use pii_detector::core::engine::ClassificationEngine;
//! use pii_detector::domain::Record;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pii-detector.toml")?;
//! let engine = ClassificationEngine::from_config(&config)?;
//!
//! let records = vec![Record::with_text("1", "Contato: exemplo@dominio.com")];
//! let outcome = engine.run(&records, None).await?;
//!
//! println!("Sensitive: {}", outcome.report.sensitive_records);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod digest;
pub mod engine;
pub mod evidence_log;
pub mod llm_review;
pub mod report;

pub use cache::{CacheEntry, ResultCache};
pub use engine::{ClassificationEngine, RunOutcome};
pub use evidence_log::EvidenceLog;
pub use report::ClassificationReport;
