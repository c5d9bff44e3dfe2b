//! Detection pipeline: fragmentation, field detectors, name scoring and
//! aggregation.
//!
//! # Modules
//!
//! - [`text`] - tokenization and normalization helpers
//! - [`fragment`] - overlapping word windows
//! - [`detector`] - e-mail, CPF, phone, registration and address rules
//! - [`name`] - weighted-token name scorer with its weight store and enrichment
//! - [`binary`] - 0/1 coercion for externally supplied label columns
//! - [`aggregator`] - policies that turn field signals into one decision

pub mod aggregator;
pub mod binary;
pub mod detector;
pub mod fragment;
pub mod name;
pub mod text;

pub use aggregator::{aggregate_precomputed, AggregationPolicy, Aggregator};
pub use binary::{BinaryCoercer, BinaryValue};
pub use fragment::{fragment, Fragment, FragmentConfig};
pub use name::{NameDetector, NameScorer};
