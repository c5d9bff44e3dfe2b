//! Evaluation against a gold standard
//!
//! ```
//! use pii_detector::evaluation::ConfusionMatrix;
//!
//! let m = ConfusionMatrix::new(3, 1, 2, 0);
//! assert_eq!(m.precision(), 0.75);
//! assert!((m.recall() - 0.6).abs() < 1e-9);
//! ```

pub mod evaluator;
pub mod metrics;

pub use evaluator::{evaluate, EvaluationReport, LabelRow, LabelTable};
pub use metrics::{ConfusionMatrix, Metrics};
