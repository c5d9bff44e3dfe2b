//! Domain error types
//!
//! Fatal errors (input shape, configuration) surface through [`PiiError`].
//! Enrichment and malformed-response failures are also modelled here so the
//! adapters can report them, but the name scorer absorbs them and never lets
//! them abort a batch.

use thiserror::Error;

/// Main error type for the classifier
#[derive(Debug, Error)]
pub enum PiiError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Fragment window must be strictly larger than the overlap
    #[error("Invalid fragment configuration: window ({window}) must be greater than overlap ({overlap})")]
    InvalidFragmentConfig { window: usize, overlap: usize },

    /// Required input columns or fields are missing
    #[error("Input error: {0}")]
    InputShape(String),

    /// A column expected by the aggregation order is absent
    #[error("Missing expected column '{0}'; run the detectors first")]
    MissingColumn(String),

    /// A detector pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(String),

    /// External enrichment call failed (network, status, timeout)
    #[error("Enrichment error ({source_name}): {message}")]
    Enrichment {
        source_name: String,
        message: String,
    },

    /// External service refused the request (authentication, quota, bad request)
    #[error("Request rejected by {source_name} with HTTP {status}")]
    Rejected { source_name: String, status: u16 },

    /// External service answered with something we could not interpret
    #[error("Malformed response from {source_name}: {message}")]
    MalformedResponse {
        source_name: String,
        message: String,
    },

    /// Evaluation input problems
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl PiiError {
    /// Builds an enrichment error for the given source
    pub fn enrichment(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        PiiError::Enrichment {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Builds a malformed-response error for the given source
    pub fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        PiiError::MalformedResponse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// True for errors that must stop processing before any detection runs
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PiiError::Configuration(_)
                | PiiError::InvalidFragmentConfig { .. }
                | PiiError::InputShape(_)
                | PiiError::MissingColumn(_)
                | PiiError::Pattern(_)
        )
    }

    /// Process exit code for a command that fails with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PiiError::InputShape(_) | PiiError::Evaluation(_) | PiiError::Io(_) => 1,
            PiiError::Configuration(_)
            | PiiError::InvalidFragmentConfig { .. }
            | PiiError::MissingColumn(_)
            | PiiError::Pattern(_) => 2,
            _ => 5,
        }
    }
}

impl From<std::io::Error> for PiiError {
    fn from(err: std::io::Error) -> Self {
        PiiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PiiError {
    fn from(err: serde_json::Error) -> Self {
        PiiError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PiiError {
    fn from(err: csv::Error) -> Self {
        PiiError::Serialization(format!("CSV error: {err}"))
    }
}

impl From<toml::de::Error> for PiiError {
    fn from(err: toml::de::Error) -> Self {
        PiiError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<regex::Error> for PiiError {
    fn from(err: regex::Error) -> Self {
        PiiError::Pattern(err.to_string())
    }
}

impl From<fancy_regex::Error> for PiiError {
    fn from(err: fancy_regex::Error) -> Self {
        PiiError::Pattern(err.to_string())
    }
}
