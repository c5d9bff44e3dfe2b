//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output with an `EnvFilter`
//! - optional JSON file output with rotation
//!
//! # Example
//!
//! ```no_run
//! use pii_detector::logging::init_logging;
//! use pii_detector::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(records = 10, "Classification started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use pii_detector::log_error_with_context;
/// use pii_detector::domain::PiiError;
///
/// let error = PiiError::InputShape("missing column 'ID'".to_string());
/// log_error_with_context!(&error, "Failed to load input");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
