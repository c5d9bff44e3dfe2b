//! Configuration management
//!
//! `pii-detector.toml` is optional: every setting has a default. Values may be
//! pulled from the environment with `${VAR_NAME}` and overridden with
//! `PII_<SECTION>_<KEY>` variables. API keys also fall back to the
//! conventional `OPENAI_API_KEY` and `GENDERIZE_API_KEY` variables.
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! workers = 8
//!
//! [detection]
//! policy = "evidence"
//! window = 35
//! overlap = 12
//!
//! [name]
//! weights_path = "data/name_weights.csv"
//!
//! [enrichment.genderize]
//! enabled = false
//! api_key = "${GENDERIZE_API_KEY}"
//!
//! [llm]
//! enabled = false
//! cache_path = "data/llm_cache.json"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pii_detector::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pii-detector.toml")?;
//! println!("Policy: {}", config.detection.policy);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DetectionConfig, EnrichmentConfig, GenderizeConfig, LlmConfig,
    LoggingConfig, NameConfig, OpenAiConfig, OutputConfig, PiiDetectorConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
