//! Domain models and types.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Input records** ([`Record`])
//! - **Detection output** ([`DetectionFlags`], [`Evidence`], [`Classification`])
//! - **Field kinds** ([`FieldKind`]) with their fixed priority order
//! - **Error types** ([`PiiError`]) and the [`Result`] alias
//!
//! # Error Handling
//!
//! ```rust
//! use pii_detector::domain::{PiiError, Result};
//! use pii_detector::detection::fragment::FragmentConfig;
//!
//! fn example() -> Result<()> {
//!     let config = FragmentConfig::new(35, 12)?;
//!     assert_eq!(config.window(), 35);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod flags;
pub mod record;
pub mod result;

pub use errors::PiiError;
pub use flags::{Classification, DetectionFlags, Evidence, FieldKind};
pub use record::Record;
pub use result::Result;
