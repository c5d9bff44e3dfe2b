//! Result type alias backed by [`PiiError`]

use super::errors::PiiError;

/// Result type alias for classifier operations
///
/// # Examples
///
/// ```
/// use pii_detector::domain::result::Result;
/// use pii_detector::domain::errors::PiiError;
///
/// fn failing_function() -> Result<()> {
///     Err(PiiError::InputShape("missing column 'ID'".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PiiError>;
