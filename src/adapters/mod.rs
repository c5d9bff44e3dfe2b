//! Adapters for external collaborators
//!
//! - [`tabular`]: delimited-text input and classified output
//! - [`openai`]: OpenAI-compatible chat completions (token weights, record review)
//! - [`genderize`]: Genderize.io first-name lookups
//! - [`retry`]: bounded exponential backoff shared by the HTTP clients

pub mod genderize;
pub mod openai;
pub mod retry;
pub mod tabular;

use crate::detection::text::preview;
use crate::domain::PiiError;
use reqwest::StatusCode;

/// Maps an unsuccessful HTTP status to an error
///
/// Throttling and server errors are transient and retried; any other status
/// means the request itself was refused.
pub(crate) fn status_error(source: &str, status: StatusCode, body: &str) -> PiiError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        PiiError::enrichment(
            source,
            format!("HTTP {status}: {}", preview(body, 200)),
        )
    } else {
        tracing::debug!(source = source, status = status.as_u16(), body = %preview(body, 200), "Request rejected");
        PiiError::Rejected {
            source_name: source.to_string(),
            status: status.as_u16(),
        }
    }
}
