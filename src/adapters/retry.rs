//! Bounded retry with exponential backoff for external calls

use crate::domain::{PiiError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry settings for one external service
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// No retries, no delay
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt` (1-based), with up to 10% jitter
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay_ms as f64);
        let jitter = if capped >= 10.0 {
            rand::thread_rng().gen_range(0.0..capped * 0.1)
        } else {
            0.0
        };
        Duration::from_millis((capped + jitter).min(self.max_delay_ms as f64) as u64)
    }
}

/// Only transport-level failures are worth another attempt
fn is_retryable(error: &PiiError) -> bool {
    matches!(error, PiiError::Enrichment { .. })
}

/// Runs `operation`, retrying transport failures up to `policy.max_retries` times
///
/// Malformed responses and other errors are returned immediately.
pub async fn retry_request<F, Fut, T>(source: &str, policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) || attempt >= policy.max_retries {
                    return Err(e);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt);

                tracing::warn!(
                    source = source,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying request after error"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
