//! Genderize.io client
//!
//! A token counts as a personal name when the service assigns it a gender
//! with enough probability. Lookups are one request per distinct token.

use super::retry::{retry_request, RetryPolicy};
use super::status_error;
use crate::config::{GenderizeConfig, SecretString};
use crate::detection::text::normalize_token;
use crate::domain::{PiiError, Result};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

pub const SOURCE: &str = "Genderize.io";

#[derive(Debug, Deserialize)]
struct GenderizeReply {
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
}

pub struct GenderizeClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    min_probability: f64,
    retry: RetryPolicy,
}

impl GenderizeClient {
    /// # Errors
    ///
    /// Returns a configuration error when no API key is available
    pub fn new(config: &GenderizeConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PiiError::Configuration("Genderize API key is not configured".to_string())
        })?;
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PiiError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            min_probability: config.min_probability,
            retry: RetryPolicy::new(config.max_retries, 200, 1000),
        })
    }

    /// True when the service is confident the token is a first name
    pub async fn is_likely_name(&self, token: &str) -> Result<bool> {
        let reply: GenderizeReply = retry_request(SOURCE, &self.retry, || async {
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[("name", token), ("apikey", self.api_key.expose_secret().as_ref())])
                .send()
                .await
                .map_err(|e| PiiError::enrichment(SOURCE, e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(status_error(SOURCE, status, &body));
            }

            resp.json()
                .await
                .map_err(|e| PiiError::malformed(SOURCE, e.to_string()))
        })
        .await?;

        let gendered = matches!(reply.gender.as_deref(), Some("male") | Some("female"));
        Ok(gendered && reply.probability.unwrap_or(0.0) >= self.min_probability)
    }

    /// Looks up each distinct token and returns the normalized names found
    ///
    /// Failed lookups are logged and skipped.
    pub async fn names_among(&self, tokens: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for token in tokens {
            let key = normalize_token(token);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            match self.is_likely_name(token).await {
                Ok(true) => names.push(key),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(source = SOURCE, error = %e, "Name lookup failed");
                }
            }
        }
        names
    }
}
