//! OpenAI-compatible chat completion client
//!
//! Only JSON-mode completions are used: every caller asks for a JSON object
//! and treats anything else as "no result".

use super::retry::{retry_request, RetryPolicy};
use super::status_error;
use crate::config::{OpenAiConfig, SecretString};
use crate::detection::text::preview;
use crate::domain::{PiiError, Result};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub const SOURCE: &str = "OpenAI";

/// Characters of a rejected reply kept in the warning
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    retry: RetryPolicy,
}

impl OpenAiClient {
    /// Builds a client from the `[enrichment.openai]` section
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no API key is available or the HTTP
    /// client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PiiError::Configuration("OpenAI API key is not configured".to_string())
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)))
            .build()
            .map_err(|e| PiiError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            retry: RetryPolicy::new(
                config.max_retries,
                config.initial_delay_ms,
                config.max_delay_ms,
            ),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one system + user exchange and returns the reply as a JSON object
    ///
    /// # Errors
    ///
    /// Transport failures (after retries) surface as [`PiiError::Enrichment`],
    /// refused requests as [`PiiError::Rejected`], and replies that are not a
    /// JSON object as [`PiiError::MalformedResponse`].
    pub async fn complete_json(&self, system: &str, user: &str) -> Result<Map<String, Value>> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let content = retry_request(SOURCE, &self.retry, || async {
            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.expose_secret().as_ref())
                .json(&request)
                .send()
                .await
                .map_err(|e| PiiError::enrichment(SOURCE, e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(status_error(SOURCE, status, &body));
            }

            let parsed: ChatResponse = resp
                .json()
                .await
                .map_err(|e| PiiError::malformed(SOURCE, e.to_string()))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| PiiError::malformed(SOURCE, "empty completion"))
        })
        .await?;

        parse_json_object(&content)
    }
}

/// Parses a completion into a JSON object, warning with a short preview otherwise
pub fn parse_json_object(content: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            tracing::warn!(
                source = SOURCE,
                preview = %preview(content, PREVIEW_CHARS),
                "Completion is not a JSON object; ignoring"
            );
            Err(PiiError::malformed(SOURCE, "completion is not a JSON object"))
        }
    }
}
