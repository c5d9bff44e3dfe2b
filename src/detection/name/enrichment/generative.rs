//! Generative-model token weighting
//!
//! The model sees the surrounding text and the unknown tokens and answers a
//! JSON object mapping each token to a weight in `[-1, 1]`. Non-numeric
//! values are ignored and numbers outside the range are clamped.

use super::TokenClassifier;
use crate::adapters::openai::{OpenAiClient, SOURCE};
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

const SYSTEM_PROMPT: &str = "Você avalia se palavras de um pedido de acesso à informação são nomes de pessoas. \
Responda somente com um objeto JSON cujas chaves são os tokens recebidos e cujos valores são pesos entre -1 e 1: \
positivos para nomes ou sobrenomes de pessoas, negativos para termos institucionais, geográficos ou de assunto.";

pub struct GenerativeClassifier {
    client: OpenAiClient,
}

impl GenerativeClassifier {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

fn user_prompt(context: &str, tokens: &[String]) -> String {
    format!(
        "Texto:\n{context}\n\nTokens desconhecidos: {}\n\nExemplo de resposta: {{\"ana\": 0.9, \"edital\": -0.8}}",
        tokens.join(", ")
    )
}

/// Keeps numeric answers, clamped to `[-1, 1]`
pub fn weights_from_reply(reply: Map<String, Value>) -> HashMap<String, f64> {
    reply
        .into_iter()
        .filter_map(|(token, value)| {
            value
                .as_f64()
                .filter(|w| w.is_finite())
                .map(|w| (token, w.clamp(-1.0, 1.0)))
        })
        .collect()
}

#[async_trait]
impl TokenClassifier for GenerativeClassifier {
    fn source(&self) -> &str {
        SOURCE
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn classify(&self, context: &str, tokens: &[String]) -> Result<HashMap<String, f64>> {
        let reply = self
            .client
            .complete_json(SYSTEM_PROMPT, &user_prompt(context, tokens))
            .await?;
        Ok(weights_from_reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, OpenAiConfig};
    use serde_json::json;

    #[test]
    fn test_weights_from_reply_filters_and_clamps() {
        let reply = json!({
            "ana": 0.9,
            "edital": -3,
            "talvez": "sim",
            "ok": null
        });
        let Value::Object(map) = reply else {
            unreachable!()
        };
        let weights = weights_from_reply(map);
        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get("ana"), Some(&0.9));
        assert_eq!(weights.get("edital"), Some(&-1.0));
    }

    #[test]
    fn test_user_prompt_lists_tokens() {
        let prompt = user_prompt("Att. Jurema", &["Jurema".to_string(), "Att".to_string()]);
        assert!(prompt.contains("Att. Jurema"));
        assert!(prompt.contains("Jurema, Att"));
    }

    #[tokio::test]
    async fn test_classify_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "choices": [{ "message": { "content": "{\"jurema\": 0.8}" } }]
        });
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = OpenAiClient::new(&OpenAiConfig {
            enabled: true,
            api_key: Some(secret_string("sk".to_string())),
            base_url: server.url(),
            max_retries: 0,
            ..OpenAiConfig::default()
        })
        .unwrap();
        let weights = GenerativeClassifier::new(client)
            .classify("Att. Jurema", &["Jurema".to_string()])
            .await
            .unwrap();
        assert_eq!(weights.get("jurema"), Some(&0.8));
    }
}
