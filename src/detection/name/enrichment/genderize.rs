//! Remote demographic lookup as a token classifier

use super::TokenClassifier;
use crate::adapters::genderize::{GenderizeClient, SOURCE};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Tokens the service recognizes as first names get a fixed positive weight
pub struct GenderizeClassifier {
    client: GenderizeClient,
    weight: f64,
}

impl GenderizeClassifier {
    pub fn new(client: GenderizeClient, weight: f64) -> Self {
        Self { client, weight }
    }
}

#[async_trait]
impl TokenClassifier for GenderizeClassifier {
    fn source(&self) -> &str {
        SOURCE
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn classify(&self, _context: &str, tokens: &[String]) -> Result<HashMap<String, f64>> {
        Ok(self
            .client
            .names_among(tokens)
            .await
            .into_iter()
            .map(|name| (name, self.weight))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, GenderizeConfig};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_names_get_the_configured_weight() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("name".into(), "Kauã".into()))
            .with_status(200)
            .with_body(r#"{"gender":"male","probability":0.93}"#)
            .create_async()
            .await;

        let client = GenderizeClient::new(&GenderizeConfig {
            enabled: true,
            api_key: Some(secret_string("gz".to_string())),
            base_url: server.url(),
            max_retries: 0,
            ..GenderizeConfig::default()
        })
        .unwrap();
        let classifier = GenderizeClassifier::new(client, 1.2);

        assert!(classifier.is_remote());
        let weights = classifier
            .classify("Kauã", &["Kauã".to_string()])
            .await
            .unwrap();
        assert_eq!(weights.get("kaua"), Some(&1.2));
    }
}
