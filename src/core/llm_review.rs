//! Generative-model second opinion for records the detectors left clean
//!
//! Only records with `nao_publico = 0` are reviewed. The most suspicious
//! fragments (ranked by PII keyword hits) go to the model, which answers
//! `{contains_pii, pii_types, evidence, confidence}`. Verdicts are cached by
//! normalized text together with the model and prompt version, and a cached
//! verdict is reused without a call. Concurrent reviews of texts sharing a
//! cache key wait for the first one instead of calling again. Any failure
//! keeps the deterministic result.

use super::cache::ResultCache;
use super::digest::text_key;
use crate::adapters::openai::{OpenAiClient, SOURCE};
use crate::detection::fragment::FragmentConfig;
use crate::domain::{Classification, Evidence, FieldKind, PiiError, Record, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Words that make a fragment worth sending
pub const SUSPECT_KEYWORDS: [&str; 9] = [
    "nome", "cpf", "rg", "telefone", "email", "rua", "avenida", "whats", "contato",
];

const SYSTEM_PROMPT: &str = "Você é um classificador de dados pessoais. Analise os fragmentos e responda apenas com JSON estrito. \
Retorne contains_pii=true somente se houver evidência explícita.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmEvidence {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub span: String,
    #[serde(default)]
    pub fragment_idx: usize,
}

/// Model answer, as cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmVerdict {
    #[serde(default)]
    pub contains_pii: bool,
    #[serde(default)]
    pub pii_types: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<LlmEvidence>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspectFragment {
    pub fragment_idx: usize,
    pub text: String,
}

/// Number of distinct suspect keywords contained in `fragment`
pub fn keyword_hits(fragment: &str) -> usize {
    let lower = fragment.to_lowercase();
    SUSPECT_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count()
}

/// Up to `max` non-empty fragments, most keyword hits first
///
/// Ties keep fragment order.
pub fn select_suspects(text: &str, config: &FragmentConfig, max: usize) -> Vec<SuspectFragment> {
    let mut scored: Vec<(usize, SuspectFragment)> = config
        .fragments(text)
        .filter(|fragment| !fragment.text.trim().is_empty())
        .map(|fragment| {
            (
                keyword_hits(fragment.text),
                SuspectFragment {
                    fragment_idx: fragment.index,
                    text: fragment.text.to_string(),
                },
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(max).map(|(_, f)| f).collect()
}

/// Maps a model PII type to a field
pub fn map_type(kind: &str) -> Option<FieldKind> {
    match kind.trim().to_lowercase().as_str() {
        "name" => Some(FieldKind::Name),
        "email" => Some(FieldKind::Email),
        "cpf" => Some(FieldKind::Cpf),
        "rg" => Some(FieldKind::Rg),
        "phone" => Some(FieldKind::Phone),
        _ => None,
    }
}

/// Applies a verdict to a deterministic classification
///
/// A verdict without PII or without evidence leaves the classification
/// untouched. Otherwise the mapped types are flagged and the aggregate
/// follows the mapped flags.
pub fn merge_verdict(mut classification: Classification, verdict: &LlmVerdict) -> Classification {
    if !verdict.contains_pii || verdict.evidence.is_empty() {
        return classification;
    }

    let flags = &mut classification.flags;
    let from_types = verdict.pii_types.iter().filter_map(|t| map_type(t));
    let from_evidence = verdict.evidence.iter().filter_map(|e| map_type(&e.kind));
    for kind in from_types.chain(from_evidence) {
        flags.set(kind, true);
    }
    flags.detector_prioritario = FieldKind::PRIORITY.into_iter().find(|k| flags.get(*k));
    flags.nao_publico = flags.detector_prioritario.is_some();

    classification.evidence.extend(verdict.evidence.iter().filter_map(|e| {
        map_type(&e.kind).map(|kind| Evidence::new(kind, e.span.clone(), e.fragment_idx))
    }));
    classification.used_llm = true;
    classification
}

fn user_prompt(suspects: &[SuspectFragment]) -> Result<String> {
    Ok(format!(
        "JSON esperado: {{\n  \"contains_pii\": boolean,\n  \"pii_types\": [\"name\",\"email\",\"cpf\",\"rg\",\"phone\"],\n  \"evidence\": [{{\"type\": string, \"span\": string, \"fragment_idx\": number}}],\n  \"confidence\": number\n}}\n\nFragmentos: {}",
        serde_json::to_string(suspects)?
    ))
}

pub struct LlmReviewer {
    client: OpenAiClient,
    cache: Arc<ResultCache>,
    fragments: FragmentConfig,
    max_fragments: usize,
    prompt_version: String,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LlmReviewer {
    pub fn new(
        client: OpenAiClient,
        cache: Arc<ResultCache>,
        fragments: FragmentConfig,
        max_fragments: usize,
        prompt_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            fragments,
            max_fragments,
            prompt_version: prompt_version.into(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Reviews a clean record; flagged records pass through
    pub async fn review(&self, record: &Record, deterministic: Classification) -> Classification {
        if deterministic.flags.nao_publico || record.text().trim().is_empty() {
            return deterministic;
        }
        match self.verdict(record.text()).await {
            Ok(verdict) => merge_verdict(deterministic, &verdict),
            Err(e) => {
                tracing::warn!(record_id = %record.id, error = %e, "Generative review failed; keeping detector result");
                deterministic
            }
        }
    }

    async fn verdict(&self, text: &str) -> Result<LlmVerdict> {
        let key = text_key(text);
        let gate = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();

        let verdict = {
            let _turn = gate.lock().await;
            self.cached_or_requested(text).await
        };

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this call still hold the gate.
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(&key);
        }
        verdict
    }

    async fn cached_or_requested(&self, text: &str) -> Result<LlmVerdict> {
        if let Some(entry) = self.cache.get(text) {
            match entry.decode::<LlmVerdict>() {
                Ok(verdict) => return Ok(verdict),
                Err(e) => tracing::warn!(key = %entry.key, error = %e, "Ignoring undecodable cache entry"),
            }
        }

        let suspects = select_suspects(text, &self.fragments, self.max_fragments);
        let reply = self
            .client
            .complete_json(SYSTEM_PROMPT, &user_prompt(&suspects)?)
            .await?;
        let mut verdict: LlmVerdict = serde_json::from_value(Value::Object(reply))
            .map_err(|e| PiiError::malformed(SOURCE, e.to_string()))?;
        verdict.model_version = Some(self.client.model().to_string());
        verdict.prompt_version = Some(self.prompt_version.clone());

        self.cache.set(text, &verdict)?;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, OpenAiConfig};
    use crate::domain::DetectionFlags;
    use serde_json::json;

    fn verdict(contains: bool, types: &[&str], evidence: &[(&str, &str)]) -> LlmVerdict {
        LlmVerdict {
            contains_pii: contains,
            pii_types: types.iter().map(|t| t.to_string()).collect(),
            evidence: evidence
                .iter()
                .map(|(kind, span)| LlmEvidence {
                    kind: kind.to_string(),
                    span: span.to_string(),
                    fragment_idx: 0,
                })
                .collect(),
            confidence: 0.9,
            model_version: None,
            prompt_version: None,
        }
    }

    fn clean(id: &str) -> Classification {
        Classification::new(id, DetectionFlags::default(), Vec::new())
    }

    #[test]
    fn test_keyword_ranking() {
        let config = FragmentConfig::new(4, 0).unwrap();
        let text = "bom dia a todos meu nome e cpf seguem abaixo";
        let suspects = select_suspects(text, &config, 1);
        assert_eq!(suspects.len(), 1);
        assert_eq!(suspects[0].fragment_idx, 1);
        assert_eq!(keyword_hits("Contato via WhatsApp"), 2);
    }

    #[test]
    fn test_merge_without_evidence_keeps_result() {
        let merged = merge_verdict(clean("1"), &verdict(true, &["name"], &[]));
        assert!(!merged.flags.nao_publico);
        assert!(!merged.used_llm);
    }

    #[test]
    fn test_merge_maps_types() {
        let merged = merge_verdict(
            clean("1"),
            &verdict(true, &["phone"], &[("name", "Jurema"), ("other", "x")]),
        );
        assert!(merged.flags.telefone);
        assert!(merged.flags.nome);
        assert!(merged.flags.nao_publico);
        assert_eq!(merged.flags.detector_prioritario, Some(FieldKind::Phone));
        assert_eq!(merged.evidence.len(), 1);
        assert!(merged.used_llm);
    }

    #[test]
    fn test_merge_unknown_types_only() {
        let merged = merge_verdict(clean("1"), &verdict(true, &["passport"], &[("passport", "X1")]));
        assert!(!merged.flags.nao_publico);
    }

    fn client(url: String) -> OpenAiClient {
        OpenAiClient::new(&OpenAiConfig {
            enabled: true,
            api_key: Some(secret_string("sk".to_string())),
            base_url: url,
            max_retries: 0,
            ..OpenAiConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_review_calls_once_then_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let content = json!({
            "contains_pii": true,
            "pii_types": ["name"],
            "evidence": [{"type": "name", "span": "Jurema", "fragment_idx": 0}],
            "confidence": 0.8
        })
        .to_string();
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": content}}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(ResultCache::in_memory());
        let reviewer = LlmReviewer::new(
            client(server.url()),
            cache.clone(),
            FragmentConfig::default(),
            3,
            "v1",
        );
        let record = Record::with_text("1", "Aqui é a Jurema falando");

        let first = reviewer.review(&record, clean("1")).await;
        assert!(first.flags.nome && first.used_llm);
        let second = reviewer.review(&record, clean("1")).await;
        assert_eq!(first.flags, second.flags);
        mock.assert_async().await;

        let cached: LlmVerdict = cache.get("aqui é a jurema falando").unwrap().decode().unwrap();
        assert_eq!(cached.prompt_version.as_deref(), Some("v1"));
        assert_eq!(cached.model_version.as_deref(), Some("gpt-4o-mini"));
    }

    #[tokio::test]
    async fn test_concurrent_reviews_of_same_text_call_once() {
        let mut server = mockito::Server::new_async().await;
        let content = json!({"contains_pii": false, "pii_types": [], "evidence": [], "confidence": 0.1})
            .to_string();
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": content}}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let reviewer = LlmReviewer::new(
            client(server.url()),
            Arc::new(ResultCache::in_memory()),
            FragmentConfig::default(),
            3,
            "v1",
        );
        let records: Vec<Record> = ["Solicito copia do contrato", "solicito   COPIA do contrato"]
            .iter()
            .cycle()
            .take(6)
            .enumerate()
            .map(|(i, text)| Record::with_text(i.to_string(), *text))
            .collect();

        let results = futures::future::join_all(
            records.iter().map(|r| reviewer.review(r, clean(&r.id))),
        )
        .await;
        assert!(results.iter().all(|r| !r.flags.nao_publico));
        mock.assert_async().await;
        assert!(reviewer.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_failure_keeps_detector_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .create_async()
            .await;
        let reviewer = LlmReviewer::new(
            client(server.url()),
            Arc::new(ResultCache::in_memory()),
            FragmentConfig::default(),
            3,
            "v1",
        );
        let result = reviewer
            .review(&Record::with_text("1", "texto qualquer"), clean("1"))
            .await;
        assert!(!result.flags.nao_publico);
        assert!(!result.used_llm);
    }

    #[tokio::test]
    async fn test_flagged_record_is_not_reviewed() {
        let reviewer = LlmReviewer::new(
            client("http://127.0.0.1:9".to_string()),
            Arc::new(ResultCache::in_memory()),
            FragmentConfig::default(),
            3,
            "v1",
        );
        let mut flagged = clean("1");
        flagged.flags.nao_publico = true;
        let result = reviewer
            .review(&Record::with_text("1", "CPF 529.982.247-25"), flagged.clone())
            .await;
        assert_eq!(result, flagged);
    }
}
