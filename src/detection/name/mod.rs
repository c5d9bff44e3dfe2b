//! Personal-name detection
//!
//! Three surfaces are searched in order:
//!
//! 1. **Label**: `Nome:` / `Nome completo:` followed by a name. Accepted by the
//!    multi-token rule, or by the single-token rule when only one word follows.
//! 2. **Introduction**: self-introductions and sign-offs (`meu nome é`,
//!    `me chamo`, `sou`, `assinado`, `att`, `atenciosamente`). Accepted by the
//!    multi-token rule, or when the first word is a known name.
//! 3. **Sequence**: any run of two or more words, regardless of
//!    capitalization. Multi-token rule only.
//!
//! Label and introduction candidates are cut to the configured maximum number
//! of content tokens before scoring.

pub mod enrichment;
pub mod scorer;
pub mod weights;

pub use enrichment::{EnrichmentPipeline, TokenClassifier};
pub use scorer::{NameScorer, NameThresholds};
pub use weights::WeightStore;

use crate::domain::Result;
use regex::Regex;
use scorer::NAME_TOKEN;
use serde::Serialize;

const CONNECTOR: &str = r"(?:da|de|do|dos|das|e)";

/// Where a name was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSurface {
    Label,
    Introduction,
    Sequence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub span: String,
    pub surface: NameSurface,
}

pub struct NameDetector {
    scorer: NameScorer,
    label: Regex,
    introduction: Regex,
    sequence: Regex,
}

impl NameDetector {
    pub fn new(scorer: NameScorer) -> Result<Self> {
        let name_run = format!(r"{NAME_TOKEN}(?:\s+(?:{CONNECTOR}\s+)?{NAME_TOKEN})*");
        Ok(Self {
            scorer,
            label: Regex::new(&format!(
                r"(?i)\bnome(?:\s+completo)?\s*[:\-]?\s*({name_run})"
            ))?,
            introduction: Regex::new(&format!(
                r"(?i)\b(?:meu\s+nome\s+[eé]|me\s+chamo|sou(?:\s+[oa])?|ass(?:inatura|inado)?|att\.?|at\.?\.?te?\.?|atenciosamente)[,:\s]+({name_run})"
            ))?,
            sequence: Regex::new(&format!(
                r"(?i)\b{NAME_TOKEN}(?:\s+(?:{CONNECTOR}\s+)?{NAME_TOKEN})+\b"
            ))?,
        })
    }

    pub fn scorer(&self) -> &NameScorer {
        &self.scorer
    }

    fn captured<'a>(re: &Regex, text: &'a str) -> Vec<&'a str> {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// First accepted name in `text`
    pub async fn find(&self, text: &str) -> Option<NameMatch> {
        let max_tokens = self.scorer.thresholds().max_single_tokens;

        for candidate in Self::captured(&self.label, text) {
            let candidate = self.scorer.truncate(candidate, max_tokens);
            if self.scorer.is_name(candidate).await || self.scorer.is_single_name(candidate) {
                return Some(NameMatch {
                    span: candidate.to_string(),
                    surface: NameSurface::Label,
                });
            }
        }

        for candidate in Self::captured(&self.introduction, text) {
            let candidate = self.scorer.truncate(candidate, max_tokens);
            if self.scorer.is_name(candidate).await || self.scorer.opens_with_name(candidate).await
            {
                return Some(NameMatch {
                    span: candidate.to_string(),
                    surface: NameSurface::Introduction,
                });
            }
        }

        let sequences: Vec<&str> = self.sequence.find_iter(text).map(|m| m.as_str()).collect();
        for candidate in sequences {
            if self.scorer.is_name(candidate).await {
                return Some(NameMatch {
                    span: candidate.to_string(),
                    surface: NameSurface::Sequence,
                });
            }
        }

        None
    }

    /// Matched name span, if any
    pub async fn detect(&self, text: &str) -> Option<String> {
        self.find(text).await.map(|m| m.span)
    }

    /// Absent input yields no match
    pub async fn detect_opt(&self, text: Option<&str>) -> Option<String> {
        match text {
            Some(text) => self.detect(text).await,
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn detector(weights: &[(&str, f64)]) -> NameDetector {
        let store = Arc::new(WeightStore::in_memory(
            weights
                .iter()
                .map(|(t, w)| (t.to_string(), *w))
                .collect::<HashMap<_, _>>(),
        ));
        let scorer = NameScorer::new(
            Arc::new(EnrichmentPipeline::disabled(store)),
            NameThresholds::default(),
        )
        .unwrap();
        NameDetector::new(scorer).unwrap()
    }

    fn seeded() -> NameDetector {
        detector(&[
            ("maria", 1.2),
            ("joao", 1.2),
            ("silva", 0.5),
            ("souza", 0.5),
            ("penha", 0.4),
            ("lei", -0.5),
            ("edital", -0.8),
            ("concurso", -0.6),
            ("secretaria", -0.6),
        ])
    }

    #[tokio::test]
    async fn test_label_with_full_name() {
        let found = seeded().find("Nome completo: Maria Silva, solicito dados").await.unwrap();
        assert_eq!(found.surface, NameSurface::Label);
        assert_eq!(found.span, "Maria Silva");
    }

    #[tokio::test]
    async fn test_label_with_single_unknown_name() {
        let found = seeded().find("nome: Jussara").await.unwrap();
        assert_eq!(found.surface, NameSurface::Label);
        assert_eq!(found.span, "Jussara");
    }

    #[tokio::test]
    async fn test_label_candidate_is_truncated() {
        let found = seeded()
            .find("Nome: Maria da Silva Souza Lima requer cópia do edital")
            .await
            .unwrap();
        assert_eq!(found.span, "Maria da Silva Souza Lima");
    }

    #[tokio::test]
    async fn test_sign_off_with_known_first_name() {
        let found = seeded().find("Obrigado. Atenciosamente, Joao").await.unwrap();
        assert_eq!(found.surface, NameSurface::Introduction);
        assert_eq!(found.span, "Joao");
    }

    #[tokio::test]
    async fn test_introduction_needs_a_name() {
        assert_eq!(seeded().find("Sou a favor da publicação").await, None);
    }

    #[tokio::test]
    async fn test_sequence_any_capitalization() {
        let found = seeded().find("pedido feito por maria souza ontem").await.unwrap();
        assert_eq!(found.surface, NameSurface::Sequence);
    }

    #[tokio::test]
    async fn test_law_name_is_not_a_person() {
        assert_eq!(seeded().detect("Lei Maria da Penha atualizada").await, None);
    }

    #[tokio::test]
    async fn test_institutional_text() {
        assert_eq!(
            seeded()
                .detect("Solicito o edital do concurso da secretaria")
                .await,
            None
        );
    }

    #[tokio::test]
    async fn test_absent_text() {
        assert_eq!(seeded().detect_opt(None).await, None);
    }
}
