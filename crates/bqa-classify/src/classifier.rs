//! Hybrid query classifier.
use crate::model::{parse_analysis, ModelClient};
use crate::patterns::IntentPatterns;
use bqa_core::{Intent, IntentResolution, QueryAnalysis, QueryMetadata};
use std::str::FromStr;
use std::sync::Arc;

/// Intent used when neither the model nor the patterns produce one.
const DEFAULT_INTENT: Intent = Intent::InsightGeneration;

/// Normalization divisors for the complexity heuristic.
const LENGTH_NORM: f64 = 500.0;
const INTENT_NORM: f64 = 5.0;
const STAT_TERM_NORM: f64 = 10.0;

pub struct QueryClassifier {
    patterns: IntentPatterns,
    model: Arc<dyn ModelClient>,
}

impl QueryClassifier {
    pub fn new(patterns: IntentPatterns, model: Arc<dyn ModelClient>) -> Self {
        Self { patterns, model }
    }

    /// Analyze a raw query. Never errors: model failure or an unparseable
    /// response degrades to the first pattern-detected intent, default
    /// insight generation.
    pub async fn analyze_query(&self, query: &str, schema_hint: Option<&str>) -> QueryAnalysis {
        let detected = self.patterns.detect(query);

        let model_outcome = match self.model.analyze(query, schema_hint).await {
            Ok(raw) => match parse_analysis(&raw) {
                Some(analysis) => match Intent::from_str(&analysis.primary_intent) {
                    Ok(intent) => Ok((intent, analysis.complexity_score)),
                    Err(_) => Err(format!(
                        "model returned unknown intent '{}'",
                        analysis.primary_intent
                    )),
                },
                None => Err("model response was not parseable as structured analysis".to_string()),
            },
            Err(err) => Err(err.to_string()),
        };

        let (primary_intent, resolution, model_complexity) = match model_outcome {
            Ok((intent, complexity)) => {
                (intent, IntentResolution::Parsed, Some(complexity.clamp(0.0, 1.0)))
            }
            Err(reason) => {
                tracing::debug!(reason = reason.as_str(), "classification degraded to patterns");
                let intent = detected.first().copied().unwrap_or(DEFAULT_INTENT);
                (intent, IntentResolution::Fallback { reason }, None)
            }
        };

        let heuristic = heuristic_complexity(query, detected.len(), self.patterns.stat_term_count(query));
        // Averaging with the model-reported score bounds the influence of an
        // unreliable external estimate; without one the heuristic stands alone.
        let complexity_score = match model_complexity {
            Some(model_score) => ((heuristic + model_score) / 2.0).clamp(0.0, 1.0),
            None => heuristic.clamp(0.0, 1.0),
        };

        QueryAnalysis {
            primary_intent,
            detected_intents: detected,
            complexity_score,
            resolution,
            metadata: metadata_for(query, &self.patterns),
        }
    }
}

/// Average of the three normalized heuristic factors, each capped at 1.
fn heuristic_complexity(query: &str, detected_count: usize, stat_terms: usize) -> f64 {
    let length_factor = (query.len() as f64 / LENGTH_NORM).min(1.0);
    let intent_factor = (detected_count as f64 / INTENT_NORM).min(1.0);
    let stat_factor = (stat_terms as f64 / STAT_TERM_NORM).min(1.0);
    (length_factor + intent_factor + stat_factor) / 3.0
}

fn metadata_for(query: &str, patterns: &IntentPatterns) -> QueryMetadata {
    QueryMetadata {
        length: query.len(),
        word_count: query.split_whitespace().count(),
        has_numbers: query.chars().any(|c| c.is_ascii_digit()),
        has_time_refs: patterns.has_time_refs(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelClient, ModelError, OfflineModel};
    use async_trait::async_trait;

    /// Returns a fixed raw completion, or errors.
    struct ScriptedModel {
        response: Result<String, ModelError>,
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn analyze(
            &self,
            _query: &str,
            _schema_hint: Option<&str>,
        ) -> Result<String, ModelError> {
            self.response.clone()
        }
    }

    fn classifier_with(response: Result<String, ModelError>) -> QueryClassifier {
        QueryClassifier::new(
            IntentPatterns::builtin(),
            Arc::new(ScriptedModel { response }),
        )
    }

    #[tokio::test]
    async fn parsed_model_response_determines_primary_intent() {
        let classifier = classifier_with(Ok(
            r#"{"primary_intent": "visualization", "complexity_score": 0.6}"#.to_string(),
        ));
        let analysis = classifier
            .analyze_query("how many orders per region", None)
            .await;

        assert_eq!(analysis.primary_intent, Intent::Visualization);
        assert_eq!(analysis.resolution, IntentResolution::Parsed);
        // Patterns still contribute the detected set.
        assert!(analysis.detected_intents.contains(&Intent::SqlQuery));
    }

    #[tokio::test]
    async fn unreachable_model_falls_back_to_first_detected_intent() {
        let classifier = QueryClassifier::new(IntentPatterns::builtin(), Arc::new(OfflineModel));
        let analysis = classifier
            .analyze_query("plot revenue over time", None)
            .await;

        assert_eq!(analysis.primary_intent, Intent::Visualization);
        assert!(analysis.resolution.is_fallback());
    }

    #[tokio::test]
    async fn garbage_response_falls_back_without_raising() {
        let classifier = classifier_with(Ok("no structure here at all".to_string()));
        let analysis = classifier.analyze_query("hello", None).await;

        assert_eq!(analysis.primary_intent, Intent::InsightGeneration);
        match &analysis.resolution {
            IntentResolution::Fallback { reason } => assert!(reason.contains("not parseable")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_model_intent_falls_back() {
        let classifier =
            classifier_with(Ok(r#"{"primary_intent": "time_travel"}"#.to_string()));
        let analysis = classifier.analyze_query("show me the data table", None).await;

        assert_eq!(analysis.primary_intent, Intent::DataExploration);
        assert!(analysis.resolution.is_fallback());
    }

    #[tokio::test]
    async fn complexity_blends_heuristic_with_model_score() {
        let query = "how many orders per region";
        let classifier = classifier_with(Ok(
            r#"{"primary_intent": "sql_query", "complexity_score": 1.0}"#.to_string(),
        ));
        let analysis = classifier.analyze_query(query, None).await;

        let heuristic = heuristic_complexity(query, analysis.detected_intents.len(), 0);
        let expected = (heuristic + 1.0) / 2.0;
        assert!((analysis.complexity_score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn complexity_is_heuristic_alone_on_fallback() {
        let query = "how many orders per region";
        let classifier = QueryClassifier::new(IntentPatterns::builtin(), Arc::new(OfflineModel));
        let analysis = classifier.analyze_query(query, None).await;

        let heuristic = heuristic_complexity(query, analysis.detected_intents.len(), 0);
        assert!((analysis.complexity_score - heuristic).abs() < 1e-9);
    }

    #[tokio::test]
    async fn complexity_stays_clamped() {
        let long_query = format!(
            "sum average total count correlation variance {}",
            "x".repeat(1000)
        );
        let classifier = classifier_with(Ok(
            r#"{"primary_intent": "sql_query", "complexity_score": 9.5}"#.to_string(),
        ));
        let analysis = classifier.analyze_query(&long_query, None).await;
        assert!(analysis.complexity_score <= 1.0);
        assert!(analysis.complexity_score >= 0.0);
    }

    #[tokio::test]
    async fn metadata_reflects_query_surface() {
        let classifier = QueryClassifier::new(IntentPatterns::builtin(), Arc::new(OfflineModel));
        let analysis = classifier
            .analyze_query("top 5 products since 2024", None)
            .await;

        assert_eq!(analysis.metadata.word_count, 5);
        assert!(analysis.metadata.has_numbers);
        assert!(analysis.metadata.has_time_refs);
    }
}
