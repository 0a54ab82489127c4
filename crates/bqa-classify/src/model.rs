//! Language-model capability consumed by the classifier.
//!
//! The model is an opaque, possibly-unreliable collaborator: it returns a
//! raw completion string which may or may not contain the structured
//! analysis we asked for. Parsing is separated from transport so the
//! degraded path stays independently testable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("MODEL/UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("MODEL/REQUEST: {0}")]
    Request(String),

    #[error("MODEL/TIMEOUT: {0}")]
    Timeout(String),
}

/// Structured analysis requested from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAnalysis {
    pub primary_intent: String,
    #[serde(default)]
    pub complexity_score: f64,
    #[serde(default)]
    pub required_data: Vec<String>,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub business_context: String,
}

/// Transport capability: send the structured-output prompt, return the raw
/// completion.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn analyze(&self, query: &str, schema_hint: Option<&str>) -> Result<String, ModelError>;
}

/// Client used when no model is configured; always degrades classification
/// to the pattern fallback.
pub struct OfflineModel;

#[async_trait]
impl ModelClient for OfflineModel {
    async fn analyze(&self, _query: &str, _schema_hint: Option<&str>) -> Result<String, ModelError> {
        Err(ModelError::Unavailable("no model client configured".to_string()))
    }
}

/// Extract a `ModelAnalysis` from a raw completion.
///
/// Accepts either a bare JSON object or an object embedded in surrounding
/// prose (models often wrap the payload in text or code fences). Returns
/// `None` when nothing parseable is present; the caller falls back to
/// pattern detection.
pub fn parse_analysis(raw: &str) -> Option<ModelAnalysis> {
    let trimmed = raw.trim();
    if let Ok(analysis) = serde_json::from_str::<ModelAnalysis>(trimmed) {
        return Some(analysis);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ModelAnalysis>(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let raw = r#"{"primary_intent": "sql_query", "complexity_score": 0.4}"#;
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.primary_intent, "sql_query");
        assert!((analysis.complexity_score - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let raw = "Sure, here is the analysis:\n```json\n{\"primary_intent\": \"visualization\", \"complexity_score\": 0.7, \"output_format\": \"chart\"}\n```";
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.primary_intent, "visualization");
        assert_eq!(analysis.output_format, "chart");
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_analysis("I could not determine the intent.").is_none());
        assert!(parse_analysis("").is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = r#"{"primary_intent": "report_generation"}"#;
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.complexity_score, 0.0);
        assert!(analysis.required_data.is_empty());
    }
}
