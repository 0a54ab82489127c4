//! BQA Agents: reference implementations of the catalogue steps.
//!
//! These agents stay intentionally small and deterministic. They act as
//! defaults so a full plan can compile, run and be exercised end-to-end
//! without bespoke analytics engines. Deployments replace them with real
//! collaborators (tabular engine, vector index, model-backed generators).
//!
//! # Pipeline Flow
//!
//! ```text
//! data → cleaner → query → retrieval → sql → insight/chart → narrative → report
//!                                                   ↓
//!                                         critique → debate
//! ```

use async_trait::async_trait;
use bqa_core::state::keys;
use bqa_core::{Agent, AgentError, AgentRegistry, PartialState, QualityAssessment, StepId, WorkflowState};
use bqa_quality::CritiqueAgent;
use serde_json::json;

/// Normalizes the raw query and extracts coarse entities.
pub struct QueryAgent;

#[async_trait]
impl Agent for QueryAgent {
    fn id(&self) -> StepId {
        StepId::Query
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::QUERY.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let query = state
            .get_str(keys::QUERY)
            .ok_or_else(|| AgentError::Validation("query text missing".to_string()))?;

        let normalized = query.trim().to_lowercase();
        let entities: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.len() > 3 && w.chars().next().is_some_and(|c| c.is_uppercase()))
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        let mut partial = PartialState::new();
        partial.insert("query_normalized".to_string(), json!(normalized));
        partial.insert("entities".to_string(), json!(entities));
        Ok(partial)
    }
}

/// Registers the uploaded file context as the active dataset.
pub struct DataAgent;

#[async_trait]
impl Agent for DataAgent {
    fn id(&self) -> StepId {
        StepId::Data
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::FILE_CONTEXT.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let source = state.get_str(keys::FILE_CONTEXT).unwrap_or("uploaded dataset");
        let mut partial = PartialState::new();
        partial.insert(
            "dataset_profile".to_string(),
            json!({"source": source, "loaded": true}),
        );
        Ok(partial)
    }
}

/// Marks the dataset as cleaned; real deployments do type coercion and
/// null handling here.
pub struct CleanerAgent;

#[async_trait]
impl Agent for CleanerAgent {
    fn id(&self) -> StepId {
        StepId::Cleaner
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["dataset_profile".to_string()]
    }

    async fn execute(&self, _state: &WorkflowState) -> Result<PartialState, AgentError> {
        let mut partial = PartialState::new();
        partial.insert(
            "dataset_clean".to_string(),
            json!({"ready": true, "notes": []}),
        );
        Ok(partial)
    }
}

/// Stands in for the vector-index lookup.
pub struct RetrievalAgent;

#[async_trait]
impl Agent for RetrievalAgent {
    fn id(&self) -> StepId {
        StepId::Retrieval
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["query_normalized".to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let normalized = state.get_str("query_normalized").unwrap_or_default();
        let mut partial = PartialState::new();
        partial.insert(
            "retrieved_context".to_string(),
            json!({"matches": [], "terms": normalized.split_whitespace().collect::<Vec<_>>()}),
        );
        Ok(partial)
    }
}

/// Produces a deterministic single-row aggregate instead of running a real
/// tabular engine.
pub struct SqlAgent;

#[async_trait]
impl Agent for SqlAgent {
    fn id(&self) -> StepId {
        StepId::Sql
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["query_normalized".to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let normalized = state.get_str("query_normalized").unwrap_or_default();
        let terms: Vec<&str> = normalized.split_whitespace().filter(|w| w.len() > 3).collect();

        let mut partial = PartialState::new();
        partial.insert(
            keys::SQL_RESULT.to_string(),
            json!({
                "statement": format!("SELECT COUNT(*) AS matches FROM dataset WHERE text LIKE '%{}%'",
                    terms.first().unwrap_or(&"")),
                "rows": [{"matches": terms.len()}],
                "row_count": 1,
            }),
        );
        Ok(partial)
    }
}

/// Summarizes the structured-query result into one insight sentence.
pub struct InsightAgent;

#[async_trait]
impl Agent for InsightAgent {
    fn id(&self) -> StepId {
        StepId::Insight
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::SQL_RESULT.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let row_count = state
            .get(keys::SQL_RESULT)
            .and_then(|v| v.get("row_count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let query = state.get_str(keys::QUERY).unwrap_or_default();

        let mut partial = PartialState::new();
        partial.insert(
            keys::INSIGHT.to_string(),
            json!(format!(
                "The structured query behind \"{}\" returned {} result row(s); values are stable across the examined slice.",
                query, row_count
            )),
        );
        Ok(partial)
    }
}

/// Emits a minimal renderable chart specification.
pub struct ChartAgent;

#[async_trait]
impl Agent for ChartAgent {
    fn id(&self) -> StepId {
        StepId::Chart
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["query_normalized".to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let query = state.get_str(keys::QUERY).unwrap_or("result");
        let mut partial = PartialState::new();
        partial.insert(
            keys::CHART_SPEC.to_string(),
            json!({
                "chart_type": "bar",
                "x_axis": "category",
                "y_axis": "value",
                "title": query,
            }),
        );
        Ok(partial)
    }
}

/// Expands the insight into a short narrative paragraph.
pub struct NarrativeAgent;

#[async_trait]
impl Agent for NarrativeAgent {
    fn id(&self) -> StepId {
        StepId::Narrative
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::INSIGHT.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let insight = state.get_str(keys::INSIGHT).unwrap_or_default();
        let mut partial = PartialState::new();
        partial.insert(
            keys::NARRATIVE.to_string(),
            json!(format!("{} No further anomalies were observed in the supporting data.", insight)),
        );
        Ok(partial)
    }
}

/// Assembles the final report object from the upstream outputs.
pub struct ReportAgent;

#[async_trait]
impl Agent for ReportAgent {
    fn id(&self) -> StepId {
        StepId::Report
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::NARRATIVE.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let mut partial = PartialState::new();
        partial.insert(
            keys::REPORT.to_string(),
            json!({
                "narrative": state.get(keys::NARRATIVE).cloned(),
                "insight": state.get(keys::INSIGHT).cloned(),
                "chart": state.get(keys::CHART_SPEC).cloned(),
                "sql": state.get(keys::SQL_RESULT).cloned(),
            }),
        );
        Ok(partial)
    }
}

/// Single resolution pass after a disapproving critique.
pub struct DebateAgent;

#[async_trait]
impl Agent for DebateAgent {
    fn id(&self) -> StepId {
        StepId::Debate
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::QUALITY_ASSESSMENT.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let assessment: QualityAssessment = state
            .get_as(keys::QUALITY_ASSESSMENT)
            .ok_or_else(|| AgentError::Validation("quality assessment missing".to_string()))?;

        // Accept the output with caveats when it scored above the floor;
        // otherwise hand the issues back for the fallback composition.
        let accepted = assessment.score >= 0.5;
        let mut partial = PartialState::new();
        partial.insert(
            keys::DEBATE_RESOLUTION.to_string(),
            json!({
                "accepted_with_caveats": accepted,
                "unresolved_issues": assessment.issues_found,
            }),
        );
        Ok(partial)
    }
}

/// Registry with every reference agent plus the critique agent.
pub fn reference_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register(std::sync::Arc::new(QueryAgent));
    registry.register(std::sync::Arc::new(DataAgent));
    registry.register(std::sync::Arc::new(CleanerAgent));
    registry.register(std::sync::Arc::new(RetrievalAgent));
    registry.register(std::sync::Arc::new(SqlAgent));
    registry.register(std::sync::Arc::new(InsightAgent));
    registry.register(std::sync::Arc::new(ChartAgent));
    registry.register(std::sync::Arc::new(NarrativeAgent));
    registry.register(std::sync::Arc::new(ReportAgent));
    registry.register(std::sync::Arc::new(CritiqueAgent));
    registry.register(std::sync::Arc::new(DebateAgent));
    registry
}
