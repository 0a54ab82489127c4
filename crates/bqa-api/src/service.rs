//! Query service: the composition root wiring classifier, planner and
//! orchestrator into the two exposed operations.
use bqa_classify::QueryClassifier;
use bqa_core::state::keys;
use bqa_core::{
    BqaError, ExecutionPlan, ExecutionTrace, Intent, Orchestrator, ProgressEvent, QualityAssessment,
    QueryAnalysis, StepId, WorkflowState,
};
use bqa_plan::ExecutionPlanner;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Completed result of one `process_query` call.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// "success" when every step succeeded, "partial" when the fallback
    /// strategy informed the result composition.
    pub status: String,
    pub session_id: String,
    pub analysis: QueryAnalysis,
    pub execution_plan: ExecutionPlan,
    pub trace: ExecutionTrace,
    pub result: Value,
    pub quality: Option<QualityAssessment>,
}

pub struct QueryService {
    classifier: QueryClassifier,
    planner: ExecutionPlanner,
    orchestrator: Orchestrator,
}

impl QueryService {
    pub fn new(
        classifier: QueryClassifier,
        planner: ExecutionPlanner,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            classifier,
            planner,
            orchestrator,
        }
    }

    /// Service wired with the reference agents, the builtin catalogue and
    /// no model client; classification degrades to patterns.
    pub fn with_reference_agents() -> Self {
        let classifier = QueryClassifier::new(
            bqa_classify::IntentPatterns::builtin(),
            Arc::new(bqa_classify::OfflineModel),
        );
        let planner = ExecutionPlanner::new(Arc::new(bqa_plan::Catalogue::builtin()));
        let orchestrator = Orchestrator::new(Arc::new(bqa_agents::reference_registry()));
        Self::new(classifier, planner, orchestrator)
    }

    /// Classify, plan and execute one query, returning the completed
    /// result with its audit trace.
    pub async fn process_query(
        &self,
        session_id: &str,
        user_query: &str,
        file_context: Option<&str>,
        query_type: Option<Intent>,
    ) -> Result<QueryResponse, BqaError> {
        let (analysis, plan, state) =
            self.prepare(session_id, user_query, file_context, query_type).await;

        let outcome = self.orchestrator.execute(&plan, state).await?;
        Ok(compose_response(session_id, analysis, plan, outcome))
    }

    /// Streaming variant: identical execution semantics, but progress
    /// events are pushed to the returned channel, ending with a terminal
    /// complete/error event.
    pub fn stream_query(
        self: Arc<Self>,
        session_id: String,
        user_query: String,
        file_context: Option<String>,
        query_type: Option<Intent>,
    ) -> UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = unbounded_channel();
        tokio::spawn(async move {
            let (_, plan, state) = self
                .prepare(
                    &session_id,
                    &user_query,
                    file_context.as_deref(),
                    query_type,
                )
                .await;

            // The orchestrator emits the terminal event on both paths; the
            // sender drops here, which closes the consumer stream.
            if let Err(err) = self
                .orchestrator
                .execute_streaming(&plan, state, tx.clone())
                .await
            {
                tracing::error!(error = %err, session = session_id.as_str(), "stream terminated");
            }
        });
        rx
    }

    async fn prepare(
        &self,
        session_id: &str,
        user_query: &str,
        file_context: Option<&str>,
        query_type: Option<Intent>,
    ) -> (QueryAnalysis, ExecutionPlan, WorkflowState) {
        let mut analysis = self.classifier.analyze_query(user_query, None).await;
        // A caller-forced query type overrides the classified intent but
        // keeps the rest of the analysis.
        if let Some(forced) = query_type {
            analysis.primary_intent = forced;
        }

        let plan = self
            .planner
            .create_execution_plan(&analysis, file_context.is_some());

        let mut state = WorkflowState::new();
        state.insert(keys::SESSION_ID, json!(session_id));
        state.insert(keys::QUERY, json!(user_query));
        if let Some(fc) = file_context {
            state.insert(keys::FILE_CONTEXT, json!(fc));
        }

        (analysis, plan, state)
    }
}

/// State key each step publishes its primary output under.
fn output_key(step: StepId) -> &'static str {
    match step {
        StepId::Data => "dataset_profile",
        StepId::Cleaner => "dataset_clean",
        StepId::Query => "query_normalized",
        StepId::Retrieval => "retrieved_context",
        StepId::Sql => keys::SQL_RESULT,
        StepId::Insight => keys::INSIGHT,
        StepId::Chart => keys::CHART_SPEC,
        StepId::Narrative => keys::NARRATIVE,
        StepId::Report => keys::REPORT,
        StepId::Critique => keys::QUALITY_ASSESSMENT,
        StepId::Debate => keys::DEBATE_RESOLUTION,
    }
}

/// Most-downstream output keys, in the order the user would want them.
const PRIMARY_OUTPUTS: &[(&str, &str)] = &[
    (keys::REPORT, "report"),
    (keys::NARRATIVE, "narrative"),
    (keys::INSIGHT, "insight"),
    (keys::CHART_SPEC, "chart"),
    (keys::SQL_RESULT, "table"),
];

fn compose_response(
    session_id: &str,
    analysis: QueryAnalysis,
    plan: ExecutionPlan,
    outcome: bqa_core::WorkflowOutcome,
) -> QueryResponse {
    let quality: Option<QualityAssessment> = outcome.state.get_as(keys::QUALITY_ASSESSMENT);

    let (status, result) = if outcome.trace.has_failures() {
        // Fallback composition: the simplified step subset's outputs under
        // the precomputed label.
        let wanted: Vec<&str> = plan.fallback.steps.iter().map(|s| output_key(*s)).collect();
        let available = outcome.state.subset(&wanted);
        (
            "partial".to_string(),
            json!({
                "label": plan.fallback.output_label,
                "outputs": available,
                "failed_steps": outcome.trace.failed_steps(),
            }),
        )
    } else {
        let primary = PRIMARY_OUTPUTS
            .iter()
            .find_map(|(key, label)| {
                outcome
                    .state
                    .get(key)
                    .map(|value| json!({"label": label, "output": value.clone()}))
            })
            .unwrap_or_else(|| json!({"label": "empty", "output": Value::Null}));
        ("success".to_string(), primary)
    };

    QueryResponse {
        status,
        session_id: session_id.to_string(),
        analysis,
        execution_plan: plan,
        trace: outcome.trace,
        result,
        quality,
    }
}
