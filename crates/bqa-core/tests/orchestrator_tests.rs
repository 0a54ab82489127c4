//! Integration tests for the orchestrator: plan order, parallel groups,
//! failure handling, gating, deadlines and the streaming event sequence.

use async_trait::async_trait;
use bqa_core::{
    Agent, AgentError, AgentRegistry, Confidence, ExecutionPlan, FallbackStrategy, Orchestrator,
    PartialState, Priority, ProgressEvent, ProgressStatus, QualityAssessment, StepId, StepStatus,
    WorkflowState,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn plan_of(steps: Vec<StepId>) -> ExecutionPlan {
    ExecutionPlan {
        steps,
        parallel_groups: Vec::new(),
        estimated_secs: 10.0,
        priority: Priority::Medium,
        requires_human_review: false,
        fallback: FallbackStrategy {
            steps: vec![StepId::Query],
            output_label: "preview".to_string(),
        },
        ordering_fallback: false,
    }
}

/// Writes one key, optionally after a delay, optionally failing.
struct Stub {
    id: StepId,
    key: &'static str,
    value: serde_json::Value,
    requires: Vec<String>,
    delay: Option<Duration>,
    fail: bool,
}

impl Stub {
    fn new(id: StepId, key: &'static str, value: serde_json::Value) -> Self {
        Self {
            id,
            key,
            value,
            requires: Vec::new(),
            delay: None,
            fail: false,
        }
    }

    fn requiring(mut self, keys: &[&str]) -> Self {
        self.requires = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Agent for Stub {
    fn id(&self) -> StepId {
        self.id
    }

    fn required_fields(&self) -> Vec<String> {
        self.requires.clone()
    }

    async fn execute(&self, _state: &WorkflowState) -> Result<PartialState, AgentError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AgentError::Upstream("collaborator unreachable".to_string()));
        }
        let mut partial = PartialState::new();
        partial.insert(self.key.to_string(), self.value.clone());
        Ok(partial)
    }
}

fn registry(agents: Vec<Stub>) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    for agent in agents {
        registry.register(Arc::new(agent));
    }
    Arc::new(registry)
}

#[tokio::test]
async fn steps_run_in_plan_order_and_state_flows_forward() {
    let registry = registry(vec![
        Stub::new(StepId::Query, "query_normalized", json!("q")),
        Stub::new(StepId::Sql, "sql_result", json!({"rows": 1})).requiring(&["query_normalized"]),
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Query, StepId::Sql]);

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    let steps: Vec<StepId> = outcome.trace.results.iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![StepId::Query, StepId::Sql]);
    assert!(outcome
        .trace
        .results
        .iter()
        .all(|r| r.status == StepStatus::Success));
    assert!(outcome.state.contains("sql_result"));
}

#[tokio::test]
async fn failed_step_does_not_abort_the_plan() {
    let registry = registry(vec![
        Stub::new(StepId::Query, "query_normalized", json!("q")),
        Stub::new(StepId::Sql, "sql_result", json!(null)).failing(),
        Stub::new(StepId::Insight, "insight", json!("text")),
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Query, StepId::Sql, StepId::Insight]);

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    assert_eq!(outcome.trace.failed_steps(), vec![StepId::Sql]);
    assert_eq!(
        outcome.trace.result_for(StepId::Insight).unwrap().status,
        StepStatus::Success
    );
    let error = outcome
        .trace
        .result_for(StepId::Sql)
        .unwrap()
        .error
        .clone()
        .unwrap();
    assert!(error.contains("AGENT/UPSTREAM"));
}

#[tokio::test]
async fn missing_required_keys_short_circuit_without_invocation() {
    let registry = registry(vec![
        Stub::new(StepId::Sql, "sql_result", json!({})).requiring(&["query_normalized"])
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Sql]);

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    let result = outcome.trace.result_for(StepId::Sql).unwrap();
    assert_eq!(result.status, StepStatus::Failed);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("missing required input keys"));
    // Never invoked, so nothing was merged.
    assert!(!outcome.state.contains("sql_result"));
}

#[tokio::test]
async fn unregistered_step_is_recorded_as_failed() {
    let registry = registry(vec![Stub::new(StepId::Query, "query_normalized", json!("q"))]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Query, StepId::Chart]);

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    assert_eq!(outcome.trace.failed_steps(), vec![StepId::Chart]);
}

#[tokio::test]
async fn parallel_group_members_join_before_next_step() {
    let registry = registry(vec![
        Stub::new(StepId::Query, "query_normalized", json!("q")),
        Stub::new(StepId::Sql, "sql_result", json!({"rows": 2}))
            .delayed(Duration::from_millis(50)),
        Stub::new(StepId::Chart, "chart_spec", json!({"chart_type": "bar"}))
            .delayed(Duration::from_millis(10)),
        Stub::new(StepId::Insight, "insight", json!("both inputs present"))
            .requiring(&["sql_result", "chart_spec"]),
    ]);
    let orchestrator = Orchestrator::new(registry);
    let mut plan = plan_of(vec![StepId::Query, StepId::Sql, StepId::Chart, StepId::Insight]);
    plan.parallel_groups = vec![vec![StepId::Sql, StepId::Chart]];

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    // Insight saw both group outputs, so the group was joined first.
    assert_eq!(
        outcome.trace.result_for(StepId::Insight).unwrap().status,
        StepStatus::Success
    );
    // Group results are recorded in group iteration order.
    let steps: Vec<StepId> = outcome.trace.results.iter().map(|r| r.step).collect();
    assert_eq!(
        steps,
        vec![StepId::Query, StepId::Sql, StepId::Chart, StepId::Insight]
    );
}

#[tokio::test]
async fn parallel_key_collision_resolves_last_write_wins() {
    let registry = registry(vec![
        Stub::new(StepId::Sql, "shared", json!("from-sql")),
        Stub::new(StepId::Chart, "shared", json!("from-chart")),
    ]);
    let orchestrator = Orchestrator::new(registry);
    let mut plan = plan_of(vec![StepId::Sql, StepId::Chart]);
    plan.parallel_groups = vec![vec![StepId::Sql, StepId::Chart]];

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    // Merge happens in group iteration order, so chart's value survives.
    assert_eq!(outcome.state.get("shared"), Some(&json!("from-chart")));
}

#[tokio::test]
async fn step_deadline_records_timeout_failure() {
    let registry = registry(vec![
        Stub::new(StepId::Query, "query_normalized", json!("q")).delayed(Duration::from_secs(5))
    ]);
    let orchestrator = Orchestrator::new(registry).with_step_timeout(Duration::from_millis(20));
    let plan = plan_of(vec![StepId::Query]);

    let outcome = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap();

    let result = outcome.trace.result_for(StepId::Query).unwrap();
    assert_eq!(result.status, StepStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("AGENT/TIMEOUT"));
}

#[tokio::test]
async fn cancellation_between_steps_terminates_the_run() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let registry = registry(vec![Stub::new(StepId::Query, "query_normalized", json!("q"))]);
    let orchestrator = Orchestrator::new(registry).with_cancellation(cancel);
    let plan = plan_of(vec![StepId::Query]);

    let err = orchestrator
        .execute(&plan, WorkflowState::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("CANCELLED/"));
}

#[tokio::test]
async fn debate_is_skipped_when_assessment_approves() {
    let registry = registry(vec![
        Stub::new(StepId::Debate, "debate_resolution", json!("ran"))
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Debate]);

    let approved = QualityAssessment {
        score: 0.95,
        approved: true,
        confidence: Confidence::High,
        issues_found: vec![],
        strengths: vec!["clear".to_string()],
    };
    let mut state = WorkflowState::new();
    state.insert("quality_assessment", serde_json::to_value(&approved).unwrap());

    let outcome = orchestrator.execute(&plan, state).await.unwrap();
    let result = outcome.trace.result_for(StepId::Debate).unwrap();
    assert_eq!(result.status, StepStatus::Skipped);
    assert!(!outcome.state.contains("debate_resolution"));
}

#[tokio::test]
async fn debate_runs_exactly_once_when_disapproved() {
    let registry = registry(vec![
        Stub::new(StepId::Debate, "debate_resolution", json!("resolved"))
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Debate]);

    let disapproved = QualityAssessment {
        score: 0.65,
        approved: false,
        confidence: Confidence::Low,
        issues_found: vec!["zero rows".to_string()],
        strengths: vec![],
    };
    let mut state = WorkflowState::new();
    state.insert(
        "quality_assessment",
        serde_json::to_value(&disapproved).unwrap(),
    );

    let outcome = orchestrator.execute(&plan, state).await.unwrap();
    assert_eq!(
        outcome.trace.result_for(StepId::Debate).unwrap().status,
        StepStatus::Success
    );
    assert!(outcome.state.contains("debate_resolution"));
}

#[tokio::test]
async fn streaming_emits_ordered_events_with_terminal_complete() {
    let registry = registry(vec![
        Stub::new(StepId::Query, "query_normalized", json!("q")),
        Stub::new(StepId::Sql, "sql_result", json!({"rows": 0})).failing(),
    ]);
    let orchestrator = Orchestrator::new(registry);
    let plan = plan_of(vec![StepId::Query, StepId::Sql]);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    orchestrator
        .execute_streaming(&plan, WorkflowState::new(), tx)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let statuses: Vec<ProgressStatus> = events.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProgressStatus::Started,
            ProgressStatus::Completed,
            ProgressStatus::Started,
            ProgressStatus::Failed,
            ProgressStatus::Complete,
        ]
    );
    assert!(events.last().unwrap().is_terminal());
    assert_eq!(events[0].step_id, Some(StepId::Query));
}
