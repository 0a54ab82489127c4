//! End-to-end plan execution over the reference agents.

use bqa_agents::reference_registry;
use bqa_core::state::keys;
use bqa_core::{
    Intent, IntentResolution, Orchestrator, QualityAssessment, QueryAnalysis, QueryMetadata,
    StepId, StepStatus, WorkflowState,
};
use bqa_plan::{Catalogue, ExecutionPlanner};
use serde_json::json;
use std::sync::Arc;

fn analysis(intent: Intent, complexity: f64) -> QueryAnalysis {
    QueryAnalysis {
        primary_intent: intent,
        detected_intents: vec![intent],
        complexity_score: complexity,
        resolution: IntentResolution::Parsed,
        metadata: QueryMetadata {
            length: 40,
            word_count: 7,
            has_numbers: false,
            has_time_refs: false,
        },
    }
}

fn seeded_state(query: &str, file_context: Option<&str>) -> WorkflowState {
    let mut state = WorkflowState::new();
    state.insert(keys::SESSION_ID, json!("session-test"));
    state.insert(keys::QUERY, json!(query));
    if let Some(fc) = file_context {
        state.insert(keys::FILE_CONTEXT, json!(fc));
    }
    state
}

#[tokio::test]
async fn sql_query_plan_runs_clean() {
    let planner = ExecutionPlanner::new(Arc::new(Catalogue::builtin()));
    let plan = planner.create_execution_plan(&analysis(Intent::SqlQuery, 0.4), false);
    let orchestrator = Orchestrator::new(Arc::new(reference_registry()));

    let outcome = orchestrator
        .execute(&plan, seeded_state("total revenue by region", None))
        .await
        .unwrap();

    assert!(!outcome.trace.has_failures());
    assert!(outcome.state.contains(keys::SQL_RESULT));
    assert_eq!(outcome.trace.len(), 2);
}

#[tokio::test]
async fn complex_report_plan_runs_quality_gate() {
    let planner = ExecutionPlanner::new(Arc::new(Catalogue::builtin()));
    let plan = planner.create_execution_plan(&analysis(Intent::ReportGeneration, 0.75), true);
    let orchestrator = Orchestrator::new(Arc::new(reference_registry()));

    let outcome = orchestrator
        .execute(
            &plan,
            seeded_state("full report on revenue and growth", Some("sales.csv")),
        )
        .await
        .unwrap();

    assert!(!outcome.trace.has_failures());
    assert!(outcome.state.contains(keys::REPORT));

    // The reference insight scores cleanly, so the assessment approves and
    // the bounded debate pass is skipped.
    let assessment: QualityAssessment = outcome.state.get_as(keys::QUALITY_ASSESSMENT).unwrap();
    assert!(assessment.approved);
    assert_eq!(
        outcome.trace.result_for(StepId::Debate).unwrap().status,
        StepStatus::Skipped
    );
}

#[tokio::test]
async fn parallel_sql_and_chart_both_merge() {
    let planner = ExecutionPlanner::new(Arc::new(Catalogue::builtin()));
    let plan = planner.create_execution_plan(&analysis(Intent::Visualization, 0.6), true);
    assert_eq!(plan.parallel_groups, vec![vec![StepId::Sql, StepId::Chart]]);

    let orchestrator = Orchestrator::new(Arc::new(reference_registry()));
    let outcome = orchestrator
        .execute(
            &plan,
            seeded_state("plot revenue by month", Some("sales.csv")),
        )
        .await
        .unwrap();

    assert!(outcome.state.contains(keys::SQL_RESULT));
    assert!(outcome.state.contains(keys::CHART_SPEC));
    assert!(!outcome.trace.has_failures());
}

#[tokio::test]
async fn missing_file_context_fails_only_ingestion_steps() {
    let planner = ExecutionPlanner::new(Arc::new(Catalogue::builtin()));
    let plan = planner.create_execution_plan(&analysis(Intent::SqlQuery, 0.4), true);
    let orchestrator = Orchestrator::new(Arc::new(reference_registry()));

    // No file_context key seeded although the plan expects ingestion.
    let outcome = orchestrator
        .execute(&plan, seeded_state("count orders", None))
        .await
        .unwrap();

    let failed = outcome.trace.failed_steps();
    assert_eq!(failed, vec![StepId::Data, StepId::Cleaner]);
    // Downstream steps still ran.
    assert_eq!(
        outcome.trace.result_for(StepId::Sql).unwrap().status,
        StepStatus::Success
    );
}
