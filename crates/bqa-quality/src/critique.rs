//! Critique scoring and the critique step agent.
use crate::rules::{review_target, RuleReport, TargetCategory};
use async_trait::async_trait;
use bqa_core::state::keys;
use bqa_core::{
    Agent, AgentError, Confidence, PartialState, QualityAssessment, StepId, WorkflowState,
};

const APPROVAL_SCORE: f64 = 0.75;
const APPROVAL_MAX_ISSUES: usize = 1;

/// Fixed score table over (issue count, strength count).
pub fn score_review(issues: usize, strengths: usize) -> f64 {
    if issues == 0 && strengths > 0 {
        0.95
    } else if issues <= 1 && strengths >= 2 {
        0.85
    } else if issues <= 2 && strengths >= 1 {
        0.70
    } else {
        (0.8 - 0.15 * issues as f64).max(0.3)
    }
}

pub fn is_approved(score: f64, issues: usize) -> bool {
    score >= APPROVAL_SCORE && issues <= APPROVAL_MAX_ISSUES
}

fn confidence_for(score: f64) -> Confidence {
    if score >= 0.85 {
        Confidence::High
    } else if score >= 0.65 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Turn a rule report into the request's quality assessment.
pub fn assess(report: &RuleReport) -> QualityAssessment {
    let issues = report.issues_found.len();
    let strengths = report.strengths.len();
    let score = score_review(issues, strengths);
    QualityAssessment {
        score,
        approved: is_approved(score, issues),
        confidence: confidence_for(score),
        issues_found: report.issues_found.clone(),
        strengths: report.strengths.clone(),
    }
}

/// The critique step: reviews the most downstream reviewable output
/// present in the workflow state and records the assessment.
///
/// Target precedence follows pipeline order (insight, then chart, then
/// structured query, then any generic result) so the critique always
/// lands on the output closest to what the user receives.
pub struct CritiqueAgent;

impl CritiqueAgent {
    fn select_target(state: &WorkflowState) -> Option<(TargetCategory, serde_json::Value)> {
        if let Some(value) = state.get(keys::INSIGHT) {
            return Some((TargetCategory::Insight, value.clone()));
        }
        if let Some(value) = state.get(keys::CHART_SPEC) {
            return Some((TargetCategory::Chart, value.clone()));
        }
        if let Some(value) = state.get(keys::SQL_RESULT) {
            return Some((TargetCategory::StructuredQuery, value.clone()));
        }
        state
            .get("result")
            .map(|value| (TargetCategory::Generic, value.clone()))
    }
}

#[async_trait]
impl Agent for CritiqueAgent {
    fn id(&self) -> StepId {
        StepId::Critique
    }

    fn required_fields(&self) -> Vec<String> {
        vec![keys::QUERY.to_string()]
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError> {
        let query = state.get_str(keys::QUERY).unwrap_or_default().to_string();
        let (category, output) = Self::select_target(state).ok_or_else(|| {
            AgentError::Validation("no reviewable step output in workflow state".to_string())
        })?;

        let report = review_target(category, &output, &query);
        let assessment = assess(&report);
        tracing::info!(
            score = assessment.score,
            approved = assessment.approved,
            issues = assessment.issues_found.len(),
            "critique completed"
        );

        let mut partial = PartialState::new();
        partial.insert(
            keys::QUALITY_ASSESSMENT.to_string(),
            serde_json::to_value(&assessment)
                .map_err(|e| AgentError::Execution(e.to_string()))?,
        );
        partial.insert(
            keys::CRITIQUE_REPORT.to_string(),
            serde_json::to_value(&report).map_err(|e| AgentError::Execution(e.to_string()))?,
        );
        Ok(partial)
    }
}
