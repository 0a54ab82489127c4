//! Execution planner: (QueryAnalysis, file context) → ExecutionPlan.
use crate::catalogue::Catalogue;
use bqa_core::{ExecutionPlan, Priority, QueryAnalysis, StepId};
use std::sync::Arc;

/// Above this complexity the plan gains quality-control steps, a longer
/// estimate and high priority.
const QUALITY_THRESHOLD: f64 = 0.7;
/// Above this complexity plans with enough steps run sql/chart in parallel.
const PARALLEL_THRESHOLD: f64 = 0.5;
const PARALLEL_MIN_STEPS: usize = 3;
/// Above this complexity the result is flagged for human review.
const HUMAN_REVIEW_THRESHOLD: f64 = 0.8;
const QUALITY_TIME_FACTOR: f64 = 1.5;

pub struct ExecutionPlanner {
    catalogue: Arc<Catalogue>,
}

impl ExecutionPlanner {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue }
    }

    /// Build the plan for one analyzed query. Pure: identical analysis and
    /// context flag always produce an identical plan.
    pub fn create_execution_plan(
        &self,
        analysis: &QueryAnalysis,
        file_context_present: bool,
    ) -> ExecutionPlan {
        let base = self.catalogue.base_plan(analysis.primary_intent);
        let mut steps = base.steps.clone();
        let mut estimated_secs = base.estimated_secs;

        if analysis.complexity_score > QUALITY_THRESHOLD {
            for quality_step in [StepId::Critique, StepId::Debate] {
                if !steps.contains(&quality_step) {
                    steps.push(quality_step);
                }
            }
            estimated_secs *= QUALITY_TIME_FACTOR;
        }

        if file_context_present {
            // Ingestion steps go ahead of everything else, data then cleaner.
            steps.retain(|s| *s != StepId::Data && *s != StepId::Cleaner);
            steps.insert(0, StepId::Cleaner);
            steps.insert(0, StepId::Data);
        }

        dedupe(&mut steps);
        let (steps, ordering_fallback) = self.order_steps(&steps);

        let parallel_groups = if analysis.complexity_score > PARALLEL_THRESHOLD
            && steps.len() > PARALLEL_MIN_STEPS
            && steps.contains(&StepId::Sql)
            && steps.contains(&StepId::Chart)
        {
            vec![vec![StepId::Sql, StepId::Chart]]
        } else {
            Vec::new()
        };

        if ordering_fallback {
            tracing::warn!(
                intent = analysis.primary_intent.as_str(),
                "plan ordering hit an unsatisfiable dependency subset; appended remainder in catalogue order"
            );
        }

        ExecutionPlan {
            steps,
            parallel_groups,
            estimated_secs,
            priority: if analysis.complexity_score > QUALITY_THRESHOLD {
                Priority::High
            } else {
                Priority::Medium
            },
            requires_human_review: analysis.complexity_score > HUMAN_REVIEW_THRESHOLD,
            fallback: self.catalogue.fallback(analysis.primary_intent),
            ordering_fallback,
        }
    }

    /// Dependency-respecting first-fit ordering.
    ///
    /// Repeatedly scan the unordered steps and place the first one whose
    /// every declared dependency is either already ordered or absent from
    /// the step set. If a full scan places nothing (cycle or unsatisfiable
    /// subset), append the remainder in catalogue-list order and flag the
    /// plan: the result is then a permutation of the input but not
    /// dependency-checked.
    fn order_steps(&self, steps: &[StepId]) -> (Vec<StepId>, bool) {
        let mut remaining: Vec<StepId> = steps.to_vec();
        let mut ordered: Vec<StepId> = Vec::with_capacity(steps.len());

        while !remaining.is_empty() {
            let placeable = remaining.iter().position(|&candidate| {
                self.catalogue
                    .dependencies(candidate)
                    .iter()
                    .all(|dep| ordered.contains(dep) || !steps.contains(dep))
            });

            match placeable {
                Some(index) => ordered.push(remaining.remove(index)),
                None => {
                    remaining.sort_by_key(|&s| self.catalogue.position(s));
                    ordered.append(&mut remaining);
                    return (ordered, true);
                }
            }
        }

        (ordered, false)
    }
}

fn dedupe(steps: &mut Vec<StepId>) {
    let mut seen = Vec::new();
    steps.retain(|s| {
        if seen.contains(s) {
            false
        } else {
            seen.push(*s);
            true
        }
    });
}
