//! Orchestrator: runs an ExecutionPlan against a WorkflowState.
//!
//! Steps run strictly in plan order, except that members of a declared
//! parallel group are dispatched concurrently and joined before the next
//! sequential position. Step failures never abort the plan; they are
//! recorded and execution continues. The streaming variant additionally
//! emits one progress event per step start/completion plus a terminal
//! complete/error event.

use crate::agent::{Agent, AgentError, AgentRegistry, PartialState};
use crate::data_model::{ExecutionPlan, QualityAssessment, StepId};
use crate::error::BqaError;
use crate::events::{ProgressEvent, ProgressSender};
use crate::state::{keys, WorkflowState};
use crate::trace::{ExecutionTrace, StepResult};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Final state plus the audit trace for one plan run.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub state: WorkflowState,
    pub trace: ExecutionTrace,
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    step_timeout: Duration,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Per-step deadline; a step that exceeds it is recorded as failed.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Cancellation is checked between steps and raced against every
    /// collaborator call.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        state: WorkflowState,
    ) -> Result<WorkflowOutcome, BqaError> {
        self.run_plan(plan, state, None).await
    }

    /// Identical semantics to `execute`, but emits progress events to the
    /// given channel, terminated by a final complete/error event.
    pub async fn execute_streaming(
        &self,
        plan: &ExecutionPlan,
        state: WorkflowState,
        sender: ProgressSender,
    ) -> Result<WorkflowOutcome, BqaError> {
        self.run_plan(plan, state, Some(&sender)).await
    }

    async fn run_plan(
        &self,
        plan: &ExecutionPlan,
        mut state: WorkflowState,
        progress: Option<&ProgressSender>,
    ) -> Result<WorkflowOutcome, BqaError> {
        let mut trace = ExecutionTrace::new();
        if plan.ordering_fallback {
            trace.annotate("ordering fallback: step order is not dependency-checked");
        }

        let mut executed: HashSet<StepId> = HashSet::new();

        for &step in &plan.steps {
            if executed.contains(&step) {
                continue;
            }
            if self.cancel.is_cancelled() {
                let msg = format!("cancelled before step '{}'", step);
                trace.annotate(msg.clone());
                trace.finish();
                emit(progress, ProgressEvent::error(msg.clone()));
                return Err(BqaError::Cancelled(msg));
            }

            if let Some(group) = plan.group_of(step) {
                let group: Vec<StepId> = group.to_vec();
                self.run_group(&group, &mut state, &mut trace, progress)
                    .await;
                executed.extend(group);
            } else {
                let result = self.run_sequential(step, &mut state, progress).await;
                trace.record(result);
                executed.insert(step);
            }
        }

        trace.finish();
        emit(
            progress,
            ProgressEvent::complete(format!("{} steps executed", trace.len())),
        );
        Ok(WorkflowOutcome { state, trace })
    }

    async fn run_sequential(
        &self,
        step: StepId,
        state: &mut WorkflowState,
        progress: Option<&ProgressSender>,
    ) -> StepResult {
        if let Some(reason) = gate_reason(step, state) {
            let result = StepResult::skipped(step, reason);
            emit(progress, ProgressEvent::finished(&result));
            return result;
        }

        let result = match self.prepare(step, state) {
            Err(result) => result,
            Ok(agent) => {
                emit(progress, ProgressEvent::started(step));
                let (duration_ms, outcome) = self.invoke(agent, state).await;
                match outcome {
                    Ok(partial) => {
                        let result = StepResult::success(step, duration_ms, &partial);
                        state.merge(partial);
                        result
                    }
                    Err(err) => StepResult::failed(step, duration_ms, err.to_string()),
                }
            }
        };

        emit(progress, ProgressEvent::finished(&result));
        result
    }

    /// Dispatch every runnable group member concurrently, wait for all of
    /// them, then merge outputs in group iteration order (last write wins;
    /// a key written by more than one member is logged as a warning).
    async fn run_group(
        &self,
        group: &[StepId],
        state: &mut WorkflowState,
        trace: &mut ExecutionTrace,
        progress: Option<&ProgressSender>,
    ) {
        let mut prepared: Vec<(StepId, Result<Arc<dyn Agent>, StepResult>)> = Vec::new();
        for &step in group {
            let slot = self.prepare(step, state);
            if slot.is_ok() {
                emit(progress, ProgressEvent::started(step));
            }
            prepared.push((step, slot));
        }

        // Every runnable member executes against the same pre-group
        // snapshot; no member observes another's in-flight writes.
        let snapshot = state.clone();
        let outcomes = join_all(prepared.into_iter().map(|(step, slot)| {
            let snapshot = &snapshot;
            async move {
                match slot {
                    Ok(agent) => {
                        let (duration_ms, outcome) = self.invoke(agent, snapshot).await;
                        match outcome {
                            Ok(partial) => (step, Ok((duration_ms, partial))),
                            Err(err) => {
                                (step, Err(StepResult::failed(step, duration_ms, err.to_string())))
                            }
                        }
                    }
                    Err(result) => (step, Err(result)),
                }
            }
        }))
        .await;

        // Merge and record in group iteration order, last write wins.
        let mut written_by: HashMap<String, StepId> = HashMap::new();
        for (step, outcome) in outcomes {
            let result = match outcome {
                Ok((duration_ms, partial)) => {
                    let result = StepResult::success(step, duration_ms, &partial);
                    for key in partial.keys() {
                        if let Some(prev) = written_by.insert(key.clone(), step) {
                            tracing::warn!(
                                key = key.as_str(),
                                first = prev.as_str(),
                                second = step.as_str(),
                                "parallel group members wrote the same state key; last write wins"
                            );
                        }
                    }
                    state.merge(partial);
                    result
                }
                Err(result) => result,
            };
            emit(progress, ProgressEvent::finished(&result));
            trace.record(result);
        }
    }

    /// Resolve the collaborator and check its declared inputs. An
    /// unregistered step or a missing required key short-circuits to a
    /// failed result without invoking anything.
    fn prepare(&self, step: StepId, state: &WorkflowState) -> Result<Arc<dyn Agent>, StepResult> {
        let agent = self.registry.get(step).ok_or_else(|| {
            StepResult::failed(step, 0, format!("no agent registered for step '{}'", step))
        })?;

        if !agent.validate_input(state) {
            let missing: Vec<String> = agent
                .required_fields()
                .into_iter()
                .filter(|k| !state.contains(k))
                .collect();
            return Err(StepResult::failed(
                step,
                0,
                format!("missing required input keys: {}", missing.join(", ")),
            ));
        }

        Ok(agent)
    }

    async fn invoke(
        &self,
        agent: Arc<dyn Agent>,
        state: &WorkflowState,
    ) -> (u64, Result<PartialState, AgentError>) {
        let start = Instant::now();
        let timeout_ms = self.step_timeout.as_millis() as u64;
        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            result = tokio::time::timeout(self.step_timeout, agent.execute(state)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(AgentError::Timeout(timeout_ms)),
                }
            }
        };
        (start.elapsed().as_millis() as u64, outcome)
    }
}

/// The debate step only runs while a recorded quality assessment
/// disapproves; it is the single bounded retry of the quality gate.
fn gate_reason(step: StepId, state: &WorkflowState) -> Option<String> {
    if step != StepId::Debate {
        return None;
    }
    match state.get_as::<QualityAssessment>(keys::QUALITY_ASSESSMENT) {
        Some(assessment) if !assessment.approved => None,
        Some(_) => Some("quality assessment approved; no resolution pass needed".to_string()),
        None => Some("no disapproving quality assessment recorded".to_string()),
    }
}

fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = progress {
        // A consumer that disconnected simply stops reading; ignore the error.
        let _ = sender.send(event);
    }
}
