//! Execution Trace: the authoritative audit record of one plan run.
use crate::agent::PartialState;
use crate::data_model::StepId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome of one step invocation, appended to the trace as steps complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepId,
    pub status: StepStatus,
    pub duration_ms: u64,
    /// blake3 hash of the merged output keys, when the step produced any.
    pub output_hash: Option<String>,
    pub produced_keys: Vec<String>,
    pub error: Option<String>,
}

impl StepResult {
    pub fn success(step: StepId, duration_ms: u64, partial: &PartialState) -> Self {
        let mut produced_keys: Vec<String> = partial.keys().cloned().collect();
        produced_keys.sort();
        Self {
            step,
            status: StepStatus::Success,
            duration_ms,
            output_hash: Some(hash_partial(partial)),
            produced_keys,
            error: None,
        }
    }

    pub fn failed(step: StepId, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            duration_ms,
            output_hash: None,
            produced_keys: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn skipped(step: StepId, reason: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            duration_ms: 0,
            output_hash: None,
            produced_keys: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

/// Ordered record of step results plus run-level annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<StepResult>,
    pub annotations: Vec<String>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn record(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn annotate(&mut self, note: impl Into<String>) {
        self.annotations.push(note.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn result_for(&self, step: StepId) -> Option<&StepResult> {
        self.results.iter().find(|r| r.step == step)
    }

    pub fn failed_steps(&self) -> Vec<StepId> {
        self.results
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .map(|r| r.step)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == StepStatus::Failed)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Content hash of a step's output keys. Keys are sorted first so the hash
/// is independent of map iteration order.
pub fn hash_partial(partial: &PartialState) -> String {
    let sorted: BTreeMap<&String, &serde_json::Value> = partial.iter().collect();
    let bytes = serde_json::to_vec(&sorted).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes))
}
