//! Progress events emitted by the streaming execution variant.
use crate::data_model::StepId;
use crate::trace::{StepResult, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Started,
    Completed,
    Failed,
    Skipped,
    /// Terminal event: the whole plan finished.
    Complete,
    /// Terminal event: the request died outside step-level handling.
    Error,
}

/// One progress event on the single-consumer ordered channel.
///
/// Step-level events carry the step id; the two terminal variants do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step_id: Option<StepId>,
    pub status: ProgressStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    fn new(step_id: Option<StepId>, status: ProgressStatus, message: String) -> Self {
        Self {
            step_id,
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn started(step: StepId) -> Self {
        Self::new(
            Some(step),
            ProgressStatus::Started,
            format!("step '{}' started", step),
        )
    }

    pub fn finished(result: &StepResult) -> Self {
        let (status, message) = match result.status {
            StepStatus::Success => (
                ProgressStatus::Completed,
                format!("step '{}' completed in {}ms", result.step, result.duration_ms),
            ),
            StepStatus::Failed => (
                ProgressStatus::Failed,
                format!(
                    "step '{}' failed: {}",
                    result.step,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            ),
            StepStatus::Skipped => (
                ProgressStatus::Skipped,
                format!(
                    "step '{}' skipped: {}",
                    result.step,
                    result.error.as_deref().unwrap_or("")
                ),
            ),
        };
        Self::new(Some(result.step), status, message)
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(None, ProgressStatus::Complete, message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(None, ProgressStatus::Error, message.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ProgressStatus::Complete | ProgressStatus::Error)
    }
}

/// Sending half of the progress channel. A consumer that stops reading
/// simply misses further events; sends to a dropped receiver are ignored.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressEvent>;
