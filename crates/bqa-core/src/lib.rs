//! BQA Core: data model, workflow state, agent contract, and orchestrator.
//!
//! Generic per-request execution core: an `ExecutionPlan` is run step by
//! step against a shared `WorkflowState`, producing an ordered
//! `ExecutionTrace` and, in the streaming variant, a sequence of progress
//! events.

pub mod agent;
pub mod data_model;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod state;
pub mod trace;

pub use agent::{Agent, AgentError, AgentRegistry, PartialState};
pub use data_model::{
    Confidence, ExecutionPlan, FallbackStrategy, Intent, IntentResolution, Priority,
    QualityAssessment, QueryAnalysis, QueryMetadata, StepId,
};
pub use error::BqaError;
pub use events::{ProgressEvent, ProgressSender, ProgressStatus};
pub use orchestrator::{Orchestrator, WorkflowOutcome};
pub use state::WorkflowState;
pub use trace::{ExecutionTrace, StepResult, StepStatus};

/// Engine version reported by the API health endpoint.
pub const BQA_VERSION: &str = "1.0.0";
