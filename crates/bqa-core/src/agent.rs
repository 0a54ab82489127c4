//! Agent Trait: the single contract every step collaborator implements.
use crate::data_model::StepId;
use crate::state::WorkflowState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Keys returned by a step, merged into `WorkflowState` by the orchestrator.
pub type PartialState = HashMap<String, Value>;

#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("AGENT/INPUT: {0}")]
    Validation(String),

    #[error("AGENT/EXEC: {0}")]
    Execution(String),

    /// A downstream collaborator (model, index, tabular engine) failed.
    #[error("AGENT/UPSTREAM: {0}")]
    Upstream(String),

    #[error("AGENT/TIMEOUT: step exceeded {0}ms")]
    Timeout(u64),

    #[error("AGENT/CANCELLED: request cancelled")]
    Cancelled,
}

/// Single-method execution capability of one catalogue step.
///
/// The orchestrator checks `validate_input` before invoking `execute`; a
/// step that fails validation is recorded as failed without being invoked.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Which catalogue step this collaborator implements.
    fn id(&self) -> StepId;

    /// State keys that must exist before this step can run.
    fn required_fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn validate_input(&self, state: &WorkflowState) -> bool {
        self.required_fields().iter().all(|k| state.contains(k))
    }

    async fn execute(&self, state: &WorkflowState) -> Result<PartialState, AgentError>;
}

/// Lookup table from step id to collaborator.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<StepId, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.id(), agent);
    }

    pub fn get(&self, id: StepId) -> Option<Arc<dyn Agent>> {
        self.agents.get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<StepId> {
        self.agents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
