//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BqaError {
    #[error("CLASSIFY/{0}")]
    ClassifyError(String),

    #[error("PLAN/{0}")]
    PlanError(String),

    #[error("STEP/{0}")]
    StepError(String),

    #[error("STATE/{0}")]
    StateError(String),

    #[error("QLT/{0}")]
    QualityError(String),

    #[error("STREAM/{0}")]
    StreamError(String),

    #[error("CANCELLED/{0}")]
    Cancelled(String),
}
