//! BQA Plan: step catalogue and execution planner.
//!
//! The catalogue is immutable configuration: step descriptors with their
//! declared dependencies and default durations, per-intent base plans and
//! fallback strategies. The planner is a pure function of
//! (QueryAnalysis, file-context flag) over a fixed catalogue.

pub mod catalogue;
pub mod planner;

pub use catalogue::{BasePlan, Catalogue, CatalogueError, StepDescriptor};
pub use planner::ExecutionPlanner;
