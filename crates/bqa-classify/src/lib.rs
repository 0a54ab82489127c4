//! BQA Classify: raw query → typed QueryAnalysis.
//!
//! Hybrid classification: fixed regex families per intent category plus a
//! structured language-model analysis. A missing or malformed model
//! response never raises; classification degrades to the pattern-detected
//! intent (default: insight generation) and records the degradation in the
//! analysis so callers and tests can tell the two paths apart.

pub mod classifier;
pub mod model;
pub mod patterns;

pub use classifier::QueryClassifier;
pub use model::{ModelAnalysis, ModelClient, ModelError, OfflineModel};
pub use patterns::IntentPatterns;
