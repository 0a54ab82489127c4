//! BQA Quality Gate: post-hoc critique of step outputs.
//!
//! Dispatches one of four rule sets by the target output's category,
//! produces a bounded score in [0.3, 1.0] and an approve/retry decision.
//! A disapproving assessment triggers at most one debate resolution pass
//! (the orchestrator enforces the bound).

pub mod critique;
pub mod rules;

pub use critique::{assess, is_approved, score_review, CritiqueAgent};
pub use rules::{review_target, RuleReport, TargetCategory};
