//! Data Model: intents, query analysis, execution plans, quality assessments.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five intent categories a query can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DataExploration,
    Visualization,
    InsightGeneration,
    SqlQuery,
    ReportGeneration,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::DataExploration => "data_exploration",
            Intent::Visualization => "visualization",
            Intent::InsightGeneration => "insight_generation",
            Intent::SqlQuery => "sql_query",
            Intent::ReportGeneration => "report_generation",
        }
    }

    /// All categories in their fixed detection order.
    pub fn all() -> [Intent; 5] {
        [
            Intent::DataExploration,
            Intent::Visualization,
            Intent::InsightGeneration,
            Intent::SqlQuery,
            Intent::ReportGeneration,
        ]
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "data_exploration" | "exploration" => Ok(Intent::DataExploration),
            "visualization" | "chart" => Ok(Intent::Visualization),
            "insight_generation" | "insight" => Ok(Intent::InsightGeneration),
            "sql_query" | "structured_query" | "sql" => Ok(Intent::SqlQuery),
            "report_generation" | "report" => Ok(Intent::ReportGeneration),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

/// One named unit of work in the step catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Data,
    Cleaner,
    Query,
    Retrieval,
    Sql,
    Insight,
    Chart,
    Narrative,
    Report,
    Critique,
    Debate,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Data => "data",
            StepId::Cleaner => "cleaner",
            StepId::Query => "query",
            StepId::Retrieval => "retrieval",
            StepId::Sql => "sql",
            StepId::Insight => "insight",
            StepId::Chart => "chart",
            StepId::Narrative => "narrative",
            StepId::Report => "report",
            StepId::Critique => "critique",
            StepId::Debate => "debate",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "data" => Ok(StepId::Data),
            "cleaner" => Ok(StepId::Cleaner),
            "query" => Ok(StepId::Query),
            "retrieval" => Ok(StepId::Retrieval),
            "sql" => Ok(StepId::Sql),
            "insight" => Ok(StepId::Insight),
            "chart" => Ok(StepId::Chart),
            "narrative" => Ok(StepId::Narrative),
            "report" => Ok(StepId::Report),
            "critique" => Ok(StepId::Critique),
            "debate" => Ok(StepId::Debate),
            other => Err(format!("unknown step id: {}", other)),
        }
    }
}

/// Surface metadata computed from the raw query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub length: usize,
    pub word_count: usize,
    pub has_numbers: bool,
    pub has_time_refs: bool,
}

/// How the primary intent was determined.
///
/// `Parsed` means the language model returned a well-formed structured
/// analysis; `Fallback` means the response was missing or malformed and the
/// pattern-detected intent (or the default) was used instead. Tests rely on
/// this distinction instead of inferring it from output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentResolution {
    Parsed,
    Fallback { reason: String },
}

impl IntentResolution {
    pub fn is_fallback(&self) -> bool {
        matches!(self, IntentResolution::Fallback { .. })
    }
}

/// Classifier output. Created once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub primary_intent: Intent,
    /// Pattern-detected categories in fixed family order, deduplicated.
    pub detected_intents: Vec<Intent>,
    /// Blended complexity in [0, 1].
    pub complexity_score: f64,
    pub resolution: IntentResolution,
    pub metadata: QueryMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

/// Precomputed simplified plan used when the primary plan underperforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStrategy {
    pub steps: Vec<StepId>,
    pub output_label: String,
}

/// The ordered, dependency-resolved, partially-parallelized step sequence
/// chosen for one query. Immutable once created by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<StepId>,
    /// Disjoint subsets of `steps` eligible for concurrent execution.
    pub parallel_groups: Vec<Vec<StepId>>,
    pub estimated_secs: f64,
    pub priority: Priority,
    pub requires_human_review: bool,
    pub fallback: FallbackStrategy,
    /// True when the ordering scan hit an unsatisfiable dependency subset
    /// and the remaining steps were appended in catalogue order. The
    /// resulting order is a permutation of the step set but is not
    /// guaranteed to respect dependencies.
    pub ordering_fallback: bool,
}

impl ExecutionPlan {
    pub fn contains(&self, step: StepId) -> bool {
        self.steps.contains(&step)
    }

    /// The parallel group `step` belongs to, if any.
    pub fn group_of(&self, step: StepId) -> Option<&[StepId]> {
        self.parallel_groups
            .iter()
            .find(|g| g.contains(&step))
            .map(|g| g.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Post-hoc critique verdict over one target step's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Bounded score in [0.3, 1.0].
    pub score: f64,
    pub approved: bool,
    pub confidence: Confidence,
    pub issues_found: Vec<String>,
    pub strengths: Vec<String>,
}
