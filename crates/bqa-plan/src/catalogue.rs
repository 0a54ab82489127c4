//! Step catalogue: immutable planning configuration.
use bqa_core::{FallbackStrategy, Intent, StepId};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("CATALOGUE/PARSE: {0}")]
    Parse(String),

    #[error("CATALOGUE/UNKNOWN: {0}")]
    Unknown(String),
}

/// One step's static description.
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub id: StepId,
    pub depends_on: Vec<StepId>,
    pub estimated_secs: f64,
}

/// Per-intent base step list and time estimate.
#[derive(Debug, Clone)]
pub struct BasePlan {
    pub steps: Vec<StepId>,
    pub estimated_secs: f64,
}

/// The full static catalogue injected into the planner.
#[derive(Debug, Clone)]
pub struct Catalogue {
    /// Fixed catalogue-list order; the ordering fallback appends in this order.
    steps: Vec<StepDescriptor>,
    base_plans: HashMap<Intent, BasePlan>,
    fallbacks: HashMap<Intent, FallbackStrategy>,
}

/// YAML shape for substitutable catalogue fixtures.
#[derive(Debug, Deserialize)]
struct CatalogueFile {
    steps: Vec<StepSpec>,
    base_plans: HashMap<String, BasePlanSpec>,
    fallbacks: HashMap<String, FallbackSpec>,
}

#[derive(Debug, Deserialize)]
struct StepSpec {
    id: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default = "default_step_secs")]
    estimated_secs: f64,
}

fn default_step_secs() -> f64 {
    10.0
}

#[derive(Debug, Deserialize)]
struct BasePlanSpec {
    steps: Vec<String>,
    estimated_secs: f64,
}

#[derive(Debug, Deserialize)]
struct FallbackSpec {
    steps: Vec<String>,
    output_label: String,
}

impl Catalogue {
    /// The fixed production catalogue.
    pub fn builtin() -> Self {
        use Intent::*;
        use StepId::*;

        let steps = vec![
            descriptor(Data, &[], 8.0),
            descriptor(Cleaner, &[Data], 10.0),
            descriptor(Query, &[], 5.0),
            descriptor(Retrieval, &[Query], 10.0),
            descriptor(Sql, &[Query, Retrieval], 15.0),
            descriptor(Insight, &[Sql], 20.0),
            // chart draws from the query directly so it can run alongside sql
            descriptor(Chart, &[Query], 15.0),
            descriptor(Narrative, &[Insight], 15.0),
            descriptor(Report, &[Insight, Chart, Narrative], 20.0),
            descriptor(Critique, &[Insight], 10.0),
            descriptor(Debate, &[Critique], 12.0),
        ];

        let base_plans = HashMap::from([
            (DataExploration, base(&[Query, Retrieval, Insight], 30.0)),
            (Visualization, base(&[Query, Sql, Chart], 45.0)),
            (InsightGeneration, base(&[Query, Retrieval, Sql, Insight], 60.0)),
            (SqlQuery, base(&[Query, Sql], 20.0)),
            (
                ReportGeneration,
                base(&[Query, Retrieval, Sql, Insight, Chart, Narrative, Report], 120.0),
            ),
        ]);

        let fallbacks = HashMap::from([
            (DataExploration, fallback(&[Query], "data_preview")),
            (Visualization, fallback(&[Query, Chart], "basic_chart")),
            (InsightGeneration, fallback(&[Query, Insight], "summary")),
            (SqlQuery, fallback(&[Query, Sql], "table")),
            (
                ReportGeneration,
                fallback(&[Query, Insight, Narrative], "short_report"),
            ),
        ]);

        Self {
            steps,
            base_plans,
            fallbacks,
        }
    }

    /// Load a substitute catalogue from YAML (test fixtures).
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile =
            serde_yaml::from_str(yaml).map_err(|e| CatalogueError::Parse(e.to_string()))?;

        let mut steps = Vec::new();
        for spec in file.steps {
            let id = parse_step(&spec.id)?;
            let mut depends_on = Vec::new();
            for dep in &spec.depends_on {
                depends_on.push(parse_step(dep)?);
            }
            steps.push(StepDescriptor {
                id,
                depends_on,
                estimated_secs: spec.estimated_secs,
            });
        }

        let mut base_plans = HashMap::new();
        for (intent, spec) in file.base_plans {
            let intent = parse_intent(&intent)?;
            base_plans.insert(
                intent,
                BasePlan {
                    steps: parse_steps(&spec.steps)?,
                    estimated_secs: spec.estimated_secs,
                },
            );
        }

        let mut fallbacks = HashMap::new();
        for (intent, spec) in file.fallbacks {
            let intent = parse_intent(&intent)?;
            fallbacks.insert(
                intent,
                FallbackStrategy {
                    steps: parse_steps(&spec.steps)?,
                    output_label: spec.output_label,
                },
            );
        }

        // The default arms of `base_plan`/`fallback` lean on this entry.
        if !base_plans.contains_key(&Intent::InsightGeneration)
            || !fallbacks.contains_key(&Intent::InsightGeneration)
        {
            return Err(CatalogueError::Parse(
                "catalogue must define insight_generation base plan and fallback".to_string(),
            ));
        }

        Ok(Self {
            steps,
            base_plans,
            fallbacks,
        })
    }

    pub fn descriptor(&self, id: StepId) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Declared dependencies, empty for steps missing from the catalogue.
    pub fn dependencies(&self, id: StepId) -> &[StepId] {
        self.descriptor(id)
            .map(|s| s.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// Position in the fixed catalogue list; unknown steps sort last.
    pub fn position(&self, id: StepId) -> usize {
        self.steps
            .iter()
            .position(|s| s.id == id)
            .unwrap_or(self.steps.len())
    }

    /// Base plan for an intent; unknown intents get the insight-generation
    /// entry.
    pub fn base_plan(&self, intent: Intent) -> &BasePlan {
        self.base_plans
            .get(&intent)
            .or_else(|| self.base_plans.get(&Intent::InsightGeneration))
            .expect("catalogue always carries an insight_generation base plan")
    }

    /// Fallback strategy for an intent, same default rule as `base_plan`.
    pub fn fallback(&self, intent: Intent) -> FallbackStrategy {
        self.fallbacks
            .get(&intent)
            .or_else(|| self.fallbacks.get(&Intent::InsightGeneration))
            .cloned()
            .expect("catalogue always carries an insight_generation fallback")
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

fn descriptor(id: StepId, deps: &[StepId], estimated_secs: f64) -> StepDescriptor {
    StepDescriptor {
        id,
        depends_on: deps.to_vec(),
        estimated_secs,
    }
}

fn base(steps: &[StepId], estimated_secs: f64) -> BasePlan {
    BasePlan {
        steps: steps.to_vec(),
        estimated_secs,
    }
}

fn fallback(steps: &[StepId], label: &str) -> FallbackStrategy {
    FallbackStrategy {
        steps: steps.to_vec(),
        output_label: label.to_string(),
    }
}

fn parse_step(s: &str) -> Result<StepId, CatalogueError> {
    StepId::from_str(s).map_err(CatalogueError::Unknown)
}

fn parse_steps(steps: &[String]) -> Result<Vec<StepId>, CatalogueError> {
    steps.iter().map(|s| parse_step(s)).collect()
}

fn parse_intent(s: &str) -> Result<Intent, CatalogueError> {
    Intent::from_str(s).map_err(CatalogueError::Unknown)
}
