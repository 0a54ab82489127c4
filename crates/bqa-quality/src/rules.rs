//! Category-specific critique rule sets.
//!
//! Each rule set walks a target step output and fills four lists:
//! checks performed, issues found, strengths, recommendations. The rules
//! are fixed heuristics, deliberately cheap and deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chart types the chart rules accept without complaint.
const STANDARD_CHART_TYPES: &[&str] = &["bar", "line", "pie", "scatter", "histogram", "area"];

/// Config fields a renderable chart spec must carry.
const REQUIRED_CHART_FIELDS: &[&str] = &["chart_type", "x_axis", "y_axis", "title"];

/// Phrases that mark an insight as filler rather than analysis.
const HEDGING_PHRASES: &[&str] = &[
    "it is difficult to say",
    "more data is needed",
    "results may vary",
    "unable to determine",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    StructuredQuery,
    Insight,
    Chart,
    Generic,
}

/// Output of one rule-set pass over a target step output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    pub category: TargetCategory,
    pub checks_performed: Vec<String>,
    pub issues_found: Vec<String>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RuleReport {
    fn new(category: TargetCategory) -> Self {
        Self {
            category,
            checks_performed: Vec::new(),
            issues_found: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    fn check(&mut self, name: &str) {
        self.checks_performed.push(name.to_string());
    }

    fn issue(&mut self, text: impl Into<String>) {
        self.issues_found.push(text.into());
    }

    fn strength(&mut self, text: impl Into<String>) {
        self.strengths.push(text.into());
    }

    fn recommend(&mut self, text: impl Into<String>) {
        self.recommendations.push(text.into());
    }
}

/// Run the rule set for `category` over `output`.
pub fn review_target(category: TargetCategory, output: &Value, query: &str) -> RuleReport {
    match category {
        TargetCategory::StructuredQuery => review_structured_query(output, query),
        TargetCategory::Insight => review_insight(output, query),
        TargetCategory::Chart => review_chart(output),
        TargetCategory::Generic => review_generic(output),
    }
}

fn review_structured_query(output: &Value, query: &str) -> RuleReport {
    let mut report = RuleReport::new(TargetCategory::StructuredQuery);

    report.check("execution_error");
    if let Some(error) = output.get("error").and_then(|v| v.as_str()) {
        report.issue(format!("query execution reported an error: {}", error));
        report.recommend("re-run the query against the cleaned dataset");
    } else {
        report.strength("query executed without errors");
    }

    report.check("row_count");
    let row_count = output
        .get("row_count")
        .and_then(|v| v.as_u64())
        .or_else(|| output.get("rows").and_then(|v| v.as_array()).map(|a| a.len() as u64));
    match row_count {
        Some(0) => {
            report.issue("result set is empty");
            report.recommend("relax the filter conditions and retry");
        }
        Some(_) => report.strength("result set is non-empty"),
        None => report.issue("result carries no row information"),
    }

    report.check("keyword_overlap");
    let statement = output
        .get("statement")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_lowercase();
    if !statement.is_empty() {
        if query_terms(query).any(|term| statement.contains(&term)) {
            report.strength("statement references terms from the query");
        } else {
            report.issue("statement shares no keywords with the query");
            report.recommend("verify the generated statement targets the asked-for columns");
        }
    }

    report
}

fn review_insight(output: &Value, query: &str) -> RuleReport {
    let mut report = RuleReport::new(TargetCategory::Insight);
    let text = output.as_str().unwrap_or_default();

    report.check("length");
    if text.trim().len() < 40 {
        report.issue("insight text is too short to be informative");
        report.recommend("expand the insight with supporting evidence");
    } else {
        report.strength("insight has substantive length");
    }

    report.check("numeric_evidence");
    if text.chars().any(|c| c.is_ascii_digit()) {
        report.strength("insight cites numeric evidence");
    } else {
        report.issue("insight cites no numbers from the data");
    }

    report.check("hedging");
    let lowered = text.to_lowercase();
    if HEDGING_PHRASES.iter().any(|p| lowered.contains(p)) {
        report.issue("insight hedges instead of concluding");
    }

    report.check("query_relevance");
    if query_terms(query).any(|term| lowered.contains(&term)) {
        report.strength("insight addresses terms from the query");
    }

    report
}

fn review_chart(output: &Value) -> RuleReport {
    let mut report = RuleReport::new(TargetCategory::Chart);

    report.check("chart_type");
    match output.get("chart_type").and_then(|v| v.as_str()) {
        Some(chart_type) if STANDARD_CHART_TYPES.contains(&chart_type) => {
            report.strength(format!("standard chart type '{}'", chart_type));
        }
        Some(chart_type) => {
            report.issue(format!("non-standard chart type '{}'", chart_type));
            report.recommend("fall back to a bar or line chart");
        }
        None => {
            report.issue("chart spec declares no chart type");
        }
    }

    report.check("required_fields");
    let missing: Vec<&str> = REQUIRED_CHART_FIELDS
        .iter()
        .filter(|f| output.get(**f).is_none())
        .copied()
        .collect();
    if missing.is_empty() {
        report.strength("all required chart fields present");
    } else {
        report.issue(format!("missing chart configuration: {}", missing.join(", ")));
        report.recommend("populate axis and title fields before rendering");
    }

    report
}

fn review_generic(output: &Value) -> RuleReport {
    let mut report = RuleReport::new(TargetCategory::Generic);

    report.check("presence");
    let empty = match output {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    };
    if empty {
        report.issue("step produced an empty output");
    } else {
        report.strength("step produced output");
    }

    report.check("error_marker");
    if output.get("error").is_some() {
        report.issue("output carries an error marker");
    }

    report
}

/// Lowercased query words long enough to be meaningful.
fn query_terms(query: &str) -> impl Iterator<Item = String> + '_ {
    query
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}
