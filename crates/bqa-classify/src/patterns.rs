//! Intent pattern families.
//!
//! One regex family per intent category; any match adds that category to
//! the detected set. Families are immutable configuration: the built-in
//! table mirrors production, and a YAML loader exists so tests can
//! substitute fixtures.

use bqa_core::Intent;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::str::FromStr;

/// Terms that signal statistically-loaded queries; used by the complexity
/// heuristic.
pub const STAT_TERMS: &[&str] = &[
    "average", "mean", "median", "sum", "total", "count", "correlation", "variance", "deviation",
    "percent", "percentage", "distribution", "forecast", "growth", "minimum", "maximum",
    "quartile", "outlier",
];

/// Compiled pattern families in fixed detection order.
#[derive(Debug, Clone)]
pub struct IntentPatterns {
    families: Vec<(Intent, Vec<Regex>)>,
    time_refs: Regex,
}

/// YAML shape for substitutable pattern fixtures.
#[derive(Debug, Deserialize)]
struct PatternsFile {
    version: String,
    families: Vec<FamilySpec>,
}

#[derive(Debug, Deserialize)]
struct FamilySpec {
    intent: String,
    patterns: Vec<String>,
}

impl IntentPatterns {
    /// The fixed production families.
    pub fn builtin() -> Self {
        let families = vec![
            (
                Intent::DataExploration,
                compile(&[
                    r"\b(show|display|list|preview|browse)\b.*\b(data|dataset|table|rows|columns|records)\b",
                    r"\bwhat\s+(columns|fields|tables)\b",
                    r"\b(explore|inspect|look at)\b.*\bdata\b",
                    r"\b(first|top)\s+\d+\s+rows\b",
                ]),
            ),
            (
                Intent::Visualization,
                compile(&[
                    r"\b(chart|plot|graph|visuali[sz]e|visuali[sz]ation)\b",
                    r"\b(bar|line|pie|scatter|histogram|area)\s+(chart|plot|graph)\b",
                    r"\bdraw\b",
                    r"\bover time\b",
                ]),
            ),
            (
                Intent::InsightGeneration,
                compile(&[
                    r"\b(insight|analy[sz]e|analysis|pattern|anomal(y|ies)|correlat\w*)\b",
                    r"\bwhy\b.*\b(did|is|are|does)\b",
                    r"\bwhat\s+(drives|explains|caused|changed)\b",
                    r"\b(key\s+)?(findings|takeaways?)\b",
                ]),
            ),
            (
                Intent::SqlQuery,
                compile(&[
                    r"\b(sum|count|average|avg|min|max)\b.*\b(of|by|per)\b",
                    r"\b(group(ed)?\s+by|filter(ed)?\s+(by|where)|order(ed)?\s+by)\b",
                    r"\bhow\s+(many|much)\b",
                    r"\btop\s+\d+\b",
                ]),
            ),
            (
                Intent::ReportGeneration,
                compile(&[
                    r"\b(report|summar(y|ize|ise)|overview|briefing)\b",
                    r"\b(full|complete|comprehensive|executive)\s+(analysis|report|breakdown|summary)\b",
                    r"\bdashboard\b",
                ]),
            ),
        ];

        let time_refs = RegexBuilder::new(
            r"\b(year(ly)?|month(ly)?|week(ly)?|quarter(ly)?|da(y|ily)|today|yesterday|last|since|until|trend|over time|q[1-4]|\d{4})\b",
        )
        .case_insensitive(true)
        .build()
        .expect("time reference regex is valid");

        Self { families, time_refs }
    }

    /// Load substitute families from YAML (test fixtures, tenant overrides).
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let file: PatternsFile =
            serde_yaml::from_str(yaml).map_err(|e| format!("failed to parse patterns YAML: {}", e))?;
        if file.version.trim().is_empty() {
            return Err("patterns file missing version".to_string());
        }

        let mut families = Vec::new();
        for family in file.families {
            let intent = Intent::from_str(&family.intent)?;
            let mut compiled = Vec::new();
            for pattern in &family.patterns {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| format!("invalid pattern for {}: {}", intent, e))?;
                compiled.push(regex);
            }
            families.push((intent, compiled));
        }

        let builtin = Self::builtin();
        Ok(Self {
            families,
            time_refs: builtin.time_refs,
        })
    }

    /// Detected categories in family order, each at most once.
    pub fn detect(&self, query: &str) -> Vec<Intent> {
        self.families
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(query)))
            .map(|(intent, _)| *intent)
            .collect()
    }

    pub fn has_time_refs(&self, query: &str) -> bool {
        self.time_refs.is_match(query)
    }

    /// How many distinct statistically-loaded terms appear in the query.
    pub fn stat_term_count(&self, query: &str) -> usize {
        let lowered = query.to_lowercase();
        STAT_TERMS.iter().filter(|t| lowered.contains(**t)).count()
    }
}

impl Default for IntentPatterns {
    fn default() -> Self {
        Self::builtin()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("builtin pattern is valid")
        })
        .collect()
}
