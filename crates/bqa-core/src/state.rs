//! Workflow State: shared key/value context threaded through one request.
use crate::agent::PartialState;
use serde_json::Value;
use std::collections::HashMap;

/// Well-known state keys shared between the orchestrator and step agents.
pub mod keys {
    pub const SESSION_ID: &str = "session_id";
    pub const QUERY: &str = "query";
    pub const FILE_CONTEXT: &str = "file_context";
    pub const QUALITY_ASSESSMENT: &str = "quality_assessment";
    pub const CRITIQUE_REPORT: &str = "critique_report";
    pub const SQL_RESULT: &str = "sql_result";
    pub const INSIGHT: &str = "insight";
    pub const CHART_SPEC: &str = "chart_spec";
    pub const NARRATIVE: &str = "narrative";
    pub const REPORT: &str = "report";
    pub const DEBATE_RESOLUTION: &str = "debate_resolution";
}

/// Mutable key/value context owned by the orchestrator for one request.
///
/// Steps receive it by reference and return new keys as a `PartialState`;
/// the orchestrator merges those back. Once merged, a key is visible to
/// every subsequent step in execution order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    values: HashMap<String, Value>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a state from initial entries (session id, query text, ...).
    pub fn seeded(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge a step's returned keys into the state, last write wins.
    ///
    /// Returns the keys that already existed and were replaced, so the
    /// caller can flag ambiguous writes within a parallel group.
    pub fn merge(&mut self, partial: PartialState) -> Vec<String> {
        let mut replaced = Vec::new();
        for (key, value) in partial {
            if self.values.insert(key.clone(), value).is_some() {
                replaced.push(key);
            }
        }
        replaced
    }

    /// Deserialize a stored value into a typed view.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Project a subset of keys, used when composing fallback results.
    pub fn subset(&self, wanted: &[&str]) -> HashMap<String, Value> {
        wanted
            .iter()
            .filter_map(|k| self.values.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect()
    }
}
