//! The analyzer's output: a queryable index over every field lineage and a
//! per-line snapshot of the live set (spec §4.7 "Output materialization").

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tracker::{Event, FieldLineage};

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LineageIndex {
    lineages: Vec<FieldLineage>,
    most_recent: HashMap<String, usize>,
    event_log: Vec<(String, Event)>,
    /// Live field names after the stage occupying each line, built by
    /// snapshotting the live set once per stage during the analyzer loop.
    fields_at_line: HashMap<u32, Vec<String>>,
}

impl LineageIndex {
    pub(crate) fn new(
        lineages: Vec<FieldLineage>,
        most_recent: HashMap<String, usize>,
        event_log: Vec<(String, Event)>,
        fields_at_line: HashMap<u32, Vec<String>>,
    ) -> Self {
        LineageIndex {
            lineages,
            most_recent,
            event_log,
            fields_at_line,
        }
    }

    pub fn get_field_lineage(&self, name: &str) -> Option<&FieldLineage> {
        self.most_recent.get(name).map(|&i| &self.lineages[i])
    }

    pub fn get_all_fields(&self) -> Vec<&str> {
        self.most_recent.keys().map(String::as_str).collect()
    }

    pub fn get_fields_at_line(&self, line: u32) -> &[String] {
        self.fields_at_line
            .get(&line)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every event across every field, in global pipeline order: the order
    /// `FieldTracker`'s mutation methods were actually called in, not grouped
    /// by field (spec §6).
    pub fn events(&self) -> impl Iterator<Item = (&str, &Event)> {
        self.event_log.iter().map(|(name, e)| (name.as_str(), e))
    }

    /// Serializes the whole index to JSON — the interchange format callers
    /// outside this crate (a dashboard, a CI gate) consume spec §6's output
    /// through, the same role `JsonSchema`/`serde_json` play for the
    /// teacher's own parser/IR types.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn serializes_to_json_and_back() {
        let mut most_recent = HashMap::new();
        most_recent.insert("host".to_string(), 0usize);
        let mut fields_at_line = HashMap::new();
        fields_at_line.insert(1u32, vec!["host".to_string()]);
        let index = LineageIndex::new(
            vec![FieldLineage {
                field_name: "host".to_string(),
                events: Vec::new(),
                current_state: crate::tracker::FieldState::Live,
            }],
            most_recent,
            Vec::new(),
            fields_at_line,
        );

        let json = index.to_json().expect("serialization should succeed");
        assert!(json.contains("\"host\""));
        let round_tripped: LineageIndex =
            serde_json::from_str(&json).expect("deserialization should succeed");
        assert_eq!(round_tripped.get_all_fields(), vec!["host"]);
    }
}
