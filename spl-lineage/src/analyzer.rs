//! C8: the analyzer loop. Walks a [`Pipeline`] stage by stage, dispatches
//! each stage through the registry (C6), and folds the resulting
//! [`CommandFieldEffect`] into the field tracker to build a [`LineageIndex`]
//! (spec §4.7).

use std::collections::{HashMap, HashSet};

use spl_lineage_ast::Pipeline;
use spl_lineage_parser::ParseOutcome;

use crate::effect::DropReason;
use crate::index::LineageIndex;
use crate::registry;
use crate::tracker::{AnalysisOptions, FieldTracker};

/// `analyzeLineage(pipeline) -> LineageIndex` (spec §6).
pub fn analyze_lineage(pipeline: &Pipeline, source: &str, options: &AnalysisOptions) -> LineageIndex {
    analyze_pipeline(pipeline, source, options, 0)
}

/// The recursive worker behind [`analyze_lineage`] and the subsearch
/// handlers: each nested subsearch gets its own tracker, isolated from the
/// parent's live set (spec §5's "Shared-resource policy").
pub(crate) fn analyze_pipeline(
    pipeline: &Pipeline,
    source: &str,
    options: &AnalysisOptions,
    depth: u32,
) -> LineageIndex {
    let mut tracker = FieldTracker::new(source, options, depth);
    let mut fields_at_line: HashMap<u32, Vec<String>> = HashMap::new();

    for (stage_index, stage) in pipeline.stages.iter().enumerate() {
        tracker.set_stage_index(stage_index);
        let effect = registry::dispatch(stage, &tracker);

        let consumed_before: HashSet<String> = tracker.live_names();

        for consumption in &effect.consumes {
            tracker.consume_field(&consumption.field_name, consumption.line, consumption.column);
        }
        for modification in &effect.modifies {
            tracker.modify_field(modification);
        }
        for creation in &effect.creates {
            tracker.create_field(creation);
        }

        let drop_set = if effect.preserves_all {
            effect.drops.iter().map(|d| d.field_name.clone()).collect::<HashSet<_>>()
        } else if let Some(except) = &effect.drops_all_except {
            let except: HashSet<&str> = except.iter().map(String::as_str).collect();
            let mut base = consumed_before;
            base.extend(effect.creates.iter().map(|c| c.field_name.clone()));
            base.extend(effect.modifies.iter().map(|m| m.field_name.clone()));
            let mut set: HashSet<String> = base.into_iter().filter(|n| !except.contains(n.as_str())).collect();
            set.extend(effect.drops.iter().map(|d| d.field_name.clone()));
            set
        } else {
            effect.drops.iter().map(|d| d.field_name.clone()).collect()
        };

        let explicit: HashMap<&str, &crate::effect::FieldDrop> =
            effect.drops.iter().map(|d| (d.field_name.as_str(), d)).collect();
        for name in &drop_set {
            if let Some(d) = explicit.get(name.as_str()) {
                tracker.drop_field(&d.field_name, d.reason, d.line, d.column);
            } else {
                tracker.drop_field(name, DropReason::Implicit, None, None);
            }
        }

        let live_snapshot: Vec<String> = {
            let mut names: Vec<String> = tracker.live_names().into_iter().collect();
            names.sort();
            names
        };
        let location = stage.location();
        for line in location.line..=location.end_line {
            fields_at_line.insert(line, live_snapshot.clone());
        }
    }

    let (lineages, most_recent, event_log) = tracker.into_parts();
    LineageIndex::new(lineages, most_recent, event_log, fields_at_line)
}

/// `analyze(text) -> { ast, errors, lineage }` (spec §6's convenience
/// composition).
pub struct AnalysisResult {
    pub ast: Option<Pipeline>,
    pub parse_errors: Vec<spl_lineage_parser::ParseError>,
    pub lex_errors: Vec<spl_lineage_parser::LexError>,
    pub lineage: LineageIndex,
}

pub fn analyze(text: &str, options: &AnalysisOptions) -> AnalysisResult {
    let ParseOutcome { ast, parse_errors, lex_errors } = spl_lineage_parser::parse_spl(text);
    let lineage = match &ast {
        Some(pipeline) => analyze_lineage(pipeline, text, options),
        None => LineageIndex::default(),
    };
    AnalysisResult { ast, parse_errors, lex_errors, lineage }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::effect::Confidence;
    use crate::tracker::EventKind;
    use spl_lineage_ast::DataType;

    fn run(text: &str) -> AnalysisResult {
        analyze(text, &AnalysisOptions::default())
    }

    #[test]
    fn eval_creates_a_certain_number_field() {
        let result = run("index=main | eval x=1");
        let lineage = result.lineage.get_field_lineage("x").expect("x should exist");
        assert_eq!(lineage.events.len(), 1);
        let event = &lineage.events[0];
        assert_eq!(event.kind, EventKind::Created);
        assert!(event.depends_on.is_empty());
        assert_eq!(event.data_type, Some(DataType::Number));
        assert_eq!(event.confidence, Some(Confidence::Certain));
    }

    #[test]
    fn rex_creates_a_likely_string_field_depending_on_raw() {
        let result = run(r#"index=main | rex field=_raw "status=(?<status>\d+)""#);
        let lineage = result.lineage.get_field_lineage("status").expect("status should exist");
        let event = &lineage.events[0];
        assert_eq!(event.depends_on, vec!["_raw".to_string()]);
        assert_eq!(event.confidence, Some(Confidence::Likely));
        assert_eq!(event.data_type, Some(DataType::String));
    }

    #[test]
    fn stats_drops_fields_outside_by_and_aggregates() {
        let result = run("index=main | eval foo=1, bar=2 | stats count by host");
        let fields = result.lineage.get_fields_at_line(1);
        assert!(fields.iter().any(|f| f == "count"));
        assert!(fields.iter().any(|f| f == "host"));
        assert!(!fields.iter().any(|f| f == "foo"));
        let foo = result.lineage.get_field_lineage("foo").expect("foo recorded");
        assert_eq!(foo.current_state, crate::tracker::FieldState::Dropped);
    }

    #[test]
    fn eventstats_preserves_earlier_fields_for_later_dependency() {
        let result = run("index=main | eval a=1 | eventstats count by host | eval b=a+count");
        let b = result.lineage.get_field_lineage("b").expect("b should exist");
        let depends_on: HashSet<String> = b.events[0].depends_on.iter().cloned().collect();
        assert!(depends_on.contains("a"));
        assert!(depends_on.contains("count"));
    }

    #[test]
    fn rename_closes_old_lineage_and_opens_a_rename_event() {
        let result = run(r#"index=main | rename _raw AS raw_data | rex field=raw_data "(?<x>\d+)""#);
        let x = result.lineage.get_field_lineage("x").expect("x should exist");
        assert_eq!(x.events[0].depends_on, vec!["raw_data".to_string()]);
        let raw_data = result.lineage.get_field_lineage("raw_data").expect("raw_data should exist");
        assert!(raw_data.events.iter().any(|e| e.kind == EventKind::Created));
    }

    #[test]
    fn transaction_creates_duration_and_eventcount() {
        let result = run("index=main | transaction sessionid");
        for name in ["duration", "eventcount"] {
            let lineage = result.lineage.get_field_lineage(name).unwrap_or_else(|| panic!("{name} should exist"));
            let event = &lineage.events[0];
            assert_eq!(event.data_type, Some(DataType::Number));
            assert_eq!(event.confidence, Some(Confidence::Certain));
            assert!(event.depends_on.is_empty());
        }
        let sessionid = result.lineage.get_field_lineage("sessionid");
        assert!(sessionid.is_none() || sessionid.unwrap().events.iter().any(|e| e.kind == EventKind::Consumed));
    }

    #[test]
    fn iplocation_creates_five_geo_fields() {
        let result = run("index=main | iplocation prefix=geo_ clientip");
        for (name, expected_type) in [
            ("geo_city", DataType::String),
            ("geo_country", DataType::String),
            ("geo_lat", DataType::Number),
            ("geo_lon", DataType::Number),
            ("geo_region", DataType::String),
        ] {
            let lineage = result.lineage.get_field_lineage(name).unwrap_or_else(|| panic!("{name} should exist"));
            let event = &lineage.events[0];
            assert_eq!(event.data_type, Some(expected_type));
            assert_eq!(event.depends_on, vec!["clientip".to_string()]);
        }
    }

    #[test]
    fn no_field_creation_ever_carries_a_wildcard_name() {
        let result = run("index=main | table host*, user | eval z=1");
        for name in result.lineage.get_all_fields() {
            assert!(!name.contains('*'), "wildcard leaked into a concrete field name: {name}");
        }
    }

    #[test]
    fn table_drops_everything_not_listed() {
        let result = run("index=main | eval foo=1 | table host");
        let fields = result.lineage.get_fields_at_line(1);
        assert!(fields.iter().any(|f| f == "host"));
        assert!(!fields.iter().any(|f| f == "foo"));
        assert!(!fields.iter().any(|f| f == "_raw"));
    }

    #[test]
    fn fields_exclude_mode_drops_only_the_named_fields() {
        let result = run("index=main | eval foo=1 | fields - foo");
        let fields = result.lineage.get_fields_at_line(1);
        assert!(!fields.iter().any(|f| f == "foo"));
        assert!(fields.iter().any(|f| f == "host"));
    }

    #[test]
    fn join_subsearch_fields_become_likely_creates_depending_on_join_keys() {
        let result = run("index=main | join sessionid [ search index=other | eval score=1 ]");
        let score = result.lineage.get_field_lineage("score").expect("score should exist");
        let event = &score.events[0];
        assert_eq!(event.confidence, Some(Confidence::Likely));
        assert_eq!(event.depends_on, vec!["sessionid".to_string()]);
    }

    #[test]
    fn lookup_output_rescue_recovers_field_names_from_source_text() {
        let result = run("index=main | lookup users uid OUTPUT username, department");
        for name in ["username", "department"] {
            let lineage = result.lineage.get_field_lineage(name);
            assert!(lineage.is_some(), "{name} should be recovered by the OUTPUT rescue");
        }
    }

    #[test]
    fn events_are_reported_in_global_pipeline_order() {
        let result = run("index=main | eval a=1 | eval b=2");
        let stages: Vec<usize> = result.lineage.events().map(|(_, e)| e.stage_index).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
    }
}
