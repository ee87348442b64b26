//! C8's field tracker: the live field set plus the per-name event log that
//! backs the final [`crate::LineageIndex`].

use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spl_lineage_ast::DataType;

use crate::effect::{Confidence, DropReason, FieldCreation, FieldModification};

/// One column of a cached lookup-table schema, supplied by the caller via
/// [`AnalysisOptions::lookup_schemas`] (spec §6's `lookupSchemas` option).
#[derive(Clone, Debug, PartialEq)]
pub struct LookupSchemaColumn {
    pub name: String,
    pub data_type: DataType,
}

/// The engine's only configuration surface (spec §6's "Recognized
/// configuration" table): no files, no env vars, passed once per analysis.
#[derive(Clone, Debug, Default)]
pub struct AnalysisOptions {
    pub tracked_commands: Option<HashSet<String>>,
    pub lookup_schemas: Option<HashMap<String, Vec<LookupSchemaColumn>>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, Serialize, Deserialize, JsonSchema)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Created,
    Modified,
    Consumed,
    Dropped,
    /// Part of the stable `Event.kind` contract (spec §6) but never emitted
    /// by the current handler set: a rename is modeled as `dropped(old)` +
    /// `created(new, isRename=true)`, per spec §4.6's rename handler.
    Renamed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    pub kind: EventKind,
    pub stage_index: usize,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub depends_on: Vec<String>,
    pub expression: Option<String>,
    pub data_type: Option<DataType>,
    pub confidence: Option<Confidence>,
}

impl Event {
    fn new(kind: EventKind, stage_index: usize, line: Option<u32>, column: Option<u32>) -> Self {
        Event {
            kind,
            stage_index,
            line,
            column,
            depends_on: Vec::new(),
            expression: None,
            data_type: None,
            confidence: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FieldState {
    Live,
    Dropped,
}

/// One field's lifetime: from a single `created` event through however many
/// `modified`/`consumed` events to an optional `dropped` event. A field name
/// reused after being dropped gets a brand-new `FieldLineage` (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldLineage {
    pub field_name: String,
    pub events: Vec<Event>,
    pub current_state: FieldState,
}

/// Fields treated as always-live at stage 0 so `dependsOn` references to
/// them are valid without a prior `created` event (spec's "synthetic
/// origin" glossary entry).
const SYNTHETIC_ORIGINS: &[&str] = &["_raw", "_time", "source", "sourcetype", "host"];

pub fn is_synthetic_origin(name: &str) -> bool {
    SYNTHETIC_ORIGINS.contains(&name)
}

/// What [`FieldTracker::into_parts`] hands back to the analyzer: every
/// lineage instance, the name-to-most-recent-instance index, and the global
/// pipeline-order event log.
type TrackerParts = (Vec<FieldLineage>, HashMap<String, usize>, Vec<(String, Event)>);

/// Owns every `FieldLineage` instance ever opened and the current live set.
/// `lineages[i]` never moves once pushed, so indices handed out by
/// `live` remain valid for the tracker's whole lifetime.
pub struct FieldTracker<'a> {
    source: &'a str,
    options: &'a AnalysisOptions,
    lineages: Vec<FieldLineage>,
    live: HashMap<String, usize>,
    most_recent: HashMap<String, usize>,
    /// Every event in the exact order it was recorded, i.e. global pipeline
    /// order — `events()` on the final index is this log verbatim.
    event_log: Vec<(String, Event)>,
    stage_index: usize,
    /// Subsearch nesting depth of this tracker's analysis, 0 at the top
    /// level. Read by the subsearch handlers to bound recursion (design
    /// notes: "reject pathological nesting above, say, 32").
    depth: u32,
}

impl<'a> FieldTracker<'a> {
    /// Seeds the live set with the five synthetic origins so that BY/consume
    /// references to them (e.g. `stats count by host`) and their eventual
    /// `rename`/`drop` are ordinary lineage events rather than a special
    /// case (spec glossary: "treated as always-live at stage 0").
    pub fn new(source: &'a str, options: &'a AnalysisOptions, depth: u32) -> Self {
        let mut tracker = FieldTracker {
            source,
            options,
            lineages: Vec::new(),
            live: HashMap::new(),
            most_recent: HashMap::new(),
            event_log: Vec::new(),
            stage_index: 0,
            depth,
        };
        for name in SYNTHETIC_ORIGINS {
            tracker.create_field(&FieldCreation {
                field_name: name.to_string(),
                depends_on: Vec::new(),
                expression: None,
                data_type: None,
                confidence: Confidence::Certain,
                line: None,
                column: None,
                is_rename: false,
            });
        }
        tracker
    }

    pub fn set_stage_index(&mut self, index: usize) {
        self.stage_index = index;
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn subsearch_depth(&self) -> u32 {
        self.depth
    }

    /// Part of the tracker's stable contract (spec §4.7); no handler in this
    /// implementation needs to query liveness before acting, since handlers
    /// only read the stage, but downstream embedders composing custom
    /// handlers will.
    #[allow(dead_code)]
    pub fn contains(&self, name: &str) -> bool {
        self.live.contains_key(name) || is_synthetic_origin(name)
    }

    #[allow(dead_code)]
    pub fn get_existing_fields(&self) -> Vec<&str> {
        self.live.keys().map(String::as_str).collect()
    }

    pub fn get_source_line(&self, line: u32) -> &'a str {
        self.source.lines().nth((line.saturating_sub(1)) as usize).unwrap_or("")
    }

    pub fn lookup_schema(&self, name: &str) -> Option<&Vec<LookupSchemaColumn>> {
        self.options.lookup_schemas.as_ref().and_then(|m| m.get(name))
    }

    pub fn options(&self) -> &AnalysisOptions {
        self.options
    }

    /// Opens a new `FieldLineage` instance for `name`. If a live instance
    /// with the same name already exists, it is closed with an implicit
    /// drop first — spec §4.7's "create takes precedence" rule for e.g.
    /// `stats count AS host by host`.
    pub fn create_field(&mut self, creation: &FieldCreation) {
        let name = creation.field_name.as_str();
        if self.live.contains_key(name) {
            self.close_live(name, DropReason::Implicit, creation.line, creation.column);
        }
        let mut event = Event::new(EventKind::Created, self.stage_index, creation.line, creation.column);
        event.depends_on = creation.depends_on.clone();
        event.expression = creation.expression.clone();
        event.data_type = creation.data_type;
        event.confidence = Some(creation.confidence);
        self.event_log.push((name.to_string(), event.clone()));
        let index = self.lineages.len();
        self.lineages.push(FieldLineage {
            field_name: name.to_string(),
            events: vec![event],
            current_state: FieldState::Live,
        });
        self.live.insert(name.to_string(), index);
        self.most_recent.insert(name.to_string(), index);
        log::trace!("tracker: created field {name}");
    }

    pub fn modify_field(&mut self, modification: &FieldModification) {
        let name = modification.field_name.as_str();
        let Some(&index) = self.live.get(name) else {
            log::warn!("modify() on field '{name}' with no live lineage; treating as a create");
            self.create_field(&FieldCreation {
                field_name: modification.field_name.clone(),
                depends_on: modification.depends_on.clone(),
                expression: None,
                data_type: None,
                confidence: Confidence::Certain,
                line: modification.line,
                column: modification.column,
                is_rename: false,
            });
            return;
        };
        let mut event = Event::new(EventKind::Modified, self.stage_index, modification.line, modification.column);
        event.depends_on = modification.depends_on.clone();
        self.event_log.push((name.to_string(), event.clone()));
        self.lineages[index].events.push(event);
        log::trace!("tracker: modified field {name}");
    }

    pub fn consume_field(&mut self, name: &str, line: Option<u32>, column: Option<u32>) {
        let Some(&index) = self.live.get(name) else {
            if !is_synthetic_origin(name) {
                log::trace!("consume() on field '{name}' with no live lineage; ignoring");
            }
            return;
        };
        let event = Event::new(EventKind::Consumed, self.stage_index, line, column);
        self.event_log.push((name.to_string(), event.clone()));
        self.lineages[index].events.push(event);
    }

    pub fn drop_field(&mut self, name: &str, reason: DropReason, line: Option<u32>, column: Option<u32>) {
        self.close_live(name, reason, line, column);
    }

    fn close_live(
        &mut self,
        name: &str,
        reason: DropReason,
        line: Option<u32>,
        column: Option<u32>,
    ) {
        let Some(index) = self.live.remove(name) else {
            return;
        };
        let _ = reason;
        let event = Event::new(EventKind::Dropped, self.stage_index, line, column);
        self.event_log.push((name.to_string(), event.clone()));
        let lineage = &mut self.lineages[index];
        lineage.events.push(event);
        lineage.current_state = FieldState::Dropped;
        log::trace!("tracker: dropped field {name}");
    }

    pub fn into_parts(self) -> TrackerParts {
        (self.lineages, self.most_recent, self.event_log)
    }

    pub fn live_names(&self) -> HashSet<String> {
        self.live.keys().cloned().collect()
    }
}
