//! C6: maps every recognized command to a handler, by the fixed resolution
//! order of spec §4.5: tracked-filter → name lookup → variant lookup →
//! pattern interpreter → extract special-case → pass-through.

use std::collections::HashMap;
use std::mem::discriminant;
use std::sync::OnceLock;

use spl_lineage_ast::{Location, PipelineStage};

use crate::effect::CommandFieldEffect;
use crate::handlers;
use crate::pattern::{self, Pattern};
use crate::tracker::FieldTracker;

pub type Handler = fn(&PipelineStage, &FieldTracker) -> CommandFieldEffect;

fn dummy_loc() -> Location {
    Location::new(0, 0, 0, 0)
}

/// A representative instance of each variant this map dispatches on, used
/// only to compute `std::mem::discriminant` — the fields are never read.
fn field_alias_variants() -> Vec<(PipelineStage, Handler)> {
    let dummy_alias = spl_lineage_ast::FieldAlias {
        field: spl_lineage_ast::FieldRef::new("_", dummy_loc()),
        alias: None,
    };
    vec![
        (
            PipelineStage::BinCommand {
                target: dummy_alias.clone(),
                span: None,
                location: dummy_loc(),
            },
            handlers::field_alias_handler as Handler,
        ),
        (
            PipelineStage::DeltaCommand {
                target: dummy_alias.clone(),
                location: dummy_loc(),
            },
            handlers::field_alias_handler as Handler,
        ),
        (
            PipelineStage::AccumCommand {
                target: dummy_alias.clone(),
                location: dummy_loc(),
            },
            handlers::field_alias_handler as Handler,
        ),
        (
            PipelineStage::AutoregressCommand {
                target: dummy_alias.clone(),
                location: dummy_loc(),
            },
            handlers::field_alias_handler as Handler,
        ),
        (
            PipelineStage::BucketdirCommand {
                target: dummy_alias,
                location: dummy_loc(),
            },
            handlers::field_alias_handler as Handler,
        ),
    ]
}

fn name_handlers() -> &'static HashMap<&'static str, Handler> {
    static MAP: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut m: HashMap<&'static str, Handler> = HashMap::new();
        m.insert("eval", handlers::eval_handler);
        m.insert("setfields", handlers::eval_handler);
        m.insert("stats", handlers::stats_handler);
        m.insert("eventstats", handlers::stats_handler);
        m.insert("streamstats", handlers::stats_handler);
        m.insert("chart", handlers::stats_handler);
        m.insert("timechart", handlers::stats_handler);
        m.insert("tstats", handlers::tstats_handler);
        m.insert("rex", handlers::rex_handler);
        m.insert("rename", handlers::rename_handler);
        m.insert("lookup", handlers::lookup_handler);
        m.insert("inputlookup", handlers::inputlookup_handler);
        m.insert("spath", handlers::spath_handler);
        m.insert("transaction", handlers::transaction_handler);
        m.insert("iplocation", handlers::iplocation_handler);
        m.insert("table", handlers::table_handler);
        m.insert("fields", handlers::fields_handler);
        m.insert("top", handlers::top_handler);
        m.insert("rare", handlers::top_handler);
        m.insert("strcat", handlers::strcat_handler);
        m.insert("convert", handlers::convert_handler);
        m.insert("append", handlers::subsearch_handler);
        m.insert("appendcols", handlers::subsearch_handler);
        m.insert("join", handlers::subsearch_handler);
        m.insert("union", handlers::subsearch_handler);
        m.insert("contingency", handlers::contingency_handler);
        m.insert("xyseries", handlers::xyseries_handler);
        m.insert("xpath", handlers::xpath_handler);
        m.insert("erex", handlers::erex_handler);
        m.insert("makeresults", handlers::makeresults_handler);
        m.insert("addtotals", handlers::addtotals_handler);
        m.insert("inputcsv", handlers::inputcsv_handler);
        m.insert("fieldsummary", handlers::fieldsummary_handler);
        m.insert("addcoltotals", handlers::addcoltotals_handler);
        m.insert("concurrency", handlers::concurrency_handler);
        m.insert("search", handlers::search_handler);
        m
    })
}

fn variant_handlers() -> &'static HashMap<std::mem::Discriminant<PipelineStage>, Handler> {
    static MAP: OnceLock<HashMap<std::mem::Discriminant<PipelineStage>, Handler>> = OnceLock::new();
    MAP.get_or_init(|| {
        field_alias_variants()
            .into_iter()
            .map(|(stage, handler)| (discriminant(&stage), handler))
            .collect()
    })
}

fn pattern_handlers() -> &'static HashMap<&'static str, Pattern> {
    static MAP: OnceLock<HashMap<&'static str, Pattern>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut m: HashMap<&'static str, Pattern> = HashMap::new();
        m.insert("where", Pattern { consumes: pattern::where_consumes });
        m.insert("dedup", Pattern { consumes: pattern::dedup_consumes });
        m.insert("replace", Pattern { consumes: pattern::replace_consumes });
        m.insert("makemv", Pattern { consumes: pattern::makemv_consumes });
        m.insert("nomv", Pattern { consumes: pattern::nomv_consumes });
        m.insert(
            "makecontinuous",
            Pattern { consumes: pattern::makecontinuous_consumes },
        );
        m.insert("multikv", Pattern { consumes: pattern::multikv_consumes });
        m.insert("kv", Pattern { consumes: pattern::kv_consumes });
        m.insert("xmlkv", Pattern { consumes: pattern::xmlkv_consumes });
        m.insert(
            "xmlunescape",
            Pattern { consumes: pattern::xmlunescape_consumes },
        );
        m.insert("geom", Pattern { consumes: pattern::geom_consumes });
        m.insert("reltime", Pattern { consumes: pattern::reltime_consumes });
        m.insert("tags", Pattern { consumes: pattern::tags_consumes });
        m.insert("timewrap", Pattern { consumes: pattern::timewrap_consumes });
        m.insert("return", Pattern { consumes: pattern::return_consumes });
        m.insert("typer", Pattern { consumes: pattern::typer_consumes });
        m
    })
}

fn pass_through(_stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    CommandFieldEffect::pass_through()
}

/// Resolves a handler for `stage` per spec §4.5's six-step order, then
/// invokes it. `tracked_commands`, when present, is consulted before any
/// other step.
pub fn dispatch(stage: &PipelineStage, tracker: &FieldTracker) -> CommandFieldEffect {
    let name = stage.command_name();

    if let Some(tracked) = &tracker.options().tracked_commands {
        if !tracked.contains(name) {
            return CommandFieldEffect::pass_through();
        }
    }

    if let Some(handler) = name_handlers().get(name) {
        return handler(stage, tracker);
    }

    if let Some(handler) = variant_handlers().get(&discriminant(stage)) {
        return handler(stage, tracker);
    }

    if let Some(pattern) = pattern_handlers().get(name) {
        return pattern::interpret_pattern(pattern, stage);
    }

    if let PipelineStage::GenericCommand { command_name, .. } = stage {
        if command_name.eq_ignore_ascii_case("extract") {
            return handlers::extract_handler(stage, tracker);
        }
    }

    pass_through(stage, tracker)
}
