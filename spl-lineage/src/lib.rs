//! Static field-lineage analysis for SPL pipelines.
//!
//! [`analyze`] is the one-shot entry point: parse text, then walk the
//! resulting [`Pipeline`] stage by stage, dispatching each stage through a
//! command handler (or a shared pattern, for the commands whose effect is
//! "consume some fields, preserve the rest") to build a queryable
//! [`LineageIndex`].

mod analyzer;
mod effect;
mod handlers;
mod index;
mod pattern;
mod registry;
mod tracker;

pub use analyzer::{analyze, analyze_lineage, AnalysisResult};
pub use effect::{
    CommandFieldEffect, Confidence, DropReason, FieldConsumption, FieldCreation, FieldDrop,
    FieldModification,
};
pub use index::LineageIndex;
pub use spl_lineage_ast::Pipeline;
pub use tracker::{AnalysisOptions, Event, EventKind, FieldLineage, FieldState, LookupSchemaColumn};
