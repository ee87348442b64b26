//! C7: one function per command family. Each handler is pure — it reads the
//! stage and the tracker's live-set snapshot and returns a
//! [`CommandFieldEffect`]; it never mutates the tracker itself (spec §4.6).

use std::collections::HashSet;

use itertools::Itertools;
use spl_lineage_ast::{DataType, FieldAlias, FieldRef, PipelineStage, StatsVariant};

use crate::effect::{
    CommandFieldEffect, Confidence, DropReason, FieldConsumption, FieldCreation, FieldDrop,
    FieldModification,
};
use crate::tracker::FieldTracker;

fn consume(effect: &mut CommandFieldEffect, field: &FieldRef) {
    if field.is_wildcard {
        return;
    }
    effect.consumes.push(FieldConsumption {
        field_name: field.name.clone(),
        line: Some(field.location.line),
        column: Some(field.location.column),
    });
}

/// Consumes `fields`, deduplicated by name, keeping the first occurrence's
/// location (spec §4.6's stats bullet: "Deduplicate consumes by field name,
/// keeping first occurrence with its location").
fn consume_deduped<'a>(effect: &mut CommandFieldEffect, fields: impl IntoIterator<Item = &'a FieldRef>) {
    for field in fields.into_iter().unique_by(|f| f.name.clone()) {
        consume(effect, field);
    }
}

fn aggregation_data_type(function: &str) -> DataType {
    match function.to_ascii_lowercase().as_str() {
        "values" | "list" | "first" | "last" => DataType::String,
        _ => DataType::Number,
    }
}

// ---- Eval / Setfields ----------------------------------------------------

pub fn eval_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let assignments = match stage {
        PipelineStage::EvalCommand { assignments, .. } => assignments,
        PipelineStage::SetfieldsCommand { assignments, .. } => assignments,
        _ => return CommandFieldEffect::pass_through(),
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    let mut seen = HashSet::new();
    for assignment in assignments {
        let referenced = assignment.expr.referenced_fields();
        effect.creates.push(FieldCreation {
            field_name: assignment.target.name.clone(),
            depends_on: referenced.iter().map(|f| f.name.clone()).collect(),
            expression: Some(assignment.expr.render()),
            data_type: Some(assignment.expr.infer_type()),
            confidence: Confidence::Certain,
            line: Some(assignment.target.location.line),
            column: Some(assignment.target.location.column),
            is_rename: false,
        });
        for field in &referenced {
            if seen.insert(field.name.clone()) {
                consume(&mut effect, field);
            }
        }
    }
    effect
}

// ---- Stats family / Tstats ------------------------------------------------

pub fn stats_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::StatsCommand { variant, aggregations, by_fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    let created_names = build_aggregation_creates(&mut effect, aggregations);
    consume_deduped(&mut effect, by_fields.iter());
    consume_deduped(
        &mut effect,
        aggregations.iter().filter_map(|a| a.field.as_ref()),
    );
    let mut except: Vec<String> = by_fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect();
    except.extend(created_names);
    if matches!(variant, StatsVariant::Timechart) {
        effect.consumes.push(FieldConsumption { field_name: "_time".to_string(), line: None, column: None });
        except.push("_time".to_string());
    }
    match variant {
        StatsVariant::Stats | StatsVariant::Chart | StatsVariant::Timechart => {
            effect.drops_all_except = Some(except);
        }
        StatsVariant::Eventstats | StatsVariant::Streamstats => {
            effect.preserves_all = true;
        }
    }
    effect
}

pub fn tstats_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::TstatsCommand { aggregations, by_fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    let created_names = build_aggregation_creates(&mut effect, aggregations);
    consume_deduped(&mut effect, by_fields.iter());
    consume_deduped(
        &mut effect,
        aggregations.iter().filter_map(|a| a.field.as_ref()),
    );
    let mut except: Vec<String> = created_names;
    except.extend(by_fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()));
    effect.drops_all_except = Some(except);
    effect
}

fn build_aggregation_creates(
    effect: &mut CommandFieldEffect,
    aggregations: &[spl_lineage_ast::Aggregation],
) -> Vec<String> {
    let mut names = Vec::new();
    for agg in aggregations {
        let field_name = agg.alias.as_ref().map(|a| a.name.clone()).unwrap_or_else(|| match &agg.field {
            Some(field) => format!("{}({})", agg.function, field.name),
            None => agg.function.clone(),
        });
        let depends_on = agg.field.iter().map(|f| f.name.clone()).collect();
        let location = agg.alias.as_ref().map(|a| a.location).unwrap_or(agg.location);
        names.push(field_name.clone());
        effect.creates.push(FieldCreation {
            field_name,
            depends_on,
            expression: None,
            data_type: Some(aggregation_data_type(&agg.function)),
            confidence: Confidence::Certain,
            line: Some(location.line),
            column: Some(location.column),
            is_rename: false,
        });
    }
    names
}

// ---- Rex -------------------------------------------------------------------

pub fn rex_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::RexCommand { source_field, pattern, extracted_fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    let source_name = source_field.as_ref().map(|f| f.name.clone()).unwrap_or_else(|| "_raw".to_string());
    if let Some(field) = source_field {
        consume(&mut effect, field);
    } else {
        effect.consumes.push(FieldConsumption { field_name: source_name.clone(), line: None, column: None });
    }
    for extracted in extracted_fields {
        effect.creates.push(FieldCreation {
            field_name: extracted.name.clone(),
            depends_on: vec![source_name.clone()],
            expression: Some(format!("rex field={source_name} \"{pattern}\"")),
            data_type: Some(DataType::String),
            confidence: Confidence::Likely,
            line: Some(extracted.location.line),
            column: Some(extracted.location.column),
            is_rename: false,
        });
    }
    effect
}

// ---- Rename ----------------------------------------------------------------

pub fn rename_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::RenameCommand { renamings, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for renaming in renamings {
        if renaming.old.is_wildcard || renaming.new.is_wildcard {
            continue;
        }
        effect.creates.push(FieldCreation {
            field_name: renaming.new.name.clone(),
            depends_on: vec![renaming.old.name.clone()],
            expression: Some(format!("{} AS {}", renaming.old.name, renaming.new.name)),
            data_type: None,
            confidence: Confidence::Certain,
            line: Some(renaming.new.location.line),
            column: Some(renaming.new.location.column),
            is_rename: true,
        });
        effect.drops.push(FieldDrop {
            field_name: renaming.old.name.clone(),
            reason: DropReason::Explicit,
            line: Some(renaming.old.location.line),
            column: Some(renaming.old.location.column),
        });
    }
    effect
}

// ---- Lookup / Inputlookup ----------------------------------------------------

pub fn lookup_handler(stage: &PipelineStage, tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::LookupCommand { input_mappings, output_mappings, output_rescued, location, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    let mut input_names = Vec::new();
    for mapping in input_mappings {
        consume(&mut effect, &mapping.lookup_field);
        input_names.push(mapping.lookup_field.name.clone());
        if mapping.event_field.name != mapping.lookup_field.name {
            consume(&mut effect, &mapping.event_field);
        }
    }
    if !output_mappings.is_empty() {
        for mapping in output_mappings {
            effect.creates.push(FieldCreation {
                field_name: mapping.event_field.name.clone(),
                depends_on: input_names.clone(),
                expression: None,
                data_type: Some(DataType::Unknown),
                confidence: Confidence::Likely,
                line: Some(mapping.event_field.location.line),
                column: Some(mapping.event_field.location.column),
                is_rename: false,
            });
        }
    } else if *output_rescued {
        let source_line = tracker.get_source_line(location.line);
        for name in rescue_output_fields(source_line) {
            effect.creates.push(FieldCreation {
                field_name: name,
                depends_on: input_names.clone(),
                expression: None,
                data_type: Some(DataType::Unknown),
                confidence: Confidence::Likely,
                line: Some(location.line),
                column: None,
                is_rename: false,
            });
        }
    }
    effect
}

/// The textual fallback described in the design notes as `/output(?:new)?(.+)/i`:
/// finds the `OUTPUT`/`OUTPUTNEW` keyword and splits the remainder of the
/// line on commas and `AS`, keeping only the right-hand (event-field) side of
/// each mapping.
fn rescue_output_fields(source_line: &str) -> Vec<String> {
    let upper = source_line.to_ascii_uppercase();
    let keyword_pos = upper.find("OUTPUTNEW").map(|i| i + "OUTPUTNEW".len())
        .or_else(|| upper.find("OUTPUT").map(|i| i + "OUTPUT".len()));
    let Some(pos) = keyword_pos else { return Vec::new() };
    source_line[pos..]
        .split(',')
        .filter_map(|chunk| {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                return None;
            }
            let name = match chunk.split_whitespace().collect::<Vec<_>>().as_slice() {
                [_lookup_field, "AS", alias] | [_lookup_field, "as", alias] => *alias,
                [only] => *only,
                parts => parts.last().copied().unwrap_or(chunk),
            };
            Some(name.to_string())
        })
        .collect()
}

pub fn inputlookup_handler(stage: &PipelineStage, tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::InputlookupCommand { lookup_name, location } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    if let Some(columns) = tracker.lookup_schema(lookup_name) {
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        for column in columns {
            effect.creates.push(FieldCreation {
                field_name: column.name.clone(),
                depends_on: Vec::new(),
                expression: None,
                data_type: Some(column.data_type),
                confidence: Confidence::Certain,
                line: Some(location.line),
                column: None,
                is_rename: false,
            });
        }
        effect.drops_all_except = Some(names);
    } else {
        effect.preserves_all = true;
        effect.creates.push(FieldCreation {
            field_name: "(lookup_fields)".to_string(),
            depends_on: Vec::new(),
            expression: None,
            data_type: Some(DataType::Unknown),
            confidence: Confidence::Unknown,
            line: Some(location.line),
            column: None,
            is_rename: false,
        });
    }
    effect
}

// ---- Table / Fields ---------------------------------------------------------

pub fn table_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::TableCommand { fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    table_like_effect(fields)
}

fn table_like_effect(fields: &[FieldRef]) -> CommandFieldEffect {
    let mut effect = CommandFieldEffect::pass_through();
    if fields.iter().any(|f| f.is_wildcard && f.name == "*") {
        effect.preserves_all = true;
        return effect;
    }
    let mut kept = Vec::new();
    for field in fields {
        consume(&mut effect, field);
        if !field.is_wildcard {
            kept.push(field.name.clone());
        }
    }
    effect.drops_all_except = Some(kept);
    effect
}

pub fn fields_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::FieldsCommand { mode, fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    match mode {
        spl_lineage_ast::FieldsMode::Include => table_like_effect(fields),
        spl_lineage_ast::FieldsMode::Exclude => {
            let mut effect = CommandFieldEffect::pass_through();
            for field in fields {
                if field.is_wildcard {
                    continue;
                }
                effect.drops.push(FieldDrop {
                    field_name: field.name.clone(),
                    reason: DropReason::Explicit,
                    line: Some(field.location.line),
                    column: Some(field.location.column),
                });
            }
            effect
        }
    }
}

// ---- Top / Rare --------------------------------------------------------------

pub fn top_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let (fields, by_fields, count_field, percent_field) = match stage {
        PipelineStage::TopCommand { fields, by_fields, count_field, percent_field, .. } => {
            (fields, by_fields, count_field, percent_field)
        }
        PipelineStage::RareCommand { fields, by_fields, count_field, percent_field, .. } => {
            (fields, by_fields, count_field, percent_field)
        }
        _ => return CommandFieldEffect::pass_through(),
    };
    let mut effect = CommandFieldEffect::pass_through();
    consume_deduped(&mut effect, fields.iter().chain(by_fields.iter()));
    let analyzed_names: Vec<String> = fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect();
    effect.creates.push(FieldCreation {
        field_name: count_field.name.clone(),
        depends_on: analyzed_names.clone(),
        expression: None,
        data_type: Some(DataType::Number),
        confidence: Confidence::Certain,
        line: Some(count_field.location.line),
        column: Some(count_field.location.column),
        is_rename: false,
    });
    let mut except: Vec<String> = analyzed_names.clone();
    except.extend(by_fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()));
    except.push(count_field.name.clone());
    if let Some(percent) = percent_field {
        effect.creates.push(FieldCreation {
            field_name: percent.name.clone(),
            depends_on: analyzed_names,
            expression: None,
            data_type: Some(DataType::Number),
            confidence: Confidence::Certain,
            line: Some(percent.location.line),
            column: Some(percent.location.column),
            is_rename: false,
        });
        except.push(percent.name.clone());
    }
    effect.drops_all_except = Some(except);
    effect
}

// ---- Strcat ------------------------------------------------------------------

pub fn strcat_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::StrcatCommand { source_fields, dest_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume_deduped(&mut effect, source_fields.iter());
    effect.creates.push(FieldCreation {
        field_name: dest_field.name.clone(),
        depends_on: source_fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect(),
        expression: None,
        data_type: Some(DataType::String),
        confidence: Confidence::Certain,
        line: Some(dest_field.location.line),
        column: Some(dest_field.location.column),
        is_rename: false,
    });
    effect
}

// ---- Convert -----------------------------------------------------------------

pub fn convert_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::ConvertCommand { conversions, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for conversion in conversions {
        consume(&mut effect, &conversion.field);
        match &conversion.alias {
            Some(alias) => effect.creates.push(FieldCreation {
                field_name: alias.name.clone(),
                depends_on: vec![conversion.field.name.clone()],
                expression: Some(format!("{}({})", conversion.function, conversion.field.name)),
                data_type: None,
                confidence: Confidence::Certain,
                line: Some(alias.location.line),
                column: Some(alias.location.column),
                is_rename: false,
            }),
            None => effect.modifies.push(FieldModification {
                field_name: conversion.field.name.clone(),
                depends_on: vec![conversion.field.name.clone()],
                line: Some(conversion.field.location.line),
                column: Some(conversion.field.location.column),
            }),
        }
    }
    effect
}

// ---- Field-alias family (Bin / Delta / Accum / Autoregress / Bucketdir) -----

pub fn field_alias_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let target: &FieldAlias = match stage {
        PipelineStage::BinCommand { target, .. }
        | PipelineStage::DeltaCommand { target, .. }
        | PipelineStage::AccumCommand { target, .. }
        | PipelineStage::AutoregressCommand { target, .. }
        | PipelineStage::BucketdirCommand { target, .. } => target,
        _ => return CommandFieldEffect::pass_through(),
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume(&mut effect, &target.field);
    match &target.alias {
        Some(alias) => effect.creates.push(FieldCreation {
            field_name: alias.name.clone(),
            depends_on: vec![target.field.name.clone()],
            expression: None,
            data_type: None,
            confidence: Confidence::Certain,
            line: Some(alias.location.line),
            column: Some(alias.location.column),
            is_rename: false,
        }),
        None => effect.modifies.push(FieldModification {
            field_name: target.field.name.clone(),
            depends_on: vec![target.field.name.clone()],
            line: Some(target.field.location.line),
            column: Some(target.field.location.column),
        }),
    }
    effect
}

// ---- Transaction / Iplocation / Spath / Xpath / Concurrency -----------------

pub fn transaction_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::TransactionCommand { grouping_fields, location } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume_deduped(&mut effect, grouping_fields.iter());
    for name in ["duration", "eventcount"] {
        effect.creates.push(FieldCreation {
            field_name: name.to_string(),
            depends_on: Vec::new(),
            expression: None,
            data_type: Some(DataType::Number),
            confidence: Confidence::Certain,
            line: Some(location.line),
            column: None,
            is_rename: false,
        });
    }
    effect
}

pub fn iplocation_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::IplocationCommand { ip_field, prefix, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume(&mut effect, ip_field);
    let geo_fields: [(&str, DataType); 5] = [
        ("city", DataType::String),
        ("country", DataType::String),
        ("lat", DataType::Number),
        ("lon", DataType::Number),
        ("region", DataType::String),
    ];
    for (suffix, data_type) in geo_fields {
        effect.creates.push(FieldCreation {
            field_name: format!("{prefix}{suffix}"),
            depends_on: vec![ip_field.name.clone()],
            expression: None,
            data_type: Some(data_type),
            confidence: Confidence::Likely,
            line: Some(ip_field.location.line),
            column: None,
            is_rename: false,
        });
    }
    effect
}

pub fn spath_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::SpathCommand { input_field, output_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    let source_name = input_field.as_ref().map(|f| f.name.clone()).unwrap_or_else(|| "_raw".to_string());
    if let Some(field) = input_field {
        consume(&mut effect, field);
    }
    if let Some(output) = output_field {
        effect.creates.push(FieldCreation {
            field_name: output.name.clone(),
            depends_on: vec![source_name],
            expression: None,
            data_type: Some(DataType::String),
            confidence: Confidence::Likely,
            line: Some(output.location.line),
            column: Some(output.location.column),
            is_rename: false,
        });
    }
    effect
}

pub fn xpath_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::XpathCommand { input_field, output_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume(&mut effect, input_field);
    effect.creates.push(FieldCreation {
        field_name: output_field.name.clone(),
        depends_on: vec![input_field.name.clone()],
        expression: None,
        data_type: Some(DataType::String),
        confidence: Confidence::Likely,
        line: Some(output_field.location.line),
        column: Some(output_field.location.column),
        is_rename: false,
    });
    effect
}

pub fn concurrency_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::ConcurrencyCommand { duration_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume(&mut effect, duration_field);
    effect.creates.push(FieldCreation {
        field_name: "concurrency".to_string(),
        depends_on: vec![duration_field.name.clone()],
        expression: None,
        data_type: Some(DataType::Number),
        confidence: Confidence::Certain,
        line: Some(duration_field.location.line),
        column: Some(duration_field.location.column),
        is_rename: false,
    });
    effect
}

// ---- Erex --------------------------------------------------------------------

pub fn erex_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::ErexCommand { fields, source_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    let source_name = source_field.as_ref().map(|f| f.name.clone()).unwrap_or_else(|| "_raw".to_string());
    if let Some(field) = source_field {
        consume(&mut effect, field);
    }
    for field in fields {
        effect.creates.push(FieldCreation {
            field_name: field.name.clone(),
            depends_on: vec![source_name.clone()],
            expression: None,
            data_type: Some(DataType::String),
            confidence: Confidence::Likely,
            line: Some(field.location.line),
            column: Some(field.location.column),
            is_rename: false,
        });
    }
    effect
}

// ---- Makeresults / Addtotals / Inputcsv / Fieldsummary / Addcoltotals -------

pub fn makeresults_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::MakeresultsCommand { created_fields, location, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for name in created_fields {
        let data_type = if name == "_time" { DataType::Time } else { DataType::String };
        effect.creates.push(FieldCreation {
            field_name: name.clone(),
            depends_on: Vec::new(),
            expression: None,
            data_type: Some(data_type),
            confidence: Confidence::Certain,
            line: Some(location.line),
            column: None,
            is_rename: false,
        });
    }
    effect
}

pub fn addtotals_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::AddtotalsCommand { fields, total_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume_deduped(&mut effect, fields.iter());
    effect.creates.push(FieldCreation {
        field_name: total_field.name.clone(),
        depends_on: fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect(),
        expression: None,
        data_type: Some(DataType::Number),
        confidence: Confidence::Certain,
        line: Some(total_field.location.line),
        column: Some(total_field.location.column),
        is_rename: false,
    });
    effect
}

pub fn inputcsv_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::InputcsvCommand { location, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    effect.creates.push(FieldCreation {
        field_name: "(csv_fields)".to_string(),
        depends_on: Vec::new(),
        expression: None,
        data_type: Some(DataType::Unknown),
        confidence: Confidence::Unknown,
        line: Some(location.line),
        column: None,
        is_rename: false,
    });
    effect
}

pub fn fieldsummary_handler(_stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    effect
}

pub fn addcoltotals_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::AddcoltotalsCommand { fields, label_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    consume_deduped(&mut effect, fields.iter());
    if let Some(label) = label_field {
        effect.creates.push(FieldCreation {
            field_name: label.name.clone(),
            depends_on: fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect(),
            expression: None,
            data_type: Some(DataType::String),
            confidence: Confidence::Certain,
            line: Some(label.location.line),
            column: Some(label.location.column),
            is_rename: false,
        });
    }
    effect
}

// ---- Contingency / Xyseries ---------------------------------------------------

pub fn contingency_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::ContingencyCommand { row_field, col_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    consume(&mut effect, row_field);
    consume(&mut effect, col_field);
    effect.drops_all_except = Some(vec![row_field.name.clone(), col_field.name.clone()]);
    effect
}

pub fn xyseries_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::XyseriesCommand { row_field, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    consume(&mut effect, row_field);
    effect.drops_all_except = Some(vec![row_field.name.clone()]);
    effect
}

// ---- Subsearch family (append / appendcols / join / union) -----------------

pub fn subsearch_handler(stage: &PipelineStage, tracker: &FieldTracker) -> CommandFieldEffect {
    let (subsearch, join_fields, location) = match stage {
        PipelineStage::AppendCommand { subsearch, location, .. } => (subsearch, &[][..], *location),
        PipelineStage::JoinCommand { subsearch, join_fields, location, .. } => {
            (subsearch, join_fields.as_slice(), *location)
        }
        PipelineStage::UnionCommand { subsearch, location, .. } => (subsearch, &[][..], *location),
        _ => return CommandFieldEffect::pass_through(),
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for field in join_fields {
        consume(&mut effect, field);
    }
    let join_names: Vec<String> = join_fields.iter().filter(|f| !f.is_wildcard).map(|f| f.name.clone()).collect();

    if tracker.subsearch_depth() >= 32 {
        log::warn!("subsearch nesting exceeded depth 32; treating as contributing no fields");
        return effect;
    }

    let nested = crate::analyzer::analyze_pipeline(
        subsearch,
        tracker.source(),
        tracker.options(),
        tracker.subsearch_depth() + 1,
    );
    for name in nested.get_all_fields() {
        effect.creates.push(FieldCreation {
            field_name: name.to_string(),
            depends_on: join_names.clone(),
            expression: None,
            data_type: Some(DataType::Unknown),
            confidence: Confidence::Likely,
            line: Some(location.line),
            column: None,
            is_rename: false,
        });
    }
    effect
}

// ---- Extract / Search (stage 0) ---------------------------------------------

pub fn extract_handler(_stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    effect
}

pub fn search_handler(stage: &PipelineStage, _tracker: &FieldTracker) -> CommandFieldEffect {
    let PipelineStage::SearchExpression { referenced_fields, .. } = stage else {
        return CommandFieldEffect::pass_through();
    };
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for field in referenced_fields {
        consume(&mut effect, field);
    }
    effect
}
