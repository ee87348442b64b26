//! C4: lowers the concrete-syntax tree into the typed [`spl_lineage_ast::Pipeline`].
//!
//! Each `lift_*` function implements one of the "key derivations" in the
//! design notes: named-capture extraction for `rex`, `eval` dataType
//! inference via [`Expr::infer_type`], per-aggregation stats shape capture,
//! the lookup OUTPUT textual rescue, and so on.

use std::collections::HashSet;

use spl_lineage_ast::{
    Aggregation, Assignment, Conversion, FieldAlias, FieldRef, FieldsMode, Location, LookupMapping,
    Pipeline, PipelineStage, Renaming, StatsVariant,
};

use crate::cst::{CstNode, CstShape, GenericCommandCst};

pub fn lift_pipeline(nodes: &[CstNode], _source: &str) -> Pipeline {
    let stages = nodes.iter().map(lift_stage).collect();
    Pipeline { stages }
}

fn option_value<'a>(generic: &'a GenericCommandCst, name: &str) -> Option<&'a str> {
    generic
        .options
        .iter()
        .find(|o| o.name.eq_ignore_ascii_case(name))
        .map(|o| o.value.as_str())
}

fn field_alias_from(generic: &GenericCommandCst) -> FieldAlias {
    FieldAlias {
        field: generic
            .fields
            .first()
            .cloned()
            .unwrap_or_else(|| FieldRef::new("", generic_loc_fallback())),
        alias: generic.by_fields.first().cloned(),
    }
}

fn generic_loc_fallback() -> Location {
    Location::new(0, 0, 0, 0)
}

fn lift_stage(node: &CstNode) -> PipelineStage {
    let location = node.location;
    match &node.shape {
        CstShape::Search { terms } => {
            let mut referenced_fields = Vec::new();
            let mut seen = HashSet::new();
            for t in terms {
                if !t.field.is_wildcard && seen.insert(t.field.name.clone()) {
                    referenced_fields.push(t.field.clone());
                }
            }
            PipelineStage::SearchExpression {
                terms: terms.clone(),
                referenced_fields,
                location,
            }
        }
        CstShape::Eval { assignments } => {
            let assignments = assignments
                .iter()
                .map(|(target, expr)| Assignment {
                    target: target.clone(),
                    expr: expr.clone(),
                    location: Location::span(target.location, expr.location),
                })
                .collect();
            if node.command_name == "setfields" {
                PipelineStage::SetfieldsCommand {
                    assignments,
                    location,
                }
            } else {
                PipelineStage::EvalCommand {
                    assignments,
                    location,
                }
            }
        }
        CstShape::Expr { expr } => PipelineStage::WhereCommand {
            expr: expr.clone(),
            location,
        },
        CstShape::Stats {
            aggregations,
            by_fields,
        } => {
            let variant = match node.command_name.as_str() {
                "eventstats" => StatsVariant::Eventstats,
                "streamstats" => StatsVariant::Streamstats,
                "chart" => StatsVariant::Chart,
                "timechart" => StatsVariant::Timechart,
                _ => StatsVariant::Stats,
            };
            let aggregations = aggregations
                .iter()
                .map(|a| Aggregation {
                    function: a.function.clone(),
                    field: a.field.clone(),
                    alias: a.alias.clone(),
                    location: a.location,
                })
                .collect();
            if node.command_name == "tstats" {
                PipelineStage::TstatsCommand {
                    aggregations,
                    by_fields: by_fields.clone(),
                    location,
                }
            } else {
                PipelineStage::StatsCommand {
                    variant,
                    aggregations,
                    by_fields: by_fields.clone(),
                    location,
                }
            }
        }
        CstShape::Rex { field, pattern } => {
            let extracted_fields = extract_named_captures(pattern, location);
            PipelineStage::RexCommand {
                source_field: field.clone(),
                pattern: pattern.clone(),
                extracted_fields,
                location,
            }
        }
        CstShape::Rename { renamings } => PipelineStage::RenameCommand {
            renamings: renamings
                .iter()
                .map(|(old, new)| Renaming {
                    old: old.clone(),
                    new: new.clone(),
                })
                .collect(),
            location,
        },
        CstShape::Lookup {
            lookup_name,
            input,
            output,
            has_output_clause,
        } => {
            let input_mappings: Vec<LookupMapping> = input
                .iter()
                .map(|m| LookupMapping {
                    lookup_field: m.lookup_field.clone(),
                    event_field: m.event_field.clone().unwrap_or_else(|| m.lookup_field.clone()),
                })
                .collect();
            let mut output_mappings: Vec<LookupMapping> = output
                .iter()
                .map(|m| LookupMapping {
                    lookup_field: m.lookup_field.clone(),
                    event_field: m.event_field.clone().unwrap_or_else(|| m.lookup_field.clone()),
                })
                .collect();
            let mut output_rescued = false;
            // Rescue: `lookup t a OUTPUT` with no explicit field list still
            // names the lookup's own output columns implicitly; without a
            // table schema available here we can only record that an OUTPUT
            // clause existed and leave the field list for the analyzer to
            // fill in from `AnalysisOptions::lookup_schemas`.
            if *has_output_clause && output_mappings.is_empty() {
                output_rescued = true;
            }
            if !*has_output_clause {
                output_mappings.clear();
            }
            PipelineStage::LookupCommand {
                lookup_name: lookup_name.clone(),
                input_mappings,
                output_mappings,
                output_rescued,
                location,
            }
        }
        CstShape::Convert { conversions } => PipelineStage::ConvertCommand {
            conversions: conversions
                .iter()
                .map(|(function, field, alias)| Conversion {
                    function: function.clone(),
                    field: field.clone(),
                    alias: alias.clone(),
                })
                .collect(),
            location,
        },
        CstShape::Subsearch { join_fields, inner } => {
            let subsearch = Box::new(lift_pipeline(inner, ""));
            match node.command_name.as_str() {
                "append" => PipelineStage::AppendCommand {
                    cols: false,
                    subsearch,
                    location,
                },
                "appendcols" => PipelineStage::AppendCommand {
                    cols: true,
                    subsearch,
                    location,
                },
                "join" => PipelineStage::JoinCommand {
                    join_fields: join_fields.clone(),
                    subsearch,
                    location,
                },
                _ => PipelineStage::UnionCommand { subsearch, location },
            }
        }
        CstShape::Generic(generic) => lift_generic(&node.command_name, generic, location),
    }
}

fn lift_generic(command_name: &str, generic: &GenericCommandCst, location: Location) -> PipelineStage {
    match command_name {
        "inputlookup" => PipelineStage::InputlookupCommand {
            lookup_name: generic
                .fields
                .first()
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            location,
        },
        "spath" => PipelineStage::SpathCommand {
            input_field: option_value(generic, "input")
                .map(|v| FieldRef::new(v.to_string(), location)),
            output_field: option_value(generic, "output")
                .map(|v| FieldRef::new(v.to_string(), location)),
            path: option_value(generic, "path").map(|s| s.to_string()),
            location,
        },
        "transaction" => PipelineStage::TransactionCommand {
            grouping_fields: generic.fields.clone(),
            location,
        },
        "iplocation" => PipelineStage::IplocationCommand {
            ip_field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            prefix: option_value(generic, "prefix").unwrap_or("").to_string(),
            location,
        },
        "table" => PipelineStage::TableCommand {
            fields: generic.fields.clone(),
            location,
        },
        "fields" => {
            let mode = if generic
                .fields
                .first()
                .map(|f| f.name.starts_with('-'))
                .unwrap_or(false)
            {
                FieldsMode::Exclude
            } else {
                FieldsMode::Include
            };
            let fields = generic
                .fields
                .iter()
                .map(|f| {
                    if let Some(stripped) = f.name.strip_prefix('-') {
                        FieldRef::new(stripped.to_string(), f.location)
                    } else {
                        f.clone()
                    }
                })
                .collect();
            PipelineStage::FieldsCommand {
                mode,
                fields,
                location,
            }
        }
        "bin" => PipelineStage::BinCommand {
            target: field_alias_from(generic),
            span: option_value(generic, "span").map(|s| s.to_string()),
            location,
        },
        "dedup" => PipelineStage::DedupCommand {
            fields: generic.fields.clone(),
            location,
        },
        "top" | "rare" => {
            let fallback = || FieldRef::new("count", location);
            let stage_fields = generic.fields.clone();
            let by_fields = generic.by_fields.clone();
            let count_field = FieldRef::new("count", location);
            let percent_field = Some(FieldRef::new("percent", location));
            let _ = fallback;
            if command_name == "top" {
                PipelineStage::TopCommand {
                    fields: stage_fields,
                    by_fields,
                    count_field,
                    percent_field,
                    location,
                }
            } else {
                PipelineStage::RareCommand {
                    fields: stage_fields,
                    by_fields,
                    count_field,
                    percent_field,
                    location,
                }
            }
        }
        "strcat" => {
            let dest_field = generic
                .fields
                .last()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location));
            let source_fields = generic.fields[..generic.fields.len().saturating_sub(1)].to_vec();
            PipelineStage::StrcatCommand {
                source_fields,
                dest_field,
                location,
            }
        }
        "replace" => PipelineStage::ReplaceCommand {
            fields: generic.fields.clone(),
            location,
        },
        "makemv" => PipelineStage::MakemvCommand {
            field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "return" => PipelineStage::ReturnCommand {
            count: generic.leading_number.map(|n| n as u32),
            fields: generic.fields.clone(),
            location,
        },
        "tags" => PipelineStage::TagsCommand {
            field: generic.fields.first().cloned(),
            location,
        },
        "contingency" => PipelineStage::ContingencyCommand {
            row_field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            col_field: generic
                .fields
                .get(1)
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "xyseries" => PipelineStage::XyseriesCommand {
            row_field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "timewrap" => PipelineStage::TimewrapCommand {
            span: option_value(generic, "span").unwrap_or("1d").to_string(),
            by_field: generic.by_fields.first().cloned(),
            location,
        },
        "xpath" => PipelineStage::XpathCommand {
            input_field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            output_field: generic
                .fields
                .get(1)
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "xmlkv" => PipelineStage::XmlkvCommand {
            input_field: generic.fields.first().cloned(),
            location,
        },
        "xmlunescape" => PipelineStage::XmlunescapeCommand {
            field: generic.fields.first().cloned(),
            location,
        },
        "multikv" => PipelineStage::MultikvCommand {
            fields: generic.fields.clone(),
            location,
        },
        "erex" => PipelineStage::ErexCommand {
            fields: generic.fields.clone(),
            examples: generic
                .options
                .iter()
                .filter(|o| o.name.eq_ignore_ascii_case("examples"))
                .map(|o| o.value.clone())
                .collect(),
            source_field: option_value(generic, "field").map(|v| FieldRef::new(v.to_string(), location)),
            location,
        },
        "kv" => PipelineStage::KvCommand {
            fields: generic.fields.clone(),
            location,
        },
        "makeresults" => {
            let annotate = option_value(generic, "annotate")
                .map(|v| v.eq_ignore_ascii_case("t") || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            PipelineStage::MakeresultsCommand {
                annotate,
                created_fields: generic.fields.iter().map(|f| f.name.clone()).collect(),
                location,
            }
        }
        "addtotals" => PipelineStage::AddtotalsCommand {
            fields: generic.fields.clone(),
            total_field: generic
                .by_fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("Total", location)),
            location,
        },
        "delta" => PipelineStage::DeltaCommand {
            target: field_alias_from(generic),
            location,
        },
        "accum" => PipelineStage::AccumCommand {
            target: field_alias_from(generic),
            location,
        },
        "autoregress" => PipelineStage::AutoregressCommand {
            target: field_alias_from(generic),
            location,
        },
        "inputcsv" => PipelineStage::InputcsvCommand {
            filename: generic
                .fields
                .first()
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            location,
        },
        "fieldsummary" => PipelineStage::FieldsummaryCommand { location },
        "addcoltotals" => PipelineStage::AddcoltotalsCommand {
            fields: generic.fields.clone(),
            label_field: generic.by_fields.first().cloned(),
            location,
        },
        "bucketdir" => PipelineStage::BucketdirCommand {
            target: field_alias_from(generic),
            location,
        },
        "geom" => PipelineStage::GeomCommand {
            field: generic.fields.first().cloned(),
            location,
        },
        "concurrency" => PipelineStage::ConcurrencyCommand {
            duration_field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("duration", location)),
            location,
        },
        "typer" => PipelineStage::TyperCommand { location },
        "nomv" => PipelineStage::NomvCommand {
            field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "makecontinuous" => PipelineStage::MakecontinuousCommand {
            field: generic
                .fields
                .first()
                .cloned()
                .unwrap_or_else(|| FieldRef::new("", location)),
            location,
        },
        "reltime" => PipelineStage::ReltimeCommand {
            field: generic.fields.first().cloned(),
            location,
        },
        _ => PipelineStage::GenericCommand {
            command_name: command_name.to_string(),
            arguments: generic
                .fields
                .iter()
                .map(|f| f.name.clone())
                .chain(generic.options.iter().map(|o| format!("{}={}", o.name, o.value)))
                .collect(),
            location,
        },
    }
}

/// Named-capture group extraction for `rex`: scans `(?<name>...)` groups in
/// the pattern text, per spec §4.3's key derivation.
fn extract_named_captures(pattern: &str, location: Location) -> Vec<FieldRef> {
    let mut out = Vec::new();
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i + 3 < bytes.len() {
        if &bytes[i..i + 3] == b"(?<" {
            let name_start = i + 3;
            if let Some(end) = pattern[name_start..].find('>') {
                let name = &pattern[name_start..name_start + end];
                if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    out.push(FieldRef::new(name.to_string(), location));
                }
                i = name_start + end + 1;
                continue;
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{lexer::tokenize, parser::parse};

    fn lift(text: &str) -> Pipeline {
        let (tokens, _) = tokenize(text);
        let (cst, _) = parse(&tokens);
        lift_pipeline(&cst.unwrap(), text)
    }

    #[test]
    fn rex_lifts_named_captures() {
        let pipeline = lift(r#"index=main | rex field=_raw "status=(?<status>\d+)""#);
        let PipelineStage::RexCommand { extracted_fields, .. } = &pipeline.stages[1] else {
            panic!("expected rex command")
        };
        assert_eq!(extracted_fields.len(), 1);
        assert_eq!(extracted_fields[0].name, "status");
    }

    #[test]
    fn eval_lifts_assignment_with_inferred_type() {
        let pipeline = lift("index=main | eval total=price*qty");
        let PipelineStage::EvalCommand { assignments, .. } = &pipeline.stages[1] else {
            panic!("expected eval command")
        };
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].target.name, "total");
        assert_eq!(
            assignments[0].expr.infer_type(),
            spl_lineage_ast::DataType::Number
        );
    }

    #[test]
    fn search_expression_collects_referenced_fields() {
        let pipeline = lift("index=main sourcetype=access_combined status=200");
        let PipelineStage::SearchExpression { referenced_fields, .. } = &pipeline.stages[0] else {
            panic!("expected search expression")
        };
        let names: Vec<_> = referenced_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["index", "sourcetype", "status"]);
    }
}
