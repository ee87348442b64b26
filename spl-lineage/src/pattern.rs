//! C5: declarative field-effect descriptions for the command family whose
//! semantics reduce to "consume the fields it reads, leave everything else
//! alone" — `where`, `dedup`, `replace`, and the handful of single-field
//! commands that never create or drop anything statically knowable.
//!
//! Every registered pattern commits to `preserves_all = true`; commands that
//! also create or drop fields (`stats`, `table`, `bin` with an alias, …) are
//! given full handlers in [`crate::handlers`] instead, since a richer
//! `createsFrom`/`dropsAllExcept` template would only ever be exercised by
//! those, identical-looking, two or three commands.

use spl_lineage_ast::{FieldRef, PipelineStage};

use crate::effect::{CommandFieldEffect, FieldConsumption};

/// `consumes` extracts every field this stage reads, in source order.
pub struct Pattern {
    pub consumes: fn(&PipelineStage) -> Vec<FieldRef>,
}

/// Runs `pattern.consumes` against `stage` and folds the result into a
/// `preservesAll` effect (spec §4.4's pattern interpreter, specialized to
/// the one semantics shape this implementation's pattern-eligible commands
/// actually need).
pub fn interpret_pattern(pattern: &Pattern, stage: &PipelineStage) -> CommandFieldEffect {
    let mut effect = CommandFieldEffect::pass_through();
    effect.preserves_all = true;
    for field_ref in (pattern.consumes)(stage) {
        if field_ref.is_wildcard {
            continue;
        }
        effect.consumes.push(FieldConsumption {
            field_name: field_ref.name,
            line: Some(field_ref.location.line),
            column: Some(field_ref.location.column),
        });
    }
    effect
}

fn none(_stage: &PipelineStage) -> Vec<FieldRef> {
    Vec::new()
}

pub fn where_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::WhereCommand { expr, .. } => expr.referenced_fields(),
        _ => Vec::new(),
    }
}

pub fn dedup_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::DedupCommand { fields, .. } => fields.clone(),
        _ => Vec::new(),
    }
}

pub fn replace_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::ReplaceCommand { fields, .. } => fields.clone(),
        _ => Vec::new(),
    }
}

pub fn makemv_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::MakemvCommand { field, .. } => vec![field.clone()],
        _ => Vec::new(),
    }
}

pub fn nomv_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::NomvCommand { field, .. } => vec![field.clone()],
        _ => Vec::new(),
    }
}

pub fn makecontinuous_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::MakecontinuousCommand { field, .. } => vec![field.clone()],
        _ => Vec::new(),
    }
}

pub fn multikv_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::MultikvCommand { fields, .. } => fields.clone(),
        _ => Vec::new(),
    }
}

pub fn kv_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::KvCommand { fields, .. } => fields.clone(),
        _ => Vec::new(),
    }
}

pub fn xmlkv_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::XmlkvCommand { input_field, .. } => input_field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn xmlunescape_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::XmlunescapeCommand { field, .. } => field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn geom_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::GeomCommand { field, .. } => field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn reltime_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::ReltimeCommand { field, .. } => field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn tags_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::TagsCommand { field, .. } => field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn timewrap_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::TimewrapCommand { by_field, .. } => by_field.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn return_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    match stage {
        PipelineStage::ReturnCommand { fields, .. } => fields.clone(),
        _ => Vec::new(),
    }
}

pub fn typer_consumes(stage: &PipelineStage) -> Vec<FieldRef> {
    none(stage)
}

#[cfg(test)]
mod test {
    use super::*;
    use spl_lineage_ast::Location;

    fn loc() -> Location {
        Location::new(1, 1, 0, 1)
    }

    #[test]
    fn dedup_pattern_preserves_all_and_consumes_fields() {
        let stage = PipelineStage::DedupCommand {
            fields: vec![FieldRef::new("host", loc())],
            location: loc(),
        };
        let pattern = Pattern { consumes: dedup_consumes };
        let effect = interpret_pattern(&pattern, &stage);
        assert!(effect.preserves_all);
        assert_eq!(effect.consumes.len(), 1);
        assert_eq!(effect.consumes[0].field_name, "host");
    }
}
