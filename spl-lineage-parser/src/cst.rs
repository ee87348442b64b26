//! C3's concrete-syntax tree. Transient: only [`crate::ast_lifter`] reads it.
//!
//! spec.md describes a fully generic `tag + children: map<label, node[]>`
//! tree. That shape is kept for [`GenericCommandCst`] (the shape shared by
//! most commands per the template in spec §4.2), but commands whose syntax
//! is genuinely distinct (an aggregation list, a rename-pair list, a lookup
//! mapping list, an expression) get their own typed CST variant instead of
//! being shoehorned into the generic map — see `DESIGN.md` for why a fully
//! dynamic tree was not worth it here.

use spl_lineage_ast::{Expr, FieldRef, Location, SearchComparison};

/// One `optionName=optionValue` pair, gated during parsing by the LA(2) rule
/// in spec §4.2: a bare field and an option are only distinguished by
/// whether the *next* token is `=`.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionPair {
    pub name: String,
    pub name_location: Location,
    pub value: String,
    pub value_location: Location,
}

/// The shape most commands parse into: an optional leading count, zero or
/// more options, a positional field list, and an optional `BY` clause.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenericCommandCst {
    pub leading_number: Option<f64>,
    pub options: Vec<OptionPair>,
    pub fields: Vec<FieldRef>,
    pub by_fields: Vec<FieldRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationCst {
    pub function: String,
    pub field: Option<FieldRef>,
    pub alias: Option<FieldRef>,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LookupMappingCst {
    pub lookup_field: FieldRef,
    pub event_field: Option<FieldRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CstShape {
    Generic(GenericCommandCst),
    Eval {
        assignments: Vec<(FieldRef, Expr)>,
    },
    Stats {
        aggregations: Vec<AggregationCst>,
        by_fields: Vec<FieldRef>,
    },
    Rename {
        renamings: Vec<(FieldRef, FieldRef)>,
    },
    Rex {
        field: Option<FieldRef>,
        pattern: String,
    },
    Lookup {
        lookup_name: String,
        input: Vec<LookupMappingCst>,
        output: Vec<LookupMappingCst>,
        has_output_clause: bool,
    },
    Convert {
        conversions: Vec<(String, FieldRef, Option<FieldRef>)>,
    },
    Expr {
        expr: Expr,
    },
    Search {
        terms: Vec<SearchComparison>,
    },
    /// `append`/`join`/`union`/`appendcols` bracketed subsearch, holding the
    /// fully parsed inner pipeline as a recursive CST list.
    Subsearch {
        join_fields: Vec<FieldRef>,
        inner: Vec<CstNode>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct CstNode {
    pub rule: &'static str,
    pub command_name: String,
    pub location: Location,
    pub shape: CstShape,
}
