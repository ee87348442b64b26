use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::{Expr, FieldRef, Location};

/// `target = expr` inside an `eval`/`setfields`-like command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: FieldRef,
    pub expr: Expr,
    pub location: Location,
}

/// One `function(field?) [AS alias]` in a stats-family aggregation list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: String,
    pub field: Option<FieldRef>,
    pub alias: Option<FieldRef>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsVariant {
    Stats,
    Eventstats,
    Streamstats,
    Chart,
    Timechart,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Renaming {
    pub old: FieldRef,
    pub new: FieldRef,
}

/// A single lookup field mapping, either on the input (`lookup t a AS b`) or
/// output (`OUTPUT c AS d`) side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupMapping {
    pub lookup_field: FieldRef,
    pub event_field: FieldRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldsMode {
    Include,
    Exclude,
}

/// `function(field) [AS alias]`, used by `convert`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub function: String,
    pub field: FieldRef,
    pub alias: Option<FieldRef>,
}

/// `field [AS alias]`, the shape shared by `bin`, `delta`, `accum`,
/// `autoregress`, `bucketdir` and a handful of other single-field commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldAlias {
    pub field: FieldRef,
    pub alias: Option<FieldRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchComparison {
    pub field: FieldRef,
    pub operator: String,
    pub value: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum PipelineStage {
    EvalCommand {
        assignments: Vec<Assignment>,
        location: Location,
    },
    StatsCommand {
        variant: StatsVariant,
        aggregations: Vec<Aggregation>,
        by_fields: Vec<FieldRef>,
        location: Location,
    },
    RexCommand {
        source_field: Option<FieldRef>,
        pattern: String,
        extracted_fields: Vec<FieldRef>,
        location: Location,
    },
    RenameCommand {
        renamings: Vec<Renaming>,
        location: Location,
    },
    LookupCommand {
        lookup_name: String,
        input_mappings: Vec<LookupMapping>,
        output_mappings: Vec<LookupMapping>,
        /// Populated by the AST lifter only when `output_mappings` came back
        /// empty from the grammar rule and the lifter recovered them
        /// textually (see `lookup OUTPUT rescue` in the design notes).
        output_rescued: bool,
        location: Location,
    },
    InputlookupCommand {
        lookup_name: String,
        location: Location,
    },
    SpathCommand {
        input_field: Option<FieldRef>,
        output_field: Option<FieldRef>,
        path: Option<String>,
        location: Location,
    },
    TransactionCommand {
        grouping_fields: Vec<FieldRef>,
        location: Location,
    },
    IplocationCommand {
        ip_field: FieldRef,
        prefix: String,
        location: Location,
    },
    TableCommand {
        fields: Vec<FieldRef>,
        location: Location,
    },
    FieldsCommand {
        mode: FieldsMode,
        fields: Vec<FieldRef>,
        location: Location,
    },
    WhereCommand {
        expr: Expr,
        location: Location,
    },
    BinCommand {
        target: FieldAlias,
        span: Option<String>,
        location: Location,
    },
    DedupCommand {
        fields: Vec<FieldRef>,
        location: Location,
    },
    TopCommand {
        fields: Vec<FieldRef>,
        by_fields: Vec<FieldRef>,
        count_field: FieldRef,
        percent_field: Option<FieldRef>,
        location: Location,
    },
    RareCommand {
        fields: Vec<FieldRef>,
        by_fields: Vec<FieldRef>,
        count_field: FieldRef,
        percent_field: Option<FieldRef>,
        location: Location,
    },
    StrcatCommand {
        source_fields: Vec<FieldRef>,
        dest_field: FieldRef,
        location: Location,
    },
    ReplaceCommand {
        fields: Vec<FieldRef>,
        location: Location,
    },
    ConvertCommand {
        conversions: Vec<Conversion>,
        location: Location,
    },
    MakemvCommand {
        field: FieldRef,
        location: Location,
    },
    AppendCommand {
        /// `true` for `appendcols`, `false` for plain `append`.
        cols: bool,
        subsearch: Box<Pipeline>,
        location: Location,
    },
    JoinCommand {
        join_fields: Vec<FieldRef>,
        subsearch: Box<Pipeline>,
        location: Location,
    },
    UnionCommand {
        subsearch: Box<Pipeline>,
        location: Location,
    },
    ReturnCommand {
        count: Option<u32>,
        fields: Vec<FieldRef>,
        location: Location,
    },
    TstatsCommand {
        aggregations: Vec<Aggregation>,
        by_fields: Vec<FieldRef>,
        location: Location,
    },
    SetfieldsCommand {
        assignments: Vec<Assignment>,
        location: Location,
    },
    TagsCommand {
        field: Option<FieldRef>,
        location: Location,
    },
    ContingencyCommand {
        row_field: FieldRef,
        col_field: FieldRef,
        location: Location,
    },
    XyseriesCommand {
        row_field: FieldRef,
        location: Location,
    },
    TimewrapCommand {
        span: String,
        by_field: Option<FieldRef>,
        location: Location,
    },
    XpathCommand {
        input_field: FieldRef,
        output_field: FieldRef,
        location: Location,
    },
    XmlkvCommand {
        input_field: Option<FieldRef>,
        location: Location,
    },
    XmlunescapeCommand {
        field: Option<FieldRef>,
        location: Location,
    },
    MultikvCommand {
        fields: Vec<FieldRef>,
        location: Location,
    },
    ErexCommand {
        fields: Vec<FieldRef>,
        examples: Vec<String>,
        source_field: Option<FieldRef>,
        location: Location,
    },
    KvCommand {
        fields: Vec<FieldRef>,
        location: Location,
    },
    MakeresultsCommand {
        annotate: bool,
        created_fields: Vec<String>,
        location: Location,
    },
    AddtotalsCommand {
        fields: Vec<FieldRef>,
        total_field: FieldRef,
        location: Location,
    },
    DeltaCommand {
        target: FieldAlias,
        location: Location,
    },
    AccumCommand {
        target: FieldAlias,
        location: Location,
    },
    AutoregressCommand {
        target: FieldAlias,
        location: Location,
    },
    InputcsvCommand {
        filename: String,
        location: Location,
    },
    FieldsummaryCommand {
        location: Location,
    },
    AddcoltotalsCommand {
        fields: Vec<FieldRef>,
        label_field: Option<FieldRef>,
        location: Location,
    },
    BucketdirCommand {
        target: FieldAlias,
        location: Location,
    },
    GeomCommand {
        field: Option<FieldRef>,
        location: Location,
    },
    ConcurrencyCommand {
        duration_field: FieldRef,
        location: Location,
    },
    TyperCommand {
        location: Location,
    },
    NomvCommand {
        field: FieldRef,
        location: Location,
    },
    MakecontinuousCommand {
        field: FieldRef,
        location: Location,
    },
    ReltimeCommand {
        field: Option<FieldRef>,
        location: Location,
    },
    /// The implicit stage 0 search expression preceding the first `|`.
    SearchExpression {
        terms: Vec<SearchComparison>,
        referenced_fields: Vec<FieldRef>,
        location: Location,
    },
    /// Catch-all for any command not given its own variant above.
    GenericCommand {
        command_name: String,
        arguments: Vec<String>,
        location: Location,
    },
}

impl PipelineStage {
    /// The command keyword this stage was parsed from, lowercased. Used by
    /// the handler registry's name-based dispatch step.
    pub fn command_name(&self) -> &str {
        use PipelineStage::*;
        match self {
            EvalCommand { .. } => "eval",
            StatsCommand { variant, .. } => match variant {
                StatsVariant::Stats => "stats",
                StatsVariant::Eventstats => "eventstats",
                StatsVariant::Streamstats => "streamstats",
                StatsVariant::Chart => "chart",
                StatsVariant::Timechart => "timechart",
            },
            RexCommand { .. } => "rex",
            RenameCommand { .. } => "rename",
            LookupCommand { .. } => "lookup",
            InputlookupCommand { .. } => "inputlookup",
            SpathCommand { .. } => "spath",
            TransactionCommand { .. } => "transaction",
            IplocationCommand { .. } => "iplocation",
            TableCommand { .. } => "table",
            FieldsCommand { .. } => "fields",
            WhereCommand { .. } => "where",
            BinCommand { .. } => "bin",
            DedupCommand { .. } => "dedup",
            TopCommand { .. } => "top",
            RareCommand { .. } => "rare",
            StrcatCommand { .. } => "strcat",
            ReplaceCommand { .. } => "replace",
            ConvertCommand { .. } => "convert",
            MakemvCommand { .. } => "makemv",
            AppendCommand { cols, .. } => {
                if *cols {
                    "appendcols"
                } else {
                    "append"
                }
            }
            JoinCommand { .. } => "join",
            UnionCommand { .. } => "union",
            ReturnCommand { .. } => "return",
            TstatsCommand { .. } => "tstats",
            SetfieldsCommand { .. } => "setfields",
            TagsCommand { .. } => "tags",
            ContingencyCommand { .. } => "contingency",
            XyseriesCommand { .. } => "xyseries",
            TimewrapCommand { .. } => "timewrap",
            XpathCommand { .. } => "xpath",
            XmlkvCommand { .. } => "xmlkv",
            XmlunescapeCommand { .. } => "xmlunescape",
            MultikvCommand { .. } => "multikv",
            ErexCommand { .. } => "erex",
            KvCommand { .. } => "kv",
            MakeresultsCommand { .. } => "makeresults",
            AddtotalsCommand { .. } => "addtotals",
            DeltaCommand { .. } => "delta",
            AccumCommand { .. } => "accum",
            AutoregressCommand { .. } => "autoregress",
            InputcsvCommand { .. } => "inputcsv",
            FieldsummaryCommand { .. } => "fieldsummary",
            AddcoltotalsCommand { .. } => "addcoltotals",
            BucketdirCommand { .. } => "bucketdir",
            GeomCommand { .. } => "geom",
            ConcurrencyCommand { .. } => "concurrency",
            TyperCommand { .. } => "typer",
            NomvCommand { .. } => "nomv",
            MakecontinuousCommand { .. } => "makecontinuous",
            ReltimeCommand { .. } => "reltime",
            SearchExpression { .. } => "search",
            GenericCommand { command_name, .. } => command_name.as_str(),
        }
    }

    pub fn location(&self) -> Location {
        use PipelineStage::*;
        match self {
            EvalCommand { location, .. }
            | StatsCommand { location, .. }
            | RexCommand { location, .. }
            | RenameCommand { location, .. }
            | LookupCommand { location, .. }
            | InputlookupCommand { location, .. }
            | SpathCommand { location, .. }
            | TransactionCommand { location, .. }
            | IplocationCommand { location, .. }
            | TableCommand { location, .. }
            | FieldsCommand { location, .. }
            | WhereCommand { location, .. }
            | BinCommand { location, .. }
            | DedupCommand { location, .. }
            | TopCommand { location, .. }
            | RareCommand { location, .. }
            | StrcatCommand { location, .. }
            | ReplaceCommand { location, .. }
            | ConvertCommand { location, .. }
            | MakemvCommand { location, .. }
            | AppendCommand { location, .. }
            | JoinCommand { location, .. }
            | UnionCommand { location, .. }
            | ReturnCommand { location, .. }
            | TstatsCommand { location, .. }
            | SetfieldsCommand { location, .. }
            | TagsCommand { location, .. }
            | ContingencyCommand { location, .. }
            | XyseriesCommand { location, .. }
            | TimewrapCommand { location, .. }
            | XpathCommand { location, .. }
            | XmlkvCommand { location, .. }
            | XmlunescapeCommand { location, .. }
            | MultikvCommand { location, .. }
            | ErexCommand { location, .. }
            | KvCommand { location, .. }
            | MakeresultsCommand { location, .. }
            | AddtotalsCommand { location, .. }
            | DeltaCommand { location, .. }
            | AccumCommand { location, .. }
            | AutoregressCommand { location, .. }
            | InputcsvCommand { location, .. }
            | FieldsummaryCommand { location, .. }
            | AddcoltotalsCommand { location, .. }
            | BucketdirCommand { location, .. }
            | GeomCommand { location, .. }
            | ConcurrencyCommand { location, .. }
            | TyperCommand { location, .. }
            | NomvCommand { location, .. }
            | MakecontinuousCommand { location, .. }
            | ReltimeCommand { location, .. }
            | SearchExpression { location, .. }
            | GenericCommand { location, .. } => *location,
        }
    }
}

/// An ordered sequence of stages, starting with the implicit stage-0 search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub stages: Vec<PipelineStage>,
}
