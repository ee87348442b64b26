use std::fmt;

use strum::{Display, EnumString};

/// The closed set of reserved words recognized by the lexer. Matched
/// case-insensitively; `EnumString`'s `ascii_case_insensitive` does the
/// folding so the keyword table itself stays declarative (C1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Keyword {
    Search,
    Eval,
    Stats,
    Eventstats,
    Streamstats,
    Chart,
    Timechart,
    Rex,
    Rename,
    Lookup,
    Inputlookup,
    Spath,
    Transaction,
    Iplocation,
    Table,
    Fields,
    Where,
    Bin,
    Dedup,
    Top,
    Rare,
    Strcat,
    Replace,
    Convert,
    Makemv,
    Append,
    Appendcols,
    Join,
    Union,
    Return,
    Tstats,
    Setfields,
    Tags,
    Contingency,
    Xyseries,
    Timewrap,
    Xpath,
    Xmlkv,
    Xmlunescape,
    Multikv,
    Erex,
    Kv,
    Makeresults,
    Addtotals,
    Delta,
    Accum,
    Autoregress,
    Inputcsv,
    Fieldsummary,
    Addcoltotals,
    Bucketdir,
    Geom,
    Concurrency,
    Typer,
    Nomv,
    Makecontinuous,
    Reltime,
    Extract,

    // option / clause keywords, contextually also accepted as field names
    By,
    As,
    Output,
    Outputnew,
    Field,
    Value,
    Max,
    Mode,
    Span,
    Limit,
    Window,
    Datamodel,
    Default,
    Delim,
    Type,
    Prefix,
    And,
    Or,
    Not,
}

impl Keyword {
    /// Option-position keywords SPL allows to double as field names (the
    /// `fieldOrWildcard` helper in spec §4.2).
    pub fn is_field_capable(self) -> bool {
        use Keyword::*;
        matches!(
            self,
            Field | Value | Output | Max | Mode | Type | Span | Limit | Window | Default | Delim | Prefix
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // punctuation
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    // operators
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    // literals
    StringLiteral(String),
    NumberLiteral(f64),
    TimeModifier(String),
    True,
    False,
    Null,
    Identifier(String),
    WildcardField(String),
    MacroCall(String),
    Keyword(Keyword),
    /// Recovery token inserted in place of an unterminated string.
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            Pipe => write!(f, "|"),
            LParen => write!(f, "("),
            RParen => write!(f, ")"),
            LBracket => write!(f, "["),
            RBracket => write!(f, "]"),
            LBrace => write!(f, "{{"),
            RBrace => write!(f, "}}"),
            Comma => write!(f, ","),
            Dot => write!(f, "."),
            Equals => write!(f, "="),
            NotEquals => write!(f, "!="),
            LessThan => write!(f, "<"),
            LessThanOrEqual => write!(f, "<="),
            GreaterThan => write!(f, ">"),
            GreaterThanOrEqual => write!(f, ">="),
            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Multiply => write!(f, "*"),
            Divide => write!(f, "/"),
            Modulo => write!(f, "%"),
            StringLiteral(s) => write!(f, "{s:?}"),
            NumberLiteral(n) => write!(f, "{n}"),
            TimeModifier(t) => write!(f, "{t}"),
            True => write!(f, "true"),
            False => write!(f, "false"),
            Null => write!(f, "NULL"),
            Identifier(s) => write!(f, "{s}"),
            WildcardField(s) => write!(f, "{s}"),
            MacroCall(s) => write!(f, "`{s}`"),
            Keyword(k) => write!(f, "{k}"),
            Error => write!(f, "<error>"),
        }
    }
}

/// `(kind, text, startLine, startColumn, startOffset, endOffset)` from
/// spec.md §3.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start_offset: usize,
    pub end_offset: usize,
}
