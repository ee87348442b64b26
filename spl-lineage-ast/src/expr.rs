use enum_as_inner::EnumAsInner;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{FieldRef, Location};

/// Coarse runtime type lattice the analyzer reasons about. Never narrower
/// than what static inspection of an expression can support: no attempt is
/// made to evaluate expressions or check real SPL types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DataType {
    Number,
    String,
    Boolean,
    Time,
    Unknown,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Time => "time",
            DataType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "\"{s}\""),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = ".")]
    Concat,
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

impl BinOp {
    pub fn result_type(self) -> DataType {
        use BinOp::*;
        match self {
            Add | Sub | Mul | Div | Mod => DataType::Number,
            Concat => DataType::String,
            Eq | Ne | Lt | Le | Gt | Ge | And | Or => DataType::Boolean,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum UnOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "NOT")]
    Not,
}

/// An expression appearing in `eval`/`where`/aggregation-argument position.
///
/// This is deliberately small: the analyzer never evaluates expressions, it
/// only needs to (a) collect the field names an expression reads and (b)
/// render the expression back to source-like text for `FieldCreation.expression`,
/// plus (c) make a coarse guess at the result's [`DataType`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum ExprKind {
    Literal(Literal),
    Field(FieldRef),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// `name(args...)`, including the keyword-functions `true()`, `false()`,
    /// `null()`, `now()`.
    FuncCall {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Expr { kind, location }
    }

    /// Field names read while evaluating this expression, in order of first
    /// appearance with duplicates removed. Used to populate `dependsOn` and
    /// `consumes` for `eval`/`where`-like commands.
    pub fn referenced_fields(&self) -> Vec<FieldRef> {
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        self.collect_fields(&mut out, &mut seen);
        out
    }

    fn collect_fields(&self, out: &mut Vec<FieldRef>, seen: &mut std::collections::HashSet<String>) {
        match &self.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Field(f) => {
                if !f.is_wildcard && seen.insert(f.name.clone()) {
                    out.push(f.clone());
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_fields(out, seen);
                right.collect_fields(out, seen);
            }
            ExprKind::Unary { operand, .. } => operand.collect_fields(out, seen),
            ExprKind::FuncCall { args, .. } => {
                for a in args {
                    a.collect_fields(out, seen);
                }
            }
        }
    }

    /// Infer a coarse data type for this expression. See §4.3 of the design
    /// notes for the rule set this implements.
    pub fn infer_type(&self) -> DataType {
        match &self.kind {
            ExprKind::Literal(Literal::Number(_)) => DataType::Number,
            ExprKind::Literal(Literal::String(_)) => DataType::String,
            ExprKind::Literal(Literal::Boolean(_)) => DataType::Boolean,
            ExprKind::Literal(Literal::Null) => DataType::Unknown,
            ExprKind::Field(_) => DataType::Unknown,
            ExprKind::Binary { op, .. } => op.result_type(),
            ExprKind::Unary { op: UnOp::Not, .. } => DataType::Boolean,
            ExprKind::Unary { op: UnOp::Neg, .. } => DataType::Number,
            ExprKind::FuncCall { name, args } => infer_func_type(name, args),
        }
    }

    /// Render a source-like string for this expression, used to populate
    /// `FieldCreation.expression`. Not guaranteed to round-trip byte-for-byte
    /// with the original text (whitespace is normalized).
    pub fn render(&self) -> String {
        match &self.kind {
            ExprKind::Literal(lit) => lit.to_string(),
            ExprKind::Field(f) => f.name.clone(),
            ExprKind::Binary { op, left, right } => {
                format!("{} {} {}", left.render(), op, right.render())
            }
            ExprKind::Unary { op: UnOp::Not, operand } => format!("NOT {}", operand.render()),
            ExprKind::Unary { op: UnOp::Neg, operand } => format!("-{}", operand.render()),
            ExprKind::FuncCall { name, args } => {
                let args = args.iter().map(Expr::render).collect::<Vec<_>>().join(", ");
                format!("{name}({args})")
            }
        }
    }
}

fn infer_func_type(name: &str, args: &[Expr]) -> DataType {
    match name.to_ascii_lowercase().as_str() {
        "len" | "round" | "floor" | "ceiling" | "abs" | "pow" | "sqrt" | "exact" | "tonumber" => {
            DataType::Number
        }
        "lower" | "upper" | "substr" | "trim" | "ltrim" | "rtrim" | "replace" | "tostring"
        | "split" | "mvjoin" | "printf" | "spath" | "json_extract" => DataType::String,
        "true" | "false" | "isnull" | "isnotnull" | "like" | "match" | "cidrmatch" | "in" => {
            DataType::Boolean
        }
        "now" | "relative_time" | "strptime" => DataType::Time,
        "if" => args
            .get(1)
            .map(Expr::infer_type)
            .unwrap_or(DataType::Unknown),
        "coalesce" => args
            .iter()
            .map(Expr::infer_type)
            .find(|t| *t != DataType::Unknown)
            .unwrap_or(DataType::Unknown),
        "case" => args
            .iter()
            .skip(1)
            .step_by(2)
            .map(Expr::infer_type)
            .find(|t| *t != DataType::Unknown)
            .unwrap_or(DataType::Unknown),
        _ => DataType::Unknown,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Location;

    fn loc() -> Location {
        Location::new(1, 1, 0, 1)
    }

    #[test]
    fn infers_arithmetic_as_number() {
        let e = Expr::new(
            ExprKind::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::new(ExprKind::Literal(Literal::Number(1.0)), loc())),
                right: Box::new(Expr::new(ExprKind::Literal(Literal::Number(2.0)), loc())),
            },
            loc(),
        );
        assert_eq!(e.infer_type(), DataType::Number);
        assert_eq!(e.render(), "1 + 2");
    }

    #[test]
    fn collects_unique_field_refs_in_order() {
        let a = FieldRef::new("a", loc());
        let b = FieldRef::new("b", loc());
        let e = Expr::new(
            ExprKind::FuncCall {
                name: "coalesce".into(),
                args: vec![
                    Expr::new(ExprKind::Field(a.clone()), loc()),
                    Expr::new(ExprKind::Field(b), loc()),
                    Expr::new(ExprKind::Field(a), loc()),
                ],
            },
            loc(),
        );
        let refs = e.referenced_fields();
        assert_eq!(refs.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
