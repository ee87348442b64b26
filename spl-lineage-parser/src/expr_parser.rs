//! C3's expression grammar (the `eval`/`where` operand language), built on
//! `chumsky` the same way the lexer is: a declarative precedence-climbing
//! grammar over a token stream instead of a hand-advanced cursor, matching
//! the teacher's own `prqlc-parser` (whose `parser/mod.rs` likewise drives
//! its expression grammar through `chumsky::Parser` combinators rather than
//! a manual `Pratt`-by-hand loop).
//!
//! Command-level structure (which fields a `stats` clause binds, where a
//! `rename` pair list ends, ...) stays on the cursor-based walk in
//! [`crate::parser`]: that layer's "once a command name is recognized its
//! shape is always produced, malformed or not" recovery contract needs
//! per-command custom recovery text that chumsky's backtracking `choice`
//! would have to re-derive per command; the expression grammar has no such
//! requirement; it has a normal unambiguous precedence hierarchy, which is
//! exactly the case chumsky is built for.

use std::ops::Range;

use chumsky::prelude::*;
use chumsky::Stream;

use spl_lineage_ast::{BinOp, Expr, ExprKind, FieldRef, Literal, Location, UnOp};

use crate::error::ParseError;
use crate::token::{Keyword, Token, TokenKind};

/// A hashable, payload-free mirror of [`TokenKind`]. `chumsky::error::Simple`
/// requires its input type to be `Hash + Eq`, which `TokenKind` itself can't
/// be (`NumberLiteral(f64)` has neither); the grammar below matches on `Sym`
/// and recovers the real token — text, number value, location — via
/// `map_with_span`'s token-index span indexing back into the original
/// `&[Token]` slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Sym {
    Pipe,
    LParen,
    RParen,
    Comma,
    Dot,
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
    StringLiteral,
    NumberLiteral,
    TimeModifier,
    True,
    False,
    Null,
    Identifier,
    WildcardField,
    Keyword(Keyword),
    Other,
}

impl From<&TokenKind> for Sym {
    fn from(kind: &TokenKind) -> Sym {
        match kind {
            TokenKind::Pipe => Sym::Pipe,
            TokenKind::LParen => Sym::LParen,
            TokenKind::RParen => Sym::RParen,
            TokenKind::Comma => Sym::Comma,
            TokenKind::Dot => Sym::Dot,
            TokenKind::Equals => Sym::Equals,
            TokenKind::NotEquals => Sym::NotEquals,
            TokenKind::LessThan => Sym::LessThan,
            TokenKind::LessThanOrEqual => Sym::LessThanOrEqual,
            TokenKind::GreaterThan => Sym::GreaterThan,
            TokenKind::GreaterThanOrEqual => Sym::GreaterThanOrEqual,
            TokenKind::Plus => Sym::Plus,
            TokenKind::Minus => Sym::Minus,
            TokenKind::Multiply => Sym::Multiply,
            TokenKind::Divide => Sym::Divide,
            TokenKind::Modulo => Sym::Modulo,
            TokenKind::StringLiteral(_) => Sym::StringLiteral,
            TokenKind::NumberLiteral(_) => Sym::NumberLiteral,
            TokenKind::TimeModifier(_) => Sym::TimeModifier,
            TokenKind::True => Sym::True,
            TokenKind::False => Sym::False,
            TokenKind::Null => Sym::Null,
            TokenKind::Identifier(_) => Sym::Identifier,
            TokenKind::WildcardField(_) => Sym::WildcardField,
            TokenKind::Keyword(k) => Sym::Keyword(*k),
            TokenKind::MacroCall(_) | TokenKind::LBracket | TokenKind::RBracket
            | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Error => Sym::Other,
        }
    }
}

type PErr = Simple<Sym>;

/// Parses one expression starting at `tokens[0]`. Returns the expression,
/// how many tokens it consumed (so the caller's cursor can skip past them),
/// and any diagnostics. Never fails outright: on a dead end it reports an
/// error and synthesizes a `null` literal, the same fallback
/// `parser::Parser::parse_primary` used.
pub fn parse_expr(tokens: &[Token]) -> (Expr, usize, Vec<ParseError>) {
    if tokens.is_empty() {
        return (Expr::new(ExprKind::Literal(Literal::Null), Location::new(1, 1, 0, 0)), 0, Vec::new());
    }
    let grammar = expr_grammar(tokens).map_with_span(|expr, span: Range<usize>| (expr, span.end));
    let len = tokens.len();
    let stream = Stream::from_iter(
        len..len + 1,
        tokens.iter().enumerate().map(|(i, t)| (Sym::from(&t.kind), i..i + 1)),
    );
    match grammar.parse_recovery(stream) {
        (Some((expr, consumed)), errs) => (expr, consumed, errs.into_iter().map(|e| to_parse_error(tokens, e)).collect()),
        (None, errs) => {
            let parse_errors = errs.into_iter().map(|e| to_parse_error(tokens, e)).collect();
            (Expr::new(ExprKind::Literal(Literal::Null), idx_loc(tokens, 0)), tokens.len(), parse_errors)
        }
    }
}

fn to_parse_error(tokens: &[Token], err: PErr) -> ParseError {
    let idx = err.span().start.min(tokens.len().saturating_sub(1));
    let (line, column, text) = tokens
        .get(idx)
        .map(|t| (t.start_line, t.start_column, t.text.clone()))
        .unwrap_or((0, 0, "<eof>".to_string()));
    let message = err
        .label()
        .map(|l| format!("unexpected token in expression, expected {l}"))
        .unwrap_or_else(|| "unexpected token in expression".to_string());
    log::warn!("parser: {message} at {line}:{column} (found {text:?})");
    ParseError { message, line, column, token_text: text, expected: err.label().map(|l| l.to_string()) }
}

fn idx_loc(tokens: &[Token], idx: usize) -> Location {
    let tok = &tokens[idx.min(tokens.len() - 1)];
    Location {
        line: tok.start_line,
        column: tok.start_column,
        end_line: tok.end_line,
        end_column: tok.end_column,
        start: tok.start_offset,
        end: tok.end_offset,
    }
}

fn tok_loc(tok: &Token) -> Location {
    Location {
        line: tok.start_line,
        column: tok.start_column,
        end_line: tok.end_line,
        end_column: tok.end_column,
        start: tok.start_offset,
        end: tok.end_offset,
    }
}

fn just_sym(sym: Sym) -> impl Parser<Sym, (), Error = PErr> + Clone {
    filter(move |s: &Sym| *s == sym).ignored()
}

/// Matches one token whose `Sym` satisfies `pred`, producing the original
/// (cloned) [`Token`] so its payload (string/number value, text, location)
/// is available to the caller.
fn value_tok<'a>(
    tokens: &'a [Token],
    pred: impl Fn(&Sym) -> bool + Clone + 'a,
) -> impl Parser<Sym, Token, Error = PErr> + Clone + 'a {
    filter(pred).map_with_span(move |_, span: Range<usize>| tokens[span.start].clone())
}

fn token_name(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Identifier(s) => s.clone(),
        TokenKind::Keyword(k) => k.to_string(),
        _ => String::new(),
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let loc = Location::span(left.location, right.location);
    Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, loc)
}

fn expr_grammar(tokens: &[Token]) -> impl Parser<Sym, Expr, Error = PErr> + Clone + '_ {
    recursive(|expr| {
        let paren = just_sym(Sym::LParen).ignore_then(expr.clone()).then_ignore(just_sym(Sym::RParen));

        let func_call = value_tok(tokens, |s| matches!(s, Sym::Identifier | Sym::Keyword(_)))
            .then_ignore(just_sym(Sym::LParen))
            .then(expr.clone().separated_by(just_sym(Sym::Comma)).allow_trailing())
            .then(value_tok(tokens, |s| *s == Sym::RParen))
            .map(|((name_tok, args), rparen_tok)| {
                let loc = Location::span(tok_loc(&name_tok), tok_loc(&rparen_tok));
                Expr::new(ExprKind::FuncCall { name: token_name(&name_tok), args }, loc)
            });

        let literal = value_tok(tokens, |s| {
            matches!(s, Sym::NumberLiteral | Sym::StringLiteral | Sym::True | Sym::False | Sym::Null | Sym::TimeModifier)
        })
        .map(|tok| {
            let loc = tok_loc(&tok);
            let lit = match &tok.kind {
                TokenKind::NumberLiteral(n) => Literal::Number(*n),
                TokenKind::StringLiteral(s) => Literal::String(s.clone()),
                TokenKind::True => Literal::Boolean(true),
                TokenKind::False => Literal::Boolean(false),
                TokenKind::TimeModifier(t) => Literal::String(t.clone()),
                _ => Literal::Null,
            };
            Expr::new(ExprKind::Literal(lit), loc)
        });

        let field = value_tok(tokens, |s| {
            matches!(s, Sym::Identifier | Sym::WildcardField)
                || matches!(s, Sym::Keyword(k) if k.is_field_capable())
        })
        .map(|tok| {
            let loc = tok_loc(&tok);
            let name = match &tok.kind {
                TokenKind::Identifier(s) | TokenKind::WildcardField(s) => s.clone(),
                TokenKind::Keyword(k) => k.to_string(),
                _ => String::new(),
            };
            Expr::new(ExprKind::Field(FieldRef::new(name, loc)), loc)
        });

        let fallback = value_tok(tokens, |_| true).map(|tok| {
            let loc = tok_loc(&tok);
            Expr::new(ExprKind::Literal(Literal::Null), loc)
        });

        let primary = choice((paren, func_call, literal, field))
            .or(fallback.validate(move |expr, span: Range<usize>, emit| {
                emit(PErr::expected_input_found(span, Vec::new(), None).with_label("expression"));
                expr
            }));

        let unary = recursive(|unary: Recursive<Sym, Expr, PErr>| {
            let not_op = just_sym(Sym::Keyword(Keyword::Not))
                .ignore_then(unary.clone())
                .map_with_span(move |operand, span: Range<usize>| {
                    Expr::new(ExprKind::Unary { op: UnOp::Not, operand: Box::new(operand) }, span_loc(tokens, span))
                });
            let neg_op = just_sym(Sym::Minus)
                .ignore_then(unary)
                .map_with_span(move |operand, span: Range<usize>| {
                    Expr::new(ExprKind::Unary { op: UnOp::Neg, operand: Box::new(operand) }, span_loc(tokens, span))
                });
            choice((not_op, neg_op, primary))
        });

        let multiplicative = unary
            .clone()
            .then(
                choice((
                    just_sym(Sym::Multiply).to(BinOp::Mul),
                    just_sym(Sym::Divide).to(BinOp::Div),
                    just_sym(Sym::Modulo).to(BinOp::Mod),
                ))
                .then(unary)
                .repeated(),
            )
            .foldl(|left, (op, right)| binary(op, left, right));

        let additive = multiplicative
            .clone()
            .then(
                choice((
                    just_sym(Sym::Plus).to(BinOp::Add),
                    just_sym(Sym::Minus).to(BinOp::Sub),
                    just_sym(Sym::Dot).to(BinOp::Concat),
                ))
                .then(multiplicative)
                .repeated(),
            )
            .foldl(|left, (op, right)| binary(op, left, right));

        let comparison = additive
            .clone()
            .then(
                choice((
                    just_sym(Sym::Equals).to(BinOp::Eq),
                    just_sym(Sym::NotEquals).to(BinOp::Ne),
                    just_sym(Sym::LessThanOrEqual).to(BinOp::Le),
                    just_sym(Sym::LessThan).to(BinOp::Lt),
                    just_sym(Sym::GreaterThanOrEqual).to(BinOp::Ge),
                    just_sym(Sym::GreaterThan).to(BinOp::Gt),
                ))
                .then(additive)
                .or_not(),
            )
            .map(|(left, rest)| match rest {
                Some((op, right)) => binary(op, left, right),
                None => left,
            });

        let and_expr = comparison
            .clone()
            .then(just_sym(Sym::Keyword(Keyword::And)).ignore_then(comparison).repeated())
            .foldl(|left, right| binary(BinOp::And, left, right));

        and_expr
            .clone()
            .then(just_sym(Sym::Keyword(Keyword::Or)).ignore_then(and_expr).repeated())
            .foldl(|left, right| binary(BinOp::Or, left, right))
    })
}

fn span_loc(tokens: &[Token], span: Range<usize>) -> Location {
    let end = span.end.saturating_sub(1).min(tokens.len().saturating_sub(1));
    Location::span(idx_loc(tokens, span.start), idx_loc(tokens, end))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    fn expr_of(text: &str) -> (Expr, usize, Vec<ParseError>) {
        let (tokens, _) = tokenize(text);
        parse_expr(&tokens)
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        let (expr, consumed, errors) = expr_of("price*qty+1");
        assert!(errors.is_empty());
        assert_eq!(consumed, 5);
        let ExprKind::Binary { op: BinOp::Add, left, right } = &expr.kind else {
            panic!("expected a top-level add, got {expr:?}")
        };
        assert!(matches!(right.kind, ExprKind::Literal(Literal::Number(n)) if n == 1.0));
        assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn parses_function_call_with_args() {
        let (expr, _, errors) = expr_of("round(total, 2)");
        assert!(errors.is_empty());
        let ExprKind::FuncCall { name, args } = &expr.kind else {
            panic!("expected a function call")
        };
        assert_eq!(name, "round");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn parses_boolean_and_comparison() {
        let (expr, _, errors) = expr_of("status=200 AND NOT bytes<0");
        assert!(errors.is_empty());
        assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn stops_at_comma_for_caller_to_handle() {
        let (_, consumed, _) = expr_of("x=1, y=2");
        // only "x=1" belongs to this expression; the comma is left for the
        // caller (`parse_eval_like`'s assignment loop) to consume.
        assert_eq!(consumed, 3);
    }
}
