//! C2: tokenize free-form SPL text into a keyword-rich token stream.
//!
//! Built on `chumsky`'s char-level parser combinators, the same crate and
//! style the teacher project lexes with (`prqlc-parser::lexer::lexer`):
//! each lexeme is described declaratively (`just`, `filter`, `repeated`,
//! `map_with_span`) rather than by hand-advancing a cursor. Diagnostics that
//! need an exact wording (unterminated string, stray `!`, ...) are carried
//! through as marker values and turned into `LexError`s in one pass after
//! the combinator grammar runs, since spec.md §4.1 pins down message text
//! chumsky's own `Cheap<char>` doesn't carry.

use std::ops::Range;
use std::str::FromStr;

use chumsky::error::Cheap;
use chumsky::prelude::*;

use crate::error::LexError;
use crate::token::{Keyword, Token, TokenKind};

pub fn tokenize(text: &str) -> (Vec<Token>, Vec<LexError>) {
    if text.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let raw = lexer().parse(text).unwrap_or_default();
    let line_starts = line_starts(text);

    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (lexeme, span) in raw {
        let (start_line, start_column) = line_col(text, &line_starts, span.start);
        let (end_line, end_column) = line_col(text, &line_starts, span.end);
        let token_text = text[span.start..span.end].to_string();

        let kind = match lexeme {
            Lexeme::Punct(kind) => kind,
            Lexeme::Ident => classify_word(&token_text),
            Lexeme::Number => {
                let value = token_text.parse::<f64>().unwrap_or(f64::NAN);
                TokenKind::NumberLiteral(value)
            }
            Lexeme::TimeModifier => TokenKind::TimeModifier(token_text.clone()),
            Lexeme::StringLiteral(value) => TokenKind::StringLiteral(value),
            Lexeme::UnterminatedString(value) => {
                push_error(
                    &mut errors,
                    "unterminated string literal",
                    start_line,
                    start_column,
                    span.start,
                );
                TokenKind::StringLiteral(value)
            }
            Lexeme::MacroCall(value) => TokenKind::MacroCall(value),
            Lexeme::UnterminatedMacro(value) => {
                push_error(
                    &mut errors,
                    "unterminated macro call",
                    start_line,
                    start_column,
                    span.start,
                );
                TokenKind::MacroCall(value)
            }
            Lexeme::BadBang => {
                push_error(&mut errors, "unexpected byte '!'", start_line, start_column, span.start);
                TokenKind::Error
            }
            Lexeme::BadByte(c) => {
                push_error(
                    &mut errors,
                    format!("unexpected byte {c:?}"),
                    start_line,
                    start_column,
                    span.start,
                );
                TokenKind::Error
            }
        };

        tokens.push(Token {
            kind,
            text: token_text,
            start_line,
            start_column,
            end_line,
            end_column,
            start_offset: span.start,
            end_offset: span.end,
        });
    }
    (tokens, errors)
}

fn push_error(errors: &mut Vec<LexError>, message: impl Into<String>, line: u32, column: u32, offset: usize) {
    let message = message.into();
    log::warn!("lexer: {message} at {line}:{column}");
    errors.push(LexError {
        message,
        line,
        column,
        offset,
    });
}

/// What one combinator match turned out to be; most variants carry no
/// payload because the final token text is sliced from `span` once instead
/// of rebuilt twice.
#[derive(Clone, Debug, PartialEq)]
enum Lexeme {
    Punct(TokenKind),
    Ident,
    Number,
    TimeModifier,
    StringLiteral(String),
    UnterminatedString(String),
    MacroCall(String),
    UnterminatedMacro(String),
    BadBang,
    BadByte(char),
}

fn lexer() -> impl Parser<char, Vec<(Lexeme, Range<usize>)>, Error = Cheap<char>> {
    ignored()
        .ignore_then(lex_token().map_with_span(|lexeme, span| (lexeme, span)))
        .then_ignore(ignored())
        .repeated()
        .then_ignore(end())
}

fn ignored() -> impl Parser<char, (), Error = Cheap<char>> {
    filter(|c: &char| c.is_whitespace()).repeated().ignored()
}

fn lex_token() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    let bang = just("!=")
        .to(Lexeme::Punct(TokenKind::NotEquals))
        .or(just('!').to(Lexeme::BadBang));

    choice((
        string_literal('"'),
        string_literal('\''),
        macro_call(),
        time_modifier().or(just('-').to(Lexeme::Punct(TokenKind::Minus))),
        bang,
        number(),
        ident_or_keyword(),
        punct(),
    ))
    .or(any().map(Lexeme::BadByte))
}

fn punct() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    just('|')
        .to(TokenKind::Pipe)
        .or(just('(').to(TokenKind::LParen))
        .or(just(')').to(TokenKind::RParen))
        .or(just('[').to(TokenKind::LBracket))
        .or(just(']').to(TokenKind::RBracket))
        .or(just('{').to(TokenKind::LBrace))
        .or(just('}').to(TokenKind::RBrace))
        .or(just(',').to(TokenKind::Comma))
        .or(just("<=").to(TokenKind::LessThanOrEqual))
        .or(just('<').to(TokenKind::LessThan))
        .or(just(">=").to(TokenKind::GreaterThanOrEqual))
        .or(just('>').to(TokenKind::GreaterThan))
        .or(just('=').to(TokenKind::Equals))
        .or(just('+').to(TokenKind::Plus))
        .or(just('*').to(TokenKind::Multiply))
        .or(just('/').to(TokenKind::Divide))
        .or(just('%').to(TokenKind::Modulo))
        .or(just('.').to(TokenKind::Dot))
        .map(Lexeme::Punct)
}

/// `-<digits><unit letters>[@<alnum>*]`, e.g. `-24h`, `-7d@d`. Tried before
/// plain `Minus` so a bare `-` in `x-1` still falls through to subtraction.
fn time_modifier() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    just('-')
        .ignore_then(filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1))
        .ignore_then(filter(|c: &char| c.is_ascii_alphabetic()).repeated().at_least(1))
        .ignore_then(
            just('@')
                .ignore_then(filter(|c: &char| c.is_ascii_alphanumeric()).repeated())
                .or_not(),
        )
        .to(Lexeme::TimeModifier)
}

fn string_literal(quote: char) -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    let escaped = just('\\').ignore_then(
        just('n')
            .to("\n".to_string())
            .or(just('t').to("\t".to_string()))
            .or(filter(move |c: &char| *c == quote || *c == '\\').map(|c: char| c.to_string()))
            // Any other escape (notably regex escapes like `\d`, `\s` inside
            // `rex`/`regex` patterns) is kept verbatim, backslash included;
            // the following char is left for the next unit to consume.
            .or(empty().to("\\".to_string())),
    );
    let plain = filter(move |c: &char| *c != quote && *c != '\\' && *c != '\n').map(|c: char| c.to_string());
    let body = choice((escaped, plain)).repeated().collect::<Vec<String>>().map(|v| v.concat());

    just(quote)
        .ignore_then(body)
        .then(just(quote).to(true).or_not().map(|t| t.unwrap_or(false)))
        .map(|(value, terminated)| {
            if terminated {
                Lexeme::StringLiteral(value)
            } else {
                Lexeme::UnterminatedString(value)
            }
        })
}

fn macro_call() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    just('`')
        .ignore_then(filter(|c: &char| *c != '`').repeated().collect::<String>())
        .then(just('`').to(true).or_not().map(|t| t.unwrap_or(false)))
        .map(|(value, terminated)| {
            if terminated {
                Lexeme::MacroCall(value)
            } else {
                Lexeme::UnterminatedMacro(value)
            }
        })
}

fn number() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    let digit = filter(|c: &char| c.is_ascii_digit());
    let digits1 = || digit.repeated().at_least(1).ignored();
    let frac = just('.').then_ignore(digits1());
    let exp = one_of::<_, _, Cheap<char>>("eE")
        .ignore_then(one_of("+-").or_not())
        .then_ignore(digits1());

    let digits_first = digits1().then_ignore(frac.or_not()).then_ignore(exp.clone().or_not());
    let dot_first = just('.').ignore_then(digits1()).then_ignore(exp.or_not());

    digits_first.or(dot_first).to(Lexeme::Number)
}

fn ident_or_keyword() -> impl Parser<char, Lexeme, Error = Cheap<char>> {
    filter(|c: &char| is_ident_start(*c))
        .chain(filter(|c: &char| is_ident_continue(*c)).repeated())
        .to(Lexeme::Ident)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in text.char_indices() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn line_col(text: &str, line_starts: &[usize], offset: usize) -> (u32, u32) {
    let line_idx = match line_starts.binary_search(&offset) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    let line_start = line_starts[line_idx];
    let column = text[line_start..offset].chars().count() as u32 + 1;
    (line_idx as u32 + 1, column)
}

/// The teacher's lexer resolves the keyword-vs-identifier conflict by
/// requiring the *entire* scanned run to match a keyword exactly
/// (case-insensitively); substrings of longer identifiers never become
/// keywords because `ident_or_keyword` always scans to its maximal length
/// first.
///
/// `*` is deliberately excluded from identifier characters: it is kept as a
/// standalone [`TokenKind::Multiply`] so `eval`/`where` arithmetic lexes
/// correctly, and field-list contexts (`fields so*`, `rename host* AS *_h`)
/// reassemble adjacent `Multiply` tokens into a wildcard field in
/// [`crate::parser::Parser::parse_field_ref`] instead.
fn classify_word(text: &str) -> TokenKind {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "true" => return TokenKind::True,
        "false" => return TokenKind::False,
        "null" => return TokenKind::Null,
        "now" | "earliest" | "latest" => return TokenKind::TimeModifier(text.to_string()),
        _ => {}
    }
    if let Ok(kw) = Keyword::from_str(&lower) {
        TokenKind::Keyword(kw)
    } else {
        TokenKind::Identifier(text.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_simple_pipeline() {
        let kinds = kinds("index=main | eval x=1");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("index".into()),
                TokenKind::Equals,
                TokenKind::Identifier("main".into()),
                TokenKind::Pipe,
                TokenKind::Keyword(Keyword::Eval),
                TokenKind::Identifier("x".into()),
                TokenKind::Equals,
                TokenKind::NumberLiteral(1.0),
            ]
        );
    }

    #[test]
    fn keyword_does_not_match_identifier_substring() {
        // `evaluate` must lex as one identifier, not `eval` + `uate`.
        let kinds = kinds("evaluate");
        assert_eq!(kinds, vec![TokenKind::Identifier("evaluate".into())]);
    }

    #[test]
    fn keywords_are_case_insensitive_identifiers_preserve_case() {
        let tokens = tokenize("STATS Count By Host").0;
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Stats));
        assert_eq!(tokens[1].text, "Count");
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(_)));
    }

    #[test]
    fn unterminated_string_is_recovered() {
        let (tokens, errors) = tokenize("eval x=\"abc");
        assert_eq!(errors.len(), 1);
        assert!(matches!(tokens.last().unwrap().kind, TokenKind::StringLiteral(_)));
    }

    #[test]
    fn line_and_column_track_newlines() {
        let tokens = tokenize("eval a=1\neval b=2").0;
        let b_tok = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b_tok.start_line, 2);
    }

    #[test]
    fn rex_pattern_string_keeps_capture_group_syntax() {
        let tokens = tokenize(r#"rex field=_raw "status=(?<status>\d+)""#).0;
        let string_tok = tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::StringLiteral(_)))
            .unwrap();
        assert_eq!(
            string_tok.kind,
            TokenKind::StringLiteral("status=(?<status>\\d+)".into())
        );
    }
}
