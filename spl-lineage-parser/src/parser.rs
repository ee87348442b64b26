//! C3: recursive-descent LL(k≤3) parser with backtracking gates and
//! per-command error recovery (skip to the next `|` or EOF).

use spl_lineage_ast::{Expr, ExprKind, FieldRef, Literal, Location, SearchComparison};

use crate::cst::{AggregationCst, CstNode, CstShape, GenericCommandCst, LookupMappingCst, OptionPair};
use crate::error::ParseError;
use crate::token::{Keyword, Token, TokenKind};

pub fn parse(tokens: &[Token]) -> (Option<Vec<CstNode>>, Vec<ParseError>) {
    let mut p = Parser::new(tokens);
    let stages = p.parse_pipeline();
    (Some(stages), p.errors)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    // --- cursor helpers ---------------------------------------------------

    fn peek(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn peek_tok(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_pipe(&self) -> bool {
        matches!(self.peek(0), Some(TokenKind::Pipe))
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn location_of(&self, tok: &Token) -> Location {
        Location {
            line: tok.start_line,
            column: tok.start_column,
            end_line: tok.end_line,
            end_column: tok.end_column,
            start: tok.start_offset,
            end: tok.end_offset,
        }
    }

    fn current_location(&self) -> Location {
        self.peek_tok(0)
            .or_else(|| self.tokens.last())
            .map(|t| self.location_of(t))
            .unwrap_or(Location::new(1, 1, 0, 0))
    }

    fn error(&mut self, message: impl Into<String>, expected: Option<&str>) {
        let (line, column, text) = self
            .peek_tok(0)
            .map(|t| (t.start_line, t.start_column, t.text.clone()))
            .unwrap_or((0, 0, "<eof>".to_string()));
        let message = message.into();
        log::warn!("parser: {message} at {line}:{column} (found {text:?}), recovering");
        self.errors.push(ParseError {
            message,
            line,
            column,
            token_text: text,
            expected: expected.map(|s| s.to_string()),
        });
    }

    /// Recover from a failed command rule by skipping to the next `|` or EOF
    /// (spec §4.2: "on failure inside a command rule the parser skips to the
    /// next Pipe or EOF and continues").
    fn recover_to_next_pipe(&mut self) {
        while !self.at_end() && !self.at_pipe() {
            self.advance();
        }
    }

    /// GATE: disambiguates `optionName=value` from a positional field — true
    /// iff the token at LA(2) is `=` (spec §4.2's stated rule).
    fn looks_like_option(&self) -> bool {
        self.field_like_text(0).is_some() && matches!(self.peek(1), Some(TokenKind::Equals))
    }

    /// The `fieldOrWildcard` helper: several keyword tokens are accepted as
    /// field names in positional/option-name position.
    fn field_like_text(&self, offset: usize) -> Option<String> {
        match self.peek(offset) {
            Some(TokenKind::Identifier(s)) | Some(TokenKind::WildcardField(s)) => Some(s.clone()),
            Some(TokenKind::Keyword(k)) if k.is_field_capable() => Some(k.to_string()),
            _ => None,
        }
    }

    /// Parses one field reference, reassembling a wildcard pattern like
    /// `host*` or `*_error` from adjacent `Multiply` tokens (the lexer never
    /// emits `*` as part of an identifier — see `classify_word`'s doc
    /// comment). Only called from field-list positions, never from
    /// expression parsing, so `price*qty` in an `eval` still lexes as
    /// multiplication.
    fn parse_field_ref(&mut self) -> Option<FieldRef> {
        let start_tok = self.peek_tok(0)?.clone();
        let mut prefix = String::new();
        if matches!(start_tok.kind, TokenKind::Minus) {
            prefix.push('-');
            self.advance();
        }
        let mut name = match self.field_like_text(0) {
            Some(n) => n,
            None if !prefix.is_empty() => return Some(FieldRef::new(prefix, self.location_of(&start_tok))),
            None => return None,
        };
        name.insert_str(0, &prefix);
        self.advance();
        let mut last_tok = start_tok.clone();
        while let Some(mul_tok) = self.peek_tok(0).cloned() {
            if !matches!(mul_tok.kind, TokenKind::Multiply) || mul_tok.start_offset != last_tok.end_offset
            {
                break;
            }
            name.push('*');
            self.advance();
            last_tok = mul_tok;
            if let Some(next_text) = self.field_like_text(0) {
                let next_tok = self.peek_tok(0).unwrap().clone();
                if next_tok.start_offset == last_tok.end_offset {
                    name.push_str(&next_text);
                    self.advance();
                    last_tok = next_tok;
                }
            }
        }
        let loc = Location::span(self.location_of(&start_tok), self.location_of(&last_tok));
        Some(FieldRef::new(name, loc))
    }

    fn parse_option_value_text(&mut self) -> (String, Location) {
        let tok = match self.advance() {
            Some(t) => t.clone(),
            None => return (String::new(), self.current_location()),
        };
        let text = match &tok.kind {
            TokenKind::StringLiteral(s) => s.clone(),
            _ => tok.text.clone(),
        };
        (text, self.location_of(&tok))
    }

    // --- top level ----------------------------------------------------

    fn parse_pipeline(&mut self) -> Vec<CstNode> {
        let mut stages = Vec::new();
        if !self.at_pipe() && !self.at_end() {
            stages.push(self.parse_search_expression());
        }
        while self.at_pipe() {
            self.advance(); // consume '|'
            if self.at_end() {
                break;
            }
            stages.push(self.parse_command());
        }
        stages
    }

    fn parse_search_expression(&mut self) -> CstNode {
        let start = self.current_location();
        // Optional leading `search` keyword.
        if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::Search))) {
            self.advance();
        }
        let mut terms = Vec::new();
        while !self.at_pipe() && !self.at_end() {
            if matches!(
                self.peek(0),
                Some(TokenKind::Keyword(Keyword::And))
                    | Some(TokenKind::Keyword(Keyword::Or))
                    | Some(TokenKind::Keyword(Keyword::Not))
            ) {
                self.advance();
                continue;
            }
            if matches!(self.peek(0), Some(TokenKind::LBracket)) {
                self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
                continue;
            }
            if let Some(field_text) = self.field_like_text(0) {
                if let Some(op) = self.comparison_op_at(1) {
                    let field_tok = self.peek_tok(0).unwrap().clone();
                    self.advance();
                    self.advance(); // operator
                    let (value, value_loc) = self.parse_option_value_text();
                    let loc = Location::span(self.location_of(&field_tok), value_loc);
                    terms.push(SearchComparison {
                        field: FieldRef::new(field_text, self.location_of(&field_tok)),
                        operator: op,
                        value,
                        location: loc,
                    });
                    continue;
                }
            }
            self.advance();
        }
        let end = self.current_location();
        CstNode {
            rule: "search",
            command_name: "search".to_string(),
            location: Location::span(start, end),
            shape: CstShape::Search { terms },
        }
    }

    fn comparison_op_at(&self, offset: usize) -> Option<String> {
        match self.peek(offset) {
            Some(TokenKind::Equals) => Some("=".to_string()),
            Some(TokenKind::NotEquals) => Some("!=".to_string()),
            Some(TokenKind::LessThan) => Some("<".to_string()),
            Some(TokenKind::LessThanOrEqual) => Some("<=".to_string()),
            Some(TokenKind::GreaterThan) => Some(">".to_string()),
            Some(TokenKind::GreaterThanOrEqual) => Some(">=".to_string()),
            _ => None,
        }
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        let mut depth = 0;
        loop {
            match self.peek(0) {
                None => break,
                Some(k) if *k == open => {
                    depth += 1;
                    self.advance();
                }
                Some(k) if *k == close => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    // --- command dispatch -----------------------------------------------

    fn parse_command(&mut self) -> CstNode {
        let start = self.current_location();
        let name_tok = match self.peek_tok(0) {
            Some(t) => t.clone(),
            None => {
                self.error("expected a command name", Some("command"));
                return self.generic_cst("", start, GenericCommandCst::default());
            }
        };
        let name = match &name_tok.kind {
            TokenKind::Keyword(k) => k.to_string(),
            TokenKind::Identifier(s) => s.clone(),
            _ => {
                self.error(
                    format!("unexpected token {}", name_tok.text),
                    Some("command name"),
                );
                self.recover_to_next_pipe();
                return self.generic_cst("", start, GenericCommandCst::default());
            }
        };
        self.advance();

        let node = match name.as_str() {
            "eval" | "setfields" => self.parse_eval_like(&name, start),
            "where" => self.parse_where(start),
            "stats" | "eventstats" | "streamstats" | "chart" | "timechart" => {
                self.parse_stats(&name, start)
            }
            "tstats" => self.parse_stats(&name, start),
            "rex" => self.parse_rex(start),
            "rename" => self.parse_rename(start),
            "lookup" => self.parse_lookup(start),
            "convert" => self.parse_convert(start),
            "append" | "appendcols" | "join" | "union" => self.parse_subsearch(&name, start),
            "bin" | "delta" | "accum" | "autoregress" | "bucketdir" => {
                self.parse_field_alias_command(&name, start)
            }
            _ => self.parse_generic(&name, start),
        };

        if self.pos < self.tokens.len() && !self.at_pipe() {
            // The command rule didn't consume everything up to the next
            // pipe: recover instead of silently dropping tokens.
            self.recover_to_next_pipe();
        }
        node
    }

    fn generic_cst(&self, name: &str, start: Location, generic: GenericCommandCst) -> CstNode {
        CstNode {
            rule: "genericCommand",
            command_name: name.to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Generic(generic),
        }
    }

    /// The shared template from spec §4.2: optional leading count, then
    /// `(optionName=optionValue)*`, then a positional field/wildcard list,
    /// then an optional `BY field-list`.
    fn parse_generic(&mut self, name: &str, start: Location) -> CstNode {
        let mut generic = GenericCommandCst::default();

        if let Some(TokenKind::NumberLiteral(n)) = self.peek(0) {
            generic.leading_number = Some(*n);
            self.advance();
        }

        loop {
            if self.at_pipe() || self.at_end() {
                break;
            }
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::By))) {
                self.advance();
                while let Some(f) = self.parse_field_ref() {
                    generic.by_fields.push(f);
                    if matches!(self.peek(0), Some(TokenKind::Comma)) {
                        self.advance();
                    }
                }
                continue;
            }
            if self.looks_like_option() {
                let name_tok = self.peek_tok(0).unwrap().clone();
                let option_name = self.field_like_text(0).unwrap();
                self.advance(); // name
                self.advance(); // '='
                let (value, value_loc) = self.parse_option_value_text();
                generic.options.push(OptionPair {
                    name: option_name,
                    name_location: self.location_of(&name_tok),
                    value,
                    value_location: value_loc,
                });
                continue;
            }
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
                continue;
            }
            match self.parse_field_ref() {
                Some(f) => generic.fields.push(f),
                None => break,
            }
        }

        self.generic_cst(name, start, generic)
    }

    fn parse_eval_like(&mut self, name: &str, start: Location) -> CstNode {
        let mut assignments = Vec::new();
        loop {
            if self.at_pipe() || self.at_end() {
                break;
            }
            let Some(target) = self.parse_field_ref() else {
                self.error("expected a field name in assignment", Some("field"));
                self.recover_to_next_pipe();
                break;
            };
            if !matches!(self.peek(0), Some(TokenKind::Equals)) {
                self.error("expected '=' after field name", Some("="));
                self.recover_to_next_pipe();
                break;
            }
            self.advance();
            let expr = self.parse_expr();
            assignments.push((target, expr));
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
            }
        }
        CstNode {
            rule: "evalCommand",
            command_name: name.to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Eval { assignments },
        }
    }

    fn parse_where(&mut self, start: Location) -> CstNode {
        let expr = self.parse_expr();
        CstNode {
            rule: "whereCommand",
            command_name: "where".to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Expr { expr },
        }
    }

    fn parse_field_alias_command(&mut self, name: &str, start: Location) -> CstNode {
        // `bin span=5m field [AS alias]`; also covers delta/accum/autoregress/bucketdir.
        let mut generic = GenericCommandCst::default();
        while self.looks_like_option() {
            let name_tok = self.peek_tok(0).unwrap().clone();
            let option_name = self.field_like_text(0).unwrap();
            self.advance();
            self.advance();
            let (value, value_loc) = self.parse_option_value_text();
            generic.options.push(OptionPair {
                name: option_name,
                name_location: self.location_of(&name_tok),
                value,
                value_location: value_loc,
            });
        }
        if let Some(field) = self.parse_field_ref() {
            generic.fields.push(field);
        }
        if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::As))) {
            self.advance();
            if let Some(alias) = self.parse_field_ref() {
                generic.by_fields.push(alias); // reuse by_fields slot as "alias" for this shape
            }
        }
        self.generic_cst(name, start, generic)
    }

    fn parse_stats(&mut self, name: &str, start: Location) -> CstNode {
        let mut aggregations = Vec::new();
        let mut by_fields = Vec::new();
        loop {
            if self.at_pipe() || self.at_end() {
                break;
            }
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::By))) {
                self.advance();
                while let Some(f) = self.parse_field_ref() {
                    by_fields.push(f);
                    if matches!(self.peek(0), Some(TokenKind::Comma)) {
                        self.advance();
                    }
                }
                continue;
            }
            if self.looks_like_option() {
                // e.g. `limit=10`; skip, not part of field lineage.
                self.advance();
                self.advance();
                self.parse_option_value_text();
                continue;
            }
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
                continue;
            }
            let Some(func_tok) = self.peek_tok(0).cloned() else {
                break;
            };
            let function = match &func_tok.kind {
                TokenKind::Identifier(s) => s.clone(),
                TokenKind::Keyword(k) => k.to_string(),
                _ => break,
            };
            self.advance();
            let field = if matches!(self.peek(0), Some(TokenKind::LParen)) {
                self.advance();
                let f = if matches!(self.peek(0), Some(TokenKind::RParen)) {
                    None
                } else {
                    self.parse_field_ref()
                };
                if matches!(self.peek(0), Some(TokenKind::RParen)) {
                    self.advance();
                }
                f
            } else {
                None
            };
            let mut alias = None;
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::As))) {
                self.advance();
                alias = self.parse_field_ref();
            }
            aggregations.push(AggregationCst {
                function,
                field,
                alias,
                location: self.location_of(&func_tok),
            });
        }
        CstNode {
            rule: "aggregation",
            command_name: name.to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Stats {
                aggregations,
                by_fields,
            },
        }
    }

    fn parse_rex(&mut self, start: Location) -> CstNode {
        let mut field = None;
        let mut pattern = String::new();
        while !self.at_pipe() && !self.at_end() {
            if self.looks_like_option() {
                let option_name = self.field_like_text(0).unwrap();
                self.advance();
                self.advance();
                let (value, value_loc) = self.parse_option_value_text();
                if option_name.eq_ignore_ascii_case("field") {
                    field = Some(FieldRef::new(value, value_loc));
                }
                continue;
            }
            if let Some(TokenKind::StringLiteral(s)) = self.peek(0) {
                pattern = s.clone();
                self.advance();
                continue;
            }
            self.advance();
        }
        CstNode {
            rule: "rexCommand",
            command_name: "rex".to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Rex { field, pattern },
        }
    }

    fn parse_rename(&mut self, start: Location) -> CstNode {
        let mut renamings = Vec::new();
        loop {
            if self.at_pipe() || self.at_end() {
                break;
            }
            let Some(old) = self.parse_field_ref() else {
                break;
            };
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::As))) {
                self.advance();
            } else {
                self.error("expected 'AS' in rename", Some("AS"));
            }
            let Some(new) = self.parse_field_ref() else {
                break;
            };
            renamings.push((old, new));
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
            }
        }
        if renamings.is_empty() {
            self.error("rename requires at least one 'field AS alias' pair", Some("field"));
        }
        CstNode {
            rule: "renameCommand",
            command_name: "rename".to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Rename { renamings },
        }
    }

    fn parse_lookup(&mut self, start: Location) -> CstNode {
        let lookup_name = self
            .field_like_text(0)
            .unwrap_or_else(|| "unknown".to_string());
        self.advance();

        let mut input = Vec::new();
        let mut output = Vec::new();
        let mut has_output_clause = false;
        let mut in_output = false;
        loop {
            if self.at_pipe() || self.at_end() {
                break;
            }
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::Output)))
                || matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::Outputnew)))
            {
                self.advance();
                in_output = true;
                has_output_clause = true;
                continue;
            }
            let Some(lookup_field) = self.parse_field_ref() else {
                self.advance();
                continue;
            };
            let mut event_field = None;
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::As))) {
                self.advance();
                event_field = self.parse_field_ref();
            }
            let mapping = LookupMappingCst {
                lookup_field,
                event_field,
            };
            if in_output {
                output.push(mapping);
            } else {
                input.push(mapping);
            }
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
            }
        }
        CstNode {
            rule: "lookupCommand",
            command_name: "lookup".to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Lookup {
                lookup_name,
                input,
                output,
                has_output_clause,
            },
        }
    }

    fn parse_convert(&mut self, start: Location) -> CstNode {
        let mut conversions = Vec::new();
        while !self.at_pipe() && !self.at_end() {
            if self.looks_like_option() {
                // e.g. `timeformat=...`
                self.advance();
                self.advance();
                self.parse_option_value_text();
                continue;
            }
            let Some(func_tok) = self.peek_tok(0).cloned() else {
                break;
            };
            let function = match &func_tok.kind {
                TokenKind::Identifier(s) => s.clone(),
                TokenKind::Keyword(k) => k.to_string(),
                _ => {
                    self.advance();
                    continue;
                }
            };
            self.advance();
            if !matches!(self.peek(0), Some(TokenKind::LParen)) {
                continue;
            }
            self.advance();
            let Some(field) = self.parse_field_ref() else {
                continue;
            };
            if matches!(self.peek(0), Some(TokenKind::RParen)) {
                self.advance();
            }
            let mut alias = None;
            if matches!(self.peek(0), Some(TokenKind::Keyword(Keyword::As))) {
                self.advance();
                alias = self.parse_field_ref();
            }
            conversions.push((function, field, alias));
            if matches!(self.peek(0), Some(TokenKind::Comma)) {
                self.advance();
            }
        }
        CstNode {
            rule: "convertCommand",
            command_name: "convert".to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Convert { conversions },
        }
    }

    fn parse_subsearch(&mut self, name: &str, start: Location) -> CstNode {
        let mut join_fields = Vec::new();
        if name == "join" {
            while let Some(f) = self.parse_field_ref() {
                join_fields.push(f);
                if matches!(self.peek(0), Some(TokenKind::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let mut inner = Vec::new();
        if matches!(self.peek(0), Some(TokenKind::LBracket)) {
            self.advance();
            let mut sub = Parser::new(self.tokens_until_matching_bracket());
            inner = sub.parse_pipeline();
            self.errors.extend(sub.errors);
        }
        CstNode {
            rule: "subsearchCommand",
            command_name: name.to_string(),
            location: Location::span(start, self.current_location()),
            shape: CstShape::Subsearch { join_fields, inner },
        }
    }

    /// Slices out the tokens up to (and consuming) the matching `]`, bounded
    /// recursion depth guarded by the caller never needing more than the
    /// token stream's own length.
    fn tokens_until_matching_bracket(&mut self) -> &'a [Token] {
        let start = self.pos;
        let mut depth = 1;
        while !self.at_end() {
            match self.peek(0) {
                Some(TokenKind::LBracket) => depth += 1,
                Some(TokenKind::RBracket) => {
                    depth -= 1;
                    if depth == 0 {
                        let slice = &self.tokens[start..self.pos];
                        self.advance();
                        return slice;
                    }
                }
                _ => {}
            }
            self.advance();
        }
        &self.tokens[start..self.pos]
    }

    // --- expressions: delegated to the chumsky-based grammar in `expr_parser` ---

    /// Parses one expression at the cursor via [`crate::expr_parser`]'s
    /// chumsky grammar, then advances `pos` by however many tokens it
    /// consumed (it stops at the first token that can't extend the
    /// expression — a comma, a pipe, a closing paren it doesn't own — and
    /// leaves that for the surrounding command rule to handle).
    fn parse_expr(&mut self) -> Expr {
        if self.at_end() {
            self.error("unexpected end of input in expression", None);
            return Expr::new(ExprKind::Literal(Literal::Null), self.current_location());
        }
        let (expr, consumed, errors) = crate::expr_parser::parse_expr(&self.tokens[self.pos..]);
        self.pos += consumed.max(1);
        self.errors.extend(errors);
        expr
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_text(text: &str) -> (Vec<CstNode>, Vec<ParseError>) {
        let (tokens, _) = tokenize(text);
        let (cst, errors) = parse(&tokens);
        (cst.unwrap(), errors)
    }

    #[test]
    fn parses_search_then_eval() {
        let (stages, errors) = parse_text("index=main | eval x=1");
        assert!(errors.is_empty());
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].rule, "search");
        assert_eq!(stages[1].rule, "evalCommand");
    }

    #[test]
    fn parses_stats_by_clause() {
        let (stages, _) = parse_text("index=main | stats count by host");
        let CstShape::Stats { aggregations, by_fields } = &stages[1].shape else {
            panic!("expected stats shape")
        };
        assert_eq!(aggregations.len(), 1);
        assert_eq!(by_fields.len(), 1);
        assert_eq!(by_fields[0].name, "host");
    }

    #[test]
    fn recovers_after_malformed_command() {
        let (stages, errors) = parse_text("index=main | rename | eval y=2");
        assert!(!errors.is_empty());
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2].rule, "evalCommand");
    }

    #[test]
    fn parses_rename_pairs() {
        let (stages, _) = parse_text("index=main | rename _raw AS raw_data");
        let CstShape::Rename { renamings } = &stages[1].shape else {
            panic!("expected rename shape")
        };
        assert_eq!(renamings.len(), 1);
        assert_eq!(renamings[0].0.name, "_raw");
        assert_eq!(renamings[0].1.name, "raw_data");
    }

    #[test]
    fn parses_fields_exclude_with_space_before_minus() {
        let (stages, errors) = parse_text("index=main | fields - foo, bar");
        assert!(errors.is_empty());
        let CstShape::Generic(generic) = &stages[1].shape else {
            panic!("expected generic shape")
        };
        assert_eq!(generic.fields.len(), 2);
        assert_eq!(generic.fields[0].name, "-foo");
        assert_eq!(generic.fields[1].name, "bar");
    }
}
