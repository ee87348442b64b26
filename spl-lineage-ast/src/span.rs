use serde::{Deserialize, Serialize};

/// A 1-based source position, attached to every AST node a user can hover.
///
/// Mirrors the offset-plus-line/column pairing used throughout the lexer and
/// parser: `line`/`column` are for display, `start`/`end` are byte offsets
/// into the original query text and are what `LineageIndex` consumers use to
/// slice the source back out.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(line: u32, column: u32, start: usize, end: usize) -> Self {
        Location {
            line,
            column,
            end_line: line,
            end_column: column,
            start,
            end,
        }
    }

    /// Merge two locations taken from the start and the end of a rule match.
    pub fn span(start: Location, end: Location) -> Self {
        Location {
            line: start.line,
            column: start.column,
            end_line: end.end_line,
            end_column: end.end_column,
            start: start.start,
            end: end.end,
        }
    }
}

impl std::fmt::Debug for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}..{}:{}",
            self.line, self.column, self.end_line, self.end_column
        )
    }
}
