use std::fmt;

/// Modeled on the teacher compiler's `Error`/`Reason` split (see
/// `spl-lineage-ast`'s sibling crate design notes in `DESIGN.md`), but
/// narrowed to the shape spec.md §6 actually specifies: a message plus a
/// source position, nothing else. Handlers never produce these; only the
/// lexer and parser do, and always by recovering rather than aborting.
#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for LexError {}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub token_text: String,
    pub expected: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected {expected})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
