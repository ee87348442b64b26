//! AST types for the SPL field-lineage analyzer.
//!
//! This crate only holds data: [`Pipeline`]/[`PipelineStage`] (the lifted
//! syntax tree), the small [`Expr`] language used inside `eval`/`where`, and
//! the [`FieldRef`]/[`Location`] primitives attached throughout. Lexing,
//! parsing and all analysis live in sibling crates.

mod expr;
mod field;
mod span;
mod stage;

pub use expr::*;
pub use field::*;
pub use span::*;
pub use stage::*;
