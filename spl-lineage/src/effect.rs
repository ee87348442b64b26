//! The output shape every command handler (C7) produces, and the pattern
//! interpreter (C5) assembles generically.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spl_lineage_ast::DataType;

/// Static certainty that a field will exist at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, Serialize, Deserialize, JsonSchema)]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
    Certain,
    Likely,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, Serialize, Deserialize, JsonSchema)]
#[strum(serialize_all = "lowercase")]
pub enum DropReason {
    Explicit,
    Implicit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldCreation {
    pub field_name: String,
    pub depends_on: Vec<String>,
    pub expression: Option<String>,
    pub data_type: Option<DataType>,
    pub confidence: Confidence,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub is_rename: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldModification {
    pub field_name: String,
    pub depends_on: Vec<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldConsumption {
    pub field_name: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDrop {
    pub field_name: String,
    pub reason: DropReason,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// A handler's (or the pattern interpreter's) pure output. `preserves_all`
/// takes precedence over `drops_all_except` when both are present — the
/// analyzer (C8) applies this precedence, not the handler.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandFieldEffect {
    pub creates: Vec<FieldCreation>,
    pub modifies: Vec<FieldModification>,
    pub consumes: Vec<FieldConsumption>,
    pub drops: Vec<FieldDrop>,
    pub preserves_all: bool,
    pub drops_all_except: Option<Vec<String>>,
}

impl CommandFieldEffect {
    /// The empty effect emitted by the pass-through handler (spec §4.5 step
    /// 1 and 6) and by any handler's defensive guard (spec §7).
    pub fn pass_through() -> Self {
        CommandFieldEffect::default()
    }
}
