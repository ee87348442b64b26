use serde::{Deserialize, Serialize};

use crate::Location;

/// A reference to a field, as it appears literally in the query text.
///
/// `is_wildcard` is true when `name` contains a `*` (including the bare `*`
/// that matches every field). Per invariant 4 of the spec, a wildcard
/// reference is recorded as a fact on the owning command but never enters
/// `consumes`/`drops`/`creates` as a concrete field name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub name: String,
    pub is_wildcard: bool,
    pub location: Location,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        let name = name.into();
        let is_wildcard = name.contains('*');
        FieldRef {
            name,
            is_wildcard,
            location,
        }
    }
}
