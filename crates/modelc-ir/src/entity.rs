//! Entities: the globally unique, classified objects every later id
//! refers to (spec.md §3, "Entities"). Grounded on the teacher's own
//! `Catalog` relation records — a small struct held in an arena, looked up
//! by id rather than passed around by reference.

use modelc_ast::{EntityKind, SourceLocation};

#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    pub location: SourceLocation,
    pub scope: crate::ids::ScopeId,
    /// Distinguishes a declared entity from one that only exists because
    /// something else referenced it first (spec.md §3 invariant).
    pub declared: bool,
}

impl Entity {
    pub fn forward_reference(
        kind: EntityKind,
        name: impl Into<String>,
        location: SourceLocation,
        scope: crate::ids::ScopeId,
    ) -> Self {
        Entity {
            kind,
            name: name.into(),
            location,
            scope,
            declared: false,
        }
    }

    pub fn mark_declared(&mut self, location: SourceLocation) {
        self.declared = true;
        self.location = location;
    }
}
