//! Name dictionaries (spec.md §3, "Scopes"). A scope holds two tables —
//! short local handles and long serialized ("dotted") names — plus enough
//! state for the library-loading recursion guard described in §4.2. The
//! active `find_or_create`/`import` logic that *uses* these tables lives
//! in the compiler crate's `registry` module; this type only owns the
//! data, the same split the teacher draws between its `ir` crate's node
//! shapes and the `ir_builder` crate's construction logic.

use crate::ids::{EntityId, ScopeId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    handles: HashMap<String, EntityId>,
    serial_names: HashMap<String, EntityId>,
    /// Set while a library's declarations are being loaded, so a cyclic
    /// import can be detected without re-entering (spec.md §4.2).
    pub being_processed: bool,
}

impl Scope {
    pub fn root() -> Self {
        Scope {
            parent: None,
            handles: HashMap::new(),
            serial_names: HashMap::new(),
            being_processed: false,
        }
    }

    pub fn child(parent: ScopeId) -> Self {
        Scope {
            parent: Some(parent),
            handles: HashMap::new(),
            serial_names: HashMap::new(),
            being_processed: false,
        }
    }

    pub fn lookup_local(&self, handle: &str) -> Option<EntityId> {
        self.handles.get(handle).copied()
    }

    pub fn lookup_serial(&self, name: &str) -> Option<EntityId> {
        self.serial_names.get(name).copied()
    }

    pub fn bind_handle(&mut self, handle: impl Into<String>, id: EntityId) -> Option<EntityId> {
        self.handles.insert(handle.into(), id)
    }

    pub fn bind_serial(&mut self, name: impl Into<String>, id: EntityId) -> Option<EntityId> {
        self.serial_names.insert(name.into(), id)
    }

    pub fn handles(&self) -> impl Iterator<Item = (&String, &EntityId)> {
        self.handles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_misses_are_none() {
        let s = Scope::root();
        assert!(s.lookup_local("x").is_none());
    }

    #[test]
    fn bind_then_lookup_round_trips() {
        let mut s = Scope::root();
        s.bind_handle("x", EntityId(3));
        assert_eq!(s.lookup_local("x"), Some(EntityId(3)));
    }

    #[test]
    fn rebinding_a_handle_returns_the_previous_id() {
        let mut s = Scope::root();
        s.bind_handle("x", EntityId(1));
        let prev = s.bind_handle("x", EntityId(2));
        assert_eq!(prev, Some(EntityId(1)));
    }
}
