//! C2 — Scope & registry (spec.md §4.2). Owns the entity and scope
//! arenas and the active `find_or_create`/`import`/library-loading logic
//! that operates over `modelc_ir::{Entity, Scope}`. Grounded in shape on
//! an `IRBuilder`-style construction pass: a builder struct
//! wrapping a catalog, exposing one method per construction step, called
//! in a fixed order from the top-level pipeline.

use crate::diagnostics::CompileError;
use modelc_ast::{EntityKind, ExprAst, SourceLocation};
use modelc_ir::{Entity, EntityId, Scope, ScopeId};
use std::collections::HashMap;

pub struct Registry {
    entities: Vec<Entity>,
    scopes: Vec<Scope>,
    /// Handle/kind pairs already warned about so a second reference to a
    /// forward-declared entity doesn't re-check the kind every time.
    root: ScopeId,
    /// Parameter names plus body for every declared `function` entity, so
    /// C3's call resolution can actually inline a real body (spec.md §9
    /// "Function inlining") instead of only recognizing the call exists.
    functions: HashMap<EntityId, (Vec<String>, ExprAst)>,
}

impl Registry {
    pub fn new() -> Self {
        let mut scopes = Vec::new();
        scopes.push(Scope::root());
        Registry {
            entities: Vec::new(),
            scopes,
            root: ScopeId(0),
            functions: HashMap::new(),
        }
    }

    /// Attaches a resolved parameter list and body to a declared `function`
    /// entity (spec.md §4.2/§9). Called once per function declaration by
    /// the top-level orchestration pass.
    pub fn declare_function(&mut self, id: EntityId, params: Vec<String>, body: ExprAst) {
        self.functions.insert(id, (params, body));
    }

    pub fn function_body(&self, id: EntityId) -> Option<&(Vec<String>, ExprAst)> {
        self.functions.get(&id)
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope::child(parent));
        ScopeId((self.scopes.len() - 1) as u32)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Resolve `handle` in `scope`, walking outward through parents
    /// (spec.md §3 "Handles resolve by walking outward").
    pub fn resolve_handle(&self, scope: ScopeId, handle: &str) -> Option<EntityId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(found) = s.lookup_local(handle) {
                return Some(found);
            }
            current = s.parent;
        }
        None
    }

    /// Resolve a dotted serial name (`a.x`) in `scope`, walking outward the
    /// same way `resolve_handle` does for short handles (spec.md §4.2).
    pub fn resolve_serial(&self, scope: ScopeId, name: &str) -> Option<EntityId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(found) = s.lookup_serial(name) {
                return Some(found);
            }
            current = s.parent;
        }
        None
    }

    /// All entities referenced (forward-declared or not) but never actually
    /// declared by the end of composition (spec.md §4.2: "an entity that is
    /// only ever referenced, never declared, is reported once scope
    /// composition finishes" rather than at the point of first reference,
    /// since a later declaration elsewhere in the same module may still
    /// satisfy it).
    pub fn undeclared_entities(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.declared)
            .map(|(i, _)| EntityId(i as u32))
            .collect()
    }

    /// Raises one `CompileError` per still-undeclared entity, in the order
    /// they were first referenced (spec.md §4.2 end-of-scope sweep).
    pub fn check_all_declared(&self) -> Result<(), CompileError> {
        let undeclared = self.undeclared_entities();
        if let Some(first) = undeclared.first() {
            let entity = self.entity(*first);
            return Err(CompileError::model_building(
                entity.location.clone(),
                format!(
                    "'{}' is referenced but never declared ({} other undeclared entit{} also found)",
                    entity.name,
                    undeclared.len() - 1,
                    if undeclared.len() == 2 { "y" } else { "ies" }
                ),
            )
            .with_trace(undeclared.iter().map(|id| self.entity(*id).name.clone()).collect()));
        }
        Ok(())
    }

    /// `find_or_create(scope, handle?, serial_name?, decl?)` — spec.md §4.2.
    pub fn find_or_create(
        &mut self,
        scope: ScopeId,
        handle: Option<&str>,
        serial_name: Option<&str>,
        kind: EntityKind,
        location: SourceLocation,
        declare: bool,
    ) -> Result<EntityId, CompileError> {
        if let Some(h) = handle {
            if let Some(existing) = self.resolve_handle(scope, h) {
                let entity = self.entity(existing);
                if entity.kind != kind {
                    return Err(CompileError::model_building(
                        location,
                        format!(
                            "'{h}' already refers to a {:?}, requested as {:?} (previously declared at {})",
                            entity.kind, kind, entity.location
                        ),
                    ));
                }
                if declare {
                    if entity.declared {
                        return Err(CompileError::model_building(
                            location,
                            format!(
                                "redeclaration of '{h}' (first declared at {})",
                                entity.location
                            ),
                        ));
                    }
                    self.entity_mut(existing).mark_declared(location);
                }
                return Ok(existing);
            }
        }

        let entity = Entity {
            kind,
            name: handle.or(serial_name).unwrap_or("<anonymous>").to_string(),
            location,
            scope,
            declared: declare,
        };
        self.entities.push(entity);
        let id = EntityId((self.entities.len() - 1) as u32);

        if let Some(h) = handle {
            self.scope_mut(scope).bind_handle(h, id);
        }
        if let Some(s) = serial_name {
            if self.scope(scope).lookup_serial(s).is_some() {
                return Err(CompileError::model_building(
                    location,
                    format!("duplicate serial name '{s}'"),
                ));
            }
            self.scope_mut(scope).bind_serial(s, id);
        }
        Ok(id)
    }

    /// `import(other, location?, allow_parameters?)` — copies every
    /// binding from `other` into `into` (spec.md §4.2). Parameter
    /// bindings are skipped unless `allow_parameters` is set.
    pub fn import(
        &mut self,
        into: ScopeId,
        other: ScopeId,
        allow_parameters: bool,
        location: SourceLocation,
    ) -> Result<(), CompileError> {
        let bindings: Vec<(String, EntityId)> = self
            .scope(other)
            .handles()
            .filter(|(_, id)| allow_parameters || self.entity(**id).kind != EntityKind::Parameter)
            .map(|(h, id)| (h.clone(), *id))
            .collect();

        for (handle, id) in bindings {
            if let Some(existing) = self.scope(into).lookup_local(&handle) {
                let existing_entity = self.entity(existing);
                return Err(CompileError::model_building(
                    location,
                    format!(
                        "import conflict on '{handle}': already bound at {} (imported from {})",
                        existing_entity.location,
                        self.entity(id).location
                    ),
                ));
            }
            self.scope_mut(into).bind_handle(handle, id);
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

/// Tracks in-progress library loads so a diamond import is allowed but a
/// true cycle is reported with a path trace (spec.md §4.2).
#[derive(Default)]
pub struct LibraryLoadTracker {
    being_processed: HashMap<String, ()>,
    path: Vec<String>,
}

impl LibraryLoadTracker {
    pub fn new() -> Self {
        LibraryLoadTracker::default()
    }

    /// Returns `Err` naming the cycle if `name` is already on the active
    /// load path; otherwise marks it in-progress and returns `Ok(())`.
    pub fn enter(&mut self, name: &str, location: SourceLocation) -> Result<(), CompileError> {
        if self.being_processed.contains_key(name) {
            let mut trace = self.path.clone();
            trace.push(name.to_string());
            return Err(CompileError::model_building(
                location,
                format!("circular library load involving '{name}'"),
            )
            .with_trace(trace));
        }
        self.being_processed.insert(name.to_string(), ());
        self.path.push(name.to_string());
        Ok(())
    }

    pub fn exit(&mut self, name: &str) {
        self.being_processed.remove(name);
        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::synthesized()
    }

    #[test]
    fn find_or_create_reuses_existing_handle() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        let a = reg
            .find_or_create(root, Some("x"), None, EntityKind::Quantity, loc(), false)
            .unwrap();
        let b = reg
            .find_or_create(root, Some("x"), None, EntityKind::Quantity, loc(), false)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn kind_mismatch_on_existing_handle_is_fatal() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        reg.find_or_create(root, Some("x"), None, EntityKind::Quantity, loc(), false)
            .unwrap();
        let result = reg.find_or_create(root, Some("x"), None, EntityKind::Parameter, loc(), false);
        assert!(result.is_err());
    }

    #[test]
    fn redeclaration_is_fatal() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        reg.find_or_create(root, Some("x"), None, EntityKind::Quantity, loc(), true)
            .unwrap();
        let result = reg.find_or_create(root, Some("x"), None, EntityKind::Quantity, loc(), true);
        assert!(result.is_err());
    }

    #[test]
    fn handles_resolve_outward_through_parents() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        let outer = reg
            .find_or_create(root, Some("k"), None, EntityKind::Compartment, loc(), true)
            .unwrap();
        let child = reg.new_scope(root);
        assert_eq!(reg.resolve_handle(child, "k"), Some(outer));
    }

    #[test]
    fn import_conflict_is_fatal() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        let lib_a = reg.new_scope(root);
        let lib_b = reg.new_scope(root);
        reg.find_or_create(lib_a, Some("x"), None, EntityKind::Quantity, loc(), true)
            .unwrap();
        reg.find_or_create(lib_b, Some("x"), None, EntityKind::Quantity, loc(), true)
            .unwrap();
        let model = reg.new_scope(root);
        reg.import(model, lib_a, false, loc()).unwrap();
        assert!(reg.import(model, lib_b, false, loc()).is_err());
    }

    #[test]
    fn circular_library_load_is_detected() {
        let mut tracker = LibraryLoadTracker::new();
        tracker.enter("a", loc()).unwrap();
        tracker.enter("b", loc()).unwrap();
        let result = tracker.enter("a", loc());
        assert!(result.is_err());
    }

    #[test]
    fn forward_referenced_entity_left_undeclared_is_reported() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        reg.find_or_create(root, Some("x"), None, EntityKind::Compartment, loc(), false)
            .unwrap();
        assert!(reg.check_all_declared().is_err());
    }

    #[test]
    fn forward_referenced_entity_later_declared_passes_the_sweep() {
        let mut reg = Registry::new();
        let root = reg.root_scope();
        reg.find_or_create(root, Some("x"), None, EntityKind::Compartment, loc(), false)
            .unwrap();
        reg.find_or_create(root, Some("x"), None, EntityKind::Compartment, loc(), true)
            .unwrap();
        assert!(reg.check_all_declared().is_ok());
    }

    #[test]
    fn diamond_import_is_allowed() {
        let mut tracker = LibraryLoadTracker::new();
        tracker.enter("a", loc()).unwrap();
        tracker.enter("b", loc()).unwrap();
        tracker.exit("b");
        tracker.enter("c", loc()).unwrap();
        tracker.exit("c");
        tracker.exit("a");
        // 'a' loaded 'b' and 'c' independently (a diamond), not a cycle.
        assert!(tracker.enter("a", loc()).is_ok());
    }
}
