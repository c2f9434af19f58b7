//! C4 — Variable composer (spec.md §4.4). Turns declared locations into
//! the `modelc_ir::StateVar` arena: one state variable per located
//! declaration, plus every variable a later pass needs to synthesize
//! (dissolved fluxes, concentrations, aggregates). Grounded on
//! `original_source/src/state_variable.h`'s construction order and on the
//! `Catalog`-building passes in `src/ir_builder/mod.rs` (several
//! small ordered mutation passes over one shared table, rather than one
//! monolithic function).

use crate::diagnostics::CompileError;
use crate::typed_expr::{ArithOp, Binding, TypedExpr, ValueType};
use modelc_ast::SourceLocation;
use modelc_ir::{
    ConversionData, EntityId, StateVar, StateVarFlags, StateVarKind, UnitData, VarId, VarLocation,
};
use std::collections::HashMap;

/// One `has`-style declaration site, as handed over by the loader/parser
/// (out of scope here — see spec.md §1). `nesting_depth` is the length of
/// the dissolved-substance chain leading to this location (pass 2 sorts on
/// it); 0 for anything not inside a medium.
#[derive(Debug, Clone)]
pub struct DeclaredLocation {
    pub decl: EntityId,
    pub location: VarLocation,
    pub name: String,
    pub unit: UnitData,
    pub has_code: bool,
    pub is_property: bool,
    pub nesting_depth: u32,
    pub dissolved_in: Option<EntityId>,
    pub initial_is_conc: bool,
    pub override_conc: bool,
    pub location_for_loc: SourceLocation,
}

/// The arena C4 builds and every later stage reads by `VarId`.
#[derive(Debug, Default)]
pub struct VarStore {
    vars: Vec<StateVar>,
    /// `VarLocation -> VarId` so later passes (flux wiring, dependency
    /// analysis) can find "the" variable at a location without a linear
    /// scan (spec.md §8 "Variable uniqueness").
    by_location: HashMap<LocationKey, VarId>,
}

/// `VarLocation` itself isn't `Hash` (its restriction vector makes that
/// awkward to keep total), so the store indexes on the common case: no
/// restrictions. Restricted locations still live in `vars`, just outside
/// this fast path — callers needing them scan `iter()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LocationKey {
    compartment: EntityId,
    property: EntityId,
}

impl VarStore {
    pub fn new() -> Self {
        VarStore::default()
    }

    pub fn push(&mut self, var: StateVar) -> VarId {
        if !var.location.is_restricted() {
            let key = LocationKey {
                compartment: var.location.compartment,
                property: var.location.property,
            };
            let id = VarId(self.vars.len() as u32);
            self.by_location.insert(key, id);
            self.vars.push(var);
            id
        } else {
            let id = VarId(self.vars.len() as u32);
            self.vars.push(var);
            id
        }
    }

    pub fn get(&self, id: VarId) -> &StateVar {
        &self.vars[id.index()]
    }

    pub fn get_mut(&mut self, id: VarId) -> &mut StateVar {
        &mut self.vars[id.index()]
    }

    pub fn find_at(&self, compartment: EntityId, property: EntityId) -> Option<VarId> {
        self.by_location
            .get(&LocationKey { compartment, property })
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &StateVar)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId(i as u32), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Pass 2 — ordering by nesting depth (spec.md §4.4 step 2): shallower
/// dissolved chains first, so a medium's own variable exists before its
/// dissolved quantities are processed.
pub fn order_by_nesting_depth(decls: &mut [DeclaredLocation]) {
    decls.sort_by_key(|d| d.nesting_depth);
}

/// Pass 1 — primary registration (spec.md §4.4 step 1). Declarations with
/// code win over no-code redeclarations of the same location; two
/// with-code declarations at the same location are fatal. Callers should
/// run [`order_by_nesting_depth`] first so parents register before
/// children when both share this pass.
pub fn register_primary(decls: &[DeclaredLocation]) -> Result<VarStore, CompileError> {
    let mut store = VarStore::new();
    let mut coded_at: HashMap<LocationKey, &DeclaredLocation> = HashMap::new();

    for decl in decls {
        let key = LocationKey {
            compartment: decl.location.compartment,
            property: decl.location.property,
        };
        if decl.has_code {
            if let Some(prev) = coded_at.get(&key) {
                return Err(CompileError::model_building(
                    decl.location_for_loc.clone(),
                    format!(
                        "'{}' already has a code-bearing declaration at {} — only one is allowed per location",
                        decl.name, prev.location_for_loc
                    ),
                ));
            }
            coded_at.insert(key, decl);
        }
    }

    for decl in decls {
        let key = LocationKey {
            compartment: decl.location.compartment,
            property: decl.location.property,
        };
        let is_winner = coded_at.get(&key).map(|d| std::ptr::eq(*d, decl)).unwrap_or(false);
        if decl.has_code && !is_winner {
            continue;
        }
        if !decl.has_code && coded_at.contains_key(&key) {
            // A no-code redeclaration of an already-coded location: tolerated,
            // contributes nothing new.
            continue;
        }
        if !decl.has_code && !decl.is_property {
            // Quantities without code anywhere still need a compute stub
            // (they default to an implicit ODE state); properties without
            // code become input series instead, per spec.md §4.4 step 1.
        }
        store.push(StateVar {
            name: decl.name.clone(),
            unit: decl.unit.clone(),
            location: decl.location.clone(),
            kind: StateVarKind::Declared {
                decl: decl.decl,
                connection: None,
                initial_is_conc: decl.initial_is_conc,
            },
            flags: StateVarFlags {
                clear_series_to_nan: false,
                ..Default::default()
            },
        });
    }

    Ok(store)
}

/// Pass 3 — dissolved-flux generation (spec.md §4.4 step 3). For each
/// dissolved quantity `q` inside medium `m`, and each flux transporting
/// `m` whose target is unlocated or also hosts `q`, synthesizes a
/// `dissolved_flux(q, flux)` carrying `conc(q, m) * flux`.
pub struct DissolvedLink {
    pub quantity: EntityId,
    pub medium_flux: VarId,
    pub conc_var: VarId,
    pub no_carry: bool,
}

pub fn generate_dissolved_fluxes(store: &mut VarStore, links: &[DissolvedLink]) -> Vec<VarId> {
    let mut created = Vec::new();
    for link in links {
        if link.no_carry {
            continue;
        }
        let flux_unit = store.get(link.medium_flux).unit.clone();
        let id = store.push(StateVar {
            name: format!("dissolved_flux({}, {})", link.quantity.index(), link.medium_flux.index()),
            unit: flux_unit,
            location: VarLocation::simple(link.quantity, link.quantity),
            kind: StateVarKind::DissolvedFlux {
                conc: link.conc_var,
                flux_of_medium: link.medium_flux,
                conversion: ConversionData {
                    source: link.conc_var,
                    weight: link.medium_flux,
                },
            },
            flags: StateVarFlags {
                is_flux: true,
                clear_series_to_nan: true,
                ..Default::default()
            },
        });
        created.push(id);
    }
    created
}

/// Pass 4 — concentration generation (spec.md §4.4 step 4): `conc(Q,M) =
/// Q / M`, using a safe divide that yields 0 rather than panicking when
/// `M` is zero.
pub fn generate_concentration(store: &mut VarStore, quantity: VarId, medium: VarId) -> VarId {
    let unit = store.get(quantity).unit.clone();
    store.push(StateVar {
        name: format!("conc({}, {})", quantity.index(), medium.index()),
        unit,
        location: store.get(quantity).location.clone(),
        kind: StateVarKind::DissolvedConc {
            conc_of: quantity,
            unit_conversion: medium,
        },
        flags: StateVarFlags::default(),
    })
}

/// Per-variable typed code bodies (spec.md §4.4: each state variable
/// "carries... typed code bodies for main, initial, override, and
/// unit-conversion"). Kept in a side table rather than on `StateVar`
/// itself, since `modelc_ir::StateVar` is the IR crate's structural shape
/// and `TypedExpr` is a compiler-crate type built by C3's resolve pass.
#[derive(Debug, Clone, Default)]
pub struct VarBodies {
    pub main: Option<TypedExpr>,
    pub initial: Option<TypedExpr>,
    pub override_expr: Option<TypedExpr>,
    pub unit_conversion: Option<TypedExpr>,
}

pub type BodyTable = HashMap<VarId, VarBodies>;

fn state_var_ref(store: &VarStore, var: VarId) -> TypedExpr {
    TypedExpr::Ref {
        binding: Binding::StateVar(var),
        ty: ValueType::Real,
        unit: store.get(var).unit.standard,
        restriction: None,
    }
}

fn multiply(lhs: TypedExpr, rhs: TypedExpr, unit: modelc_ir::StandardUnit) -> TypedExpr {
    TypedExpr::Arith {
        op: ArithOp::Mul,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        ty: ValueType::Real,
        unit,
    }
}

/// Pass 5 — override and initial-as-concentration rewrites (spec.md §4.4
/// step 5). `@initial_conc` turns the mass variable's declared initial
/// (a concentration) into `initial * medium`; `@override_conc` replaces
/// the mass derivative with `conc * medium` and moves the override
/// expression onto the conc variable instead.
pub fn apply_conc_rewrites(
    store: &VarStore,
    bodies: &mut BodyTable,
    mass: VarId,
    conc: VarId,
    medium: VarId,
    initial_is_conc: bool,
    override_conc: bool,
) {
    let medium_unit = store.get(medium).unit.standard;
    if initial_is_conc {
        let medium_ref = state_var_ref(store, medium);
        let entry = bodies.entry(mass).or_default();
        if let Some(initial) = entry.initial.take() {
            entry.initial = Some(multiply(initial, medium_ref, medium_unit));
        }
    }
    if override_conc {
        let conc_ref = state_var_ref(store, conc);
        let medium_ref = state_var_ref(store, medium);
        let mass_bodies = bodies.entry(mass).or_default();
        let moved_override = mass_bodies.override_expr.take();
        mass_bodies.main = Some(multiply(conc_ref, medium_ref, medium_unit));
        if let Some(expr) = moved_override {
            bodies.entry(conc).or_default().main = Some(expr);
        }
    }
}

/// Pass 6 — aggregation requests (spec.md §4.4 step 6). Builds a regular
/// aggregate summing `contributors` into a fresh variable targeting
/// `target`'s own compute variable `target_var`.
pub fn generate_regular_aggregate(
    store: &mut VarStore,
    target: EntityId,
    target_var: VarId,
    unit: UnitData,
    contributors: &[VarId],
) -> VarId {
    let agg = store.push(StateVar {
        name: format!("aggregate->{}", target.index()),
        unit,
        location: VarLocation::simple(target, target),
        kind: StateVarKind::RegularAggregate {
            aggregates: target_var,
            target,
        },
        flags: StateVarFlags {
            clear_series_to_nan: true,
            ..Default::default()
        },
    });
    for &c in contributors {
        store.get_mut(c).flags.has_aggregate = true;
    }
    agg
}

/// Sum of `in_flux` directive references into a given variable (spec.md
/// §4.4 step 6, "In-flux aggregate"): one per variable that has at least
/// one `in_flux(...)` reference targeting it.
pub fn generate_in_flux_aggregate(store: &mut VarStore, in_flux_to: VarId, unit: UnitData) -> VarId {
    let target_location = store.get(in_flux_to).location.clone();
    store.push(StateVar {
        name: format!("in_flux_aggregate->{}", in_flux_to.index()),
        unit,
        location: target_location,
        kind: StateVarKind::InFluxAggregate { in_flux_to },
        flags: StateVarFlags {
            clear_series_to_nan: true,
            ..Default::default()
        },
    })
}

/// Sum of fluxes crossing a connection, grouped by which endpoint they sit
/// on (spec.md §4.4 step 6, "Connection aggregate"). `is_source` selects
/// which half of the connection this aggregate serves.
pub fn generate_connection_aggregate(
    store: &mut VarStore,
    connection: modelc_ir::ConnectionId,
    endpoint: EntityId,
    is_source: bool,
    unit: UnitData,
    contributors: &[VarId],
) -> VarId {
    let agg = store.push(StateVar {
        name: format!(
            "connection_aggregate({}, {})",
            connection.index(),
            if is_source { "source" } else { "target" }
        ),
        unit,
        location: VarLocation::simple(endpoint, endpoint),
        kind: StateVarKind::ConnectionAggregate { connection, is_source },
        flags: StateVarFlags {
            clear_series_to_nan: true,
            ..Default::default()
        },
    });
    for &c in contributors {
        store.get_mut(c).flags.has_aggregate = true;
    }
    agg
}

/// Pass 7 — validity sweep (spec.md §4.4 step 7): a dissolved flux whose
/// source and target are both overridden is invalid.
pub fn validity_sweep(store: &mut VarStore, overridden: &[VarId]) {
    let overridden: std::collections::HashSet<VarId> = overridden.iter().copied().collect();
    let mut to_invalidate = Vec::new();
    for (id, var) in store.iter() {
        if let StateVarKind::DissolvedFlux { conc, flux_of_medium, .. } = &var.kind {
            if overridden.contains(conc) && overridden.contains(flux_of_medium) {
                to_invalidate.push(id);
            }
        }
    }
    for id in to_invalidate {
        store.get_mut(id).invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::synthesized()
    }

    fn decl(name: &str, compartment: u32, property: u32, has_code: bool) -> DeclaredLocation {
        DeclaredLocation {
            decl: EntityId(0),
            location: VarLocation::simple(EntityId(compartment), EntityId(property)),
            name: name.to_string(),
            unit: UnitData::dimensionless(),
            has_code,
            is_property: false,
            nesting_depth: 0,
            dissolved_in: None,
            initial_is_conc: false,
            override_conc: false,
            location_for_loc: loc(),
        }
    }

    #[test]
    fn nesting_depth_sort_puts_shallower_locations_first() {
        let mut decls = vec![
            DeclaredLocation { nesting_depth: 2, ..decl("child", 1, 2, true) },
            DeclaredLocation { nesting_depth: 0, ..decl("parent", 3, 4, true) },
        ];
        order_by_nesting_depth(&mut decls);
        assert_eq!(decls[0].name, "parent");
    }

    #[test]
    fn two_coded_declarations_at_the_same_location_are_fatal() {
        let decls = vec![decl("x", 1, 2, true), decl("x2", 1, 2, true)];
        assert!(register_primary(&decls).is_err());
    }

    #[test]
    fn repeated_no_code_declarations_are_tolerated() {
        let decls = vec![decl("x", 1, 2, false), decl("x2", 1, 2, false)];
        let store = register_primary(&decls).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn coded_declaration_wins_over_uncoded_redeclaration() {
        let decls = vec![decl("x", 1, 2, false), decl("x_coded", 1, 2, true)];
        let store = register_primary(&decls).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(VarId(0)).name, "x_coded");
    }

    #[test]
    fn validity_sweep_invalidates_double_overridden_dissolved_flux() {
        let mut store = VarStore::new();
        let conc = store.push(StateVar {
            name: "conc".to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(0), EntityId(1)),
            kind: StateVarKind::DissolvedConc {
                conc_of: VarId(9),
                unit_conversion: VarId(9),
            },
            flags: StateVarFlags::default(),
        });
        let flux = store.push(StateVar {
            name: "flux".to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(2), EntityId(3)),
            kind: StateVarKind::Declared {
                decl: EntityId(0),
                connection: None,
                initial_is_conc: false,
            },
            flags: StateVarFlags::default(),
        });
        let dissolved = store.push(StateVar {
            name: "dissolved".to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(4), EntityId(5)),
            kind: StateVarKind::DissolvedFlux {
                conc,
                flux_of_medium: flux,
                conversion: ConversionData { source: conc, weight: flux },
            },
            flags: StateVarFlags::default(),
        });
        validity_sweep(&mut store, &[conc, flux]);
        assert!(!store.get(dissolved).is_valid());
    }

    fn plain_var(store: &mut VarStore, name: &str, compartment: u32) -> VarId {
        store.push(StateVar {
            name: name.to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(compartment), EntityId(compartment)),
            kind: StateVarKind::Declared {
                decl: EntityId(0),
                connection: None,
                initial_is_conc: false,
            },
            flags: StateVarFlags::default(),
        })
    }

    #[test]
    fn initial_as_conc_multiplies_the_declared_initial_by_the_medium() {
        let mut store = VarStore::new();
        let mass = plain_var(&mut store, "mass", 1);
        let conc = plain_var(&mut store, "conc", 2);
        let medium = plain_var(&mut store, "medium", 3);
        let mut bodies = BodyTable::new();
        bodies.entry(mass).or_default().initial = Some(TypedExpr::LiteralReal(2.0, modelc_ir::StandardUnit::dimensionless()));
        apply_conc_rewrites(&store, &mut bodies, mass, conc, medium, true, false);
        match &bodies[&mass].initial {
            Some(TypedExpr::Arith { op: ArithOp::Mul, .. }) => {}
            other => panic!("expected a multiply, got {other:?}"),
        }
    }

    #[test]
    fn override_conc_moves_the_override_expression_onto_the_conc_variable() {
        let mut store = VarStore::new();
        let mass = plain_var(&mut store, "mass", 1);
        let conc = plain_var(&mut store, "conc", 2);
        let medium = plain_var(&mut store, "medium", 3);
        let mut bodies = BodyTable::new();
        bodies.entry(mass).or_default().override_expr = Some(TypedExpr::LiteralReal(5.0, modelc_ir::StandardUnit::dimensionless()));
        apply_conc_rewrites(&store, &mut bodies, mass, conc, medium, false, true);
        assert!(matches!(bodies[&mass].main, Some(TypedExpr::Arith { op: ArithOp::Mul, .. })));
        assert!(matches!(bodies[&conc].main, Some(TypedExpr::LiteralReal(v, _)) if v == 5.0));
    }

    #[test]
    fn regular_aggregate_points_back_at_the_targets_own_compute_var() {
        let mut store = VarStore::new();
        let target_var = plain_var(&mut store, "x", 1);
        let contributor = plain_var(&mut store, "flux_in", 2);
        let agg = generate_regular_aggregate(&mut store, EntityId(1), target_var, UnitData::dimensionless(), &[contributor]);
        match store.get(agg).kind {
            StateVarKind::RegularAggregate { aggregates, .. } => assert_eq!(aggregates, target_var),
            _ => panic!("expected a regular aggregate"),
        }
        assert!(store.get(contributor).flags.has_aggregate);
    }

    #[test]
    fn in_flux_aggregate_targets_its_destination_variables_location() {
        let mut store = VarStore::new();
        let dest = plain_var(&mut store, "x", 1);
        let agg = generate_in_flux_aggregate(&mut store, dest, UnitData::dimensionless());
        match store.get(agg).kind {
            StateVarKind::InFluxAggregate { in_flux_to } => assert_eq!(in_flux_to, dest),
            _ => panic!("expected an in-flux aggregate"),
        }
        assert_eq!(store.get(agg).location, store.get(dest).location);
    }

    #[test]
    fn connection_aggregate_marks_contributors_as_aggregated() {
        let mut store = VarStore::new();
        let contributor = plain_var(&mut store, "flux", 2);
        let agg = generate_connection_aggregate(
            &mut store,
            modelc_ir::ConnectionId(0),
            EntityId(9),
            true,
            UnitData::dimensionless(),
            &[contributor],
        );
        match store.get(agg).kind {
            StateVarKind::ConnectionAggregate { is_source, .. } => assert!(is_source),
            _ => panic!("expected a connection aggregate"),
        }
        assert!(store.get(contributor).flags.has_aggregate);
    }
}
