//! C5 — Instruction builder (spec.md §4.5). Walks the `VarStore` C4
//! produced and emits 0..N `modelc_ir::Instruction`s per state variable.
//! Grounded on `original_source/src/instruction_builder.h`'s per-kind
//! emission rules; structured as one function per state-variable kind,
//! the same per-node-kind dispatch a `code_generator` module
//! uses for `IRNode`.

use crate::composer::VarStore;
use modelc_ir::{Instruction, InstructionKind, StateVarKind, VarId};
use std::collections::HashMap;

/// A strong dependency edge `from -> to` meaning "`to`'s instruction must
/// run before `from`'s" (spec.md §4.5: "the target's compute gains a
/// strong dependency on the add"). Consumed by C6/C7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrongEdge {
    pub from: VarId,
    pub to: VarId,
}

#[derive(Debug, Default)]
pub struct InstructionSet {
    pub instructions: Vec<Instruction>,
    pub strong_edges: Vec<StrongEdge>,
}

impl InstructionSet {
    fn push(&mut self, kind: InstructionKind) {
        self.instructions.push(Instruction::new(kind));
    }
}

/// A discrete flux's resolved source/target endpoints, supplied by the
/// caller once the flux's declared locations are known (spec.md §4.5) —
/// `StateVar` alone doesn't carry a flux's endpoints, only its own
/// location.
#[derive(Debug, Clone, Copy)]
pub struct FluxEndpoints {
    pub source: Endpoint,
    pub target: Endpoint,
}

/// Discrete vs. ODE fluxes are told apart by whether the flux's target
/// variable carries a solver label (spec.md §4.5: "an ODE flux produces
/// no subtract/add"). The instruction builder doesn't assign solver
/// labels itself (that's C6); callers pass in the provisional
/// declared-solver set gathered while parsing `solve(...)` blocks, and the
/// endpoints of every declared flux gathered while resolving its
/// location arguments.
pub fn build_instructions(
    store: &VarStore,
    ode_targets: &HashMap<VarId, ()>,
    flux_endpoints: &HashMap<VarId, FluxEndpoints>,
) -> InstructionSet {
    let mut set = InstructionSet::default();

    for (id, var) in store.iter() {
        if !var.is_valid() {
            continue;
        }
        match &var.kind {
            StateVarKind::Declared { connection, .. } => {
                build_declared(&mut set, id, var, *connection, ode_targets, flux_endpoints, store);
            }
            StateVarKind::RegularAggregate { target, .. } => {
                set.push(InstructionKind::ClearStateVar { var: id });
                for (cid, cvar) in store.iter() {
                    if cvar.flags.has_aggregate && cvar.location.property == *target {
                        set.push(InstructionKind::AddToAggregate {
                            aggregate: id,
                            contributor: cid,
                        });
                        set.strong_edges.push(StrongEdge { from: id, to: cid });
                    }
                }
                // A no-op compute sentinel keeps the aggregator's own node in
                // the order graph even when nothing contributes to it yet.
                set.push(InstructionKind::ComputeStateVar { var: id });
            }
            StateVarKind::InFluxAggregate { .. } => {
                set.push(InstructionKind::ClearStateVar { var: id });
                set.push(InstructionKind::ComputeStateVar { var: id });
            }
            StateVarKind::ConnectionAggregate { connection, .. } => {
                set.push(InstructionKind::ClearStateVar { var: id });
                for (cid, cvar) in store.iter() {
                    if cvar.is_flux() {
                        set.push(InstructionKind::AddToConnectionAggregate {
                            aggregate: id,
                            connection: *connection,
                            contributor: cid,
                        });
                        set.strong_edges.push(StrongEdge { from: id, to: cid });
                    }
                }
            }
            StateVarKind::DissolvedFlux { .. } => {
                set.push(InstructionKind::ComputeStateVar { var: id });
            }
            StateVarKind::DissolvedConc { .. } => {
                set.push(InstructionKind::ComputeStateVar { var: id });
            }
            StateVarKind::ExternalComputation { targets, .. } => {
                set.push(InstructionKind::ExternalComputation { var: id });
                for &t in targets {
                    set.strong_edges.push(StrongEdge { from: t, to: id });
                }
            }
        }
    }

    set
}

/// Sentinel endpoint meaning a flux's source or target is *out* (outside
/// the modeled system) rather than a located variable — spec.md §4.5 "A
/// discrete flux additionally produces one subtract (unless source is
/// out)". Modeled as `None` rather than a real `VarId`.
pub type Endpoint = Option<VarId>;

fn build_declared(
    set: &mut InstructionSet,
    id: VarId,
    var: &modelc_ir::StateVar,
    _connection: Option<modelc_ir::ConnectionId>,
    ode_targets: &HashMap<VarId, ()>,
    flux_endpoints: &HashMap<VarId, FluxEndpoints>,
    store: &VarStore,
) {
    set.push(InstructionKind::ComputeStateVar { var: id });

    if var.is_flux() && var.flags.clear_series_to_nan {
        set.push(InstructionKind::ClearStateVar { var: id });
    }

    if var.is_flux() && !ode_targets.contains_key(&id) {
        if let Some(endpoints) = flux_endpoints.get(&id) {
            let target_has_aggregate = endpoints
                .target
                .map(|t| store.get(t).flags.has_aggregate)
                .unwrap_or(false);
            wire_discrete_flux(set, id, endpoints.source, endpoints.target, target_has_aggregate);
        }
    }
}

/// Wires one discrete flux's subtract/add instructions once its endpoints
/// are known (spec.md §4.5). `source`/`target` are `None` for an *out*
/// endpoint.
pub fn wire_discrete_flux(
    set: &mut InstructionSet,
    flux: VarId,
    source: Endpoint,
    target: Endpoint,
    target_has_aggregate: bool,
) {
    if let Some(source) = source {
        set.push(InstructionKind::SubtractDiscreteFluxFromSource { flux, source });
        set.strong_edges.push(StrongEdge { from: source, to: flux });
    }
    if let Some(target) = target {
        if !target_has_aggregate {
            set.push(InstructionKind::AddDiscreteFluxToTarget { flux, target });
            set.strong_edges.push(StrongEdge { from: target, to: flux });
        }
    }
}

/// A discrete-order declaration (spec.md §4.5 last bullet): every flux
/// listed after another gains strong edges on the earlier flux's
/// subtract/add instructions.
pub fn impose_discrete_order(set: &mut InstructionSet, ordered_fluxes: &[VarId]) {
    for pair in ordered_fluxes.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        set.strong_edges.push(StrongEdge { from: later, to: earlier });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelc_ir::{EntityId, StateVar, StateVarFlags, UnitData, VarLocation};

    fn declared(name: &str, is_flux: bool) -> StateVar {
        StateVar {
            name: name.to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(0), EntityId(1)),
            kind: StateVarKind::Declared {
                decl: EntityId(0),
                connection: None,
                initial_is_conc: false,
            },
            flags: StateVarFlags {
                is_flux,
                ..Default::default()
            },
        }
    }

    #[test]
    fn declared_quantity_emits_exactly_one_compute() {
        let mut store = VarStore::new();
        store.push(declared("x", false));
        let set = build_instructions(&store, &HashMap::new(), &HashMap::new());
        assert_eq!(set.instructions.len(), 1);
        assert!(matches!(set.instructions[0].kind, InstructionKind::ComputeStateVar { .. }));
    }

    #[test]
    fn a_discrete_declared_flux_is_wired_via_its_registered_endpoints() {
        let mut store = VarStore::new();
        let target = store.push(declared("target", false));
        let flux = store.push(declared("flux", true));
        let mut endpoints = HashMap::new();
        endpoints.insert(flux, FluxEndpoints { source: None, target: Some(target) });
        let set = build_instructions(&store, &HashMap::new(), &endpoints);
        assert!(set
            .instructions
            .iter()
            .any(|i| matches!(i.kind, InstructionKind::AddDiscreteFluxToTarget { .. })));
    }

    #[test]
    fn discrete_flux_with_out_source_only_emits_add() {
        let mut set = InstructionSet::default();
        let flux = VarId(0);
        let target = VarId(1);
        wire_discrete_flux(&mut set, flux, None, Some(target), false);
        assert_eq!(set.instructions.len(), 1);
        assert!(matches!(
            set.instructions[0].kind,
            InstructionKind::AddDiscreteFluxToTarget { .. }
        ));
    }

    #[test]
    fn discrete_order_chains_strong_edges_in_sequence() {
        let mut set = InstructionSet::default();
        let a = VarId(0);
        let b = VarId(1);
        let c = VarId(2);
        impose_discrete_order(&mut set, &[a, b, c]);
        assert_eq!(set.strong_edges.len(), 2);
        assert_eq!(set.strong_edges[0], StrongEdge { from: b, to: a });
        assert_eq!(set.strong_edges[1], StrongEdge { from: c, to: b });
    }
}
