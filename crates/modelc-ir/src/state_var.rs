//! State variables: the flattened, arena-held nodes produced by C4 (the
//! variable composer) and consumed by every later stage. Grounded on
//! `original_source/src/state_variable.h`'s `State_Var` / `State_Var_Sub<Type>`
//! family — that header uses a base struct plus a tag-dispatched template
//! specialization per kind; here the same shape is a single tagged enum,
//! the idiom the teacher's own `IRNode`/`IRExpression` enums in
//! `src/ir/mod.rs` use for an equivalent one-struct-per-kind family.

use crate::ids::{ConnectionId, EntityId, VarId};
use crate::location::VarLocation;
use crate::unit::UnitData;

/// Per-variable flags that cut across kinds (declared on the base struct
/// in the original, here just bits on [`StateVar`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateVarFlags {
    /// Another state variable aggregates this one.
    pub has_aggregate: bool,
    /// Reset to NaN at the start of each solver step rather than carried
    /// over (fluxes and most aggregates; declared quantities are not).
    pub clear_series_to_nan: bool,
    /// This variable represents a flux rather than a state quantity.
    pub is_flux: bool,
    /// Marked invalid by an earlier pass (e.g. failed unit check) — kept
    /// in the arena so existing `VarId`s stay valid, but excluded from
    /// codegen.
    pub invalid: bool,
}

/// The source of a dissolved-substance conversion weight (spec.md §5,
/// "dissolved chain"). Grounds `Conversion_Data` in `state_variable.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionData {
    pub source: VarId,
    pub weight: VarId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateVarKind {
    /// A variable the user wrote a `var`/`flux`/`property` declaration
    /// for, as opposed to one synthesized by a later pass.
    Declared {
        decl: EntityId,
        connection: Option<ConnectionId>,
        /// True if the declared initial/override value is a
        /// concentration rather than a mass/amount (spec.md §5).
        initial_is_conc: bool,
    },
    /// Sum of all in-fluxes and regular fluxes targeting this compartment
    /// (synthesized, one per target location).
    RegularAggregate { aggregates: VarId, target: EntityId },
    /// Sum of all `in_flux` directive references into a given variable.
    InFluxAggregate { in_flux_to: VarId },
    /// Sum of fluxes crossing a connection, grouped by source or target
    /// endpoint.
    ConnectionAggregate {
        connection: ConnectionId,
        is_source: bool,
    },
    /// A flux expressed in one medium but carried as dissolved mass in
    /// another (spec.md §5 dissolved-chain example).
    DissolvedFlux {
        conc: VarId,
        flux_of_medium: VarId,
        conversion: ConversionData,
    },
    /// The concentration view of a dissolved quantity (mass / medium).
    DissolvedConc { conc_of: VarId, unit_conversion: VarId },
    /// A computation supplied directly as code by the user (what the
    /// original calls `special_computation`, later reused for
    /// solver-stage external hooks — unified under one name here since
    /// both are "run this block, not a declared expression").
    ExternalComputation { decl: EntityId, targets: Vec<VarId> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateVar {
    pub name: String,
    pub unit: UnitData,
    pub location: VarLocation,
    pub kind: StateVarKind,
    pub flags: StateVarFlags,
}

impl StateVar {
    pub fn is_flux(&self) -> bool {
        self.flags.is_flux
    }

    pub fn is_valid(&self) -> bool {
        !self.flags.invalid
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.kind,
            StateVarKind::RegularAggregate { .. }
                | StateVarKind::InFluxAggregate { .. }
                | StateVarKind::ConnectionAggregate { .. }
        )
    }

    pub fn invalidate(&mut self) {
        self.flags.invalid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;

    fn dummy() -> StateVar {
        StateVar {
            name: "x".to_string(),
            unit: UnitData::dimensionless(),
            location: VarLocation::simple(EntityId(0), EntityId(1)),
            kind: StateVarKind::Declared {
                decl: EntityId(2),
                connection: None,
                initial_is_conc: false,
            },
            flags: StateVarFlags::default(),
        }
    }

    #[test]
    fn declared_is_not_aggregate() {
        assert!(!dummy().is_aggregate());
    }

    #[test]
    fn in_flux_aggregate_is_aggregate() {
        let mut v = dummy();
        v.kind = StateVarKind::InFluxAggregate {
            in_flux_to: VarId(3),
        };
        assert!(v.is_aggregate());
    }

    #[test]
    fn invalidate_flips_validity() {
        let mut v = dummy();
        assert!(v.is_valid());
        v.invalidate();
        assert!(!v.is_valid());
    }
}
