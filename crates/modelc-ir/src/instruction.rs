//! Instructions: one per state-variable write, produced by C5 (the
//! instruction builder) and grouped by C7 (grouped topological sort). The
//! instruction itself only records *what kind of write* happens and to/from
//! which variables — the expression that computes a `ComputeStateVar`'s
//! value is a typed tree owned by the compiler crate, keyed by
//! `InstructionId`, the same split the teacher draws between an `IRNode`'s
//! shape (`src/ir/mod.rs`) and the `IRExpression` trees hung off it.

use crate::ids::{ConnectionId, GroupId, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// Evaluate the variable's expression and store the result.
    ComputeStateVar { var: VarId },
    /// Reset a variable's accumulator (most fluxes and aggregates) before
    /// the compute pass runs.
    ClearStateVar { var: VarId },
    /// A discrete (non-ODE) flux subtracts its value from the source
    /// compartment immediately, rather than through the solver.
    SubtractDiscreteFluxFromSource { flux: VarId, source: VarId },
    /// The discrete counterpart: add the flux's value to its target.
    AddDiscreteFluxToTarget { flux: VarId, target: VarId },
    /// Accumulate one contributor into a regular or in-flux aggregate.
    AddToAggregate { aggregate: VarId, contributor: VarId },
    /// Accumulate one contributor into a per-connection aggregate.
    AddToConnectionAggregate {
        aggregate: VarId,
        connection: ConnectionId,
        contributor: VarId,
    },
    /// Run a user-supplied computation block targeting one or more
    /// variables without going through the usual expression evaluator.
    ExternalComputation { var: VarId },
}

impl InstructionKind {
    /// The variable this instruction principally writes to — used by C6 to
    /// seed the dependency graph and by C7 as the sort's node identity.
    pub fn target(&self) -> VarId {
        match self {
            InstructionKind::ComputeStateVar { var }
            | InstructionKind::ClearStateVar { var }
            | InstructionKind::ExternalComputation { var } => *var,
            InstructionKind::SubtractDiscreteFluxFromSource { source, .. } => *source,
            InstructionKind::AddDiscreteFluxToTarget { target, .. } => *target,
            InstructionKind::AddToAggregate { aggregate, .. } => *aggregate,
            InstructionKind::AddToConnectionAggregate { aggregate, .. } => *aggregate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Filled in by C7; `None` until the grouped topological sort runs.
    pub group: Option<GroupId>,
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Self {
        Instruction { kind, group: None }
    }

    pub fn target(&self) -> VarId {
        self.kind.target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_extraction_covers_every_kind() {
        let v = VarId(0);
        assert_eq!(
            Instruction::new(InstructionKind::ComputeStateVar { var: v }).target(),
            v
        );
        assert_eq!(
            Instruction::new(InstructionKind::AddDiscreteFluxToTarget {
                flux: VarId(1),
                target: v,
            })
            .target(),
            v
        );
    }

    #[test]
    fn new_instruction_is_ungrouped() {
        let i = Instruction::new(InstructionKind::ClearStateVar { var: VarId(5) });
        assert!(i.group.is_none());
    }
}
