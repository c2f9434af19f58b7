//! C8 — Code-gen walker (spec.md §4.8). Turns C7's grouped instruction
//! order into a small typed "nested for-loops + body" IR rather than text,
//! since the actual JIT emitter is an external collaborator (SPEC_FULL.md
//! §1). A `CodeEmitter` trait then consumes this structured form; the
//! split mirrors a `code_generator` module that also
//! produces an intermediate tree (`IRNode`) that a separate backend walks
//! rather than stringifying the plan itself.

use modelc_ir::{ConnectionId, IndexSetId, Instruction, InstructionKind, InstructionId, VarId};
use std::collections::HashMap;

/// An offset into a variable's storage array: a base plus a linear
/// combination of index variables weighted by per-array strides (spec.md
/// §4.8, "Offsets are computed as linear combinations...").
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetExpr {
    /// A fixed, already-resolved offset (unrestricted scalar, or fully
    /// indexed by compile-time-known constants).
    Constant(u64),
    /// `base + sum(stride[i] * IndexVar(index_set[i]))`.
    Linear {
        base: u64,
        terms: Vec<(IndexSetId, u64)>,
    },
}

/// One emittable operation inside a loop body (spec.md §4.8's per-kind
/// bullet list).
#[derive(Debug, Clone, PartialEq)]
pub enum CodeOp {
    ComputeStateVar {
        var: VarId,
        dest: OffsetExpr,
    },
    ClearStateVar {
        var: VarId,
        dest: OffsetExpr,
    },
    SubtractFlux {
        flux: VarId,
        source: OffsetExpr,
        weight: Option<OffsetExpr>,
    },
    AddFlux {
        flux: VarId,
        target: OffsetExpr,
        weight: Option<OffsetExpr>,
    },
    AddToAggregate {
        aggregate: VarId,
        aggregate_dest: OffsetExpr,
        contributor: VarId,
        weight: Option<OffsetExpr>,
    },
    /// `guard` is the runtime condition gating the add: endpoint match for
    /// graph connections, index-bound check for grid-1D (spec.md §4.8).
    AddToConnectionAggregate {
        aggregate: VarId,
        aggregate_dest: OffsetExpr,
        connection: ConnectionId,
        contributor: VarId,
        guard: ConnectionGuard,
    },
    ExternalComputation {
        var: VarId,
        args: Vec<OffsetExpr>,
        results: Vec<OffsetExpr>,
    },
    /// Emitted once per ODE batch, after the batch's for-loops: writes
    /// `position - batch_base` into the dense derivative vector.
    OdeDerivative {
        var: VarId,
        position: OffsetExpr,
        batch_base: OffsetExpr,
        derivative_slot: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionGuard {
    None,
    GraphEndpointMatches,
    GridIndexInBounds,
}

/// One nesting level of a for-loop, ranging over `index_set`. Parent
/// index sets (from restrictions / sub-indexed sets) nest their loop
/// outside this one; matrix-style double dependencies nest a second loop
/// inside the first (spec.md §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct LoopNest {
    pub index_set: IndexSetId,
    pub body: CodeBlock,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeBlock {
    pub loops: Vec<LoopNest>,
    pub ops: Vec<CodeOp>,
}

impl CodeBlock {
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty() && self.ops.is_empty()
    }
}

/// A group's signature plus its emitted body — the walker's per-group
/// output unit (spec.md §4.7 "sequence of groups").
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCode {
    pub block: CodeBlock,
}

/// Consumes the structured form C8 produces. The production backend is an
/// external JIT collaborator (out of scope here); a trait lets tests
/// supply a trivial in-process emitter instead.
pub trait CodeEmitter {
    type Output;
    fn emit(&mut self, groups: &[GroupCode]) -> Self::Output;
}

/// Per-instruction signature: which index sets its enclosing loops range
/// over, outermost first. Computed by C6/C7 and handed to the walker.
pub type Signature = Vec<IndexSetId>;

/// Resolves one instruction's per-variable storage offset given the
/// walker's transient index-set -> iterator map. Implementations live
/// alongside the handle-to-location table built during C2/C4; this trait
/// just keeps `build_group` decoupled from that table's concrete shape.
pub trait OffsetResolver {
    fn offset_of(&self, var: VarId, index_binding: &HashMap<IndexSetId, IndexSetId>) -> OffsetExpr;
    fn is_ode_target(&self, var: VarId) -> bool;
    fn ode_batch_base(&self, var: VarId) -> OffsetExpr;
    fn derivative_slot(&self, var: VarId) -> u32;
    /// The runtime condition that gates one contributor's add into a
    /// per-connection aggregate: endpoint match for a graph connection,
    /// bounds check for a grid-1D one (spec.md §4.8). Connection topology
    /// is a C2/C4 fact, not something C8 can infer from the instruction
    /// alone.
    fn connection_guard(&self, connection: ConnectionId) -> ConnectionGuard;
    /// A flux's per-contribution weight (e.g. a dissolved flux's carrying
    /// concentration), if it has one beyond the flux's own value.
    fn flux_weight(&self, flux: VarId, index_binding: &HashMap<IndexSetId, IndexSetId>) -> Option<OffsetExpr>;
    /// Extra operand offsets an `ExternalComputation` reads, beyond the
    /// variable it writes (spec.md §4.8's `@note`-declared input list).
    fn external_computation_args(&self, var: VarId, index_binding: &HashMap<IndexSetId, IndexSetId>) -> Vec<OffsetExpr>;
}

/// Builds one group's nested-loop body from its instructions and
/// per-instruction index-set signatures (spec.md §4.8: "one [loop] per
/// index set in the group's signature").
pub fn build_group<R: OffsetResolver>(
    instructions: &[(InstructionId, &Instruction)],
    signatures: &HashMap<InstructionId, Signature>,
    resolver: &R,
) -> GroupCode {
    let mut block = CodeBlock::default();
    let mut ode_derivative_ops = Vec::new();

    for &(iid, instr) in instructions {
        let empty = Vec::new();
        let sig = signatures.get(&iid).unwrap_or(&empty);
        let mut binding: HashMap<IndexSetId, IndexSetId> = HashMap::new();
        for &set in sig {
            binding.insert(set, set);
        }

        let ops = lower_instruction(&instr.kind, &binding, resolver);
        insert_nested(&mut block, sig, ops);

        let target = instr.kind.target();
        if resolver.is_ode_target(target) {
            let position = resolver.offset_of(target, &binding);
            ode_derivative_ops.push(CodeOp::OdeDerivative {
                var: target,
                position,
                batch_base: resolver.ode_batch_base(target),
                derivative_slot: resolver.derivative_slot(target),
            });
        }
    }

    block.ops.extend(ode_derivative_ops);
    GroupCode { block }
}

fn lower_instruction<R: OffsetResolver>(
    kind: &InstructionKind,
    binding: &HashMap<IndexSetId, IndexSetId>,
    resolver: &R,
) -> Vec<CodeOp> {
    match kind {
        InstructionKind::ComputeStateVar { var } => vec![CodeOp::ComputeStateVar {
            var: *var,
            dest: resolver.offset_of(*var, binding),
        }],
        InstructionKind::ClearStateVar { var } => vec![CodeOp::ClearStateVar {
            var: *var,
            dest: resolver.offset_of(*var, binding),
        }],
        InstructionKind::SubtractDiscreteFluxFromSource { flux, source } => {
            vec![CodeOp::SubtractFlux {
                flux: *flux,
                source: resolver.offset_of(*source, binding),
                weight: resolver.flux_weight(*flux, binding),
            }]
        }
        InstructionKind::AddDiscreteFluxToTarget { flux, target } => vec![CodeOp::AddFlux {
            flux: *flux,
            target: resolver.offset_of(*target, binding),
            weight: resolver.flux_weight(*flux, binding),
        }],
        InstructionKind::AddToAggregate {
            aggregate,
            contributor,
        } => vec![CodeOp::AddToAggregate {
            aggregate: *aggregate,
            aggregate_dest: resolver.offset_of(*aggregate, binding),
            contributor: *contributor,
            weight: resolver.flux_weight(*contributor, binding),
        }],
        InstructionKind::AddToConnectionAggregate {
            aggregate,
            connection,
            contributor,
        } => vec![CodeOp::AddToConnectionAggregate {
            aggregate: *aggregate,
            aggregate_dest: resolver.offset_of(*aggregate, binding),
            connection: *connection,
            contributor: *contributor,
            guard: resolver.connection_guard(*connection),
        }],
        InstructionKind::ExternalComputation { var } => vec![CodeOp::ExternalComputation {
            var: *var,
            args: resolver.external_computation_args(*var, binding),
            results: vec![resolver.offset_of(*var, binding)],
        }],
    }
}

fn insert_nested(block: &mut CodeBlock, sig: &[IndexSetId], ops: Vec<CodeOp>) {
    match sig.split_first() {
        None => block.ops.extend(ops),
        Some((&first, rest)) => {
            let pos = match block.loops.iter().position(|l| l.index_set == first) {
                Some(pos) => pos,
                None => {
                    block.loops.push(LoopNest {
                        index_set: first,
                        body: CodeBlock::default(),
                    });
                    block.loops.len() - 1
                }
            };
            insert_nested(&mut block.loops[pos].body, rest, ops);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelc_ir::Instruction;

    struct FlatResolver;
    impl OffsetResolver for FlatResolver {
        fn offset_of(&self, var: VarId, _b: &HashMap<IndexSetId, IndexSetId>) -> OffsetExpr {
            OffsetExpr::Constant(var.index() as u64)
        }
        fn is_ode_target(&self, _var: VarId) -> bool {
            false
        }
        fn ode_batch_base(&self, _var: VarId) -> OffsetExpr {
            OffsetExpr::Constant(0)
        }
        fn derivative_slot(&self, _var: VarId) -> u32 {
            0
        }
        fn connection_guard(&self, _connection: ConnectionId) -> ConnectionGuard {
            ConnectionGuard::GraphEndpointMatches
        }
        fn flux_weight(&self, _flux: VarId, _b: &HashMap<IndexSetId, IndexSetId>) -> Option<OffsetExpr> {
            None
        }
        fn external_computation_args(&self, _var: VarId, _b: &HashMap<IndexSetId, IndexSetId>) -> Vec<OffsetExpr> {
            vec![]
        }
    }

    #[test]
    fn unindexed_compute_lands_at_block_top_level() {
        let var = VarId(3);
        let instr = Instruction::new(InstructionKind::ComputeStateVar { var });
        let instrs = vec![(InstructionId(0), &instr)];
        let sigs = HashMap::new();
        let group = build_group(&instrs, &sigs, &FlatResolver);
        assert_eq!(group.block.loops.len(), 0);
        assert_eq!(group.block.ops.len(), 1);
        assert!(matches!(group.block.ops[0], CodeOp::ComputeStateVar { .. }));
    }

    #[test]
    fn indexed_compute_nests_inside_its_index_set_loop() {
        let var = VarId(3);
        let instr = Instruction::new(InstructionKind::ComputeStateVar { var });
        let iid = InstructionId(0);
        let instrs = vec![(iid, &instr)];
        let mut sigs = HashMap::new();
        sigs.insert(iid, vec![IndexSetId(7)]);
        let group = build_group(&instrs, &sigs, &FlatResolver);
        assert_eq!(group.block.loops.len(), 1);
        assert_eq!(group.block.loops[0].index_set, IndexSetId(7));
        assert_eq!(group.block.loops[0].body.ops.len(), 1);
    }

    #[test]
    fn two_instructions_sharing_an_index_set_share_one_loop() {
        let a = Instruction::new(InstructionKind::ComputeStateVar { var: VarId(1) });
        let b = Instruction::new(InstructionKind::ClearStateVar { var: VarId(2) });
        let ia = InstructionId(0);
        let ib = InstructionId(1);
        let instrs = vec![(ia, &a), (ib, &b)];
        let mut sigs = HashMap::new();
        sigs.insert(ia, vec![IndexSetId(7)]);
        sigs.insert(ib, vec![IndexSetId(7)]);
        let group = build_group(&instrs, &sigs, &FlatResolver);
        assert_eq!(group.block.loops.len(), 1);
        assert_eq!(group.block.loops[0].body.ops.len(), 2);
    }
}
