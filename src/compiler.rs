//! Top-level orchestration tying C1–C8 together (spec.md §4). Grounded on
//! a top-level engine struct wrapping the pass
//! state, exposing one method that runs every stage in a fixed order and
//! returns either a compiled artifact or the first fatal `CompileError`
//! (spec.md §7, "no partial-result recovery").

use crate::codegen::{build_group, CodeEmitter, GroupCode, OffsetResolver, Signature};
use crate::composer::VarStore;
use crate::config::Config;
use crate::dependency::DependencyGraph;
use crate::diagnostics::{CompileError, DiagnosticStream};
use crate::instructions::{build_instructions, FluxEndpoints, InstructionSet};
use crate::registry::Registry;
use crate::sort::{Group, SortPredicate};
use modelc_ast::SourceLocation;
use modelc_ir::{Instruction, InstructionId, VarId};
use std::collections::HashMap;

/// A successfully compiled model: the instruction set, the grouped order
/// C7 produced, and the per-group code C8 emitted. Read-only post-compile
/// (spec.md §5, "Compiled artifacts... are read-only post-compile").
pub struct CompiledModel {
    pub instructions: InstructionSet,
    pub groups: Vec<Group<InstructionId, Option<modelc_ir::SolverId>>>,
    pub code: Vec<GroupCode>,
}

/// Owns the registries and pass state for one compile invocation (spec.md
/// §5, "single exclusive resource owned by one compile invocation"). Not
/// reused across compiles.
pub struct Compiler {
    pub config: Config,
    pub registry: Registry,
    pub diagnostics: DiagnosticStream,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        tracing::info!(stdlib_root = ?config.compiler.stdlib_root, "initializing compiler");
        Compiler {
            config,
            registry: Registry::new(),
            diagnostics: DiagnosticStream::new(),
        }
    }

    /// Runs C6's two propagation fixed points and C7's five passes over
    /// an already-built `InstructionSet`, then C8's walker, returning the
    /// compiled artifact. C1–C5 (unit algebra, scope/registry population,
    /// expression resolution, variable composition, instruction building)
    /// happen earlier, driven by the (out-of-scope) parser feeding
    /// `crate::resolve`/`crate::composer` directly — this method picks up
    /// once an `InstructionSet` exists.
    pub fn compile_from_instructions<R: OffsetResolver, P>(
        &mut self,
        instructions: InstructionSet,
        mut graph: DependencyGraph,
        predicate: &P,
        resolver: &R,
        location: SourceLocation,
    ) -> Result<CompiledModel, CompileError>
    where
        P: SortPredicate<Node = InstructionId, Label = Option<modelc_ir::SolverId>>,
    {
        tracing::debug!("C6: propagating index sets and solver labels");
        graph.propagate_index_sets(self.config.compiler.max_fixpoint_iterations, location.clone())?;

        let var_to_instruction: HashMap<VarId, InstructionId> = instructions
            .instructions
            .iter()
            .enumerate()
            .map(|(i, instr)| (instr.target(), InstructionId::from(i)))
            .collect();
        graph.propagate_solver_labels(&instructions.strong_edges, &var_to_instruction, location.clone())?;

        tracing::debug!("C7: grouped topological sort");
        let nodes: Vec<InstructionId> = (0..instructions.instructions.len())
            .map(InstructionId::from)
            .collect();
        let mut sccs = crate::sort::strongly_connected_components(predicate, &nodes);
        crate::sort::check_label_consistency(predicate, &sccs, location.clone())?;
        let condensed = crate::sort::condensed_topological_order(predicate, &sccs)?;
        for scc in &mut sccs {
            crate::sort::order_within_cycle(predicate, scc);
        }
        let mut groups = crate::sort::group_by_label(predicate, &sccs, &condensed, |_, _| false);
        groups = crate::sort::optimize_groups(
            predicate,
            groups,
            self.config.solver.max_pass_d_iterations,
            |_, _| false,
        );

        tracing::debug!(group_count = groups.len(), "C8: emitting grouped code");
        let mut signatures: HashMap<InstructionId, Signature> = HashMap::new();
        for (id, info) in &graph.info {
            signatures.insert(*id, info.index_sets.iter().copied().collect());
        }

        let id_to_instr: HashMap<InstructionId, &Instruction> = instructions
            .instructions
            .iter()
            .enumerate()
            .map(|(i, instr)| (InstructionId::from(i), instr))
            .collect();

        let mut code = Vec::with_capacity(groups.len());
        for group in &groups {
            let group_instrs: Vec<(InstructionId, &Instruction)> = group
                .nodes
                .iter()
                .filter_map(|id| id_to_instr.get(id).map(|instr| (*id, *instr)))
                .collect();
            code.push(build_group(&group_instrs, &signatures, resolver));
        }

        Ok(CompiledModel {
            instructions,
            groups,
            code,
        })
    }

    /// Runs C4/C5 over an already-populated variable declaration set,
    /// returning the built instruction set for C6/C7/C8 to consume.
    pub fn build_instructions(
        &self,
        store: &VarStore,
        ode_targets: &HashMap<VarId, ()>,
        flux_endpoints: &HashMap<VarId, FluxEndpoints>,
    ) -> InstructionSet {
        tracing::debug!(var_count = store.len(), "C5: building instructions");
        build_instructions(store, ode_targets, flux_endpoints)
    }

    /// Runs `emitter` over a compiled model's per-group code — the
    /// seam where a real JIT backend would plug in (spec.md §1: an
    /// external collaborator, out of scope here).
    pub fn emit<E: CodeEmitter>(&self, model: &CompiledModel, emitter: &mut E) -> E::Output {
        emitter.emit(&model.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::OffsetExpr;
    use modelc_ir::IndexSetId;

    struct NoResolver;
    impl OffsetResolver for NoResolver {
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
        fn connection_guard(&self, _connection: modelc_ir::ConnectionId) -> crate::codegen::ConnectionGuard {
            crate::codegen::ConnectionGuard::GraphEndpointMatches
        }
        fn flux_weight(&self, _flux: VarId, _b: &HashMap<IndexSetId, IndexSetId>) -> Option<OffsetExpr> {
            None
        }
        fn external_computation_args(&self, _var: VarId, _b: &HashMap<IndexSetId, IndexSetId>) -> Vec<OffsetExpr> {
            vec![]
        }
    }

    struct NoEdges;
    impl SortPredicate for NoEdges {
        type Node = InstructionId;
        type Label = Option<modelc_ir::SolverId>;

        fn participates(&self, _node: InstructionId) -> bool {
            true
        }
        fn edges(&self, _node: InstructionId) -> (Vec<InstructionId>, Vec<InstructionId>, Vec<InstructionId>) {
            (vec![], vec![], vec![])
        }
        fn label(&self, _node: InstructionId) -> Option<modelc_ir::SolverId> {
            None
        }
    }

    #[test]
    fn compiling_a_single_unindexed_instruction_yields_one_group() {
        let mut instructions = InstructionSet::default();
        instructions
            .instructions
            .push(Instruction::new(modelc_ir::InstructionKind::ComputeStateVar { var: VarId(0) }));
        let graph = DependencyGraph::new();
        let mut compiler = Compiler::new(Config::default());
        let result = compiler.compile_from_instructions(
            instructions,
            graph,
            &NoEdges,
            &NoResolver,
            SourceLocation::synthesized(),
        );
        let model = result.unwrap();
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.code.len(), 1);
    }
}
