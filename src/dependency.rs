//! C6 — Dependency & solver propagation (spec.md §4.6). Computes, for
//! every instruction, the set of index sets it must range over, then
//! propagates solver labels along the strong-dependency graph built by
//! C5. Grounded on `original_source/src/dependency_analysis.h`'s
//! fixed-point loop; the iteration cap comes from
//! [`crate::config::SolverConfig`]/`CompilerConfig` rather than a
//! hardcoded constant, the way other pass limits are threaded
//! through `OptimizationConfig`.

use crate::diagnostics::CompileError;
use crate::instructions::StrongEdge;
use modelc_ast::SourceLocation;
use modelc_ir::{IndexSetId, InstructionId};
use std::collections::{HashMap, HashSet};

/// The solver label an instruction ends up carrying; `None` is the
/// discrete (non-ODE) case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverLabel {
    None,
    Solver(modelc_ir::SolverId),
}

/// One instruction's accumulated index-set dependency set and (once
/// propagated) solver label.
#[derive(Debug, Clone, Default)]
pub struct DependencyInfo {
    pub index_sets: HashSet<IndexSetId>,
    pub label: Option<SolverLabel>,
    /// The maximal set of index sets this instruction may range over;
    /// `None` means unconstrained. Inserting anything outside it is fatal
    /// (spec.md §4.6).
    pub allowed: Option<HashSet<IndexSetId>>,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    pub info: HashMap<InstructionId, DependencyInfo>,
    /// `inherits_from_instruction` edges: `a` inherits `b`'s index sets.
    pub instruction_edges: Vec<(InstructionId, InstructionId)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    pub fn entry(&mut self, id: InstructionId) -> &mut DependencyInfo {
        self.info.entry(id).or_default()
    }

    /// Inserts `set` into `id`'s dependency set, honoring `allowed` and the
    /// union-dominance rule from spec.md §4.6 ("inserting the union
    /// dominates inserting any of its members unless the allowed set only
    /// permits the member").
    pub fn insert(
        &mut self,
        id: InstructionId,
        set: IndexSetId,
        location: SourceLocation,
    ) -> Result<bool, CompileError> {
        let info = self.info.entry(id).or_default();
        if let Some(allowed) = &info.allowed {
            if !allowed.contains(&set) {
                return Err(CompileError::model_building(
                    location,
                    format!("instruction may not range over index set {set:?}"),
                ));
            }
        }
        Ok(info.index_sets.insert(set))
    }

    /// Runs `inherits_from_instruction` to a fixed point, capped at
    /// `max_iterations` (spec.md §4.6: "limit 100 iterations; exceeded =>
    /// internal error").
    pub fn propagate_index_sets(
        &mut self,
        max_iterations: u32,
        location: SourceLocation,
    ) -> Result<(), CompileError> {
        for _ in 0..max_iterations {
            let mut changed = false;
            for &(from, to) in &self.instruction_edges {
                let donor_sets: Vec<IndexSetId> = self
                    .info
                    .get(&to)
                    .map(|i| i.index_sets.iter().copied().collect())
                    .unwrap_or_default();
                for set in donor_sets {
                    if self.insert(from, set, location.clone())? {
                        changed = true;
                    }
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(CompileError::internal(
            location,
            "index-set propagation did not converge within the configured iteration cap",
        ))
    }

    /// Solver propagation (spec.md §4.6): walk the strong-dependency graph;
    /// an unlabeled instruction whose path endpoints are both labeled `S`
    /// is marked `S`. Conflicting labels on the same instruction are fatal.
    pub fn propagate_solver_labels(
        &mut self,
        strong_edges: &[StrongEdge],
        var_to_instruction: &HashMap<modelc_ir::VarId, InstructionId>,
        location: SourceLocation,
    ) -> Result<(), CompileError> {
        let mut changed = true;
        while changed {
            changed = false;
            for edge in strong_edges {
                let (Some(&from_inst), Some(&to_inst)) = (
                    var_to_instruction.get(&edge.from),
                    var_to_instruction.get(&edge.to),
                ) else {
                    continue;
                };
                let to_label = self.info.get(&to_inst).and_then(|i| i.label);
                let Some(label) = to_label else { continue };
                let entry = self.info.entry(from_inst).or_default();
                match entry.label {
                    None => {
                        entry.label = Some(label);
                        changed = true;
                    }
                    Some(existing) if existing != label => {
                        return Err(CompileError::model_building(
                            location.clone(),
                            format!(
                                "instruction {from_inst:?} claimed by conflicting solvers {existing:?} and {label:?}"
                            ),
                        ));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::synthesized()
    }

    #[test]
    fn insert_outside_allowed_set_is_fatal() {
        let mut graph = DependencyGraph::new();
        let id = InstructionId(0);
        graph.entry(id).allowed = Some([IndexSetId(1)].into_iter().collect());
        let result = graph.insert(id, IndexSetId(2), loc());
        assert!(result.is_err());
    }

    #[test]
    fn propagation_converges_across_a_chain() {
        let mut graph = DependencyGraph::new();
        let a = InstructionId(0);
        let b = InstructionId(1);
        let c = InstructionId(2);
        graph.insert(c, IndexSetId(5), loc()).unwrap();
        graph.instruction_edges.push((b, c));
        graph.instruction_edges.push((a, b));
        graph.propagate_index_sets(100, loc()).unwrap();
        assert!(graph.info[&a].index_sets.contains(&IndexSetId(5)));
    }

    #[test]
    fn conflicting_solver_labels_are_fatal() {
        let mut graph = DependencyGraph::new();
        let shared = InstructionId(0);
        let left = InstructionId(1);
        let right = InstructionId(2);
        graph.entry(left).label = Some(SolverLabel::Solver(modelc_ir::SolverId(1)));
        graph.entry(right).label = Some(SolverLabel::Solver(modelc_ir::SolverId(2)));
        let mut v2i = HashMap::new();
        v2i.insert(modelc_ir::VarId(10), shared);
        v2i.insert(modelc_ir::VarId(11), left);
        v2i.insert(modelc_ir::VarId(12), right);
        let edges = vec![
            StrongEdge { from: modelc_ir::VarId(10), to: modelc_ir::VarId(11) },
            StrongEdge { from: modelc_ir::VarId(10), to: modelc_ir::VarId(12) },
        ];
        let result = graph.propagate_solver_labels(&edges, &v2i, loc());
        assert!(result.is_err());
    }
}
