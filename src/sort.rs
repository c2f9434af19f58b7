//! C7 — Grouped topological sort (spec.md §4.7). Grounded on
//! `original_source/src/grouped_topological_sort.h`'s `Graph_Sorting_Predicate`
//! abstraction: a trait exposing which nodes participate and what edges
//! they carry, so the five passes (SCC, condensation, label grouping,
//! optimization, in-cycle ordering) stay generic over whatever node/label
//! type the caller uses. A strongly-connected-components pass feeding
//! a stratified evaluation order is the nearest analogue to this shape
//! elsewhere in a Datalog-style pipeline.

use crate::diagnostics::CompileError;
use modelc_ast::SourceLocation;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// What C7 needs from the caller's node/edge representation. `Node` is
/// whatever id the caller uses (an `InstructionId` in the real pipeline,
/// a plain `u32` in tests).
pub trait SortPredicate {
    type Node: Copy + Eq + Hash + std::fmt::Debug;
    type Label: Copy + Eq + Hash + std::fmt::Debug;

    fn participates(&self, node: Self::Node) -> bool;
    /// `(strong, weak, blocking)` outgoing edges from `node`.
    fn edges(&self, node: Self::Node) -> (Vec<Self::Node>, Vec<Self::Node>, Vec<Self::Node>);
    fn label(&self, node: Self::Node) -> Self::Label;
}

#[derive(Debug, Clone)]
pub struct Group<N, L> {
    pub label: L,
    pub nodes: Vec<N>,
}

/// Pass A — strongly-connected components under strong+weak edges
/// (Tarjan's algorithm; the spec names Dijkstra's path-based variant, but
/// any linear SCC algorithm produces the same partition). Returns one
/// `Vec<Node>` per SCC, in no particular order.
pub fn strongly_connected_components<P: SortPredicate>(
    pred: &P,
    nodes: &[P::Node],
) -> Vec<Vec<P::Node>> {
    struct Tarjan<'p, P: SortPredicate> {
        pred: &'p P,
        index: HashMap<P::Node, u32>,
        lowlink: HashMap<P::Node, u32>,
        on_stack: HashSet<P::Node>,
        stack: Vec<P::Node>,
        next_index: u32,
        result: Vec<Vec<P::Node>>,
    }

    impl<'p, P: SortPredicate> Tarjan<'p, P> {
        fn visit(&mut self, v: P::Node) {
            self.index.insert(v, self.next_index);
            self.lowlink.insert(v, self.next_index);
            self.next_index += 1;
            self.stack.push(v);
            self.on_stack.insert(v);

            let (strong, weak, _) = self.pred.edges(v);
            for w in strong.into_iter().chain(weak) {
                if !self.pred.participates(w) {
                    continue;
                }
                if !self.index.contains_key(&w) {
                    self.visit(w);
                    let w_low = self.lowlink[&w];
                    let v_low = self.lowlink[&v];
                    self.lowlink.insert(v, v_low.min(w_low));
                } else if self.on_stack.contains(&w) {
                    let w_idx = self.index[&w];
                    let v_low = self.lowlink[&v];
                    self.lowlink.insert(v, v_low.min(w_idx));
                }
            }

            if self.lowlink[&v] == self.index[&v] {
                let mut scc = Vec::new();
                loop {
                    let w = self.stack.pop().unwrap();
                    self.on_stack.remove(&w);
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.result.push(scc);
            }
        }
    }

    let mut tarjan = Tarjan {
        pred,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        next_index: 0,
        result: Vec::new(),
    };

    for &node in nodes {
        if pred.participates(node) && !tarjan.index.contains_key(&node) {
            tarjan.visit(node);
        }
    }
    tarjan.result
}

/// Pass A's label-consistency check (spec.md §8 "Label consistency"):
/// every node in one SCC must carry the same label.
pub fn check_label_consistency<P: SortPredicate>(
    pred: &P,
    sccs: &[Vec<P::Node>],
    location: SourceLocation,
) -> Result<(), CompileError> {
    for scc in sccs {
        if scc.len() <= 1 {
            continue;
        }
        let first_label = pred.label(scc[0]);
        for &n in &scc[1..] {
            if pred.label(n) != first_label {
                return Err(CompileError::model_building(
                    location.clone(),
                    format!(
                        "cycle contains nodes with conflicting solver labels: {:?} vs {:?} (nodes {:?})",
                        first_label, pred.label(n), scc
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Pass B — condensed topological sort: depth-first topological sort of
/// SCCs on strong edges only. A cycle at this level is an algorithmic bug
/// (spec.md §4.7 "abort"), not a user-facing diagnostic.
pub fn condensed_topological_order<P: SortPredicate>(
    pred: &P,
    sccs: &[Vec<P::Node>],
) -> Result<Vec<usize>, CompileError> {
    let mut node_to_scc = HashMap::new();
    for (i, scc) in sccs.iter().enumerate() {
        for &n in scc {
            node_to_scc.insert(n, i);
        }
    }

    let mut visited = vec![false; sccs.len()];
    let mut on_stack = vec![false; sccs.len()];
    let mut order = Vec::with_capacity(sccs.len());

    fn visit<P: SortPredicate>(
        i: usize,
        sccs: &[Vec<P::Node>],
        pred: &P,
        node_to_scc: &HashMap<P::Node, usize>,
        visited: &mut Vec<bool>,
        on_stack: &mut Vec<bool>,
        order: &mut Vec<usize>,
    ) -> Result<(), CompileError> {
        if visited[i] {
            return Ok(());
        }
        if on_stack[i] {
            return Err(CompileError::internal(
                SourceLocation::synthesized(),
                "condensed graph contains a cycle on strong edges — SCC computation is inconsistent",
            ));
        }
        on_stack[i] = true;
        for &n in &sccs[i] {
            let (strong, _, _) = pred.edges(n);
            for s in strong {
                if let Some(&j) = node_to_scc.get(&s) {
                    if j != i {
                        visit(j, sccs, pred, node_to_scc, visited, on_stack, order)?;
                    }
                }
            }
        }
        on_stack[i] = false;
        visited[i] = true;
        order.push(i);
        Ok(())
    }

    for i in 0..sccs.len() {
        visit(i, sccs, pred, &node_to_scc, &mut visited, &mut on_stack, &mut order)?;
    }
    // `visit` appends in post-order (dependencies before dependents via
    // `strong` pointing at predecessors), so reverse to get predecessors first.
    order.reverse();
    Ok(order)
}

/// Pass C — label grouping. Walks the condensed order and places each
/// meta-node into the earliest compatible group, or opens a new one.
pub fn group_by_label<P: SortPredicate>(
    pred: &P,
    sccs: &[Vec<P::Node>],
    condensed_order: &[usize],
    blocking: impl Fn(P::Node, P::Node) -> bool,
) -> Vec<Group<P::Node, P::Label>> {
    let mut groups: Vec<Group<P::Node, P::Label>> = Vec::new();
    // `last_strong_group[node] = index of the group containing a strong
    // predecessor of node` — used to forbid placing a node before it.
    let mut node_group: HashMap<P::Node, usize> = HashMap::new();

    for &scc_idx in condensed_order {
        let scc = &sccs[scc_idx];
        let label = pred.label(scc[0]);

        // The earliest group index this SCC's nodes may not precede.
        let mut min_group = 0usize;
        for &n in scc {
            let (strong, _, _) = pred.edges(n);
            for s in strong {
                if let Some(&g) = node_group.get(&s) {
                    min_group = min_group.max(g + 1);
                }
            }
        }

        let mut placed = None;
        for (gi, group) in groups.iter().enumerate().skip(min_group) {
            if group.label != label {
                continue;
            }
            let blocks = scc.iter().any(|&n| group.nodes.iter().any(|&existing| blocking(n, existing)));
            if !blocks {
                placed = Some(gi);
                break;
            }
        }

        let gi = match placed {
            Some(gi) => gi,
            None => {
                let insert_at = min_group.min(groups.len());
                groups.insert(
                    insert_at,
                    Group {
                        label,
                        nodes: Vec::new(),
                    },
                );
                insert_at
            }
        };

        for &n in scc {
            groups[gi].nodes.push(n);
            node_group.insert(n, gi);
        }
    }

    groups
}

/// Pass D — optimization: push nodes to later groups of the same label
/// when nothing behind them depends on them, up to `max_iterations`
/// (spec.md §4.7, default 10 — see
/// [`crate::config::SolverConfig::max_pass_d_iterations`]).
pub fn optimize_groups<P: SortPredicate>(
    pred: &P,
    mut groups: Vec<Group<P::Node, P::Label>>,
    max_iterations: u32,
    blocking: impl Fn(P::Node, P::Node) -> bool,
) -> Vec<Group<P::Node, P::Label>> {
    for _ in 0..max_iterations {
        let mut changed = false;
        'outer: for gi in 0..groups.len() {
            if gi + 1 >= groups.len() {
                continue;
            }
            for ni in 0..groups[gi].nodes.len() {
                let node = groups[gi].nodes[ni];
                let later = gi + 1;
                if groups[later].label != groups[gi].label {
                    continue;
                }
                let (strong, _, _) = pred.edges(node);
                let depended_on_by_successor = groups[gi].nodes[ni + 1..]
                    .iter()
                    .any(|&succ| pred.edges(succ).0.contains(&node));
                if depended_on_by_successor {
                    continue;
                }
                if strong.iter().any(|&s| groups[later].nodes.contains(&s)) {
                    continue;
                }
                if groups[later].nodes.iter().any(|&existing| blocking(node, existing)) {
                    continue;
                }
                groups[gi].nodes.remove(ni);
                groups[later].nodes.insert(0, node);
                changed = true;
                break 'outer;
            }
        }
        groups.retain(|g| !g.nodes.is_empty());
        if !changed {
            break;
        }
    }
    groups
}

/// Pass E — in-cycle ordering: for SCCs of size >1, a small topological
/// sort on strong edges alone fixes an internal order (weak edges don't
/// imply ordering, so ignoring them here is sound).
pub fn order_within_cycle<P: SortPredicate>(pred: &P, scc: &mut Vec<P::Node>) {
    if scc.len() <= 1 {
        return;
    }
    let members: HashSet<P::Node> = scc.iter().copied().collect();
    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(scc.len());

    fn visit<P: SortPredicate>(
        n: P::Node,
        pred: &P,
        members: &HashSet<P::Node>,
        visited: &mut HashSet<P::Node>,
        order: &mut Vec<P::Node>,
    ) {
        if !visited.insert(n) {
            return;
        }
        let (strong, _, _) = pred.edges(n);
        for s in strong {
            if members.contains(&s) {
                visit(s, pred, members, visited, order);
            }
        }
        order.push(n);
    }

    for &n in scc.iter() {
        visit(n, pred, &members, &mut visited, &mut order);
    }
    order.reverse();
    *scc = order;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tiny in-memory graph for testing the pass pipeline without
    /// wiring up the real `InstructionId` types.
    struct TestGraph {
        strong: HashMap<u32, Vec<u32>>,
        labels: HashMap<u32, u32>,
    }

    impl SortPredicate for TestGraph {
        type Node = u32;
        type Label = u32;

        fn participates(&self, node: u32) -> bool {
            self.labels.contains_key(&node)
        }

        fn edges(&self, node: u32) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
            (self.strong.get(&node).cloned().unwrap_or_default(), vec![], vec![])
        }

        fn label(&self, node: u32) -> u32 {
            self.labels[&node]
        }
    }

    #[test]
    fn acyclic_chain_sorts_into_dependency_order() {
        // 0 -> 1 -> 2 (strong edges point at predecessors).
        let mut strong = HashMap::new();
        strong.insert(2, vec![1]);
        strong.insert(1, vec![0]);
        let mut labels = HashMap::new();
        labels.insert(0, 0);
        labels.insert(1, 0);
        labels.insert(2, 0);
        let g = TestGraph { strong, labels };

        let nodes = vec![0, 1, 2];
        let sccs = strongly_connected_components(&g, &nodes);
        assert_eq!(sccs.len(), 3);
        let order = condensed_topological_order(&g, &sccs).unwrap();
        let groups = group_by_label(&g, &sccs, &order, |_, _| false);
        let positions: HashMap<u32, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(gi, grp)| grp.nodes.iter().map(move |&n| (n, gi)))
            .collect();
        assert!(positions[&0] <= positions[&1]);
        assert!(positions[&1] <= positions[&2]);
    }

    #[test]
    fn mutual_strong_edges_form_one_scc() {
        let mut strong = HashMap::new();
        strong.insert(0, vec![1]);
        strong.insert(1, vec![0]);
        let mut labels = HashMap::new();
        labels.insert(0, 0);
        labels.insert(1, 0);
        let g = TestGraph { strong, labels };

        let sccs = strongly_connected_components(&g, &[0, 1]);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }

    #[test]
    fn conflicting_labels_within_a_cycle_are_rejected() {
        let mut strong = HashMap::new();
        strong.insert(0, vec![1]);
        strong.insert(1, vec![0]);
        let mut labels = HashMap::new();
        labels.insert(0, 0);
        labels.insert(1, 1);
        let g = TestGraph { strong, labels };

        let sccs = strongly_connected_components(&g, &[0, 1]);
        let result = check_label_consistency(&g, &sccs, SourceLocation::synthesized());
        assert!(result.is_err());
    }
}
