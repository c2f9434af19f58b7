//! Graphviz DOT export (behind the `graphviz` feature), supplemented from
//! `original_source/support/graph_visualisation.h`/`.cpp`. A debug aid in
//! the same spirit as a `pipeline_trace`/`debug_ir` debug utility
//! would be — not a production interface.

use crate::dependency::DependencyGraph;
use std::fmt::Write as _;

/// Renders `graph`'s instruction dependency edges as a Graphviz DOT
/// digraph, one node per instruction and one edge per
/// `inherits_from_instruction` link.
pub fn write_dot(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph dependency {\n");

    for id in graph.info.keys() {
        let _ = writeln!(out, "  \"{id}\";");
    }
    for (from, to) in &graph.instruction_edges {
        let _ = writeln!(out, "  \"{from}\" -> \"{to}\";");
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelc_ir::InstructionId;

    #[test]
    fn empty_graph_still_produces_a_valid_digraph_header() {
        let graph = DependencyGraph::new();
        let dot = write_dot(&graph);
        assert!(dot.starts_with("digraph dependency {"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn edges_render_as_quoted_arrows() {
        let mut graph = DependencyGraph::new();
        graph.entry(InstructionId(0));
        graph.entry(InstructionId(1));
        graph.instruction_edges.push((InstructionId(0), InstructionId(1)));
        let dot = write_dot(&graph);
        assert!(dot.contains("\"InstructionId(0)\" -> \"InstructionId(1)\";"));
    }
}
