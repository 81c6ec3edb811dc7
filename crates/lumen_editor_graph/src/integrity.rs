// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph integrity checks.
//!
//! Nothing here runs during normal editing. The check is read-only and the
//! fix is only applied when the user asks for it.

use crate::edge::EdgeId;
use crate::flow::FlowGraph;
use crate::graph::Graph;
use crate::node::NodeId;
use std::collections::HashSet;

/// Discrepancies between a graph, its edges and its projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Graph edges whose endpoints do not resolve
    pub dangling_edges: Vec<EdgeId>,
    /// Flow edges whose endpoints are not flow nodes
    pub dangling_flow_edges: Vec<EdgeId>,
    /// Graph nodes without a flow node
    pub nodes_missing_from_flow: Vec<NodeId>,
    /// Flow nodes without a graph node
    pub nodes_missing_from_graph: Vec<NodeId>,
    /// Graph edges without a flow edge
    pub edges_missing_from_flow: Vec<EdgeId>,
    /// Flow edges without a graph edge
    pub edges_missing_from_graph: Vec<EdgeId>,
}

impl IntegrityReport {
    /// True when nothing was found
    pub fn is_clean(&self) -> bool {
        *self == IntegrityReport::default()
    }

    /// Total number of findings
    pub fn issue_count(&self) -> usize {
        self.dangling_edges.len()
            + self.dangling_flow_edges.len()
            + self.nodes_missing_from_flow.len()
            + self.nodes_missing_from_graph.len()
            + self.edges_missing_from_flow.len()
            + self.edges_missing_from_graph.len()
    }
}

/// Edges of `graph` with a missing endpoint
pub fn dangling_edges(graph: &Graph) -> Vec<EdgeId> {
    graph
        .edges()
        .filter(|e| !graph.contains_node(e.from) || !graph.contains_node(e.to))
        .map(|e| e.id)
        .collect()
}

/// Compare a graph against its projection
pub fn check_integrity(graph: &Graph, flow: &FlowGraph) -> IntegrityReport {
    let graph_edges: HashSet<EdgeId> = graph.edges().map(|e| e.id).collect();

    let report = IntegrityReport {
        dangling_edges: dangling_edges(graph),
        dangling_flow_edges: flow
            .edges()
            .filter(|e| !flow.contains_node(e.source) || !flow.contains_node(e.target))
            .map(|e| e.id)
            .collect(),
        nodes_missing_from_flow: graph.node_ids().filter(|id| !flow.contains_node(*id)).collect(),
        nodes_missing_from_graph: flow
            .nodes()
            .map(|n| n.id)
            .filter(|id| !graph.contains_node(*id))
            .collect(),
        edges_missing_from_flow: graph
            .edges()
            .map(|e| e.id)
            .filter(|id| !flow.contains_edge(*id))
            .collect(),
        edges_missing_from_graph: flow
            .edges()
            .map(|e| e.id)
            .filter(|id| !graph_edges.contains(id))
            .collect(),
    };

    if !report.is_clean() {
        tracing::warn!(issues = report.issue_count(), "graph integrity check failed");
    }
    report
}

/// Prune dangling edges and project the result again
pub fn attempt_fix(graph: &Graph) -> (Graph, FlowGraph) {
    let dangling: HashSet<EdgeId> = dangling_edges(graph).into_iter().collect();
    if !dangling.is_empty() {
        tracing::info!(pruned = dangling.len(), "pruned dangling edges");
    }
    let fixed = graph.remove_edges(&dangling);
    let flow = FlowGraph::from_graph(&fixed);
    (fixed, flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{binary, number, wire};

    #[test]
    fn clean_projection_reports_nothing() {
        let x = number("x");
        let add = binary();
        let graph = Graph::new()
            .with_nodes([x.clone(), add.clone()])
            .add_edge(wire(&x, &add, "a"));

        let report = check_integrity(&graph, &FlowGraph::from_graph(&graph));

        assert!(report.is_clean());
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn stale_projection_is_reported() {
        let x = number("x");
        let y = number("y");
        let add = binary();
        let graph = Graph::new()
            .with_nodes([x.clone(), add.clone()])
            .add_edge(wire(&x, &add, "a"));
        let flow = FlowGraph::from_graph(&graph);

        let edited = graph
            .remove_nodes(&HashSet::from([x.id]))
            .with_node(y.clone());
        let report = check_integrity(&edited, &flow);

        assert_eq!(report.nodes_missing_from_flow, [y.id]);
        assert_eq!(report.nodes_missing_from_graph, [x.id]);
        assert_eq!(report.edges_missing_from_graph.len(), 1);
        assert!(report.dangling_edges.is_empty());
        assert!(report.dangling_flow_edges.is_empty());
    }

    #[test]
    fn attempt_fix_prunes_dangling_edges() {
        let x = number("x");
        let add = binary();
        let ghost = number("ghost");
        let graph = Graph::from_parts(
            [x.clone(), add.clone()],
            [wire(&ghost, &add, "a"), wire(&x, &add, "b")],
        );
        let flow = FlowGraph::from_graph(&graph);

        let report = check_integrity(&graph, &flow);
        assert_eq!(report.dangling_edges.len(), 1);
        assert_eq!(report.dangling_flow_edges.len(), 1);

        let (fixed, flow) = attempt_fix(&graph);
        assert_eq!(fixed.edge_count(), 1);
        assert_eq!(fixed.edge_into(add.id, &"a".into()).unwrap().from, x.id);
        assert!(check_integrity(&fixed, &flow).is_clean());
    }
}
