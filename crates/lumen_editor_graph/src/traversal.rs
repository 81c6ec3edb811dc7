// SPDX-License-Identifier: MIT OR Apache-2.0
//! Predicate-driven subgraph search.
//!
//! [`filter_graph_from_node`] walks from a start node across its inbound
//! edges toward the nodes that feed it. Two predicates decide how far the
//! walk reaches; [`find_node_and_data`] and [`find_node_tree`] are the two
//! closures the editor deletes and replaces with.

use crate::edge::{Edge, EdgeId};
use crate::graph::Graph;
use crate::node::{Node, NodeId, ShaderStage};
use crate::port::NodeInput;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Nodes and edges collected by a search
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Collected nodes in discovery order
    pub nodes: IndexMap<NodeId, Arc<Node>>,
    /// Collected edges in discovery order
    pub edges: IndexMap<EdgeId, Arc<Edge>>,
    /// Fragment partner of a vertex start node
    pub linked_fragment_node: Option<Arc<Node>>,
    /// Vertex partner of a fragment start node
    pub linked_vertex_node: Option<Arc<Node>>,
}

impl SearchResult {
    /// Check whether a node was collected
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Check whether an edge was collected
    pub fn contains_edge(&self, edge_id: EdgeId) -> bool {
        self.edges.contains_key(&edge_id)
    }

    /// Collected node ids
    pub fn node_ids(&self) -> HashSet<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Collected edge ids
    pub fn edge_ids(&self) -> HashSet<EdgeId> {
        self.edges.keys().copied().collect()
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: SearchResult) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }

    /// Remove the collected nodes and edges from a graph
    #[must_use]
    pub fn remove_from(&self, graph: &Graph) -> Graph {
        graph
            .remove_edges(&self.edge_ids())
            .remove_nodes(&self.node_ids())
    }
}

/// Walk from `start` across inbound edges, collecting what the predicates admit.
///
/// `node_filter(node, inbound, acc)` decides whether a reached node joins the
/// result and is expanded further. `edge_filter(input, to, edge, from, acc)`
/// decides whether an inbound edge of an expanded node is followed. A node is
/// collected together with the edge it was reached through. Stage links are
/// never followed. Edges whose source node is missing are skipped with a
/// warning.
pub fn filter_graph_from_node<N, E>(
    graph: &Graph,
    start: NodeId,
    mut node_filter: N,
    mut edge_filter: E,
) -> SearchResult
where
    N: FnMut(&Node, &[Arc<Edge>], &SearchResult) -> bool,
    E: FnMut(Option<&NodeInput>, &Node, &Edge, &Node, &SearchResult) -> bool,
{
    let mut result = SearchResult::default();
    let Some(start_node) = graph.node(start) else {
        tracing::warn!(node = %start, "search started from unknown node");
        return result;
    };

    let mut stack: Vec<(Arc<Node>, Option<Arc<Edge>>)> = vec![(Arc::clone(start_node), None)];
    while let Some((node, via)) = stack.pop() {
        if result.contains_node(node.id) {
            if let Some(edge) = via {
                result.edges.insert(edge.id, edge);
            }
            continue;
        }

        let inbound: Vec<Arc<Edge>> = graph
            .inbound_edges(node.id)
            .filter(|e| !e.is_link())
            .cloned()
            .collect();
        if !node_filter(&node, &inbound, &result) {
            continue;
        }

        result.nodes.insert(node.id, Arc::clone(&node));
        if let Some(edge) = via {
            result.edges.insert(edge.id, edge);
        }

        // Reversed so the first inbound edge is expanded first
        for edge in inbound.iter().rev() {
            let Some(from) = graph.node(edge.from) else {
                tracing::warn!(edge = %edge.id, node = %edge.from, "edge source missing, skipped");
                continue;
            };
            if edge_filter(node.input(&edge.input), &node, edge, from, &result) {
                stack.push((Arc::clone(from), Some(Arc::clone(edge))));
            }
        }
    }

    result
}

/// The node paired with `node_id` through a next-stage link
pub fn find_linked_node(graph: &Graph, node_id: NodeId) -> Option<Arc<Node>> {
    let node = graph.node(node_id)?;
    let partner = match node.stage? {
        ShaderStage::Vertex => graph
            .outbound_edges(node_id)
            .find(|e| e.is_link())
            .map(|e| e.to)?,
        ShaderStage::Fragment => graph
            .inbound_edges(node_id)
            .find(|e| e.is_link())
            .map(|e| e.from)?,
    };
    match graph.node(partner) {
        Some(linked) => Some(Arc::clone(linked)),
        None => {
            tracing::warn!(node = %node_id, partner = %partner, "linked node missing");
            None
        }
    }
}

/// A node plus the data nodes that exist only to feed it.
///
/// Only data nodes are pulled in, and only when every outbound edge of the
/// data node lands inside the closure, so constants shared with other parts
/// of the graph survive a delete. The linked stage partner's closure and all
/// outbound edges of the node and its partner are included.
pub fn find_node_and_data(graph: &Graph, start: NodeId) -> SearchResult {
    search_with_partner(graph, start, |graph, root, roots| {
        filter_graph_from_node(
            graph,
            root,
            |node, _, _| node.id == root || node.is_data(),
            |_, to, _, from, acc| {
                let inside = |id: NodeId| roots.contains(&id) || acc.contains_node(id);
                inside(to.id)
                    && graph
                        .outbound_edges(from.id)
                        .filter(|e| !e.is_link())
                        .all(|e| inside(e.to))
            },
        )
    })
}

/// A node plus everything that feeds it, transitively.
///
/// The linked stage partner's tree and all outbound edges of the node and
/// its partner are included.
pub fn find_node_tree(graph: &Graph, start: NodeId) -> SearchResult {
    search_with_partner(graph, start, |graph, root, _| {
        filter_graph_from_node(graph, root, |_, _, _| true, |_, _, _, _, _| true)
    })
}

fn search_with_partner<F>(graph: &Graph, start: NodeId, search: F) -> SearchResult
where
    F: Fn(&Graph, NodeId, &HashSet<NodeId>) -> SearchResult,
{
    let Some(start_node) = graph.node(start) else {
        tracing::warn!(node = %start, "search started from unknown node");
        return SearchResult::default();
    };
    let linked = find_linked_node(graph, start);

    let mut roots = HashSet::from([start]);
    if let Some(partner) = &linked {
        roots.insert(partner.id);
    }

    let mut result = search(graph, start, &roots);
    if let Some(partner) = &linked {
        result.merge(search(graph, partner.id, &roots));
    }

    for edge in graph.edges().filter(|e| roots.contains(&e.from)) {
        result.edges.insert(edge.id, Arc::clone(edge));
    }

    match start_node.stage {
        Some(ShaderStage::Vertex) => result.linked_fragment_node = linked,
        Some(ShaderStage::Fragment) => result.linked_vertex_node = linked,
        None => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NodeOutput;
    use crate::test_support::{binary, number, output, source, wire, wire_from};

    #[test]
    fn shared_data_node_keeps_its_consumers() {
        let shared = number("shared");
        let left = binary();
        let right = binary();
        let graph = Graph::new()
            .with_nodes([shared.clone(), left.clone(), right.clone()])
            .add_edge(wire_from(&shared, "out", &left, "a"));
        // A second consumer needs a second output handle under the
        // single-consumer rule.
        let graph = graph
            .update_node(shared.id, |n| n.outputs.push(NodeOutput::new("out2", "Out 2")))
            .add_edge(wire_from(&shared, "out2", &right, "a"));

        let result = find_node_and_data(&graph, shared.id);

        assert_eq!(result.node_ids(), HashSet::from([shared.id]));
        assert_eq!(result.edges.len(), 2);
        let graph = result.remove_from(&graph);
        assert!(graph.contains_node(left.id));
        assert!(graph.contains_node(right.id));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn exclusive_data_feeds_are_collected() {
        let speed = number("speed");
        let scale = number("scale");
        let shader = source(Some(ShaderStage::Fragment), &["uniform_speed", "uniform_scale"]);
        let out = output(ShaderStage::Fragment);
        let graph = Graph::new()
            .with_nodes([speed.clone(), scale.clone(), shader.clone(), out.clone()])
            .add_edge(wire(&speed, &shader, "uniform_speed"))
            .add_edge(wire(&scale, &shader, "uniform_scale"))
            .add_edge(wire(&shader, &out, "color"));

        let result = find_node_and_data(&graph, shader.id);

        assert_eq!(result.node_ids(), HashSet::from([shader.id, speed.id, scale.id]));
        assert_eq!(result.edges.len(), 3);
        assert!(!result.contains_node(out.id));
    }

    #[test]
    fn data_shared_outside_the_closure_is_left_alone() {
        let speed = number("speed");
        let shader = source(Some(ShaderStage::Fragment), &["uniform_speed"]);
        let other = source(Some(ShaderStage::Fragment), &["uniform_speed"]);
        let graph = Graph::new()
            .with_nodes([speed.clone(), shader.clone(), other.clone()])
            .update_node(speed.id, |n| n.outputs.push(NodeOutput::new("copy", "Copy")))
            .add_edge(wire(&speed, &shader, "uniform_speed"))
            .add_edge(wire_from(&speed, "copy", &other, "uniform_speed"));

        let result = find_node_and_data(&graph, shader.id);

        assert_eq!(result.node_ids(), HashSet::from([shader.id]));
    }

    #[test]
    fn non_data_feeders_are_not_part_of_the_data_closure() {
        let upstream = source(Some(ShaderStage::Fragment), &[]);
        let shader = source(Some(ShaderStage::Fragment), &["input"]);
        let graph = Graph::new()
            .with_nodes([upstream.clone(), shader.clone()])
            .add_edge(wire(&upstream, &shader, "input"));

        let data = find_node_and_data(&graph, shader.id);
        let tree = find_node_tree(&graph, shader.id);

        assert_eq!(data.node_ids(), HashSet::from([shader.id]));
        assert_eq!(tree.node_ids(), HashSet::from([shader.id, upstream.id]));
    }

    #[test]
    fn linked_partner_is_folded_in() {
        let vert = source(Some(ShaderStage::Vertex), &["uniform_time"]);
        let frag = source(Some(ShaderStage::Fragment), &[]);
        let time = number("time");
        let vert_out = output(ShaderStage::Vertex);
        let frag_out = output(ShaderStage::Fragment);
        let graph = Graph::new()
            .with_nodes([
                vert.clone(),
                frag.clone(),
                time.clone(),
                vert_out.clone(),
                frag_out.clone(),
            ])
            .add_edge(Edge::link(vert.id, frag.id))
            .add_edge(wire(&time, &vert, "uniform_time"))
            .add_edge(wire(&vert, &vert_out, "position"))
            .add_edge(wire(&frag, &frag_out, "color"));

        let result = find_node_and_data(&graph, frag.id);

        assert_eq!(result.node_ids(), HashSet::from([frag.id, vert.id, time.id]));
        assert_eq!(result.linked_vertex_node.as_ref().map(|n| n.id), Some(vert.id));
        assert!(result.linked_fragment_node.is_none());
        // link, time -> vert, vert -> out, frag -> out
        assert_eq!(result.edges.len(), 4);

        let graph = result.remove_from(&graph);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn tree_follows_every_feeder() {
        let x = number("x");
        let y = number("y");
        let add = binary();
        let shader = source(Some(ShaderStage::Fragment), &["input"]);
        let graph = Graph::new()
            .with_nodes([x.clone(), y.clone(), add.clone(), shader.clone()])
            .add_edge(wire(&x, &add, "a"))
            .add_edge(wire(&y, &add, "b"))
            .add_edge(wire(&add, &shader, "input"));

        let result = find_node_tree(&graph, shader.id);

        assert_eq!(result.nodes.len(), 4);
        assert_eq!(result.edges.len(), 3);
        // discovery order follows edge order
        let order: Vec<_> = result.nodes.keys().copied().collect();
        assert_eq!(order, [shader.id, add.id, x.id, y.id]);
    }

    #[test]
    fn missing_source_nodes_are_skipped() {
        let shader = source(None, &["input"]);
        let ghost = number("ghost");
        let graph = Graph::from_parts([shader.clone()], [wire(&ghost, &shader, "input")]);

        let result = find_node_tree(&graph, shader.id);

        assert_eq!(result.node_ids(), HashSet::from([shader.id]));
        assert!(find_node_tree(&graph, ghost.id).nodes.is_empty());
    }
}
