// SPDX-License-Identifier: MIT OR Apache-2.0
//! Splicing pre-authored graphs into a live graph.
//!
//! An incoming graph is a complete shader: content nodes plus the Output
//! nodes that wrap them. Splicing mints fresh ids for everything, drops the
//! Output wrapper, moves the content next to where it was dropped and tags it
//! with a new group. [`replace_node`] then takes over the downstream
//! connections of the node it replaces; [`import_graph`] just adds the
//! content.

use crate::edge::EdgeId;
use crate::graph::Graph;
use crate::node::{GroupId, Node, NodeId, Position, ShaderStage};
use crate::port::HandleId;
use crate::traversal::find_node_and_data;
use crate::uniforms::{expand_graph_uniforms, UniformLayout};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Old-to-new id translation table for one splice
#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    /// Node id translation
    pub nodes: HashMap<NodeId, NodeId>,
    /// Edge id translation
    pub edges: HashMap<EdgeId, EdgeId>,
}

impl IdRemap {
    /// New id of an imported node
    pub fn node(&self, old: NodeId) -> Option<NodeId> {
        self.nodes.get(&old).copied()
    }

    /// New id of an imported edge
    pub fn edge(&self, old: EdgeId) -> Option<EdgeId> {
        self.edges.get(&old).copied()
    }
}

/// Copy a graph with every node and edge id replaced by a fresh one.
///
/// Edges that reference a node outside the graph are dropped.
pub fn regenerate_ids(graph: &Graph) -> (Graph, IdRemap) {
    let mut remap = IdRemap::default();
    let nodes: Vec<_> = graph
        .nodes()
        .map(|node| {
            let mut node = (**node).clone();
            let id = NodeId::new();
            remap.nodes.insert(node.id, id);
            node.id = id;
            node
        })
        .collect();

    let mut edges = Vec::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        let (Some(from), Some(to)) = (remap.node(edge.from), remap.node(edge.to)) else {
            tracing::warn!(edge = %edge.id, "dangling edge dropped during import");
            continue;
        };
        let mut edge = (**edge).clone();
        let id = EdgeId::new();
        remap.edges.insert(edge.id, id);
        edge.id = id;
        edge.from = from;
        edge.to = to;
        edges.push(edge);
    }

    (Graph::from_parts(nodes, edges).collapse_binary_edges(), remap)
}

/// The node output that fed an Output node before the wrapper was dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Producer {
    /// Producing node
    pub node: NodeId,
    /// Output handle on the producing node
    pub output: HandleId,
}

/// An incoming graph ready to be merged
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    /// Content nodes and edges with fresh ids, translated and grouped
    pub graph: Graph,
    /// Group every content node was tagged with
    pub group_id: GroupId,
    /// Id translation from the incoming graph
    pub remap: IdRemap,
    /// Producer of the fragment output
    pub fragment: Option<Producer>,
    /// Producer of the vertex output
    pub vertex: Option<Producer>,
}

/// Regenerate ids, expand uniforms, drop Output nodes and move the content
/// so its output-producing node sits at `anchor`.
pub fn prepare_import(incoming: &Graph, anchor: Position, layout: &UniformLayout) -> PreparedGraph {
    let (graph, remap) = regenerate_ids(incoming);
    let graph = expand_graph_uniforms(&graph, layout);

    let mut fragment = None;
    let mut vertex = None;
    let mut outputs = HashSet::new();
    for output in graph.output_nodes() {
        outputs.insert(output.id);
        let Some(edge) = graph.inbound_edges(output.id).find(|e| !e.is_link()) else {
            continue;
        };
        let producer = Producer {
            node: edge.from,
            output: edge.output.clone(),
        };
        match output.stage {
            Some(ShaderStage::Vertex) => vertex = vertex.or(Some(producer)),
            Some(ShaderStage::Fragment) | None => fragment = fragment.or(Some(producer)),
        }
    }
    let graph = graph.remove_nodes(&outputs);

    let origin = fragment
        .as_ref()
        .or(vertex.as_ref())
        .and_then(|p| graph.node(p.node))
        .or_else(|| graph.nodes().next())
        .map(|n| n.position)
        .unwrap_or_default();
    let delta = origin.delta_to(anchor);

    let group_id = GroupId::new();
    let nodes: Vec<_> = graph
        .nodes()
        .map(|node| {
            let mut node = (**node).clone();
            node.position = node.position.translated(delta);
            node.group_id = Some(group_id);
            node
        })
        .collect();
    let edges: Vec<_> = graph.edges().map(|e| (**e).clone()).collect();

    PreparedGraph {
        graph: Graph::from_parts(nodes, edges),
        group_id,
        remap,
        fragment,
        vertex,
    }
}

/// Result of a splice
#[derive(Debug, Clone)]
pub struct SpliceOutcome {
    /// The new graph
    pub graph: Graph,
    /// Group the imported nodes were tagged with
    pub group_id: GroupId,
    /// Id translation from the incoming graph
    pub remap: IdRemap,
    /// Nodes removed from the old graph
    pub removed: Vec<NodeId>,
    /// Downstream edges now fed by the imported content
    pub reconnected: Vec<EdgeId>,
}

/// Replace a node, its exclusive data feeders and its linked partner with
/// an incoming graph.
///
/// The incoming fragment producer takes over the input the replaced fragment
/// node used to write, and likewise for the vertex stage. A stage without an
/// incoming producer is left disconnected.
pub fn replace_node(
    graph: &Graph,
    target: NodeId,
    incoming: &Graph,
    layout: &UniformLayout,
) -> Result<SpliceOutcome, SpliceError> {
    let node = graph.node(target).ok_or(SpliceError::NodeNotFound(target))?;
    if node.is_output() {
        tracing::warn!(node = %target, "output nodes cannot be replaced");
        return Err(SpliceError::OutputNotReplaceable(target));
    }

    let tree = find_node_and_data(graph, target);
    let (fragment_node, vertex_node) = match node.stage {
        Some(ShaderStage::Vertex) => (tree.linked_fragment_node.clone(), Some(Arc::clone(node))),
        Some(ShaderStage::Fragment) | None => {
            (Some(Arc::clone(node)), tree.linked_vertex_node.clone())
        }
    };
    let downstream = |stage_node: Option<Arc<Node>>| {
        stage_node.and_then(|n| graph.outbound_edges(n.id).find(|e| !e.is_link()).cloned())
    };
    let fragment_edge = downstream(fragment_node);
    let vertex_edge = downstream(vertex_node);

    let prepared = prepare_import(incoming, node.position, layout);
    let mut next = graph.merge(&prepared.graph);

    // The old downstream edges are rerouted rather than replaced so they keep
    // their slot in the edge order, and with it their letter on a variadic
    // target.
    let mut reconnected = Vec::new();
    for (producer, old) in [
        (&prepared.fragment, fragment_edge),
        (&prepared.vertex, vertex_edge),
    ] {
        let (Some(producer), Some(old)) = (producer, old) else {
            continue;
        };
        if tree.contains_node(old.to) {
            tracing::warn!(node = %old.to, "downstream target is being removed, not reconnected");
            continue;
        }
        next = next.reroute_edge(old.id, producer.node, producer.output.clone());
        reconnected.push(old.id);
    }

    let removed_edges: HashSet<EdgeId> = tree
        .edge_ids()
        .into_iter()
        .filter(|id| !reconnected.contains(id))
        .collect();
    let next = next
        .remove_edges(&removed_edges)
        .remove_nodes(&tree.node_ids());

    tracing::debug!(
        node = %target,
        removed = tree.nodes.len(),
        imported = prepared.graph.node_count(),
        "replaced node"
    );

    Ok(SpliceOutcome {
        graph: next,
        group_id: prepared.group_id,
        remap: prepared.remap,
        removed: tree.nodes.keys().copied().collect(),
        reconnected,
    })
}

/// Add an incoming graph at `at` without touching existing nodes
pub fn import_graph(
    graph: &Graph,
    incoming: &Graph,
    at: Position,
    layout: &UniformLayout,
) -> SpliceOutcome {
    let prepared = prepare_import(incoming, at, layout);
    tracing::debug!(imported = prepared.graph.node_count(), "imported graph");
    SpliceOutcome {
        graph: graph.merge(&prepared.graph),
        group_id: prepared.group_id,
        remap: prepared.remap,
        removed: Vec::new(),
        reconnected: Vec::new(),
    }
}

/// Error when splicing a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpliceError {
    /// Node to replace not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Output nodes anchor the graph and cannot be replaced
    #[error("Output node {0} cannot be replaced")]
    OutputNotReplaceable(NodeId),
}
