// SPDX-License-Identifier: MIT OR Apache-2.0
//! The canonical shader graph and its invariant-preserving mutators.
//!
//! Every mutator takes `&self` and returns a new [`Graph`]. Nodes and edges
//! are shared behind [`Arc`], so a mutation only reallocates what it touches
//! and the flow projection can diff with [`Arc::ptr_eq`].
//!
//! Invariants kept by the mutators:
//! - at most one edge ends at a given `(node, input)` pair;
//! - at most one edge starts at a given `(node, output)` pair (outputs do not
//!   fan out);
//! - the inputs of a variadic node are the contiguous run `a, b, c, ...`;
//! - a vertex node has at most one next-stage link, and so does a fragment
//!   node. Links are ignored by the two handle rules above.

use crate::arity::{self, variadic_handles};
use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::node::{Node, NodeId};
use crate::port::{HandleId, NodeInput};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A shader graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphData", into = "GraphData")]
pub struct Graph {
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Arc<Node>>,
    /// Edges in order; variadic inputs are lettered by this order
    edges: IndexMap<EdgeId, Arc<Edge>>,
}

/// Serialized form of a [`Graph`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl From<GraphData> for Graph {
    fn from(data: GraphData) -> Self {
        Graph::from_parts(data.nodes, data.edges).collapse_binary_edges()
    }
}

impl From<Graph> for GraphData {
    fn from(graph: Graph) -> Self {
        GraphData {
            nodes: graph.nodes.into_values().map(Arc::unwrap_or_clone).collect(),
            edges: graph.edges.into_values().map(Arc::unwrap_or_clone).collect(),
        }
    }
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw parts without normalizing anything
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, Arc::new(n))).collect(),
            edges: edges.into_iter().map(|e| (e.id, Arc::new(e))).collect(),
        }
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(&node_id)
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Arc<Edge>> {
        self.edges.get(&edge_id)
    }

    /// Check whether a node exists
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values()
    }

    /// Get all edges in order
    pub fn edges(&self) -> impl Iterator<Item = &Arc<Edge>> {
        self.edges.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges ending at a node, links included
    pub fn inbound_edges(&self, node_id: NodeId) -> impl Iterator<Item = &Arc<Edge>> {
        self.edges.values().filter(move |e| e.to == node_id)
    }

    /// Edges starting at a node, links included
    pub fn outbound_edges(&self, node_id: NodeId) -> impl Iterator<Item = &Arc<Edge>> {
        self.edges.values().filter(move |e| e.from == node_id)
    }

    /// The data edge writing a given input
    pub fn edge_into(&self, node_id: NodeId, input: &HandleId) -> Option<&Arc<Edge>> {
        self.edges
            .values()
            .find(|e| !e.is_link() && e.to == node_id && e.input == *input)
    }

    /// Stage output nodes
    pub fn output_nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values().filter(|n| n.is_output())
    }

    /// Insert or replace a node
    #[must_use]
    pub fn with_node(&self, node: Node) -> Graph {
        self.with_nodes([node])
    }

    /// Insert or replace several nodes
    #[must_use]
    pub fn with_nodes(&self, nodes: impl IntoIterator<Item = Node>) -> Graph {
        let mut next = self.clone();
        for node in nodes {
            next.nodes.insert(node.id, Arc::new(node));
        }
        next.collapse_binary_edges()
    }

    /// Add an edge, replacing whatever it conflicts with.
    ///
    /// The edge currently writing `(edge.to, edge.input)` and the edge
    /// currently reading `(edge.from, edge.output)` are both removed before the
    /// new edge is appended. A link replaces the previous link of either
    /// endpoint instead. Variadic inputs are then renumbered.
    #[must_use]
    pub fn add_edge(&self, edge: Edge) -> Graph {
        let mut next = self.clone();
        if edge.is_link() {
            next.edges
                .retain(|_, e| !(e.is_link() && (e.from == edge.from || e.to == edge.to)));
        } else {
            next.edges.retain(|_, e| {
                e.is_link()
                    || !((e.to == edge.to && e.input == edge.input)
                        || (e.from == edge.from && e.output == edge.output))
            });
        }
        next.edges.shift_remove(&edge.id);
        next.edges.insert(edge.id, Arc::new(edge));
        next.collapse_binary_edges()
    }

    /// Apply a partial update to one node.
    ///
    /// Only the updated node is reallocated; unknown ids leave the graph as is.
    #[must_use]
    pub fn update_node(&self, node_id: NodeId, update: impl FnOnce(&mut Node)) -> Graph {
        let mut next = self.clone();
        match next.nodes.get_mut(&node_id) {
            Some(node) => update(Arc::make_mut(node)),
            None => tracing::warn!(node = %node_id, "update of unknown node ignored"),
        }
        next
    }

    /// Remove nodes together with every edge touching them
    #[must_use]
    pub fn remove_nodes(&self, node_ids: &HashSet<NodeId>) -> Graph {
        let mut next = self.clone();
        next.nodes.retain(|id, _| !node_ids.contains(id));
        next.edges
            .retain(|_, e| !node_ids.contains(&e.from) && !node_ids.contains(&e.to));
        next.collapse_binary_edges()
    }

    /// Remove edges
    #[must_use]
    pub fn remove_edges(&self, edge_ids: &HashSet<EdgeId>) -> Graph {
        let mut next = self.clone();
        next.edges.retain(|id, _| !edge_ids.contains(id));
        next.collapse_binary_edges()
    }

    /// Move the source end of an edge, keeping its id, input and position in
    /// the edge order.
    ///
    /// Whatever edge already reads `(from_node, output)` is removed first.
    #[must_use]
    pub fn reroute_edge(
        &self,
        edge_id: EdgeId,
        from_node: NodeId,
        output: impl Into<HandleId>,
    ) -> Graph {
        let output = output.into();
        let mut next = self.clone();
        next.edges.retain(|id, e| {
            *id == edge_id || e.is_link() || !(e.from == from_node && e.output == output)
        });
        match next.edges.get_mut(&edge_id) {
            Some(edge) => {
                let edge = Arc::make_mut(edge);
                edge.from = from_node;
                edge.output = output;
            }
            None => tracing::warn!(edge = %edge_id, "reroute of unknown edge ignored"),
        }
        next.collapse_binary_edges()
    }

    /// Union with another graph. Entries of `other` win on id collisions.
    #[must_use]
    pub fn merge(&self, other: &Graph) -> Graph {
        let mut next = self.clone();
        for (id, node) in &other.nodes {
            next.nodes.insert(*id, Arc::clone(node));
        }
        for (id, edge) in &other.edges {
            next.edges.insert(*id, Arc::clone(edge));
        }
        next.collapse_binary_edges()
    }

    /// Connect an output handle to an input handle.
    ///
    /// Both nodes and both handles must exist; a variadic target accepts any
    /// handle because its inputs are renumbered anyway. The edge kind follows
    /// the target's stage, falling back to the source's.
    pub fn connect(
        &self,
        from_node: NodeId,
        output: impl Into<HandleId>,
        to_node: NodeId,
        input: impl Into<HandleId>,
    ) -> Result<Graph, ConnectionError> {
        let output = output.into();
        let input = input.into();

        let source = self
            .nodes
            .get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self
            .nodes
            .get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }
        if source.output(&output).is_none() {
            return Err(ConnectionError::HandleNotFound {
                node: from_node,
                handle: output,
            });
        }
        if !target.is_variadic() && target.input(&input).is_none() {
            return Err(ConnectionError::HandleNotFound {
                node: to_node,
                handle: input,
            });
        }

        let kind = EdgeKind::for_stage(target.stage.or(source.stage));
        Ok(self.add_edge(Edge::new(from_node, output, to_node, input, kind)))
    }

    /// Renumber variadic inputs and keep one free lettered slot on each
    /// variadic node.
    #[must_use]
    pub fn collapse_binary_edges(mut self) -> Graph {
        let variadic: HashSet<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.is_variadic())
            .map(|n| n.id)
            .collect();
        if variadic.is_empty() {
            return self;
        }

        let summary = arity::collapse_edges(self.edges.values_mut(), |id| variadic.contains(id));
        if summary.rewritten > 0 {
            tracing::debug!(rewritten = summary.rewritten, "collapsed variadic inputs");
        }

        for node_id in &variadic {
            let handles = variadic_handles(summary.arity(node_id));
            let Some(node) = self.nodes.get_mut(node_id) else {
                continue;
            };
            if node.inputs.iter().map(|i| &i.id).eq(handles.iter()) {
                continue;
            }
            Arc::make_mut(node).inputs = handles
                .into_iter()
                .map(|h| {
                    let name = h.to_string();
                    NodeInput::new(h, name)
                })
                .collect();
        }

        self
    }
}

/// Error when creating an edge through [`Graph::connect`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Handle not found on the node
    #[error("Handle {handle} not found on node {node}")]
    HandleNotFound {
        /// Node that was searched
        node: NodeId,
        /// Missing handle
        handle: HandleId,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}
