// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow projection: the positioned, UI-facing mirror of a [`Graph`].
//!
//! The projection is derived from the canonical graph and never edited
//! independently, except for UI-only state such as selection and for edge
//! patches that are mirrored onto the graph in the same step.

use crate::arity::{self, ArityEdge};
use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::graph::Graph;
use crate::node::{GroupId, Node, NodeId, Position, ShaderStage};
use crate::port::{DataType, HandleId};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// A handle as the renderer draws it
#[derive(Debug, Clone, PartialEq)]
pub struct FlowHandle {
    /// Handle id
    pub id: HandleId,
    /// Label
    pub name: String,
    /// Declared data type
    pub data_type: Option<DataType>,
}

/// Render data of a flow node
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNodeData {
    /// Label
    pub label: String,
    /// Stage
    pub stage: Option<ShaderStage>,
    /// Whether inputs are renumbered on connect
    pub variadic: bool,
    /// Input handles
    pub inputs: Vec<FlowHandle>,
    /// Output handles
    pub outputs: Vec<FlowHandle>,
    /// Splice group
    pub group_id: Option<GroupId>,
}

/// A positioned node in the projection
#[derive(Debug, Clone)]
pub struct FlowNode {
    /// Same id as the backing graph node
    pub id: NodeId,
    /// Canvas position
    pub position: Position,
    /// Render data
    pub data: FlowNodeData,
    /// UI selection state
    pub selected: bool,
    source: Arc<Node>,
}

impl FlowNode {
    /// Project a graph node
    pub fn from_node(node: &Arc<Node>) -> Self {
        let inputs = node
            .inputs
            .iter()
            .map(|i| FlowHandle {
                id: i.id.clone(),
                name: i.name.clone(),
                data_type: i.data_type,
            })
            .collect();
        let outputs = node
            .outputs
            .iter()
            .map(|o| FlowHandle {
                id: o.id.clone(),
                name: o.name.clone(),
                data_type: o.data_type,
            })
            .collect();

        Self {
            id: node.id,
            position: node.position,
            data: FlowNodeData {
                label: node.name.clone(),
                stage: node.stage,
                variadic: node.is_variadic(),
                inputs,
                outputs,
                group_id: node.group_id,
            },
            selected: false,
            source: Arc::clone(node),
        }
    }

    /// Check whether this flow node was projected from exactly `node`
    pub fn is_projection_of(&self, node: &Arc<Node>) -> bool {
        Arc::ptr_eq(&self.source, node)
    }
}

/// An edge in the projection
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    /// Same id as the backing graph edge
    pub id: EdgeId,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Output handle on the source node
    pub source_handle: HandleId,
    /// Input handle on the target node
    pub target_handle: HandleId,
    /// Flow the edge belongs to
    pub kind: EdgeKind,
}

impl From<&Edge> for FlowEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id,
            source: edge.from,
            target: edge.to,
            source_handle: edge.output.clone(),
            target_handle: edge.input.clone(),
            kind: edge.kind,
        }
    }
}

impl ArityEdge for FlowEdge {
    type Key = NodeId;

    fn target(&self) -> &NodeId {
        &self.target
    }

    fn target_handle(&self) -> &HandleId {
        &self.target_handle
    }

    fn set_target_handle(&mut self, handle: HandleId) {
        self.target_handle = handle;
    }

    fn is_link(&self) -> bool {
        self.kind == EdgeKind::NextStage
    }
}

/// How much of the previous projection a sync could keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Flow nodes carried over unchanged
    pub reused: usize,
    /// Flow nodes projected again
    pub rebuilt: usize,
    /// Flow nodes whose graph node is gone
    pub dropped: usize,
}

/// The projection of a whole graph
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: IndexMap<NodeId, Arc<FlowNode>>,
    edges: IndexMap<EdgeId, FlowEdge>,
}

impl FlowGraph {
    /// Project a graph from scratch
    pub fn from_graph(graph: &Graph) -> Self {
        FlowGraph::default().sync(graph).0
    }

    /// Project `graph`, reusing flow nodes whose graph node did not change.
    ///
    /// Selection carries over for every node that still exists.
    pub fn sync(&self, graph: &Graph) -> (FlowGraph, SyncStats) {
        let mut stats = SyncStats::default();
        let mut nodes = IndexMap::with_capacity(graph.node_count());
        for node in graph.nodes() {
            let flow = match self.nodes.get(&node.id) {
                Some(previous) if previous.is_projection_of(node) => {
                    stats.reused += 1;
                    Arc::clone(previous)
                }
                previous => {
                    stats.rebuilt += 1;
                    let mut flow = FlowNode::from_node(node);
                    flow.selected = previous.is_some_and(|p| p.selected);
                    Arc::new(flow)
                }
            };
            nodes.insert(node.id, flow);
        }
        stats.dropped = self
            .nodes
            .keys()
            .filter(|id| !graph.contains_node(**id))
            .count();

        let mut next = FlowGraph {
            nodes,
            edges: graph.edges().map(|e| (e.id, FlowEdge::from(&**e))).collect(),
        };
        next.collapse();

        tracing::trace!(
            reused = stats.reused,
            rebuilt = stats.rebuilt,
            dropped = stats.dropped,
            "synced flow projection"
        );
        (next, stats)
    }

    /// Add an edge with the same replacement rules as [`Graph::add_edge`]
    #[must_use]
    pub fn add_edge(&self, edge: FlowEdge) -> FlowGraph {
        let mut next = self.clone();
        if edge.is_link() {
            next.edges.retain(|_, e| {
                !(e.is_link() && (e.source == edge.source || e.target == edge.target))
            });
        } else {
            next.edges.retain(|_, e| {
                e.is_link()
                    || !((e.target == edge.target && e.target_handle == edge.target_handle)
                        || (e.source == edge.source && e.source_handle == edge.source_handle))
            });
        }
        next.edges.shift_remove(&edge.id);
        next.edges.insert(edge.id, edge);
        next.collapse();
        next
    }

    /// Remove edges and renumber variadic inputs
    #[must_use]
    pub fn remove_edges(&self, edge_ids: &HashSet<EdgeId>) -> FlowGraph {
        let mut next = self.clone();
        next.edges.retain(|id, _| !edge_ids.contains(id));
        next.collapse();
        next
    }

    /// Renumber variadic inputs and resize their handle lists to match
    fn collapse(&mut self) {
        let nodes = &self.nodes;
        let summary = arity::collapse_edges(self.edges.values_mut(), |id| {
            nodes.get(id).is_some_and(|n| n.data.variadic)
        });

        for node in self.nodes.values_mut().filter(|n| n.data.variadic) {
            let handles = arity::variadic_handles(summary.arity(&node.id));
            if node.data.inputs.iter().map(|h| &h.id).eq(handles.iter()) {
                continue;
            }
            Arc::make_mut(node).data.inputs = handles
                .into_iter()
                .map(|id| FlowHandle {
                    name: id.to_string(),
                    id,
                    data_type: None,
                })
                .collect();
        }
    }

    /// Get a flow node
    pub fn node(&self, node_id: NodeId) -> Option<&FlowNode> {
        self.nodes.get(&node_id).map(|n| &**n)
    }

    /// Get a flow edge
    pub fn edge(&self, edge_id: EdgeId) -> Option<&FlowEdge> {
        self.edges.get(&edge_id)
    }

    /// Flow nodes in graph order
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.nodes.values().map(|n| &**n)
    }

    /// Flow edges in graph order
    pub fn edges(&self) -> impl Iterator<Item = &FlowEdge> {
        self.edges.values()
    }

    /// Check whether a node is projected
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Check whether an edge is projected
    pub fn contains_edge(&self, edge_id: EdgeId) -> bool {
        self.edges.contains_key(&edge_id)
    }

    /// Number of flow nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of flow edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check whether an input handle has an edge drawn into it
    pub fn is_connected(&self, node_id: NodeId, handle: &HandleId) -> bool {
        self.edges
            .values()
            .any(|e| !e.is_link() && e.target == node_id && e.target_handle == *handle)
    }

    /// Set the selection state of one node
    pub fn select_node(&mut self, node_id: NodeId, selected: bool) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            if node.selected != selected {
                Arc::make_mut(node).selected = selected;
            }
        }
    }

    /// Deselect every node
    pub fn clear_selection(&mut self) {
        for node in self.nodes.values_mut() {
            if node.selected {
                Arc::make_mut(node).selected = false;
            }
        }
    }

    /// Ids of the selected nodes
    pub fn selected_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|n| n.selected).map(|n| n.id)
    }
}

/// Write positions reported by the visual layer back to the graph
#[must_use]
pub fn apply_positions(graph: &Graph, moves: &[(NodeId, Position)]) -> Graph {
    moves.iter().fold(graph.clone(), |g, (id, position)| {
        g.update_node(*id, |n| n.position = *position)
    })
}
