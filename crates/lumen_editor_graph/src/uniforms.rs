// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform expansion.
//!
//! A node whose config declares uniforms gets one standalone data node per
//! uniform, wired into its `uniform_<name>` input. Expansion runs on freshly
//! created nodes and on whole graphs after loading or splicing.

use crate::constructors::{data_node, OUT};
use crate::edge::{Edge, EdgeKind};
use crate::graph::Graph;
use crate::node::{NodeId, Position};
use crate::port::{HandleId, NodeInput};
use serde::{Deserialize, Serialize};

/// Where expanded uniform nodes are placed relative to their parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformLayout {
    /// Horizontal offset from the parent, negative is left
    pub offset_x: f32,
    /// Vertical distance between consecutive uniform nodes
    pub step_y: f32,
}

impl Default for UniformLayout {
    fn default() -> Self {
        Self {
            offset_x: -250.0,
            step_y: 100.0,
        }
    }
}

impl UniformLayout {
    fn place(&self, parent: Position, index: usize) -> Position {
        Position::new(parent.x + self.offset_x, parent.y + index as f32 * self.step_y)
    }
}

/// Expand the declared uniforms of one node.
///
/// Uniforms whose input is already connected are skipped, so expanding the
/// same node twice adds nothing the second time.
#[must_use]
pub fn expand_node_uniforms(graph: &Graph, node_id: NodeId, layout: &UniformLayout) -> Graph {
    let Some(parent) = graph.node(node_id) else {
        tracing::warn!(node = %node_id, "uniform expansion of unknown node skipped");
        return graph.clone();
    };
    if parent.config.uniforms.is_empty() {
        return graph.clone();
    }

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut missing_inputs = Vec::new();
    for (index, uniform) in parent.config.uniforms.iter().enumerate() {
        let handle = HandleId::uniform(&uniform.name);
        if graph.edge_into(node_id, &handle).is_some() {
            continue;
        }
        if parent.input(&handle).is_none() {
            missing_inputs.push(NodeInput::uniform(&uniform.name, uniform.value.data_type()));
        }

        let position = layout.place(parent.position, index);
        let node = data_node(NodeId::new(), &uniform.name, position, uniform.value.clone());
        edges.push(Edge::new(
            node.id,
            OUT,
            node_id,
            handle,
            EdgeKind::for_stage(parent.stage),
        ));
        nodes.push(node);
    }

    if nodes.is_empty() {
        return graph.clone();
    }
    tracing::debug!(node = %node_id, count = nodes.len(), "expanded uniforms");

    let mut next = graph.with_nodes(nodes);
    if !missing_inputs.is_empty() {
        next = next.update_node(node_id, |n| n.inputs.extend(missing_inputs));
    }
    edges.into_iter().fold(next, |g, edge| g.add_edge(edge))
}

/// Expand the uniforms of every node in the graph
#[must_use]
pub fn expand_graph_uniforms(graph: &Graph, layout: &UniformLayout) -> Graph {
    let parents: Vec<NodeId> = graph
        .nodes()
        .filter(|n| !n.config.uniforms.is_empty())
        .map(|n| n.id)
        .collect();
    parents
        .into_iter()
        .fold(graph.clone(), |g, id| expand_node_uniforms(&g, id, layout))
}
