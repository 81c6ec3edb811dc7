// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.

use crate::node::{NodeId, ShaderStage};
use crate::port::HandleId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Output handle used by next-stage link edges
pub const NEXT_STAGE_OUTPUT: &str = "next_stage";
/// Input handle used by next-stage link edges
pub const NEXT_STAGE_INPUT: &str = "previous_stage";

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which flow an edge belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Plain data edge
    #[default]
    Data,
    /// Edge inside the vertex stage
    Vertex,
    /// Edge inside the fragment stage
    Fragment,
    /// Link from a vertex node to its paired fragment node.
    ///
    /// Links are not data flow and do not count toward handle invariants.
    NextStage,
}

impl EdgeKind {
    /// Edge kind for a data edge feeding a node of `stage`
    pub fn for_stage(stage: Option<ShaderStage>) -> Self {
        match stage {
            Some(ShaderStage::Vertex) => Self::Vertex,
            Some(ShaderStage::Fragment) => Self::Fragment,
            None => Self::Data,
        }
    }
}

/// A directed edge from an output handle to an input handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source node
    pub from: NodeId,
    /// Target node
    pub to: NodeId,
    /// Output handle on the source node
    pub output: HandleId,
    /// Input handle on the target node
    pub input: HandleId,
    /// Flow the edge belongs to
    #[serde(default, rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a new edge with a fresh id
    pub fn new(
        from: NodeId,
        output: impl Into<HandleId>,
        to: NodeId,
        input: impl Into<HandleId>,
        kind: EdgeKind,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
            output: output.into(),
            input: input.into(),
            kind,
        }
    }

    /// Create the next-stage link between a vertex node and its fragment node
    pub fn link(vertex: NodeId, fragment: NodeId) -> Self {
        Self::new(
            vertex,
            NEXT_STAGE_OUTPUT,
            fragment,
            NEXT_STAGE_INPUT,
            EdgeKind::NextStage,
        )
    }

    /// Is this a next-stage link
    pub fn is_link(&self) -> bool {
        self.kind == EdgeKind::NextStage
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from == node_id || self.to == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_edges_are_marked() {
        let vertex = NodeId::new();
        let fragment = NodeId::new();
        let link = Edge::link(vertex, fragment);
        assert!(link.is_link());
        assert!(link.involves_node(vertex));
        assert!(link.involves_node(fragment));
        assert!(!Edge::new(vertex, "out", fragment, "a", EdgeKind::Data).is_link());
    }

    #[test]
    fn kind_follows_stage() {
        assert_eq!(EdgeKind::for_stage(Some(ShaderStage::Vertex)), EdgeKind::Vertex);
        assert_eq!(EdgeKind::for_stage(None), EdgeKind::Data);
    }
}
