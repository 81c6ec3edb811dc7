// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph edits requested by the visual editor.
//!
//! Each UI action becomes one [`GraphEdit`], applied by
//! [`EditorSession::apply`](crate::session::EditorSession::apply).

use lumen_editor_graph::node::NodeConfig;
use lumen_editor_graph::{DataValue, Edge, EdgeId, Graph, HandleId, Node, NodeId, Position};
use serde::{Deserialize, Serialize};

/// How much of the graph a delete takes with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeleteMode {
    /// The node, its linked partner and the data nodes only they use
    #[default]
    NodeAndData,
    /// The node, its linked partner and everything feeding them
    Tree,
}

/// What an edit changes, as far as compiling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditImpact {
    /// Nodes or edges were added or removed
    Structural,
    /// A node's configuration changed
    Config,
    /// A data node's value changed; the renderer rebinds the uniform
    Value,
    /// Only positions changed
    Layout,
}

impl EditImpact {
    /// Check whether the graph must be compiled again
    pub fn needs_compile(&self) -> bool {
        matches!(self, EditImpact::Structural | EditImpact::Config)
    }
}

/// A mutation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GraphEdit {
    /// Add a node and expand its uniforms
    AddNode {
        /// Node to add
        node: Node,
    },
    /// Connect two handles after validating them
    Connect {
        /// Source node
        from: NodeId,
        /// Output handle
        output: HandleId,
        /// Target node
        to: NodeId,
        /// Input handle
        input: HandleId,
    },
    /// Add a prepared edge as is
    AddEdge {
        /// Edge to add
        edge: Edge,
    },
    /// Remove edges
    RemoveEdges {
        /// Edges to remove
        edges: Vec<EdgeId>,
    },
    /// Delete a node together with its closure
    DeleteNode {
        /// Node to delete
        node: NodeId,
        /// Closure to delete with it
        mode: DeleteMode,
    },
    /// Replace a node's configuration
    UpdateConfig {
        /// Node to update
        node: NodeId,
        /// New configuration
        config: NodeConfig,
    },
    /// Change the value of a data node
    SetDataValue {
        /// Data node
        node: NodeId,
        /// New value
        value: DataValue,
    },
    /// Move nodes on the canvas
    MoveNodes {
        /// New positions
        moves: Vec<(NodeId, Position)>,
    },
    /// Replace a node with a pre-authored graph
    ReplaceNode {
        /// Node to replace
        node: NodeId,
        /// Incoming graph
        incoming: Graph,
    },
    /// Drop a pre-authored graph onto the canvas
    ImportGraph {
        /// Incoming graph
        incoming: Graph,
        /// Drop position
        at: Position,
    },
    /// Prune dangling edges
    AttemptFix,
}

impl GraphEdit {
    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            GraphEdit::AddNode { .. } => "Add Node",
            GraphEdit::Connect { .. } => "Connect",
            GraphEdit::AddEdge { .. } => "Add Edge",
            GraphEdit::RemoveEdges { .. } => "Remove Edges",
            GraphEdit::DeleteNode {
                mode: DeleteMode::NodeAndData,
                ..
            } => "Delete Node",
            GraphEdit::DeleteNode {
                mode: DeleteMode::Tree,
                ..
            } => "Delete Tree",
            GraphEdit::UpdateConfig { .. } => "Update Config",
            GraphEdit::SetDataValue { .. } => "Set Value",
            GraphEdit::MoveNodes { .. } => "Move Nodes",
            GraphEdit::ReplaceNode { .. } => "Replace Node",
            GraphEdit::ImportGraph { .. } => "Import Graph",
            GraphEdit::AttemptFix => "Attempt Fix",
        }
    }

    /// Classify the edit for the compile scheduler
    pub fn impact(&self) -> EditImpact {
        match self {
            GraphEdit::UpdateConfig { .. } => EditImpact::Config,
            GraphEdit::SetDataValue { .. } => EditImpact::Value,
            GraphEdit::MoveNodes { .. } => EditImpact::Layout,
            _ => EditImpact::Structural,
        }
    }
}
