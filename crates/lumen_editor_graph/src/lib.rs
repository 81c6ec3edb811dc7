// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader node graph core for Lumen Editor.
//!
//! This crate owns the canonical shader graph and the structural edits the
//! editor performs on it:
//! - Graph model with single-writer inputs and variadic operator nodes
//! - Predicate-driven subgraph search for deletes and replacements
//! - Splicing of pre-authored graphs with id remapping
//! - Uniform expansion into standalone data nodes
//! - The flow projection drawn by the visual editor, and integrity checks
//!
//! ## Architecture
//!
//! [`Graph`] is the single source of truth. Every edit returns a new graph
//! that shares unchanged nodes and edges with the old one; [`FlowGraph`] is
//! re-derived from it and reuses whatever did not change.

pub mod arity;
pub mod constructors;
pub mod edge;
pub mod flow;
pub mod graph;
pub mod integrity;
pub mod node;
pub mod port;
pub mod splice;
pub mod traversal;
pub mod uniforms;

#[cfg(test)]
mod test_support;

pub use edge::{Edge, EdgeId, EdgeKind};
pub use flow::{FlowEdge, FlowGraph, FlowNode, SyncStats};
pub use graph::{ConnectionError, Graph, GraphData};
pub use integrity::{attempt_fix, check_integrity, IntegrityReport};
pub use node::{GroupId, Node, NodeId, NodeRegistry, NodeType, Position, ShaderStage};
pub use port::{DataType, DataValue, HandleId, NodeInput, NodeOutput};
pub use splice::{import_graph, replace_node, IdRemap, SpliceError, SpliceOutcome};
pub use traversal::{find_node_and_data, find_node_tree, SearchResult};
pub use uniforms::{expand_graph_uniforms, expand_node_uniforms, UniformLayout};
