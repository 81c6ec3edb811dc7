// SPDX-License-Identifier: MIT OR Apache-2.0
//! Small graph builders shared by unit tests.

use crate::constructors::{binary_node, number_node, output_node, OUT};
use crate::edge::{Edge, EdgeKind};
use crate::node::{BinaryOperator, Node, NodeId, NodeType, Position, ShaderStage};
use crate::port::{NodeInput, NodeOutput};

pub(crate) fn number(name: &str) -> Node {
    number_node(NodeId::new(), name, Position::default(), "1.0")
}

pub(crate) fn binary() -> Node {
    binary_node(NodeId::new(), "Add", BinaryOperator::Add, Position::default())
}

pub(crate) fn output(stage: ShaderStage) -> Node {
    output_node(NodeId::new(), "Output", Position::default(), stage)
}

/// Source node with the given input handles and an `out` output
pub(crate) fn source(stage: Option<ShaderStage>, inputs: &[&str]) -> Node {
    Node::new(NodeId::new(), "Shader", NodeType::Source)
        .with_stage(stage)
        .with_inputs(inputs.iter().map(|i| NodeInput::new(*i, *i)).collect())
        .with_outputs(vec![NodeOutput::new(OUT, "Out")])
}

/// Data edge from `from.out` to `to.input`
pub(crate) fn wire(from: &Node, to: &Node, input: &str) -> Edge {
    Edge::new(from.id, OUT, to.id, input, EdgeKind::for_stage(to.stage))
}

/// Data edge from a specific output handle
pub(crate) fn wire_from(from: &Node, output: &str, to: &Node, input: &str) -> Edge {
    Edge::new(from.id, output, to.id, input, EdgeKind::for_stage(to.stage))
}
