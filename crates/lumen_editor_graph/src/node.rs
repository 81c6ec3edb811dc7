// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the shader graph.

use crate::port::{DataType, DataValue, HandleId, NodeInput, NodeOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cosmetic group tag shared by every node imported in one splice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shader stage a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

/// Position on the editor canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Position {
    /// Create a new position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Offset that moves `self` onto `target`
    pub fn delta_to(&self, target: Position) -> Position {
        Position::new(target.x - self.x, target.y - self.y)
    }

    /// Translate by an offset
    pub fn translated(&self, delta: Position) -> Position {
        Position::new(self.x + delta.x, self.y + delta.y)
    }
}

/// Operator applied by a variadic binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `a + b + ...`
    #[serde(rename = "+")]
    Add,
    /// `a - b - ...`
    #[serde(rename = "-")]
    Subtract,
    /// `a * b * ...`
    #[serde(rename = "*")]
    Multiply,
    /// `a / b / ...`
    #[serde(rename = "/")]
    Divide,
}

impl BinaryOperator {
    /// GLSL operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

/// What kind of node this is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeType {
    /// Final output of a stage. Structural anchor, never replaced by a splice.
    Output,
    /// Shader source code fragment
    Source,
    /// Operator whose arity follows its connected edges
    Binary {
        /// Operator joining the inputs
        operator: BinaryOperator,
    },
    /// Constant leaf
    Data {
        /// Current value
        value: DataValue,
    },
}

/// Material property a source node exposes as an input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProperty {
    /// Display name
    pub name: String,
    /// Engine property name (`map`, `roughness`)
    pub property: String,
    /// Property type
    pub data_type: DataType,
}

/// Uniform declared by a source node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformDefinition {
    /// GLSL uniform name
    pub name: String,
    /// Initial value, which also decides the data node type
    pub value: DataValue,
}

impl UniformDefinition {
    /// Create a new uniform declaration
    pub fn new(name: impl Into<String>, value: DataValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Per-node configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// GLSL source for source nodes
    pub source: String,
    /// Material properties exposed as inputs
    pub properties: Vec<NodeProperty>,
    /// Uniforms expanded into standalone data nodes
    pub uniforms: Vec<UniformDefinition>,
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Node kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Stage, if the node belongs to one
    #[serde(default)]
    pub stage: Option<ShaderStage>,
    /// Input handles
    #[serde(default)]
    pub inputs: Vec<NodeInput>,
    /// Output handles
    #[serde(default)]
    pub outputs: Vec<NodeOutput>,
    /// Position in the graph UI
    #[serde(default)]
    pub position: Position,
    /// Configuration
    #[serde(default)]
    pub config: NodeConfig,
    /// Group assigned when the node was spliced in
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl Node {
    /// Create a node with no handles at the origin
    pub fn new(id: NodeId, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id,
            name: name.into(),
            node_type,
            stage: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            position: Position::default(),
            config: NodeConfig::default(),
            group_id: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Set the stage
    pub fn with_stage(mut self, stage: Option<ShaderStage>) -> Self {
        self.stage = stage;
        self
    }

    /// Set the input handles
    pub fn with_inputs(mut self, inputs: Vec<NodeInput>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the output handles
    pub fn with_outputs(mut self, outputs: Vec<NodeOutput>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the configuration
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Get an input handle by id
    pub fn input(&self, id: &HandleId) -> Option<&NodeInput> {
        self.inputs.iter().find(|i| i.id == *id)
    }

    /// Get an output handle by id
    pub fn output(&self, id: &HandleId) -> Option<&NodeOutput> {
        self.outputs.iter().find(|o| o.id == *id)
    }

    /// Is this a constant data node
    pub fn is_data(&self) -> bool {
        matches!(self.node_type, NodeType::Data { .. })
    }

    /// Is this a stage output node
    pub fn is_output(&self) -> bool {
        matches!(self.node_type, NodeType::Output)
    }

    /// Does this node's arity follow its inbound edges
    pub fn is_variadic(&self) -> bool {
        matches!(self.node_type, NodeType::Binary { .. })
    }

    /// Value of a data node
    pub fn data_value(&self) -> Option<&DataValue> {
        match &self.node_type {
            NodeType::Data { value } => Some(value),
            _ => None,
        }
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Stage outputs
    Output,
    /// Constants and uniforms
    Data,
    /// Operators
    Math,
    /// Engine materials and shader sources
    Source,
}

/// Constructor invoked by [`NodeRegistry::create_node`]
pub type NodeConstructor =
    Box<dyn Fn(NodeId, &str, Position, Option<ShaderStage>) -> Node + Send + Sync>;

/// Registered node type
pub struct NodeTemplate {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    constructor: NodeConstructor,
}

impl NodeTemplate {
    /// Create a template around a constructor
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
        description: impl Into<String>,
        constructor: impl Fn(NodeId, &str, Position, Option<ShaderStage>) -> Node
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: description.into(),
            constructor: Box::new(constructor),
        }
    }
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Registry of node constructors an engine makes available
#[derive(Debug)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: indexmap::IndexMap<String, NodeTemplate>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, template: NodeTemplate) {
        self.types.insert(template.id.clone(), template);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeTemplate> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeTemplate> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a fresh node from a type ID
    pub fn create_node(
        &self,
        type_id: &str,
        position: Position,
        stage: Option<ShaderStage>,
    ) -> Option<Node> {
        self.get(type_id)
            .map(|t| (t.constructor)(NodeId::new(), &t.name, position, stage))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_delta_round_trips() {
        let from = Position::new(10.0, -5.0);
        let to = Position::new(-30.0, 20.0);
        assert_eq!(from.translated(from.delta_to(to)), to);
    }

    #[test]
    fn binary_operator_serializes_as_symbol() {
        let json = serde_json::to_string(&NodeType::Binary {
            operator: BinaryOperator::Multiply,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"binary","operator":"*"}"#);
    }

    #[test]
    fn registry_creates_fresh_ids() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeTemplate::new(
            "source",
            "Source",
            NodeCategory::Source,
            "Raw shader source",
            |id, name, position, stage| {
                Node::new(id, name, NodeType::Source)
                    .with_position(position)
                    .with_stage(stage)
            },
        ));

        let a = registry
            .create_node("source", Position::new(1.0, 2.0), Some(ShaderStage::Fragment))
            .unwrap();
        let b = registry
            .create_node("source", Position::default(), None)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.position, Position::new(1.0, 2.0));
        assert_eq!(a.stage, Some(ShaderStage::Fragment));
        assert!(registry.create_node("missing", Position::default(), None).is_none());
        assert_eq!(registry.types_in_category(NodeCategory::Source).count(), 1);
    }
}
