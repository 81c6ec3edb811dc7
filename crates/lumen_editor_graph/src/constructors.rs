// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node constructors and the default node registry.
//!
//! Engines register their own material nodes on top of [`core_registry`];
//! the uniform expander uses [`data_node`] to build one constant leaf per
//! declared uniform.

use crate::node::{
    BinaryOperator, Node, NodeCategory, NodeConfig, NodeId, NodeProperty, NodeRegistry,
    NodeTemplate, NodeType, Position, ShaderStage,
};
use crate::port::{DataType, DataValue, HandleId, NodeInput, NodeOutput};

/// Output handle of data, binary and source nodes
pub const OUT: &str = "out";
/// Input of a fragment output node
pub const FRAGMENT_OUTPUT_INPUT: &str = "color";
/// Input of a vertex output node
pub const VERTEX_OUTPUT_INPUT: &str = "position";

/// Stage output node
pub fn output_node(id: NodeId, name: &str, position: Position, stage: ShaderStage) -> Node {
    let input = match stage {
        ShaderStage::Fragment => {
            NodeInput::new(FRAGMENT_OUTPUT_INPUT, "Color").with_type(DataType::Vector4)
        }
        ShaderStage::Vertex => {
            NodeInput::new(VERTEX_OUTPUT_INPUT, "Position").with_type(DataType::Vector3)
        }
    };
    Node::new(id, name, NodeType::Output)
        .with_position(position)
        .with_stage(Some(stage))
        .with_inputs(vec![input])
}

/// Raw GLSL source node
pub fn source_node(
    id: NodeId,
    name: &str,
    position: Position,
    stage: Option<ShaderStage>,
    source: impl Into<String>,
) -> Node {
    Node::new(id, name, NodeType::Source)
        .with_position(position)
        .with_stage(stage)
        .with_outputs(vec![NodeOutput::new(OUT, "Out")])
        .with_config(NodeConfig {
            source: source.into(),
            ..NodeConfig::default()
        })
}

/// Engine material node exposing its properties as inputs
pub fn material_node(
    id: NodeId,
    name: &str,
    position: Position,
    stage: Option<ShaderStage>,
    properties: Vec<NodeProperty>,
) -> Node {
    let inputs = properties
        .iter()
        .map(|p| NodeInput::property(p.name.clone(), &p.property, p.data_type))
        .collect();
    Node::new(id, name, NodeType::Source)
        .with_position(position)
        .with_stage(stage)
        .with_inputs(inputs)
        .with_outputs(vec![NodeOutput::new(OUT, "Out")])
        .with_config(NodeConfig {
            properties,
            ..NodeConfig::default()
        })
}

/// Variadic operator node, starting with two free inputs
pub fn binary_node(id: NodeId, name: &str, operator: BinaryOperator, position: Position) -> Node {
    Node::new(id, name, NodeType::Binary { operator })
        .with_position(position)
        .with_inputs(vec![NodeInput::new("a", "a"), NodeInput::new("b", "b")])
        .with_outputs(vec![NodeOutput::new(OUT, "Out")])
}

fn data_leaf(id: NodeId, name: &str, position: Position, value: DataValue) -> Node {
    let output = NodeOutput::new(OUT, value.type_name()).with_type(value.data_type());
    Node::new(id, name, NodeType::Data { value })
        .with_position(position)
        .with_outputs(vec![output])
}

/// Scalar constant
pub fn number_node(id: NodeId, name: &str, position: Position, value: impl Into<String>) -> Node {
    data_leaf(id, name, position, DataValue::Number(value.into()))
}

/// 2D vector constant
pub fn vector2_node(id: NodeId, name: &str, position: Position, value: [String; 2]) -> Node {
    data_leaf(id, name, position, DataValue::Vector2(value))
}

/// 3D vector constant
pub fn vector3_node(id: NodeId, name: &str, position: Position, value: [String; 3]) -> Node {
    data_leaf(id, name, position, DataValue::Vector3(value))
}

/// 4D vector constant
pub fn vector4_node(id: NodeId, name: &str, position: Position, value: [String; 4]) -> Node {
    data_leaf(id, name, position, DataValue::Vector4(value))
}

/// Color constant
pub fn rgb_node(id: NodeId, name: &str, position: Position, value: [f32; 3]) -> Node {
    data_leaf(id, name, position, DataValue::Rgb(value))
}

/// Color constant with alpha
pub fn rgba_node(id: NodeId, name: &str, position: Position, value: [f32; 4]) -> Node {
    data_leaf(id, name, position, DataValue::Rgba(value))
}

/// 2D texture reference
pub fn texture_node(id: NodeId, name: &str, position: Position, asset: impl Into<String>) -> Node {
    data_leaf(id, name, position, DataValue::Texture(asset.into()))
}

/// Cube map reference
pub fn sampler_cube_node(
    id: NodeId,
    name: &str,
    position: Position,
    asset: impl Into<String>,
) -> Node {
    data_leaf(id, name, position, DataValue::SamplerCube(asset.into()))
}

/// Build the data node matching a value's type
pub fn data_node(id: NodeId, name: &str, position: Position, value: DataValue) -> Node {
    match value {
        DataValue::Number(v) => number_node(id, name, position, v),
        DataValue::Vector2(v) => vector2_node(id, name, position, v),
        DataValue::Vector3(v) => vector3_node(id, name, position, v),
        DataValue::Vector4(v) => vector4_node(id, name, position, v),
        DataValue::Rgb(v) => rgb_node(id, name, position, v),
        DataValue::Rgba(v) => rgba_node(id, name, position, v),
        DataValue::Texture(v) => texture_node(id, name, position, v),
        DataValue::SamplerCube(v) => sampler_cube_node(id, name, position, v),
    }
}

/// Default value for a freshly created data node of `data_type`
fn default_value(data_type: DataType) -> DataValue {
    let zero = || "0".to_string();
    match data_type {
        DataType::Float => DataValue::Number("1".to_string()),
        DataType::Vector2 => DataValue::Vector2([zero(), zero()]),
        DataType::Vector3 | DataType::Mat4 => DataValue::Vector3([zero(), zero(), zero()]),
        DataType::Vector4 => DataValue::Vector4([zero(), zero(), zero(), "1".to_string()]),
        DataType::Rgb => DataValue::Rgb([1.0, 1.0, 1.0]),
        DataType::Rgba => DataValue::Rgba([1.0, 1.0, 1.0, 1.0]),
        DataType::Texture => DataValue::Texture(String::new()),
        DataType::SamplerCube => DataValue::SamplerCube(String::new()),
    }
}

/// Handle id of the property input a material property binds to
pub fn property_handle(property: &str) -> HandleId {
    HandleId::property(property)
}

/// Create the node registry with the engine-independent node types
pub fn core_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Output Nodes
    // ========================================================================

    registry.register(NodeTemplate::new(
        "output",
        "Output",
        NodeCategory::Output,
        "Final output of a shader stage",
        |id, name, position, stage| {
            output_node(id, name, position, stage.unwrap_or(ShaderStage::Fragment))
        },
    ));

    // ========================================================================
    // Sources
    // ========================================================================

    registry.register(NodeTemplate::new(
        "source",
        "Source",
        NodeCategory::Source,
        "Raw GLSL source fragment",
        |id, name, position, stage| {
            source_node(id, name, position, stage, "void main() {\n}\n")
        },
    ));

    // ========================================================================
    // Math
    // ========================================================================

    for (type_id, name, operator) in [
        ("add", "Add", BinaryOperator::Add),
        ("subtract", "Subtract", BinaryOperator::Subtract),
        ("multiply", "Multiply", BinaryOperator::Multiply),
        ("divide", "Divide", BinaryOperator::Divide),
    ] {
        registry.register(NodeTemplate::new(
            type_id,
            name,
            NodeCategory::Math,
            format!("Combine any number of inputs with `{}`", operator.symbol()),
            move |id, name, position, _stage| binary_node(id, name, operator, position),
        ));
    }

    // ========================================================================
    // Data
    // ========================================================================

    for (type_id, name, data_type) in [
        ("number", "Number", DataType::Float),
        ("vector2", "Vector2", DataType::Vector2),
        ("vector3", "Vector3", DataType::Vector3),
        ("vector4", "Vector4", DataType::Vector4),
        ("rgb", "Color", DataType::Rgb),
        ("rgba", "Color + Alpha", DataType::Rgba),
        ("texture", "Texture", DataType::Texture),
        ("samplerCube", "Cube Map", DataType::SamplerCube),
    ] {
        registry.register(NodeTemplate::new(
            type_id,
            name,
            NodeCategory::Data,
            format!("Constant {} value", data_type.glsl()),
            move |id, name, position, _stage| {
                data_node(id, name, position, default_value(data_type))
            },
        ));
    }

    registry
}
