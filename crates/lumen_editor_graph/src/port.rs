// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input/output handles on graph nodes and the values data nodes carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a handle on a node.
///
/// Handles are addressed by name rather than by a random id: edges refer to
/// `"a"`, `"color"` or `"uniform_speed"`, and variadic operator nodes rename
/// their inputs as edges come and go.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub String);

impl HandleId {
    /// Create a handle id from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Handle that receives the uniform `name` on a source node
    pub fn uniform(name: &str) -> Self {
        Self(format!("uniform_{name}"))
    }

    /// Handle that receives the material property `name`
    pub fn property(name: &str) -> Self {
        Self(format!("property_{name}"))
    }

    /// Borrow the raw handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HandleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// GLSL data type flowing through a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// `float`
    Float,
    /// `vec2`
    Vector2,
    /// `vec3`
    Vector3,
    /// `vec4`
    Vector4,
    /// `vec3` interpreted as a color
    Rgb,
    /// `vec4` interpreted as a color with alpha
    Rgba,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Texture,
    /// `samplerCube`
    SamplerCube,
}

impl DataType {
    /// GLSL spelling of the type
    pub fn glsl(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vector2 => "vec2",
            Self::Vector3 | Self::Rgb => "vec3",
            Self::Vector4 | Self::Rgba => "vec4",
            Self::Mat4 => "mat4",
            Self::Texture => "sampler2D",
            Self::SamplerCube => "samplerCube",
        }
    }
}

/// Whether an input accepts a value or replaces a code expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputCategory {
    /// Fed by a data node (uniform, property)
    #[default]
    Data,
    /// Fed by another node's generated code
    Code,
}

/// An input handle on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    /// Handle id referenced by edges
    pub id: HandleId,
    /// Display name
    pub name: String,
    /// Input category
    #[serde(default)]
    pub category: InputCategory,
    /// Declared data type, if known
    #[serde(default)]
    pub data_type: Option<DataType>,
    /// Material property this input binds to
    #[serde(default)]
    pub property: Option<String>,
}

impl NodeInput {
    /// Create a new code input
    pub fn new(id: impl Into<HandleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: InputCategory::Code,
            data_type: None,
            property: None,
        }
    }

    /// Create the input that receives uniform `name`
    pub fn uniform(name: &str, data_type: DataType) -> Self {
        Self {
            id: HandleId::uniform(name),
            name: name.to_string(),
            category: InputCategory::Data,
            data_type: Some(data_type),
            property: None,
        }
    }

    /// Create the input that receives material property `property`
    pub fn property(name: impl Into<String>, property: &str, data_type: DataType) -> Self {
        Self {
            id: HandleId::property(property),
            name: name.into(),
            category: InputCategory::Data,
            data_type: Some(data_type),
            property: Some(property.to_string()),
        }
    }

    /// Set the data type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// An output handle on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Handle id referenced by edges
    pub id: HandleId,
    /// Display name
    pub name: String,
    /// Declared data type, if known
    #[serde(default)]
    pub data_type: Option<DataType>,
}

impl NodeOutput {
    /// Create a new output
    pub fn new(id: impl Into<HandleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: None,
        }
    }

    /// Set the data type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Constant value held by a data node or declared by a uniform.
///
/// Numeric components stay as strings so the user's spelling (`"1.0"`,
/// `"0.5e-2"`) survives into the generated GLSL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum DataValue {
    /// Scalar
    Number(String),
    /// 2D vector
    Vector2([String; 2]),
    /// 3D vector
    Vector3([String; 3]),
    /// 4D vector
    Vector4([String; 4]),
    /// Color
    Rgb([f32; 3]),
    /// Color with alpha
    Rgba([f32; 4]),
    /// 2D texture asset name
    Texture(String),
    /// Cube map asset name
    SamplerCube(String),
}

impl DataValue {
    /// Get the data type for this value
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Number(_) => DataType::Float,
            Self::Vector2(_) => DataType::Vector2,
            Self::Vector3(_) => DataType::Vector3,
            Self::Vector4(_) => DataType::Vector4,
            Self::Rgb(_) => DataType::Rgb,
            Self::Rgba(_) => DataType::Rgba,
            Self::Texture(_) => DataType::Texture,
            Self::SamplerCube(_) => DataType::SamplerCube,
        }
    }

    /// Short lowercase name used for labels
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Vector2(_) => "vector2",
            Self::Vector3(_) => "vector3",
            Self::Vector4(_) => "vector4",
            Self::Rgb(_) => "rgb",
            Self::Rgba(_) => "rgba",
            Self::Texture(_) => "texture",
            Self::SamplerCube(_) => "samplerCube",
        }
    }
}
