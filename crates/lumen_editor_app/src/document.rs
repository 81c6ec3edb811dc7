// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents on disk.

use lumen_editor_graph::Graph;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialization format of a graph document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON, the format shaders are exchanged in
    #[default]
    Json,
}

impl DocumentFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ron" => Some(Self::Ron),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ron => "ron",
            Self::Json => "json",
        }
    }
}

/// Serialize a graph.
///
/// RON documents are written as a plain map tree of the JSON document, since
/// the tagged node and value enums do not survive RON's own enum syntax.
pub fn to_string(graph: &Graph, format: DocumentFormat) -> Result<String, DocumentError> {
    Ok(match format {
        DocumentFormat::Json => serde_json::to_string_pretty(graph)?,
        DocumentFormat::Ron => {
            let tree = serde_json::to_value(graph)?;
            ron::ser::to_string_pretty(&tree, ron::ser::PrettyConfig::default())?
        }
    })
}

/// Deserialize a graph
pub fn from_str(content: &str, format: DocumentFormat) -> Result<Graph, DocumentError> {
    Ok(match format {
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Ron => {
            let tree: serde_json::Value = ron::from_str(content)?;
            serde_json::from_value(tree)?
        }
    })
}

/// Load a graph, picking the format from the extension
pub fn load_graph(path: &Path) -> Result<Graph, DocumentError> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| DocumentError::UnknownFormat(path.display().to_string()))?;
    let content = std::fs::read_to_string(path)?;
    let graph = from_str(&content, format)?;
    tracing::debug!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded graph"
    );
    Ok(graph)
}

/// Save a graph; paths without a known extension use `fallback`
pub fn save_graph(
    graph: &Graph,
    path: &Path,
    fallback: DocumentFormat,
) -> Result<(), DocumentError> {
    let format = DocumentFormat::from_path(path).unwrap_or(fallback);
    std::fs::write(path, to_string(graph, format)?)?;
    tracing::debug!(path = %path.display(), "saved graph");
    Ok(())
}

/// Error reading or writing a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed RON
    #[error("RON error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failure
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// Extension names no known format
    #[error("Unknown document format: {0}")]
    UnknownFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_editor_graph::constructors::{binary_node, number_node, output_node, rgb_node};
    use lumen_editor_graph::node::BinaryOperator;
    use lumen_editor_graph::{NodeId, Position, ShaderStage};

    fn sample() -> Graph {
        let value = number_node(NodeId::new(), "value", Position::new(1.0, 2.0), "0.5");
        let out = output_node(NodeId::new(), "Output", Position::default(), ShaderStage::Fragment);
        Graph::new()
            .with_nodes([value.clone(), out.clone()])
            .connect(value.id, "out", out.id, "color")
            .unwrap()
    }

    /// `value` and `tint` into a multiply feeding a fragment output
    fn mixed() -> Graph {
        let value = number_node(NodeId::new(), "value", Position::new(-250.0, 0.0), "2.0");
        let tint = rgb_node(NodeId::new(), "tint", Position::new(-250.0, 100.0), [1.0, 0.5, 0.25]);
        let mul =
            binary_node(NodeId::new(), "Multiply", BinaryOperator::Multiply, Position::default());
        let out =
            output_node(NodeId::new(), "Output", Position::new(200.0, 0.0), ShaderStage::Fragment);
        Graph::new()
            .with_nodes([value.clone(), tint.clone(), mul.clone(), out.clone()])
            .connect(value.id, "out", mul.id, "a")
            .unwrap()
            .connect(tint.id, "out", mul.id, "b")
            .unwrap()
            .connect(mul.id, "out", out.id, "color")
            .unwrap()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Path::new("a.ron")), Some(DocumentFormat::Ron));
        assert_eq!(DocumentFormat::from_path(Path::new("a.glsl")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn ron_documents_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.ron");
        let graph = mixed();

        save_graph(&graph, &path, DocumentFormat::Json).unwrap();
        let loaded = load_graph(&path).unwrap();

        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.edge_count(), graph.edge_count());
        for node in graph.nodes() {
            assert_eq!(loaded.node(node.id).map(|n| &**n), Some(&**node));
        }
        let handles: Vec<_> = graph.edges().map(|e| (e.id, e.input.clone())).collect();
        let loaded_handles: Vec<_> = loaded.edges().map(|e| (e.id, e.input.clone())).collect();
        assert_eq!(loaded_handles, handles);
    }

    #[test]
    fn json_documents_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.json");
        let graph = sample();

        save_graph(&graph, &path, DocumentFormat::Ron).unwrap();
        let loaded = load_graph(&path).unwrap();

        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edge_count(), 1);
        let edge = loaded.edges().next().unwrap();
        assert_eq!(edge.input.as_str(), "color");
    }

    #[test]
    fn unknown_extensions_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.glsl");
        std::fs::write(&path, "void main() {}").unwrap();

        assert!(matches!(load_graph(&path), Err(DocumentError::UnknownFormat(_))));
    }
}
