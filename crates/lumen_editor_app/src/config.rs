// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Stored as RON next to the documents being edited:
//! - Engine the compiler targets
//! - Placement of expanded uniform nodes
//! - Default log directives
//! - Format new documents are saved in

use crate::document::DocumentFormat;
use lumen_editor_graph::UniformLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "lumen.ron";

/// Log directives used when neither `RUST_LOG` nor the config sets any
pub const DEFAULT_LOG_FILTER: &str = "lumen_editor_app=info,lumen_editor_graph=info";

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Format version
    pub version: u32,
    /// Engine name handed to the shader compiler
    pub engine: String,
    /// Placement of expanded uniform nodes
    pub uniform_layout: UniformLayout,
    /// Default tracing directives
    pub log_filter: String,
    /// Format documents are written in
    pub document_format: DocumentFormat,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            engine: "three".to_string(),
            uniform_layout: UniformLayout::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            document_format: DocumentFormat::default(),
        }
    }
}

impl EditorConfig {
    /// Load the configuration; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: EditorConfig = ron::from_str(&content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Save the configuration as pretty RON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Configuration file path inside a directory
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }
}

/// Error loading or saving the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization failure
    #[error("Could not write config: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer editor
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}
