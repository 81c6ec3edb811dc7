// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lumen Editor host.
//!
//! Wraps the shader graph core in an editing session:
//! - Graph edits requested by the visual editor
//! - Compile scheduling against an external shader compiler
//! - Editor configuration and graph documents
//!
//! ## Architecture
//!
//! [`EditorSession`] owns the canonical graph and its flow projection. Edits
//! go through [`EditorSession::apply`], which decides whether the shader
//! must be compiled again; [`CompileWorker`] runs at most one compile at a
//! time on a background runtime.

pub mod commands;
pub mod compile;
pub mod config;
pub mod document;
pub mod session;

pub use commands::{DeleteMode, EditImpact, GraphEdit};
pub use compile::{
    CompileError, CompileJob, CompileOutput, CompileReport, CompileScheduler, CompileStats,
    CompileWorker, ShaderCompiler,
};
pub use config::{ConfigError, EditorConfig};
pub use document::{DocumentError, DocumentFormat};
pub use session::{EditorSession, SessionError};
