// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lumen Editor command line host.
//!
//! Runs the graph editing operations the visual editor performs against
//! graph documents on disk:
//! - `check` / `fix` for graph integrity
//! - `expand` for declared uniforms
//! - `delete`, `replace` and `import` for structural edits
//! - `stats` for a summary of the graph
//!
//! Edited graphs are written to `--output`, or to stdout in the configured
//! document format.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use lumen_editor_app::document::{self, DocumentError};
use lumen_editor_app::{
    ConfigError, DeleteMode, EditorConfig, EditorSession, GraphEdit, SessionError,
};
use lumen_editor_graph::{
    attempt_fix, check_integrity, expand_graph_uniforms, FlowGraph, Graph, NodeId, NodeType,
    Position,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Shader graph editing tools.
#[derive(Parser)]
#[command(name = "lumen_editor", version, about = "Shader graph editing tools")]
struct Cli {
    /// Editor configuration file.
    #[arg(short, long, global = true, default_value = lumen_editor_app::config::CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Report dangling edges and projection mismatches.
    Check {
        /// Graph document.
        graph: PathBuf,
    },
    /// Prune dangling edges.
    Fix {
        /// Graph document.
        graph: PathBuf,
        /// Where to write the result (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Expand declared uniforms into data nodes.
    Expand {
        /// Graph document.
        graph: PathBuf,
        /// Where to write the result (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a node and the data nodes only it uses.
    Delete {
        /// Graph document.
        graph: PathBuf,
        /// Node to delete.
        #[arg(short, long, value_parser = parse_node_id)]
        node: NodeId,
        /// Delete everything feeding the node as well.
        #[arg(long)]
        tree: bool,
        /// Where to write the result (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace a node with another graph document.
    Replace {
        /// Graph document.
        graph: PathBuf,
        /// Node to replace.
        #[arg(short, long, value_parser = parse_node_id)]
        node: NodeId,
        /// Graph document to splice in.
        #[arg(short, long)]
        with: PathBuf,
        /// Where to write the result (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add another graph document at a position.
    Import {
        /// Graph document.
        graph: PathBuf,
        /// Graph document to splice in.
        #[arg(short, long)]
        with: PathBuf,
        /// Horizontal drop position.
        #[arg(long, default_value_t = 0.0)]
        x: f32,
        /// Vertical drop position.
        #[arg(long, default_value_t = 0.0)]
        y: f32,
        /// Where to write the result (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a summary of the graph.
    Stats {
        /// Graph document.
        graph: PathBuf,
    },
}

/// Error surfaced by a subcommand
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0} integrity issue(s) found")]
    Integrity(usize),
}

fn parse_node_id(s: &str) -> Result<NodeId, String> {
    Uuid::parse_str(s)
        .map(NodeId)
        .map_err(|e| format!("invalid node id '{s}': {e}"))
}

fn main() {
    let cli = Cli::parse();

    let config = match EditorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config '{}': {e}", cli.config.display());
            process::exit(2);
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli.command, config) {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Commands, config: EditorConfig) -> Result<(), CliError> {
    match command {
        Commands::Check { graph } => {
            let graph = document::load_graph(&graph)?;
            let report = check_integrity(&graph, &FlowGraph::from_graph(&graph));
            for edge in &report.dangling_edges {
                println!("dangling edge {edge}");
            }
            if report.is_clean() {
                println!("ok: {} nodes, {} edges", graph.node_count(), graph.edge_count());
                Ok(())
            } else {
                Err(CliError::Integrity(report.issue_count()))
            }
        }
        Commands::Fix { graph, output } => {
            let (fixed, _) = attempt_fix(&document::load_graph(&graph)?);
            write_graph(&fixed, output.as_deref(), &config)
        }
        Commands::Expand { graph, output } => {
            let graph = document::load_graph(&graph)?;
            let expanded = expand_graph_uniforms(&graph, &config.uniform_layout);
            write_graph(&expanded, output.as_deref(), &config)
        }
        Commands::Delete {
            graph,
            node,
            tree,
            output,
        } => {
            let mode = if tree {
                DeleteMode::Tree
            } else {
                DeleteMode::NodeAndData
            };
            edit(&graph, GraphEdit::DeleteNode { node, mode }, output, config)
        }
        Commands::Replace {
            graph,
            node,
            with,
            output,
        } => {
            let incoming = document::load_graph(&with)?;
            edit(&graph, GraphEdit::ReplaceNode { node, incoming }, output, config)
        }
        Commands::Import {
            graph,
            with,
            x,
            y,
            output,
        } => {
            let incoming = document::load_graph(&with)?;
            let at = Position::new(x, y);
            edit(&graph, GraphEdit::ImportGraph { incoming, at }, output, config)
        }
        Commands::Stats { graph } => {
            print_stats(&document::load_graph(&graph)?);
            Ok(())
        }
    }
}

/// Open a document in a session, apply one edit and write the result
fn edit(
    path: &Path,
    edit: GraphEdit,
    output: Option<PathBuf>,
    config: EditorConfig,
) -> Result<(), CliError> {
    let mut session = EditorSession::open(document::load_graph(path)?, config);
    session.apply(edit)?;
    write_graph(session.graph(), output.as_deref(), session.config())
}

fn write_graph(
    graph: &Graph,
    output: Option<&Path>,
    config: &EditorConfig,
) -> Result<(), CliError> {
    match output {
        Some(path) => document::save_graph(graph, path, config.document_format)?,
        None => println!("{}", document::to_string(graph, config.document_format)?),
    }
    Ok(())
}

fn print_stats(graph: &Graph) {
    let mut outputs = 0;
    let mut sources = 0;
    let mut operators = 0;
    let mut data = 0;
    for node in graph.nodes() {
        match node.node_type {
            NodeType::Output => outputs += 1,
            NodeType::Source => sources += 1,
            NodeType::Binary { .. } => operators += 1,
            NodeType::Data { .. } => data += 1,
        }
    }
    let links = graph.edges().filter(|e| e.is_link()).count();

    println!("nodes:     {}", graph.node_count());
    println!("  output:   {outputs}");
    println!("  source:   {sources}");
    println!("  operator: {operators}");
    println!("  data:     {data}");
    println!("edges:     {}", graph.edge_count());
    println!("  links:    {links}");
    for node in graph.nodes().filter(|n| n.is_variadic()) {
        let arity = graph.inbound_edges(node.id).count();
        println!("{} ({}): {arity} input(s)", node.name, node.id);
    }
}
