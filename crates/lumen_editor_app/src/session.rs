// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editing session.
//!
//! Owns the canonical graph, its flow projection and the compile scheduler,
//! and keeps the three in step as edits come in.

use crate::commands::{DeleteMode, EditImpact, GraphEdit};
use crate::compile::{
    CompileError, CompileJob, CompileOutput, CompileReport, CompileScheduler, CompileWorker,
};
use crate::config::EditorConfig;
use lumen_editor_graph::flow::apply_positions;
use lumen_editor_graph::{
    attempt_fix, check_integrity, expand_graph_uniforms, expand_node_uniforms, find_node_and_data,
    find_node_tree, import_graph, replace_node, ConnectionError, DataValue, FlowGraph, Graph,
    IntegrityReport, NodeId, NodeType, SpliceError, SyncStats,
};
use std::collections::HashSet;

/// Error applying an edit
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connection rejected
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Splice rejected
    #[error("Splice error: {0}")]
    Splice(#[from] SpliceError),

    /// Compile pipeline failure
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Value edits only apply to data nodes
    #[error("Node {0} is not a data node")]
    NotADataNode(NodeId),
}

/// An open shader graph
#[derive(Debug)]
pub struct EditorSession {
    graph: Graph,
    flow: FlowGraph,
    scheduler: CompileScheduler,
    config: EditorConfig,
    last_output: Option<CompileOutput>,
    last_error: Option<String>,
    uniform_updates: Vec<(NodeId, DataValue)>,
}

impl EditorSession {
    /// Start a session with an empty graph
    pub fn new(config: EditorConfig) -> Self {
        let graph = Graph::new();
        Self {
            flow: FlowGraph::from_graph(&graph),
            graph,
            scheduler: CompileScheduler::new(),
            config,
            last_output: None,
            last_error: None,
            uniform_updates: Vec::new(),
        }
    }

    /// Open a loaded graph. Uniforms are expanded and a compile is scheduled.
    pub fn open(graph: Graph, config: EditorConfig) -> Self {
        let mut session = Self::new(config);
        session.graph = expand_graph_uniforms(&graph, &session.config.uniform_layout);
        session.flow = FlowGraph::from_graph(&session.graph);
        session.scheduler.mark_dirty();
        tracing::info!(
            nodes = session.graph.node_count(),
            edges = session.graph.edge_count(),
            "opened graph"
        );
        session
    }

    /// The canonical graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The flow projection
    pub fn flow(&self) -> &FlowGraph {
        &self.flow
    }

    /// The flow projection, for UI-only state such as selection
    pub fn flow_mut(&mut self) -> &mut FlowGraph {
        &mut self.flow
    }

    /// Compile scheduling state
    pub fn scheduler(&self) -> &CompileScheduler {
        &self.scheduler
    }

    /// Editor configuration
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Output of the latest successful compile
    pub fn last_output(&self) -> Option<&CompileOutput> {
        self.last_output.as_ref()
    }

    /// Message of the latest failed compile, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply an edit.
    ///
    /// Structural and config edits schedule a compile. Value edits on data
    /// nodes only queue a uniform update for the renderer; moves schedule
    /// nothing.
    pub fn apply(&mut self, edit: GraphEdit) -> Result<EditImpact, SessionError> {
        let impact = edit.impact();
        let description = edit.description();
        let layout = self.config.uniform_layout;

        let next = match edit {
            GraphEdit::AddNode { node } => {
                let node_id = node.id;
                expand_node_uniforms(&self.graph.with_node(node), node_id, &layout)
            }
            GraphEdit::Connect {
                from,
                output,
                to,
                input,
            } => self.graph.connect(from, output, to, input)?,
            GraphEdit::AddEdge { edge } => self.graph.add_edge(edge),
            GraphEdit::RemoveEdges { edges } => {
                let edges: HashSet<_> = edges.into_iter().collect();
                self.graph.remove_edges(&edges)
            }
            GraphEdit::DeleteNode { node, mode } => {
                self.require_node(node)?;
                let closure = match mode {
                    DeleteMode::NodeAndData => find_node_and_data(&self.graph, node),
                    DeleteMode::Tree => find_node_tree(&self.graph, node),
                };
                closure.remove_from(&self.graph)
            }
            GraphEdit::UpdateConfig { node, config } => {
                self.require_node(node)?;
                let updated = self.graph.update_node(node, |n| n.config = config);
                expand_node_uniforms(&updated, node, &layout)
            }
            GraphEdit::SetDataValue { node, value } => {
                if !self.require_node(node)?.is_data() {
                    return Err(SessionError::NotADataNode(node));
                }
                self.uniform_updates.push((node, value.clone()));
                self.graph
                    .update_node(node, |n| n.node_type = NodeType::Data { value })
            }
            GraphEdit::MoveNodes { moves } => apply_positions(&self.graph, &moves),
            GraphEdit::ReplaceNode { node, incoming } => {
                replace_node(&self.graph, node, &incoming, &layout)?.graph
            }
            GraphEdit::ImportGraph { incoming, at } => {
                import_graph(&self.graph, &incoming, at, &layout).graph
            }
            GraphEdit::AttemptFix => attempt_fix(&self.graph).0,
        };

        let stats = self.set_graph(next);
        if impact.needs_compile() {
            self.scheduler.mark_dirty();
        }
        tracing::debug!(
            edit = description,
            reused = stats.reused,
            rebuilt = stats.rebuilt,
            "applied edit"
        );
        Ok(impact)
    }

    fn require_node(&self, node_id: NodeId) -> Result<&lumen_editor_graph::Node, SessionError> {
        self.graph
            .node(node_id)
            .map(|n| &**n)
            .ok_or(SessionError::NodeNotFound(node_id))
    }

    fn set_graph(&mut self, graph: Graph) -> SyncStats {
        let (flow, stats) = self.flow.sync(&graph);
        self.graph = graph;
        self.flow = flow;
        stats
    }

    /// Compare the graph against its projection
    pub fn integrity(&self) -> IntegrityReport {
        check_integrity(&self.graph, &self.flow)
    }

    /// Data values changed since the last call, for live uniform binding
    pub fn take_uniform_updates(&mut self) -> Vec<(NodeId, DataValue)> {
        std::mem::take(&mut self.uniform_updates)
    }

    /// Start a compile pass if one is due and none is in flight
    pub fn take_compile_job(&mut self) -> Option<CompileJob> {
        let ticket = self.scheduler.begin()?;
        Some(CompileJob {
            ticket,
            graph: self.graph.clone(),
            engine: self.config.engine.clone(),
        })
    }

    /// Record the outcome of a pass
    pub fn finish_compile(&mut self, report: CompileReport) {
        if !self.scheduler.finish(report.ticket) {
            return;
        }
        match report.result {
            Ok(output) => {
                tracing::info!(
                    ticket = report.ticket,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "compile finished"
                );
                self.last_error = None;
                self.last_output = Some(output);
            }
            Err(e) => {
                tracing::error!(ticket = report.ticket, "compile failed: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Hand a due pass to the worker. Returns whether a pass was started.
    pub fn pump(&mut self, worker: &CompileWorker) -> Result<bool, SessionError> {
        let Some(job) = self.take_compile_job() else {
            return Ok(false);
        };
        let ticket = job.ticket;
        if let Err(e) = worker.submit(job) {
            self.scheduler.finish(ticket);
            self.scheduler.mark_dirty();
            return Err(e.into());
        }
        Ok(true)
    }

    /// Drain finished passes from the worker. Returns how many were drained.
    pub fn poll(&mut self, worker: &mut CompileWorker) -> usize {
        let mut drained = 0;
        while let Some(report) = worker.try_recv() {
            self.finish_compile(report);
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::tests::{stopped_worker, CountingCompiler};
    use lumen_editor_graph::constructors::{binary_node, number_node, output_node, source_node};
    use lumen_editor_graph::node::{BinaryOperator, UniformDefinition};
    use lumen_editor_graph::{Position, ShaderStage};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        session: EditorSession,
        value: NodeId,
        shader: NodeId,
        out: NodeId,
    }

    /// `value -> shader.uniform_speed`, `shader -> out.color`
    fn fixture() -> Fixture {
        let mut shader = source_node(
            NodeId::new(),
            "Shader",
            Position::new(0.0, 0.0),
            Some(ShaderStage::Fragment),
            "void main() {}",
        );
        shader.config.uniforms = vec![UniformDefinition::new(
            "speed",
            DataValue::Number("1.0".to_string()),
        )];
        let out = output_node(
            NodeId::new(),
            "Output",
            Position::new(300.0, 0.0),
            ShaderStage::Fragment,
        );
        let graph = Graph::new()
            .with_nodes([shader.clone(), out.clone()])
            .connect(shader.id, "out", out.id, "color")
            .unwrap();

        let session = EditorSession::open(graph, EditorConfig::default());
        let value = session
            .graph()
            .edge_into(shader.id, &"uniform_speed".into())
            .unwrap()
            .from;
        Fixture {
            session,
            value,
            shader: shader.id,
            out: out.id,
        }
    }

    #[test]
    fn opening_expands_uniforms_and_schedules_a_compile() {
        let f = fixture();
        assert_eq!(f.session.graph().node_count(), 3);
        assert!(f.session.scheduler().needs_compile());
        assert!(f.session.integrity().is_clean());
    }

    #[test]
    fn data_values_bypass_the_compiler() {
        let mut f = fixture();
        let ticket = f.session.take_compile_job().unwrap().ticket;
        f.session.finish_compile(CompileReport {
            ticket,
            result: Ok(CompileOutput::default()),
            elapsed: Duration::ZERO,
        });

        let value = DataValue::Number("4.0".to_string());
        let impact = f
            .session
            .apply(GraphEdit::SetDataValue {
                node: f.value,
                value: value.clone(),
            })
            .unwrap();

        assert_eq!(impact, EditImpact::Value);
        assert!(!f.session.scheduler().needs_compile());
        assert_eq!(f.session.graph().node(f.value).unwrap().data_value(), Some(&value));
        assert_eq!(f.session.take_uniform_updates(), [(f.value, value)]);
        assert!(f.session.take_uniform_updates().is_empty());

        let err = f
            .session
            .apply(GraphEdit::SetDataValue {
                node: f.shader,
                value: DataValue::Number("1".to_string()),
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::NotADataNode(_)));
    }

    #[test]
    fn moves_update_the_projection_without_compiling() {
        let mut f = fixture();
        let _ = f.session.take_compile_job();

        f.session
            .apply(GraphEdit::MoveNodes {
                moves: vec![(f.shader, Position::new(40.0, 50.0))],
            })
            .unwrap();

        assert!(!f.session.scheduler().needs_compile());
        assert_eq!(
            f.session.flow().node(f.shader).unwrap().position,
            Position::new(40.0, 50.0)
        );
    }

    #[test]
    fn edits_during_a_compile_wait_for_the_next_pass() {
        let mut f = fixture();
        let first = f.session.take_compile_job().unwrap();

        let add = binary_node(NodeId::new(), "Add", BinaryOperator::Add, Position::default());
        f.session.apply(GraphEdit::AddNode { node: add }).unwrap();
        assert!(f.session.take_compile_job().is_none());

        f.session.finish_compile(CompileReport {
            ticket: first.ticket,
            result: Err(CompileError::Failed("syntax error".to_string())),
            elapsed: Duration::ZERO,
        });
        assert_eq!(f.session.last_error(), Some("Compile failed: syntax error"));

        let second = f.session.take_compile_job().unwrap();
        assert_eq!(second.graph.node_count(), 4);
        assert!(f.session.take_compile_job().is_none());
    }

    #[test]
    fn delete_modes_pick_different_closures() {
        let f = fixture();

        let mut data = EditorSession::open(f.session.graph().clone(), EditorConfig::default());
        data.apply(GraphEdit::DeleteNode {
            node: f.shader,
            mode: DeleteMode::NodeAndData,
        })
        .unwrap();
        assert_eq!(data.graph().node_count(), 1);
        assert!(data.graph().contains_node(f.out));

        let extra = number_node(NodeId::new(), "extra", Position::default(), "2.0");
        let mut tree = EditorSession::open(f.session.graph().clone(), EditorConfig::default());
        tree.apply(GraphEdit::AddNode { node: extra.clone() }).unwrap();
        tree.apply(GraphEdit::DeleteNode {
            node: f.out,
            mode: DeleteMode::Tree,
        })
        .unwrap();
        assert_eq!(tree.graph().node_count(), 1);
        assert!(tree.graph().contains_node(extra.id));
        assert!(tree.integrity().is_clean());

        let ghost = NodeId::new();
        assert!(matches!(
            tree.apply(GraphEdit::DeleteNode {
                node: ghost,
                mode: DeleteMode::Tree,
            }),
            Err(SessionError::NodeNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn output_nodes_are_not_replaced() {
        let mut f = fixture();
        let before = f.session.graph().edge_count();

        let err = f
            .session
            .apply(GraphEdit::ReplaceNode {
                node: f.out,
                incoming: Graph::new(),
            })
            .unwrap_err();

        assert!(matches!(err, SessionError::Splice(SpliceError::OutputNotReplaceable(_))));
        assert_eq!(f.session.graph().edge_count(), before);
    }

    #[test]
    fn worker_round_trip() {
        let mut f = fixture();
        let mut worker = CompileWorker::new(Arc::new(CountingCompiler {
            delay: Duration::from_millis(5),
        }))
        .unwrap();

        assert!(f.session.pump(&worker).unwrap());
        assert!(!f.session.pump(&worker).unwrap());

        let report = worker.recv_blocking().unwrap();
        f.session.finish_compile(report);
        assert_eq!(f.session.poll(&mut worker), 0);

        let output = f.session.last_output().unwrap();
        assert_eq!(output.data_nodes, [f.value]);
        assert!(f.session.last_error().is_none());
        assert!(!f.session.scheduler().is_compiling());
        assert_eq!(worker.stats().succeeded, 1);
    }

    #[test]
    fn a_rejected_submit_keeps_the_edit_pending() {
        let mut f = fixture();
        let stopped = stopped_worker();

        let err = f.session.pump(&stopped).unwrap_err();

        assert!(matches!(err, SessionError::Compile(CompileError::WorkerStopped)));
        assert!(!f.session.scheduler().is_compiling());
        assert!(f.session.scheduler().needs_compile());

        let mut worker = CompileWorker::new(Arc::new(CountingCompiler {
            delay: Duration::ZERO,
        }))
        .unwrap();
        assert!(f.session.pump(&worker).unwrap());
        let report = worker.recv_blocking().unwrap();
        f.session.finish_compile(report);
        assert!(f.session.last_output().is_some());
    }
}
