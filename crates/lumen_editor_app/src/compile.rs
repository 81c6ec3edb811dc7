// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile scheduling.
//!
//! The shader compiler is an external collaborator behind [`ShaderCompiler`].
//! At most one compile is in flight. Edits arriving meanwhile only set the
//! dirty flag again and are picked up by the next pass once the current one
//! reports back; nothing is cancelled and nothing runs in parallel.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use lumen_editor_graph::{Graph, HandleId, NodeId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Identifies one compile pass
pub type CompileTicket = u64;

/// Dirty / in-flight state machine
#[derive(Debug, Clone, Default)]
pub struct CompileScheduler {
    needs_compile: bool,
    compiling: Option<CompileTicket>,
    next_ticket: CompileTicket,
}

impl CompileScheduler {
    /// Create a scheduler with nothing to compile
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit that changes the compiled output
    pub fn mark_dirty(&mut self) {
        self.needs_compile = true;
    }

    /// Check whether an edit is waiting to be compiled
    pub fn needs_compile(&self) -> bool {
        self.needs_compile
    }

    /// Check whether a compile is in flight
    pub fn is_compiling(&self) -> bool {
        self.compiling.is_some()
    }

    /// Check whether a pass may start now
    pub fn should_start(&self) -> bool {
        self.needs_compile && self.compiling.is_none()
    }

    /// Start a pass if one may start, consuming the dirty flag
    pub fn begin(&mut self) -> Option<CompileTicket> {
        if !self.should_start() {
            return None;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.needs_compile = false;
        self.compiling = Some(ticket);
        Some(ticket)
    }

    /// End the pass `ticket`, successful or not.
    ///
    /// Returns false for a ticket that is not in flight.
    pub fn finish(&mut self, ticket: CompileTicket) -> bool {
        if self.compiling != Some(ticket) {
            tracing::warn!(ticket, "finish of a compile that is not in flight ignored");
            return false;
        }
        self.compiling = None;
        true
    }
}

/// Everything the compiler needs for one pass
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// Pass this job belongs to
    pub ticket: CompileTicket,
    /// Snapshot of the canonical graph
    pub graph: Graph,
    /// Engine the shader is compiled for
    pub engine: String,
}

/// What the compiler hands back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOutput {
    /// Fragment shader GLSL
    pub fragment_source: String,
    /// Vertex shader GLSL
    pub vertex_source: String,
    /// Data nodes that became uniforms
    pub data_nodes: Vec<NodeId>,
    /// Inputs of each node that are bound to data nodes
    pub data_inputs: IndexMap<NodeId, Vec<HandleId>>,
}

/// External shader compiler
pub trait ShaderCompiler: Send + Sync {
    /// Compile a graph for an engine
    fn compile(
        &self,
        graph: Graph,
        engine: String,
    ) -> BoxFuture<'static, Result<CompileOutput, CompileError>>;
}

/// Outcome of one pass
#[derive(Debug)]
pub struct CompileReport {
    /// Pass the report belongs to
    pub ticket: CompileTicket,
    /// Compiler result
    pub result: Result<CompileOutput, CompileError>,
    /// Time the compiler took
    pub elapsed: Duration,
}

/// Counters kept by the worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileStats {
    /// Jobs handed to the worker
    pub submitted: u64,
    /// Passes that produced output
    pub succeeded: u64,
    /// Passes that failed
    pub failed: u64,
    /// Duration of the latest pass
    pub last_duration: Option<Duration>,
}

/// Runs the compiler on a background thread with its own tokio runtime
pub struct CompileWorker {
    job_tx: mpsc::UnboundedSender<CompileJob>,
    report_rx: mpsc::UnboundedReceiver<CompileReport>,
    stats: Arc<RwLock<CompileStats>>,
}

impl CompileWorker {
    /// Start the worker thread
    pub fn new(compiler: Arc<dyn ShaderCompiler>) -> Result<Self, CompileError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(RwLock::new(CompileStats::default()));

        let worker_stats = Arc::clone(&stats);
        std::thread::Builder::new()
            .name("shader-compile".to_string())
            .spawn(move || {
                runtime.block_on(compile_worker(compiler, job_rx, report_tx, worker_stats));
            })?;

        Ok(Self {
            job_tx,
            report_rx,
            stats,
        })
    }

    /// Queue a job
    pub fn submit(&self, job: CompileJob) -> Result<(), CompileError> {
        self.stats.write().submitted += 1;
        self.job_tx.send(job).map_err(|_| CompileError::WorkerStopped)
    }

    /// Take a finished report, if any
    pub fn try_recv(&mut self) -> Option<CompileReport> {
        self.report_rx.try_recv().ok()
    }

    /// Wait for the next report. Must not be called from async code.
    pub fn recv_blocking(&mut self) -> Option<CompileReport> {
        self.report_rx.blocking_recv()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CompileStats {
        self.stats.read().clone()
    }
}

async fn compile_worker(
    compiler: Arc<dyn ShaderCompiler>,
    mut job_rx: mpsc::UnboundedReceiver<CompileJob>,
    report_tx: mpsc::UnboundedSender<CompileReport>,
    stats: Arc<RwLock<CompileStats>>,
) {
    while let Some(job) = job_rx.recv().await {
        tracing::debug!(ticket = job.ticket, nodes = job.graph.node_count(), "compile started");
        let start = Instant::now();
        let result = compiler.compile(job.graph, job.engine).await;
        let elapsed = start.elapsed();

        {
            let mut stats = stats.write();
            match &result {
                Ok(_) => stats.succeeded += 1,
                Err(_) => stats.failed += 1,
            }
            stats.last_duration = Some(elapsed);
        }

        let report = CompileReport {
            ticket: job.ticket,
            result,
            elapsed,
        };
        if report_tx.send(report).is_err() {
            break; // Session dropped
        }
    }
}

/// Error from the compile pipeline
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiler rejected the graph
    #[error("Compile failed: {0}")]
    Failed(String),

    /// The worker thread is gone
    #[error("Compile worker stopped")]
    WorkerStopped,

    /// The worker could not be started
    #[error("Could not start compile worker: {0}")]
    Runtime(#[from] std::io::Error),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::FutureExt;

    /// Compiler that reports the node count, or fails on empty graphs
    pub(crate) struct CountingCompiler {
        pub(crate) delay: Duration,
    }

    impl ShaderCompiler for CountingCompiler {
        fn compile(
            &self,
            graph: Graph,
            engine: String,
        ) -> BoxFuture<'static, Result<CompileOutput, CompileError>> {
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                if graph.node_count() == 0 {
                    return Err(CompileError::Failed("empty graph".to_string()));
                }
                Ok(CompileOutput {
                    fragment_source: format!("// {engine}: {} nodes", graph.node_count()),
                    data_nodes: graph.nodes().filter(|n| n.is_data()).map(|n| n.id).collect(),
                    ..CompileOutput::default()
                })
            }
            .boxed()
        }
    }

    /// Worker whose thread has already exited
    pub(crate) fn stopped_worker() -> CompileWorker {
        let (job_tx, _) = mpsc::unbounded_channel();
        let (_, report_rx) = mpsc::unbounded_channel();
        CompileWorker {
            job_tx,
            report_rx,
            stats: Arc::new(RwLock::new(CompileStats::default())),
        }
    }

    #[test]
    fn edits_during_a_compile_are_coalesced() {
        let mut scheduler = CompileScheduler::new();
        assert!(scheduler.begin().is_none());

        scheduler.mark_dirty();
        scheduler.mark_dirty();
        let first = scheduler.begin().unwrap();
        assert!(!scheduler.needs_compile());

        scheduler.mark_dirty();
        scheduler.mark_dirty();
        assert!(!scheduler.should_start());
        assert!(scheduler.begin().is_none());

        assert!(scheduler.finish(first));
        let second = scheduler.begin().unwrap();
        assert_ne!(first, second);
        assert!(scheduler.finish(second));
        assert!(scheduler.begin().is_none());
    }

    #[test]
    fn a_failed_pass_is_not_retried_on_its_own() {
        let mut scheduler = CompileScheduler::new();
        scheduler.mark_dirty();
        let ticket = scheduler.begin().unwrap();

        assert!(scheduler.finish(ticket));

        assert!(!scheduler.is_compiling());
        assert!(!scheduler.should_start());
        scheduler.mark_dirty();
        assert!(scheduler.should_start());
    }

    #[test]
    fn stale_tickets_are_ignored() {
        let mut scheduler = CompileScheduler::new();
        scheduler.mark_dirty();
        let ticket = scheduler.begin().unwrap();

        assert!(!scheduler.finish(ticket + 1));
        assert!(scheduler.is_compiling());
        assert!(scheduler.finish(ticket));
        assert!(!scheduler.finish(ticket));
    }

    #[test]
    fn worker_reports_results_in_order() {
        let compiler = Arc::new(CountingCompiler {
            delay: Duration::from_millis(5),
        });
        let mut worker = CompileWorker::new(compiler).unwrap();
        let graph = Graph::new().with_node(lumen_editor_graph::constructors::number_node(
            NodeId::new(),
            "x",
            lumen_editor_graph::Position::default(),
            "1.0",
        ));

        worker
            .submit(CompileJob {
                ticket: 0,
                graph,
                engine: "three".to_string(),
            })
            .unwrap();
        worker
            .submit(CompileJob {
                ticket: 1,
                graph: Graph::new(),
                engine: "three".to_string(),
            })
            .unwrap();

        let first = worker.recv_blocking().unwrap();
        assert_eq!(first.ticket, 0);
        let output = first.result.unwrap();
        assert_eq!(output.fragment_source, "// three: 1 nodes");
        assert_eq!(output.data_nodes.len(), 1);

        let second = worker.recv_blocking().unwrap();
        assert_eq!(second.ticket, 1);
        assert!(matches!(second.result, Err(CompileError::Failed(_))));

        let stats = worker.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.last_duration.is_some());
    }
}
