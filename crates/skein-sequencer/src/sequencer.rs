//! Dependency-respecting run sequencer
//!
//! Consumes a frozen graph snapshot and walks it in dependency order:
//! a node starts only once every upstream source completed, and
//! independent ready nodes run concurrently as spawned tasks. Node
//! completions are serialized back into the scheduler loop through a
//! single mpsc channel, so node status has exactly one writer;
//! aggregate metrics accumulate atomically from the loop.
//!
//! Cycles fail the run before any node leaves Pending. A node failure
//! blocks its transitive dependents and lets independent branches
//! finish. Cancellation stops scheduling, blocks not-yet-started
//! nodes, and drains in-flight work.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use skein_graph::{topological_order, GraphNode, GraphSnapshot, NodeId, NodeStatus};

use crate::error::{Result, RunError};
use crate::events::{EventSink, NullSink, RunEvent};
use crate::executor::NodeExecutor;
use crate::run::{epoch_millis, NodeOutcome, NullRecordSink, RecordSink, RunContext, RunStatus};

/// Shared cancel flag for one run
///
/// Cloneable; `cancel()` from any task stops scheduling of
/// not-yet-started nodes. It never rewrites a node that already
/// reached Completed or Failed.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Schedules node execution over a frozen snapshot
pub struct Sequencer {
    executor: Arc<dyn NodeExecutor>,
    events: Arc<dyn EventSink>,
    records: Arc<dyn RecordSink>,
}

impl Sequencer {
    /// Create a sequencer around an executor, with silent sinks
    pub fn new(executor: Arc<dyn NodeExecutor>) -> Self {
        Self {
            executor,
            events: Arc::new(NullSink),
            records: Arc::new(NullRecordSink),
        }
    }

    /// Attach an event sink for progress streaming
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Attach a run-record sink for external persistence
    pub fn with_record_sink(mut self, records: Arc<dyn RecordSink>) -> Self {
        self.records = records;
        self
    }

    /// Execute one run over a frozen snapshot
    ///
    /// Fails with `CyclicGraph` before any node transition when the
    /// snapshot has no dependency order. Otherwise always returns a
    /// `RunContext` whose status is Completed, Failed or Cancelled.
    pub async fn run(
        &self,
        workflow_id: &str,
        snapshot: &GraphSnapshot,
        cancel: CancelHandle,
    ) -> Result<RunContext> {
        topological_order(snapshot).map_err(|_| RunError::CyclicGraph)?;

        let mut ctx = RunContext::new(workflow_id, snapshot);
        ctx.status = RunStatus::Running;
        let run_id = ctx.run_id.clone();
        let total = snapshot.nodes.len();

        log::info!("run {} started over {} nodes", run_id, total);
        self.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            workflow_id: workflow_id.to_string(),
        });
        self.push_record(&ctx);

        let nodes: BTreeMap<NodeId, GraphNode> = snapshot
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();
        let mut pending_deps: BTreeMap<NodeId, usize> = snapshot
            .nodes
            .iter()
            .map(|n| (n.id.clone(), snapshot.dependencies_of(&n.id).len()))
            .collect();
        let mut dependents: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for edge in &snapshot.edges {
            dependents
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<(NodeId, std::result::Result<NodeOutcome, String>)>();
        let mut in_flight: usize = 0;
        let mut cancellation_applied = false;

        loop {
            if cancel.is_cancelled() {
                if !cancellation_applied {
                    cancellation_applied = true;
                    for (node_id, status) in ctx.node_status.iter_mut() {
                        if *status == NodeStatus::Pending {
                            *status = NodeStatus::Blocked;
                            self.emit(RunEvent::NodeBlocked {
                                run_id: run_id.clone(),
                                node_id: node_id.clone(),
                            });
                        }
                    }
                    log::info!("run {} cancelled; draining {} in-flight nodes", run_id, in_flight);
                }
            } else {
                let ready: Vec<NodeId> = ctx
                    .node_status
                    .iter()
                    .filter(|(id, status)| {
                        **status == NodeStatus::Pending && pending_deps.get(*id) == Some(&0)
                    })
                    .map(|(id, _)| id.clone())
                    .collect();

                for node_id in ready {
                    ctx.node_status.insert(node_id.clone(), NodeStatus::Running);
                    self.emit(RunEvent::NodeStarted {
                        run_id: run_id.clone(),
                        node_id: node_id.clone(),
                    });

                    let node = nodes[&node_id].clone();
                    let inputs: BTreeMap<NodeId, serde_json::Value> = snapshot
                        .dependencies_of(&node_id)
                        .into_iter()
                        .filter_map(|dep| {
                            ctx.node_results.get(&dep).map(|v| (dep.clone(), v.clone()))
                        })
                        .collect();
                    let executor = Arc::clone(&self.executor);
                    let tx = tx.clone();
                    in_flight += 1;
                    tokio::spawn(async move {
                        let result = executor.execute(&node, &inputs).await;
                        // Receiver dropping means the run is over
                        let _ = tx.send((node.id, result));
                    });
                }
            }

            if in_flight == 0 {
                break;
            }

            let Some((node_id, result)) = rx.recv().await else {
                return Err(RunError::Join("completion channel closed".to_string()));
            };
            in_flight -= 1;

            match result {
                Ok(outcome) => {
                    ctx.metrics.accumulate(&outcome);
                    ctx.node_results.insert(node_id.clone(), outcome.result);
                    ctx.node_status.insert(node_id.clone(), NodeStatus::Completed);
                    log::debug!("node {} completed in {}ms", node_id, outcome.latency_ms);
                    self.emit(RunEvent::NodeCompleted {
                        run_id: run_id.clone(),
                        node_id: node_id.clone(),
                        result: ctx.node_results[&node_id].clone(),
                    });
                    for dep in dependents.get(&node_id).cloned().unwrap_or_default() {
                        if let Some(count) = pending_deps.get_mut(&dep) {
                            *count = count.saturating_sub(1);
                        }
                    }
                }
                Err(error) => {
                    log::warn!("node {} failed: {}", node_id, error);
                    ctx.node_errors.insert(node_id.clone(), error.clone());
                    ctx.node_status.insert(node_id.clone(), NodeStatus::Failed);
                    self.emit(RunEvent::NodeFailed {
                        run_id: run_id.clone(),
                        node_id: node_id.clone(),
                        error,
                    });
                    self.block_dependents(&mut ctx, &dependents, &node_id, &run_id);
                }
            }

            self.emit(RunEvent::Progress {
                run_id: run_id.clone(),
                completed: ctx.completed_count(),
                total,
            });
            self.push_record(&ctx);
        }

        ctx.finished_at = Some(epoch_millis());
        ctx.status = if cancellation_applied || cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if ctx
            .node_status
            .values()
            .any(|s| *s == NodeStatus::Failed)
        {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let final_event = match ctx.status {
            RunStatus::Completed => RunEvent::RunCompleted {
                run_id: run_id.clone(),
            },
            RunStatus::Cancelled => RunEvent::RunCancelled {
                run_id: run_id.clone(),
            },
            _ => RunEvent::RunFailed {
                run_id: run_id.clone(),
            },
        };
        log::info!(
            "run {} finished: {:?}, {}/{} nodes completed",
            run_id,
            ctx.status,
            ctx.completed_count(),
            total
        );
        self.emit(final_event);
        self.push_record(&ctx);

        Ok(ctx)
    }

    /// Mark every transitive dependent of a failed node as Blocked
    fn block_dependents(
        &self,
        ctx: &mut RunContext,
        dependents: &BTreeMap<NodeId, Vec<NodeId>>,
        failed: &NodeId,
        run_id: &str,
    ) {
        let mut queue: VecDeque<NodeId> =
            dependents.get(failed).cloned().unwrap_or_default().into();
        while let Some(node_id) = queue.pop_front() {
            if ctx.node_status.get(&node_id) == Some(&NodeStatus::Pending) {
                ctx.node_status.insert(node_id.clone(), NodeStatus::Blocked);
                self.emit(RunEvent::NodeBlocked {
                    run_id: run_id.to_string(),
                    node_id: node_id.clone(),
                });
                queue.extend(dependents.get(&node_id).cloned().unwrap_or_default());
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Err(e) = self.events.send(event) {
            log::debug!("event sink dropped an event: {}", e);
        }
    }

    fn push_record(&self, ctx: &RunContext) {
        if let Err(e) = self.records.update(ctx.record()) {
            log::warn!("record sink update failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelSink;
    use crate::executor::SimulatedExecutor;
    use std::time::Duration;

    use skein_graph::{GraphEdge, GraphModel, NodeKind, Position};

    fn chain(n: usize) -> (GraphSnapshot, Vec<NodeId>) {
        let mut model = GraphModel::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| {
                model
                    .add_node(NodeKind::Agent, Position::new(i as f64 * 100.0, 0.0))
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        for pair in ids.windows(2) {
            model.add_edge(&pair[0], &pair[1]).unwrap();
        }
        (model.snapshot(), ids)
    }

    fn diamond() -> (GraphSnapshot, Vec<NodeId>) {
        let mut model = GraphModel::new();
        let ids: Vec<NodeId> = (0..4)
            .map(|i| {
                model
                    .add_node(NodeKind::Agent, Position::new(i as f64 * 100.0, 0.0))
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        model.add_edge(&ids[0], &ids[1]).unwrap();
        model.add_edge(&ids[0], &ids[2]).unwrap();
        model.add_edge(&ids[1], &ids[3]).unwrap();
        model.add_edge(&ids[2], &ids[3]).unwrap();
        (model.snapshot(), ids)
    }

    #[tokio::test]
    async fn test_linear_chain_completes() {
        let (snapshot, ids) = chain(3);
        let sequencer = Sequencer::new(Arc::new(SimulatedExecutor::new()));
        let ctx = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(ctx.status, RunStatus::Completed);
        for id in &ids {
            assert_eq!(ctx.node_status[id], NodeStatus::Completed);
        }
        assert_eq!(ctx.progress(), 1.0);
        assert!(ctx.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_blocks_dependents() {
        let (snapshot, ids) = chain(3);
        let executor = SimulatedExecutor::new().fail_node(ids[1].clone());
        let sequencer = Sequencer::new(Arc::new(executor));
        let ctx = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(ctx.status, RunStatus::Failed);
        assert_eq!(ctx.node_status[&ids[0]], NodeStatus::Completed);
        assert_eq!(ctx.node_status[&ids[1]], NodeStatus::Failed);
        assert_eq!(ctx.node_status[&ids[2]], NodeStatus::Blocked);
        assert!(ctx.node_errors[&ids[1]].contains("simulated failure"));
        assert!(!ctx.node_results.contains_key(&ids[2]));
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_transition() {
        let (mut snapshot, ids) = chain(2);
        snapshot.edges.push(GraphEdge {
            id: "back".to_string(),
            source: ids[1].clone(),
            target: ids[0].clone(),
            label: None,
        });

        let (sink, mut receiver) = ChannelSink::new();
        let sequencer =
            Sequencer::new(Arc::new(SimulatedExecutor::new())).with_event_sink(Arc::new(sink));
        let err = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::CyclicGraph));
        // No node ran, so no events were emitted at all
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_diamond_runs_all_branches() {
        let (snapshot, ids) = diamond();
        let sequencer = Sequencer::new(Arc::new(SimulatedExecutor::new()));
        let ctx = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(ctx.status, RunStatus::Completed);
        for id in &ids {
            assert_eq!(ctx.node_status[id], NodeStatus::Completed);
        }
        // Four agent nodes, 5 cents each
        assert_eq!(ctx.metrics.snapshot().cost_cents, 20);
        assert_eq!(ctx.metrics.snapshot().tokens_in, 480);
    }

    #[tokio::test]
    async fn test_diamond_failure_spares_independent_branch() {
        let (snapshot, ids) = diamond();
        let executor = SimulatedExecutor::new().fail_node(ids[1].clone());
        let sequencer = Sequencer::new(Arc::new(executor));
        let ctx = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(ctx.status, RunStatus::Failed);
        assert_eq!(ctx.node_status[&ids[0]], NodeStatus::Completed);
        assert_eq!(ctx.node_status[&ids[1]], NodeStatus::Failed);
        // The sibling branch still completed
        assert_eq!(ctx.node_status[&ids[2]], NodeStatus::Completed);
        assert_eq!(ctx.node_status[&ids[3]], NodeStatus::Blocked);
    }

    #[tokio::test]
    async fn test_cancellation_blocks_unstarted_nodes() {
        let (snapshot, ids) = chain(3);
        let executor = SimulatedExecutor::new().with_latency(Duration::from_millis(50));
        let sequencer = Sequencer::new(Arc::new(executor));
        let cancel = CancelHandle::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let ctx = sequencer.run("wf", &snapshot, cancel).await.unwrap();

        assert_eq!(ctx.status, RunStatus::Cancelled);
        // The first node was already in flight and finished
        assert_eq!(ctx.node_status[&ids[0]], NodeStatus::Completed);
        assert_eq!(ctx.node_status[&ids[1]], NodeStatus::Blocked);
        assert_eq!(ctx.node_status[&ids[2]], NodeStatus::Blocked);
    }

    #[tokio::test]
    async fn test_empty_graph_completes() {
        let sequencer = Sequencer::new(Arc::new(SimulatedExecutor::new()));
        let ctx = sequencer
            .run("wf", &GraphSnapshot::default(), CancelHandle::new())
            .await
            .unwrap();
        assert_eq!(ctx.status, RunStatus::Completed);
        assert_eq!(ctx.progress(), 1.0);
    }

    #[tokio::test]
    async fn test_events_stream_in_order() {
        let (snapshot, ids) = chain(2);
        let (sink, mut receiver) = ChannelSink::new();
        let sequencer =
            Sequencer::new(Arc::new(SimulatedExecutor::new())).with_event_sink(Arc::new(sink));
        sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(RunEvent::RunCompleted { .. })));
        let started: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::NodeStarted { node_id, .. } => Some(node_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![ids[0].as_str(), ids[1].as_str()]);
    }

    #[tokio::test]
    async fn test_record_sink_receives_final_state() {
        use crate::run::{RecordSink, RunRecord};
        use std::sync::Mutex;

        #[derive(Default)]
        struct CollectingSink {
            records: Mutex<Vec<RunRecord>>,
        }
        impl RecordSink for CollectingSink {
            fn update(&self, record: RunRecord) -> std::result::Result<(), crate::events::EventError> {
                self.records.lock().unwrap().push(record);
                Ok(())
            }
        }

        let (snapshot, _) = chain(2);
        let sink = Arc::new(CollectingSink::default());
        let sequencer = Sequencer::new(Arc::new(SimulatedExecutor::new()))
            .with_record_sink(Arc::clone(&sink) as Arc<dyn RecordSink>);
        let ctx = sequencer
            .run("wf", &snapshot, CancelHandle::new())
            .await
            .unwrap();

        let records = sink.records.lock().unwrap();
        let last = records.last().unwrap();
        assert_eq!(last.state, RunStatus::Completed);
        assert_eq!(last.run_id, ctx.run_id);
        assert_eq!(last.cost_cents, 10); // two agent nodes
        assert!(last.finished_at.is_some());
    }
}
