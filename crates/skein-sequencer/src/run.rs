//! Run context, metrics, and the run-record sink
//!
//! A run tracks per-node status independently of the authoring graph:
//! the sequencer operates over a frozen snapshot and writes status
//! only here. Aggregate metrics use atomic accumulation so concurrent
//! node completions never race.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use skein_graph::{GraphSnapshot, NodeId, NodeStatus};

use crate::events::EventError;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but not started
    #[default]
    Pending,
    /// Nodes are being scheduled and executed
    Running,
    /// Every node completed
    Completed,
    /// At least one node failed
    Failed,
    /// The caller aborted the run
    Cancelled,
}

/// Cost, latency and token deltas reported by one node execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutcome {
    /// Opaque result payload
    pub result: serde_json::Value,
    /// Cost of this node in cents
    pub cost_cents: u64,
    /// Tokens consumed
    pub tokens_in: u64,
    /// Tokens produced
    pub tokens_out: u64,
    /// Wall-clock execution time in milliseconds
    pub latency_ms: u64,
}

/// Aggregate run metrics with atomic accumulation
#[derive(Debug, Default)]
pub struct RunMetrics {
    cost_cents: AtomicU64,
    tokens_in: AtomicU64,
    tokens_out: AtomicU64,
}

impl RunMetrics {
    /// Fold one node outcome into the aggregates
    pub fn accumulate(&self, outcome: &NodeOutcome) {
        self.cost_cents.fetch_add(outcome.cost_cents, Ordering::Relaxed);
        self.tokens_in.fetch_add(outcome.tokens_in, Ordering::Relaxed);
        self.tokens_out.fetch_add(outcome.tokens_out, Ordering::Relaxed);
    }

    /// A consistent-enough point-in-time copy for reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cost_cents: self.cost_cents.load(Ordering::Relaxed),
            tokens_in: self.tokens_in.load(Ordering::Relaxed),
            tokens_out: self.tokens_out.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the aggregate metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub cost_cents: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Per-run state: statuses, results, errors, and aggregates
#[derive(Debug)]
pub struct RunContext {
    /// Unique id of this run
    pub run_id: String,
    /// Id of the workflow this run executes
    pub workflow_id: String,
    /// Overall run status
    pub status: RunStatus,
    /// Per-node status, independent of the authoring graph
    pub node_status: BTreeMap<NodeId, NodeStatus>,
    /// Results of completed nodes
    pub node_results: BTreeMap<NodeId, serde_json::Value>,
    /// Errors of failed nodes
    pub node_errors: BTreeMap<NodeId, String>,
    /// Aggregate metrics (shared with in-flight tasks)
    pub metrics: Arc<RunMetrics>,
    /// Epoch millis when the run started
    pub started_at: u64,
    /// Epoch millis when the run finished
    pub finished_at: Option<u64>,
}

impl RunContext {
    /// Create a context over a frozen snapshot, every node Pending
    pub fn new(workflow_id: impl Into<String>, snapshot: &GraphSnapshot) -> Self {
        Self {
            run_id: format!("run-{}", uuid::Uuid::new_v4()),
            workflow_id: workflow_id.into(),
            status: RunStatus::Pending,
            node_status: snapshot
                .nodes
                .iter()
                .map(|n| (n.id.clone(), NodeStatus::Pending))
                .collect(),
            node_results: BTreeMap::new(),
            node_errors: BTreeMap::new(),
            metrics: Arc::new(RunMetrics::default()),
            started_at: epoch_millis(),
            finished_at: None,
        }
    }

    /// Completed node count over total node count, in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.node_status.is_empty() {
            return 1.0;
        }
        self.completed_count() as f64 / self.node_status.len() as f64
    }

    /// Number of nodes that reached Completed
    pub fn completed_count(&self) -> usize {
        self.node_status
            .values()
            .filter(|s| **s == NodeStatus::Completed)
            .count()
    }

    /// Build the externally persisted record for this run
    pub fn record(&self) -> RunRecord {
        let metrics = self.metrics.snapshot();
        RunRecord {
            run_id: self.run_id.clone(),
            workflow_id: self.workflow_id.clone(),
            state: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
            cost_cents: metrics.cost_cents,
            tokens_in: metrics.tokens_in,
            tokens_out: metrics.tokens_out,
        }
    }
}

/// The run record pushed incrementally to the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunRecord {
    pub run_id: String,
    pub workflow_id: String,
    pub state: RunStatus,
    pub started_at: u64,
    pub finished_at: Option<u64>,
    pub cost_cents: u64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Trait for the injected run-record store
///
/// The sequencer invokes this with incremental updates; sink failures
/// are logged and never fail the run (the store owns its own retry
/// policy).
pub trait RecordSink: Send + Sync {
    /// Persist or forward the latest state of the run
    fn update(&self, record: RunRecord) -> Result<(), EventError>;
}

/// Record sink that drops every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecordSink;

impl RecordSink for NullRecordSink {
    fn update(&self, _record: RunRecord) -> Result<(), EventError> {
        Ok(())
    }
}

pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(cost: u64) -> NodeOutcome {
        NodeOutcome {
            result: serde_json::json!({}),
            cost_cents: cost,
            tokens_in: 10,
            tokens_out: 5,
            latency_ms: 1,
        }
    }

    #[test]
    fn test_metrics_accumulate() {
        let metrics = RunMetrics::default();
        metrics.accumulate(&outcome(3));
        metrics.accumulate(&outcome(4));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cost_cents, 7);
        assert_eq!(snapshot.tokens_in, 20);
        assert_eq!(snapshot.tokens_out, 10);
    }

    #[test]
    fn test_progress_empty_graph() {
        let ctx = RunContext::new("wf", &GraphSnapshot::default());
        assert_eq!(ctx.progress(), 1.0);
    }

    #[test]
    fn test_record_mirrors_context() {
        let mut ctx = RunContext::new("wf", &GraphSnapshot::default());
        ctx.status = RunStatus::Completed;
        ctx.finished_at = Some(ctx.started_at + 10);
        ctx.metrics.accumulate(&outcome(9));

        let record = ctx.record();
        assert_eq!(record.workflow_id, "wf");
        assert_eq!(record.state, RunStatus::Completed);
        assert_eq!(record.cost_cents, 9);
        assert_eq!(record.finished_at, Some(ctx.started_at + 10));
    }
}
