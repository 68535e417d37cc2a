//! The node executor seam
//!
//! The sequencer schedules; a `NodeExecutor` does the actual work of
//! one node. Real deployments inject an executor that calls agents
//! and tools; the `SimulatedExecutor` produces deterministic canned
//! outcomes for dry runs and tests. Bounding execution time is the
//! executor's responsibility: a node that times out must report a
//! node-scoped error, not hang.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;

use skein_graph::{GraphNode, NodeId, NodeKind};

use crate::run::NodeOutcome;

/// Executes one node with the results of its upstream dependencies
///
/// A node-scoped failure comes back as `Err(message)`; it never
/// aborts the run, it blocks dependents.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        node: &GraphNode,
        inputs: &BTreeMap<NodeId, serde_json::Value>,
    ) -> Result<NodeOutcome, String>;
}

/// Deterministic executor for dry runs and tests
///
/// Every node succeeds with a canned per-kind result and fixed
/// metric deltas, except ids listed in the failure set.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor {
    fail_nodes: HashSet<NodeId>,
    latency: Duration,
}

impl SimulatedExecutor {
    /// Executor where every node succeeds instantly
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node id as failing
    pub fn fail_node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.fail_nodes.insert(node_id.into());
        self
    }

    /// Add simulated per-node latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn canned_outcome(node: &GraphNode, latency_ms: u64) -> NodeOutcome {
        let (cost_cents, tokens_in, tokens_out) = match node.kind {
            NodeKind::Agent => (5, 120, 80),
            NodeKind::Tool => (1, 20, 10),
            NodeKind::HumanCheckpoint => (0, 0, 0),
            NodeKind::Conditional | NodeKind::Loop | NodeKind::Merge => (0, 5, 1),
        };
        NodeOutcome {
            result: serde_json::json!({
                "nodeId": node.id,
                "kind": node.kind,
                "simulated": true,
            }),
            cost_cents,
            tokens_in,
            tokens_out,
            latency_ms,
        }
    }
}

#[async_trait]
impl NodeExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        node: &GraphNode,
        _inputs: &BTreeMap<NodeId, serde_json::Value>,
    ) -> Result<NodeOutcome, String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_nodes.contains(&node.id) {
            return Err(format!("simulated failure in node '{}'", node.id));
        }
        Ok(Self::canned_outcome(node, self.latency.as_millis() as u64))
    }
}
