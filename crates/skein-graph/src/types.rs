//! Core types for workflow graphs
//!
//! These types define the structure of authoring graphs: nodes, edges,
//! positions, typed per-kind configuration, and immutable snapshots.
//! Edges hold node ids, never references, so a graph can be freely
//! serialized and diffed.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// A position on the canvas in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a position, clamping negative coordinates to zero
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.max(0.0),
            y: y.max(0.0),
        }
    }
}

/// The kind of operation a node performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An autonomous agent step backed by a model
    Agent,
    /// Conditional branching on a context value
    Conditional,
    /// Bounded loop over downstream work
    Loop,
    /// A human approval/input checkpoint
    HumanCheckpoint,
    /// An external tool invocation
    Tool,
    /// Merges multiple upstream branches
    Merge,
}

impl NodeKind {
    /// Human-readable label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Agent => "Agent",
            NodeKind::Conditional => "Conditional",
            NodeKind::Loop => "Loop",
            NodeKind::HumanCheckpoint => "Human Checkpoint",
            NodeKind::Tool => "Tool",
            NodeKind::Merge => "Merge",
        }
    }

    /// Palette category for this kind
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Agent => NodeCategory::Agent,
            NodeKind::Conditional | NodeKind::Loop | NodeKind::Merge => NodeCategory::Control,
            NodeKind::HumanCheckpoint => NodeCategory::Human,
            NodeKind::Tool => NodeCategory::Tool,
        }
    }
}

/// Category of a node, used for palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Agent execution nodes
    Agent,
    /// Control flow nodes (conditionals, loops, merges)
    Control,
    /// Human-in-the-loop nodes
    Human,
    /// Tool invocation nodes
    Tool,
}

/// Typed per-kind node configuration
///
/// Each node kind carries its own config variant, validated at
/// creation time, instead of a free-form key/value bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NodeConfig {
    Agent {
        model: String,
        system_prompt: String,
        temperature: f64,
    },
    Conditional {
        condition_key: String,
        expected_value: Option<serde_json::Value>,
    },
    Loop {
        max_iterations: u32,
        exit_condition_key: Option<String>,
    },
    HumanCheckpoint {
        prompt: String,
        timeout_secs: Option<u64>,
    },
    Tool {
        tool_name: String,
        arguments: serde_json::Value,
    },
    Merge {},
}

impl NodeConfig {
    /// The node kind this config variant belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Agent { .. } => NodeKind::Agent,
            NodeConfig::Conditional { .. } => NodeKind::Conditional,
            NodeConfig::Loop { .. } => NodeKind::Loop,
            NodeConfig::HumanCheckpoint { .. } => NodeKind::HumanCheckpoint,
            NodeConfig::Tool { .. } => NodeKind::Tool,
            NodeConfig::Merge {} => NodeKind::Merge,
        }
    }
}

/// Run-time status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet started
    #[default]
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// An upstream dependency failed; will never run
    Blocked,
}

impl NodeStatus {
    /// Whether this status is terminal for a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Blocked
        )
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Node kind (references a catalog entry)
    pub kind: NodeKind,
    /// Human-readable label
    pub label: String,
    /// Position on the canvas in world coordinates
    pub position: Position,
    /// Typed configuration for this instance
    pub config: NodeConfig,
    /// Run-scoped status; always Pending on the authoring surface
    #[serde(default)]
    pub status: NodeStatus,
    /// Run-scoped result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Run-scoped error message, present only when Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A directed edge: the target depends on the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node id (the dependency)
    pub source: NodeId,
    /// Target node id (the dependent)
    pub target: NodeId,
    /// Optional label shown on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Immutable snapshot of a graph's structure
///
/// Produced by `GraphModel::snapshot`; consumed by the history stack
/// and the sequencer. Nodes and edges are stored in id order so two
/// snapshots of equal graphs compare equal bit-for-bit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    /// Nodes in id order
    pub nodes: Vec<GraphNode>,
    /// Edges in id order
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Find a node by id
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of nodes this node depends on (upstream)
    pub fn dependencies_of(&self, node_id: &str) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Ids of nodes that depend on this node (downstream)
    pub fn dependents_of(&self, node_id: &str) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_clamps_negative() {
        let p = Position::new(-5.0, 3.0);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 3.0);
    }

    #[test]
    fn test_config_kind_pairing() {
        let config = NodeConfig::Loop {
            max_iterations: 3,
            exit_condition_key: None,
        };
        assert_eq!(config.kind(), NodeKind::Loop);
        assert_eq!(NodeConfig::Merge {}.kind(), NodeKind::Merge);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&NodeKind::HumanCheckpoint).unwrap();
        assert_eq!(json, "\"human_checkpoint\"");
    }

    #[test]
    fn test_config_tagged_serialization() {
        let config = NodeConfig::Agent {
            model: "gpt-4".to_string(),
            system_prompt: "You are helpful".to_string(),
            temperature: 0.7,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"kind\":\"agent\""));
        assert!(json.contains("\"systemPrompt\""));

        let back: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_snapshot_dependencies() {
        let snapshot = GraphSnapshot {
            nodes: vec![],
            edges: vec![GraphEdge {
                id: "e1".to_string(),
                source: "a".to_string(),
                target: "b".to_string(),
                label: None,
            }],
        };
        assert_eq!(snapshot.dependencies_of("b"), vec!["a"]);
        assert_eq!(snapshot.dependents_of("a"), vec!["b"]);
        assert!(snapshot.dependencies_of("a").is_empty());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
        assert!(NodeStatus::Blocked.is_terminal());
    }
}
