//! Structural validation and topological ordering
//!
//! Validates snapshots taken from a graph model (or imported from a
//! document) and computes the dependency order the sequencer runs in.
//! Cycle detection uses Kahn's algorithm.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::error::{GraphError, Result};
use crate::types::{GraphSnapshot, NodeId};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Cycle detected in the graph
    CycleDetected,
    /// An edge references a non-existent node
    UnknownNode { edge_id: String, node_id: String },
    /// Two edges share the same (source, target) pair
    DuplicateEdge { source: String, target: String },
    /// An edge connects a node to itself
    SelfEdge { node_id: String },
    /// A node's config variant does not match its kind
    ConfigMismatch { node_id: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in graph"),
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::DuplicateEdge { source, target } => {
                write!(f, "Duplicate edge {} -> {}", source, target)
            }
            Self::SelfEdge { node_id } => {
                write!(f, "Node '{}' has an edge to itself", node_id)
            }
            Self::ConfigMismatch { node_id } => {
                write!(f, "Node '{}' has a config for a different kind", node_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a snapshot's structure
///
/// Returns all validation errors found (not just the first).
pub fn validate(snapshot: &GraphSnapshot) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let node_ids: HashSet<&str> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen_pairs: BTreeSet<(&str, &str)> = BTreeSet::new();

    for edge in &snapshot.edges {
        if !node_ids.contains(edge.source.as_str()) {
            errors.push(ValidationError::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            });
        }
        if !node_ids.contains(edge.target.as_str()) {
            errors.push(ValidationError::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: edge.target.clone(),
            });
        }
        if edge.source == edge.target {
            errors.push(ValidationError::SelfEdge {
                node_id: edge.source.clone(),
            });
        }
        if !seen_pairs.insert((edge.source.as_str(), edge.target.as_str())) {
            errors.push(ValidationError::DuplicateEdge {
                source: edge.source.clone(),
                target: edge.target.clone(),
            });
        }
    }

    for node in &snapshot.nodes {
        if node.config.kind() != node.kind {
            errors.push(ValidationError::ConfigMismatch {
                node_id: node.id.clone(),
            });
        }
    }

    if topological_order(snapshot).is_err() {
        errors.push(ValidationError::CycleDetected);
    }

    errors
}

/// Compute a topological order over the snapshot's dependency edges
///
/// Kahn's algorithm with the ready set kept sorted, so the order is
/// deterministic for a given snapshot. Fails with `CyclicGraph` when
/// a cycle prevents a complete ordering.
pub fn topological_order(snapshot: &GraphSnapshot) -> Result<Vec<NodeId>> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &snapshot.nodes {
        in_degree.insert(&node.id, 0);
    }
    for edge in &snapshot.edges {
        if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
            *deg += 1;
        }
    }

    // in_degree is a BTreeMap, so the initial ready set is in id order
    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(snapshot.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        order.push(node_id.to_string());
        for edge in &snapshot.edges {
            if edge.source == node_id {
                if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(&edge.target);
                    }
                }
            }
        }
    }

    if order.len() < snapshot.nodes.len() {
        return Err(GraphError::CyclicGraph);
    }
    Ok(order)
}
