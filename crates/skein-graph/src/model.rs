//! Graph model with atomic, invariant-preserving mutations
//!
//! Nodes and edges live in id-keyed maps; edges reference nodes by id
//! only. Every operation validates before it mutates, so after any
//! call the full invariant set holds or the model is unchanged:
//!
//! - node ids are unique
//! - every edge endpoint references an existing node
//! - no two edges share the same (source, target) pair
//! - removing a node removes every incident edge

use std::collections::BTreeMap;

use crate::catalog::NodeTypeCatalog;
use crate::error::{GraphError, Result};
use crate::types::{
    EdgeId, GraphEdge, GraphNode, GraphSnapshot, NodeConfig, NodeId, NodeKind, NodeStatus,
    Position,
};

/// Owns the nodes and edges of one authoring graph
#[derive(Debug, Clone)]
pub struct GraphModel {
    catalog: NodeTypeCatalog,
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: BTreeMap<EdgeId, GraphEdge>,
}

impl GraphModel {
    /// Create an empty model over the builtin catalog
    pub fn new() -> Self {
        Self::with_catalog(NodeTypeCatalog::builtin())
    }

    /// Create an empty model over a custom catalog
    pub fn with_catalog(catalog: NodeTypeCatalog) -> Self {
        Self {
            catalog,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// The catalog backing node creation
    pub fn catalog(&self) -> &NodeTypeCatalog {
        &self.catalog
    }

    /// Add a node of the given kind with its catalog default config
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Result<&GraphNode> {
        let entry = self
            .catalog
            .get(kind)
            .ok_or_else(|| GraphError::UnknownType(format!("{:?}", kind)))?;
        let node = GraphNode {
            id: format!("node-{}", uuid::Uuid::new_v4()),
            kind,
            label: entry.label.clone(),
            position,
            config: entry.default_config.clone(),
            status: NodeStatus::Pending,
            result: None,
            error: None,
        };
        let id = node.id.clone();
        log::debug!("add_node {:?} at ({}, {})", kind, position.x, position.y);
        self.nodes.insert(id.clone(), node);
        Ok(&self.nodes[&id])
    }

    /// Add a node with an explicit config
    ///
    /// Rejects a config whose variant does not match the kind.
    pub fn add_node_with_config(
        &mut self,
        kind: NodeKind,
        position: Position,
        config: NodeConfig,
    ) -> Result<&GraphNode> {
        if !self.catalog.contains(kind) {
            return Err(GraphError::UnknownType(format!("{:?}", kind)));
        }
        if config.kind() != kind {
            return Err(GraphError::ConfigMismatch {
                node_id: "<new>".to_string(),
                expected: kind.label().to_string(),
            });
        }
        let node = GraphNode {
            id: format!("node-{}", uuid::Uuid::new_v4()),
            kind,
            label: kind.label().to_string(),
            position,
            config,
            status: NodeStatus::Pending,
            result: None,
            error: None,
        };
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        Ok(&self.nodes[&id])
    }

    /// Insert a fully-formed node, keeping its id (document import path)
    pub(crate) fn insert_node(&mut self, node: GraphNode) -> Result<()> {
        if !self.catalog.contains(node.kind) {
            return Err(GraphError::UnknownType(format!("{:?}", node.kind)));
        }
        if node.config.kind() != node.kind {
            return Err(GraphError::ConfigMismatch {
                node_id: node.id.clone(),
                expected: node.kind.label().to_string(),
            });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and every edge incident to it
    pub fn remove_node(&mut self, id: &str) -> Result<GraphNode> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let before = self.edges.len();
        self.edges.retain(|_, e| e.source != id && e.target != id);
        log::debug!(
            "remove_node {} (cascaded {} edges)",
            id,
            before - self.edges.len()
        );
        Ok(node)
    }

    /// Add a directed edge: `target` depends on `source`
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<&GraphEdge> {
        self.add_edge_labelled(source, target, None)
    }

    /// Add a directed edge with an optional label
    pub fn add_edge_labelled(
        &mut self,
        source: &str,
        target: &str,
        label: Option<String>,
    ) -> Result<&GraphEdge> {
        if source == target {
            return Err(GraphError::SelfEdge(source.to_string()));
        }
        if !self.nodes.contains_key(source) {
            return Err(GraphError::NodeNotFound(source.to_string()));
        }
        if !self.nodes.contains_key(target) {
            return Err(GraphError::NodeNotFound(target.to_string()));
        }
        if self
            .edges
            .values()
            .any(|e| e.source == source && e.target == target)
        {
            return Err(GraphError::DuplicateEdge {
                source_id: source.to_string(),
                target: target.to_string(),
            });
        }
        let edge = GraphEdge {
            id: format!("edge-{}", uuid::Uuid::new_v4()),
            source: source.to_string(),
            target: target.to_string(),
            label,
        };
        let id = edge.id.clone();
        log::debug!("add_edge {} -> {}", source, target);
        self.edges.insert(id.clone(), edge);
        Ok(&self.edges[&id])
    }

    /// Insert a fully-formed edge, keeping its id (document import path)
    pub(crate) fn insert_edge(&mut self, edge: GraphEdge) -> Result<()> {
        if edge.source == edge.target {
            return Err(GraphError::SelfEdge(edge.source));
        }
        if !self.nodes.contains_key(&edge.source) {
            return Err(GraphError::NodeNotFound(edge.source));
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::NodeNotFound(edge.target));
        }
        if self
            .edges
            .values()
            .any(|e| e.source == edge.source && e.target == edge.target)
        {
            return Err(GraphError::DuplicateEdge {
                source_id: edge.source,
                target: edge.target,
            });
        }
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    /// Remove an edge by id
    pub fn remove_edge(&mut self, id: &str) -> Result<GraphEdge> {
        self.edges
            .remove(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_string()))
    }

    /// Move a node to a new position
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Set a node's label
    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.label = label.into();
        Ok(())
    }

    /// Replace a node's config; the variant must match the node kind
    pub fn set_config(&mut self, id: &str, config: NodeConfig) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        if config.kind() != node.kind {
            return Err(GraphError::ConfigMismatch {
                node_id: id.to_string(),
                expected: node.kind.label().to_string(),
            });
        }
        node.config = config;
        Ok(())
    }

    /// Get a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Get an edge by id
    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id)
    }

    /// Iterate nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Iterate edges in id order
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ids of nodes the given node depends on (upstream)
    pub fn dependencies_of(&self, node_id: &str) -> Vec<NodeId> {
        self.edges
            .values()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Ids of nodes that depend on the given node (downstream)
    pub fn dependents_of(&self, node_id: &str) -> Vec<NodeId> {
        self.edges
            .values()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.clone())
            .collect()
    }

    /// Take an immutable snapshot of the current structure
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Replace the model contents with a snapshot (undo/redo path)
    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        self.nodes = snapshot
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        self.edges = snapshot
            .edges
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}
