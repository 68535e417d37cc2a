//! Persisted workflow document import/export
//!
//! The document is the exchange format with the external persistence
//! collaborator. Each exported node carries a derived `dependencies`
//! array (all edges whose target is that node); it is redundant with
//! `edges` and import verifies the two agree.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::model::GraphModel;
use crate::types::{NodeConfig, NodeId, NodeKind, Position};

/// How agents in the workflow are expected to collaborate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStrategy {
    /// One node at a time, in dependency order
    #[default]
    Sequential,
    /// Independent branches run concurrently
    Parallel,
    /// A coordinator delegates to worker branches
    Hierarchical,
}

/// A node as persisted in the workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub config: NodeConfig,
    pub position: Position,
    /// Derived: sources of all edges targeting this node, sorted
    #[serde(default)]
    pub dependencies: Vec<NodeId>,
}

/// An edge as persisted in the workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEdge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The `spec` body of a workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<DocumentEdge>,
    pub collaboration_strategy: CollaborationStrategy,
}

/// A complete persisted workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub name: String,
    pub description: String,
    pub version: String,
    pub spec: DocumentSpec,
}

/// Export a model into a workflow document
///
/// Run-scoped status fields are not exported; a re-imported graph
/// always starts with every node Pending.
pub fn export(
    model: &GraphModel,
    name: impl Into<String>,
    description: impl Into<String>,
    strategy: CollaborationStrategy,
) -> WorkflowDocument {
    let nodes = model
        .nodes()
        .map(|node| {
            let mut dependencies = model.dependencies_of(&node.id);
            dependencies.sort();
            DocumentNode {
                id: node.id.clone(),
                kind: node.kind,
                label: node.label.clone(),
                config: node.config.clone(),
                position: node.position,
                dependencies,
            }
        })
        .collect();

    let edges = model
        .edges()
        .map(|edge| DocumentEdge {
            from: edge.source.clone(),
            to: edge.target.clone(),
            label: edge.label.clone(),
        })
        .collect();

    WorkflowDocument {
        name: name.into(),
        description: description.into(),
        version: "1".to_string(),
        spec: DocumentSpec {
            nodes,
            edges,
            collaboration_strategy: strategy,
        },
    }
}

/// Import a workflow document into a fresh model
///
/// The graph is rebuilt through the model's own operations so every
/// structural invariant holds afterward. Fails with
/// `InconsistentDocument` when a node's `dependencies` array disagrees
/// with the document's edges.
pub fn import(document: &WorkflowDocument) -> Result<GraphModel> {
    let mut model = GraphModel::new();

    for doc_node in &document.spec.nodes {
        model.insert_node(crate::types::GraphNode {
            id: doc_node.id.clone(),
            kind: doc_node.kind,
            label: doc_node.label.clone(),
            position: doc_node.position,
            config: doc_node.config.clone(),
            status: crate::types::NodeStatus::Pending,
            result: None,
            error: None,
        })?;
    }

    for (i, doc_edge) in document.spec.edges.iter().enumerate() {
        model.insert_edge(crate::types::GraphEdge {
            id: format!("edge-{}", i + 1),
            source: doc_edge.from.clone(),
            target: doc_edge.to.clone(),
            label: doc_edge.label.clone(),
        })?;
    }

    // The per-node dependencies arrays are redundant with edges;
    // reject a document where they drifted apart.
    for doc_node in &document.spec.nodes {
        let mut derived = model.dependencies_of(&doc_node.id);
        derived.sort();
        let mut declared = doc_node.dependencies.clone();
        declared.sort();
        if derived != declared {
            return Err(GraphError::InconsistentDocument(format!(
                "node '{}' declares dependencies {:?} but edges imply {:?}",
                doc_node.id, declared, derived
            )));
        }
    }

    log::info!(
        "Imported workflow '{}': {} nodes, {} edges",
        document.name,
        model.node_count(),
        model.edge_count()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn sample_model() -> (GraphModel, NodeId, NodeId, NodeId) {
        let mut model = GraphModel::new();
        let a = model
            .add_node(NodeKind::Agent, Position::new(0.0, 0.0))
            .unwrap()
            .id
            .clone();
        let b = model
            .add_node(NodeKind::Conditional, Position::new(200.0, 0.0))
            .unwrap()
            .id
            .clone();
        let c = model
            .add_node(NodeKind::Tool, Position::new(400.0, 0.0))
            .unwrap()
            .id
            .clone();
        model.add_edge(&a, &b).unwrap();
        model
            .add_edge_labelled(&b, &c, Some("on true".to_string()))
            .unwrap();
        (model, a, b, c)
    }

    #[test]
    fn test_export_derives_dependencies() {
        let (model, a, b, c) = sample_model();
        let doc = export(&model, "wf", "test", CollaborationStrategy::Sequential);

        let node_c = doc.spec.nodes.iter().find(|n| n.id == c).unwrap();
        assert_eq!(node_c.dependencies, vec![b.clone()]);
        let node_a = doc.spec.nodes.iter().find(|n| n.id == a).unwrap();
        assert!(node_a.dependencies.is_empty());
        assert_eq!(doc.spec.edges.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let (model, ..) = sample_model();
        let doc = export(&model, "wf", "test", CollaborationStrategy::Parallel);
        let imported = import(&doc).unwrap();

        let original = model.snapshot();
        let round_tripped = imported.snapshot();

        assert_eq!(original.nodes.len(), round_tripped.nodes.len());
        for node in &original.nodes {
            let other = round_tripped.find_node(&node.id).unwrap();
            assert_eq!(other.kind, node.kind);
            assert_eq!(other.label, node.label);
            assert_eq!(other.position, node.position);
            assert_eq!(other.config, node.config);
        }

        let mut original_pairs: Vec<(String, String, Option<String>)> = original
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.label.clone()))
            .collect();
        let mut imported_pairs: Vec<(String, String, Option<String>)> = round_tripped
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.label.clone()))
            .collect();
        original_pairs.sort();
        imported_pairs.sort();
        assert_eq!(original_pairs, imported_pairs);
    }

    #[test]
    fn test_import_rejects_inconsistent_dependencies() {
        let (model, ..) = sample_model();
        let mut doc = export(&model, "wf", "test", CollaborationStrategy::Sequential);
        doc.spec.nodes[0].dependencies = vec!["phantom".to_string()];

        let err = import(&doc).unwrap_err();
        assert!(matches!(err, GraphError::InconsistentDocument(_)));
    }

    #[test]
    fn test_import_rejects_dangling_edge() {
        let (model, ..) = sample_model();
        let mut doc = export(&model, "wf", "test", CollaborationStrategy::Sequential);
        doc.spec.edges.push(DocumentEdge {
            from: "missing".to_string(),
            to: doc.spec.nodes[0].id.clone(),
            label: None,
        });

        assert!(matches!(
            import(&doc),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_document_json_shape() {
        let (model, ..) = sample_model();
        let doc = export(&model, "wf", "test", CollaborationStrategy::Hierarchical);
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["spec"]["collaboration_strategy"], "hierarchical");
        assert!(json["spec"]["nodes"][0]["type"].is_string());
        assert!(json["spec"]["nodes"][0]["position"]["x"].is_number());
    }
}
