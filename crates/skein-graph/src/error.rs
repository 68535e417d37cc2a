//! Error types for the graph model and document layer

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while mutating or (de)serializing a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node type is not registered in the catalog
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    /// Referenced node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Referenced edge does not exist
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// An edge between the same (source, target) pair already exists
    #[error("Duplicate edge: {source_id} -> {target}")]
    DuplicateEdge { source_id: String, target: String },

    /// An edge may not connect a node to itself
    #[error("Self edge rejected on node: {0}")]
    SelfEdge(String),

    /// Config variant does not match the node kind
    #[error("Config mismatch for node '{node_id}': expected {expected} config")]
    ConfigMismatch { node_id: String, expected: String },

    /// The graph contains a dependency cycle
    #[error("Cyclic graph: no topological order exists")]
    CyclicGraph,

    /// A persisted document disagrees with itself
    #[error("Inconsistent document: {0}")]
    InconsistentDocument(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
