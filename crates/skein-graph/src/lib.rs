//! Skein graph core - authoring model for visual workflow graphs
//!
//! This crate owns the data side of the workflow composer:
//!
//! - Typed nodes and directed dependency edges, stored in id-keyed
//!   maps (edges hold ids, never references)
//! - A node type catalog driving palette rendering and creation-time
//!   defaults
//! - Atomic, invariant-preserving graph mutations
//! - Structural validation with Kahn's-algorithm cycle detection
//! - Bounded undo/redo over zstd-compressed snapshots
//! - Import/export of the persisted workflow document format

pub mod catalog;
pub mod document;
pub mod error;
pub mod history;
pub mod model;
pub mod types;
pub mod validation;

// Re-export key types
pub use catalog::{NodeTypeCatalog, NodeTypeEntry};
pub use document::{export, import, CollaborationStrategy, WorkflowDocument};
pub use error::{GraphError, Result};
pub use history::{HistoryStack, HISTORY_CAPACITY};
pub use model::GraphModel;
pub use types::{
    EdgeId, GraphEdge, GraphNode, GraphSnapshot, NodeCategory, NodeConfig, NodeId, NodeKind,
    NodeStatus, Position,
};
pub use validation::{topological_order, validate, ValidationError};
