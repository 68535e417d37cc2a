//! Error types for run sequencing

use thiserror::Error;

/// Result type alias using RunError
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors that abort a run before or during scheduling
///
/// Node-scoped execution failures are not represented here; they are
/// captured on the node and propagate by blocking dependents.
#[derive(Debug, Error)]
pub enum RunError {
    /// The graph has a dependency cycle; nothing was executed
    #[error("Cyclic graph: no dependency order exists")]
    CyclicGraph,

    /// A spawned node task panicked or was aborted
    #[error("Node task failed to join: {0}")]
    Join(String),
}
