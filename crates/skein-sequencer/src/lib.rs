//! Skein sequencer - async execution over frozen workflow graphs
//!
//! The sequencer consumes an immutable `GraphSnapshot` taken at run
//! start, so concurrent editing of the authoring graph can never
//! corrupt an in-flight run. It walks the graph in dependency order:
//!
//! - Cycles fail the run up front, before any node transition
//! - Independent ready nodes execute concurrently as tasks
//! - A failed node blocks its transitive dependents; other branches
//!   keep running
//! - Cancellation blocks not-yet-started nodes and drains in-flight
//!   work
//!
//! Per-node work happens behind the `NodeExecutor` trait; progress
//! streams through an `EventSink` and incremental run records through
//! a `RecordSink`.

pub mod error;
pub mod events;
pub mod executor;
pub mod run;
pub mod sequencer;

// Re-export key types
pub use error::{Result, RunError};
pub use events::{ChannelSink, EventError, EventSink, NullSink, RunEvent};
pub use executor::{NodeExecutor, SimulatedExecutor};
pub use run::{
    MetricsSnapshot, NodeOutcome, NullRecordSink, RecordSink, RunContext, RunMetrics, RunRecord,
    RunStatus,
};
pub use sequencer::{CancelHandle, Sequencer};
