//! Event types for streaming run progress
//!
//! Events are sent from the sequencer to any consumer (UI, logs,
//! tests) to report per-node transitions and run lifecycle changes.

use serde::{Deserialize, Serialize};

/// Trait for sending run events
///
/// Abstracts over the transport (mpsc channel, UI bridge, test
/// collector) so the sequencer does not care who is listening.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g. the
    /// channel closed). The sequencer logs and continues.
    fn send(&self, event: RunEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    /// The run started
    #[serde(rename_all = "camelCase")]
    RunStarted { run_id: String, workflow_id: String },

    /// A node started executing
    #[serde(rename_all = "camelCase")]
    NodeStarted { run_id: String, node_id: String },

    /// A node completed successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        run_id: String,
        node_id: String,
        result: serde_json::Value,
    },

    /// A node failed; its dependents will be blocked
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: String,
        node_id: String,
        error: String,
    },

    /// A node will never run because an upstream dependency failed
    /// or the run was cancelled before it started
    #[serde(rename_all = "camelCase")]
    NodeBlocked { run_id: String, node_id: String },

    /// Progress update: completed nodes out of total
    #[serde(rename_all = "camelCase")]
    Progress {
        run_id: String,
        completed: usize,
        total: usize,
    },

    /// The run finished with every node completed
    #[serde(rename_all = "camelCase")]
    RunCompleted { run_id: String },

    /// The run finished with at least one failed node
    #[serde(rename_all = "camelCase")]
    RunFailed { run_id: String },

    /// The run was cancelled by the caller
    #[serde(rename_all = "camelCase")]
    RunCancelled { run_id: String },
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn send(&self, _event: RunEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Sink backed by an unbounded tokio mpsc channel
pub struct ChannelSink {
    sender: tokio::sync::mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_shape() {
        let event = RunEvent::NodeFailed {
            run_id: "r1".to_string(),
            node_id: "n1".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeFailed");
        assert_eq!(json["nodeId"], "n1");
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.send(RunEvent::RunCompleted {
            run_id: "r1".to_string(),
        })
        .unwrap();
        let event = receiver.try_recv().unwrap();
        assert!(matches!(event, RunEvent::RunCompleted { .. }));
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        assert!(sink
            .send(RunEvent::RunCompleted {
                run_id: "r1".to_string()
            })
            .is_err());
    }
}
