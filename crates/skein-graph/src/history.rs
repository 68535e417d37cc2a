//! Undo/redo history using compressed snapshots
//!
//! Linear, cursor-based history over immutable graph snapshots.
//! Snapshots are stored as zstd-compressed JSON: compression is fast
//! and the graphs are small, so full snapshots beat maintaining
//! inverse operations for every mutation.
//!
//! The initial (empty or loaded) graph is pushed once at load time so
//! undo can always return to the starting point.

use std::collections::VecDeque;

use crate::error::{GraphError, Result};
use crate::types::GraphSnapshot;

/// Maximum number of snapshots kept before the oldest is evicted
pub const HISTORY_CAPACITY: usize = 50;

/// Bounded undo/redo stack of graph snapshots
pub struct HistoryStack {
    /// Compressed snapshots (zstd)
    snapshots: VecDeque<Vec<u8>>,
    /// Current position in the stack
    cursor: usize,
    /// Maximum number of snapshots to keep
    capacity: usize,
}

impl HistoryStack {
    /// Create a history stack with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a history stack with an explicit capacity (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Push a new snapshot onto the stack
    ///
    /// Truncates any redo history after the cursor, appends the
    /// snapshot, and evicts from the front past capacity.
    pub fn push(&mut self, snapshot: &GraphSnapshot) -> Result<()> {
        let json = serde_json::to_vec(snapshot)?;
        let compressed =
            zstd::encode_all(&json[..], 3).map_err(|e| GraphError::Compression(e.to_string()))?;

        while self.snapshots.len() > self.cursor + 1 {
            self.snapshots.pop_back();
        }

        self.snapshots.push_back(compressed);
        self.cursor = self.snapshots.len() - 1;

        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
            if self.cursor > 0 {
                self.cursor -= 1;
            }
        }

        Ok(())
    }

    /// Undo: move back one snapshot
    ///
    /// Returns the previous snapshot, or None at the first entry.
    pub fn undo(&mut self) -> Option<Result<GraphSnapshot>> {
        if self.cursor > 0 {
            self.cursor -= 1;
            Some(self.decompress(self.cursor))
        } else {
            None
        }
    }

    /// Redo: move forward one snapshot
    ///
    /// Returns the next snapshot, or None at the last entry.
    pub fn redo(&mut self) -> Option<Result<GraphSnapshot>> {
        if self.cursor + 1 < self.snapshots.len() {
            self.cursor += 1;
            Some(self.decompress(self.cursor))
        } else {
            None
        }
    }

    /// The snapshot at the cursor, without moving it
    pub fn current(&self) -> Option<Result<GraphSnapshot>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.decompress(self.cursor))
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop all snapshots
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }

    /// Total compressed size of all snapshots in bytes
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(|s| s.len()).sum()
    }

    fn decompress(&self, index: usize) -> Result<GraphSnapshot> {
        let compressed = &self.snapshots[index];
        let json =
            zstd::decode_all(&compressed[..]).map_err(|e| GraphError::Compression(e.to_string()))?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&json)?;
        Ok(snapshot)
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}
