//! Skein canvas - coordinate math and editor interaction
//!
//! Two pieces: `CanvasTransform`, the pure affine mapping between
//! screen pixels and world coordinates under pan and zoom, and
//! `InteractionController`, the pointer-driven state machine that
//! turns input events into graph mutations and history checkpoints.

pub mod controller;
pub mod transform;

// Re-export key types
pub use controller::{InteractionController, InteractionState, PointerTarget};
pub use transform::{CanvasTransform, ScreenPoint, MAX_ZOOM, MIN_ZOOM};
