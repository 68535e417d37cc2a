//! Canvas transform: the affine mapping between screen and world space
//!
//! Screen coordinates are pixels; world coordinates are where nodes
//! live. The mapping is `screen = world * zoom + offset`. Zoom is
//! anchored at the canvas origin, not the cursor.

use serde::{Deserialize, Serialize};

use skein_graph::Position;

/// Lower zoom clamp
pub const MIN_ZOOM: f64 = 0.5;
/// Upper zoom clamp
pub const MAX_ZOOM: f64 = 2.0;

/// A point in screen space (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan offset and zoom factor for one canvas
///
/// Pure presentation state; not persisted with the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasTransform {
    /// Pan offset in screen pixels
    pub offset: ScreenPoint,
    /// Zoom factor, clamped to [MIN_ZOOM, MAX_ZOOM]
    pub zoom: f64,
}

impl CanvasTransform {
    /// Identity transform: no pan, zoom 1.0
    pub fn new() -> Self {
        Self {
            offset: ScreenPoint::default(),
            zoom: 1.0,
        }
    }

    /// Map a world point to screen space
    pub fn project(&self, world: Position) -> ScreenPoint {
        ScreenPoint {
            x: world.x * self.zoom + self.offset.x,
            y: world.y * self.zoom + self.offset.y,
        }
    }

    /// Map a screen point to world space
    pub fn unproject(&self, screen: ScreenPoint) -> Position {
        Position {
            x: (screen.x - self.offset.x) / self.zoom,
            y: (screen.y - self.offset.y) / self.zoom,
        }
    }

    /// Shift the pan offset; unbounded
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// Set the zoom factor, clamped to [MIN_ZOOM, MAX_ZOOM]
    pub fn set_zoom(&mut self, factor: f64) {
        self.zoom = factor.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self::new()
    }
}
