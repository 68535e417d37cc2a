//! Pointer interaction state machine for the graph editor
//!
//! All editor state (interaction state, selection, transform) lives in
//! one explicit controller struct, so a gesture can be driven and
//! asserted in tests without simulating a real input device. Each
//! input method is a transition on `InteractionState` plus its effects
//! on the graph model and the history stack.
//!
//! Committed structural mutations (node placement, drag end, edge
//! wiring, deletion) push one history snapshot each; cancelled
//! gestures push nothing.

use serde::{Deserialize, Serialize};

use skein_graph::{
    GraphError, GraphModel, HistoryStack, NodeId, NodeKind, Position, Result,
};

use crate::transform::{CanvasTransform, ScreenPoint};

/// What the pointer went down or up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas area
    Canvas,
    /// A node's body
    NodeBody(NodeId),
    /// A node's output connector (edge source)
    OutputConnector(NodeId),
    /// A node's input connector (edge target)
    InputConnector(NodeId),
}

/// Current interaction state of the editor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InteractionState {
    /// No gesture in flight
    #[default]
    Idle,
    /// Dragging empty canvas to pan the view
    PanningCanvas { last_screen: ScreenPoint },
    /// Dragging a node to a new position
    DraggingNode { node_id: NodeId, moved: bool },
    /// Wiring an edge from a node's output connector
    ConnectingEdge {
        from_node: NodeId,
        cursor_world: Position,
    },
}

/// Drives graph mutations from pointer and key input
pub struct InteractionController {
    model: GraphModel,
    transform: CanvasTransform,
    history: HistoryStack,
    state: InteractionState,
    selection: Option<NodeId>,
}

impl InteractionController {
    /// Wrap a model, pushing its current state as the history origin
    pub fn new(model: GraphModel) -> Result<Self> {
        let mut history = HistoryStack::new();
        history.push(&model.snapshot())?;
        Ok(Self {
            model,
            transform: CanvasTransform::new(),
            history,
            state: InteractionState::Idle,
            selection: None,
        })
    }

    /// Pointer pressed on a target at a screen position
    pub fn pointer_down(&mut self, target: PointerTarget, screen: ScreenPoint) {
        if self.state != InteractionState::Idle {
            // One gesture at a time; a second press is ignored
            return;
        }
        match target {
            PointerTarget::Canvas => {
                self.selection = None;
                self.state = InteractionState::PanningCanvas {
                    last_screen: screen,
                };
            }
            PointerTarget::NodeBody(node_id) | PointerTarget::InputConnector(node_id) => {
                if self.model.node(&node_id).is_none() {
                    log::warn!("pointer_down on missing node {}", node_id);
                    return;
                }
                self.selection = Some(node_id.clone());
                self.state = InteractionState::DraggingNode {
                    node_id,
                    moved: false,
                };
            }
            PointerTarget::OutputConnector(node_id) => {
                if self.model.node(&node_id).is_none() {
                    log::warn!("pointer_down on missing connector {}", node_id);
                    return;
                }
                self.state = InteractionState::ConnectingEdge {
                    from_node: node_id,
                    cursor_world: self.transform.unproject(screen),
                };
            }
        }
    }

    /// Pointer moved to a screen position
    pub fn pointer_move(&mut self, screen: ScreenPoint) {
        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::PanningCanvas { last_screen } => {
                let dx = screen.x - last_screen.x;
                let dy = screen.y - last_screen.y;
                *last_screen = screen;
                self.transform.pan(dx, dy);
            }
            InteractionState::DraggingNode { node_id, moved } => {
                let world = self.transform.unproject(screen);
                let id = node_id.clone();
                *moved = true;
                if let Err(e) = self.model.move_node(&id, Position::new(world.x, world.y)) {
                    log::warn!("drag lost its node: {}", e);
                    self.state = InteractionState::Idle;
                }
            }
            InteractionState::ConnectingEdge { cursor_world, .. } => {
                *cursor_world = self.transform.unproject(screen);
            }
        }
    }

    /// Pointer released on a target
    pub fn pointer_up(&mut self, target: PointerTarget) {
        let state = std::mem::take(&mut self.state);
        match state {
            InteractionState::Idle | InteractionState::PanningCanvas { .. } => {}
            InteractionState::DraggingNode { moved, .. } => {
                if moved {
                    self.commit();
                }
            }
            InteractionState::ConnectingEdge { from_node, .. } => {
                if let PointerTarget::InputConnector(to_node) = target {
                    match self.model.add_edge(&from_node, &to_node) {
                        Ok(_) => self.commit(),
                        // Re-wiring an existing pair or a self-loop is
                        // not an error to the user
                        Err(GraphError::DuplicateEdge { source_id, target }) => {
                            log::debug!("ignored duplicate edge {} -> {}", source_id, target);
                        }
                        Err(GraphError::SelfEdge(id)) => {
                            log::debug!("ignored self edge on {}", id);
                        }
                        Err(e) => log::warn!("edge wiring failed: {}", e),
                    }
                }
            }
        }
    }

    /// Escape key: cancel any in-flight gesture and clear selection
    pub fn escape(&mut self) {
        if let InteractionState::DraggingNode { moved: true, .. } = self.state {
            // Roll the uncommitted drag back to the last snapshot
            match self.history.current() {
                Some(Ok(snapshot)) => self.model.restore(snapshot),
                Some(Err(e)) => log::warn!("could not roll back drag: {}", e),
                None => {}
            }
        }
        self.state = InteractionState::Idle;
        self.selection = None;
    }

    /// Delete key: remove the selected node (Idle only)
    pub fn delete(&mut self) {
        if self.state != InteractionState::Idle {
            return;
        }
        let Some(node_id) = self.selection.take() else {
            return;
        };
        match self.model.remove_node(&node_id) {
            Ok(_) => self.commit(),
            Err(e) => log::warn!("delete failed: {}", e),
        }
    }

    /// Palette drop: create a node of `kind` under the screen point
    pub fn place_node(&mut self, kind: NodeKind, screen: ScreenPoint) -> Result<NodeId> {
        let world = self.transform.unproject(screen);
        let id = self
            .model
            .add_node(kind, Position::new(world.x, world.y))?
            .id
            .clone();
        self.commit();
        self.selection = Some(id.clone());
        Ok(id)
    }

    /// Undo the last committed mutation; returns false at the origin
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo() {
            Some(snapshot) => {
                self.model.restore(snapshot?);
                self.selection = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Redo a previously undone mutation; returns false at the tip
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo() {
            Some(snapshot) => {
                self.model.restore(snapshot?);
                self.selection = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The graph model under edit
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// The canvas transform
    pub fn transform(&self) -> &CanvasTransform {
        &self.transform
    }

    /// Mutable canvas transform (zoom controls live outside gestures)
    pub fn transform_mut(&mut self) -> &mut CanvasTransform {
        &mut self.transform
    }

    /// Current interaction state
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Currently selected node, if any
    pub fn selection(&self) -> Option<&NodeId> {
        self.selection.as_ref()
    }

    /// The in-flight wire while connecting: (source node, cursor world)
    pub fn pending_wire(&self) -> Option<(&NodeId, Position)> {
        match &self.state {
            InteractionState::ConnectingEdge {
                from_node,
                cursor_world,
            } => Some((from_node, *cursor_world)),
            _ => None,
        }
    }

    /// The undo/redo history
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    fn commit(&mut self) {
        if let Err(e) = self.history.push(&self.model.snapshot()) {
            log::warn!("history push failed: {}", e);
        }
    }
}
