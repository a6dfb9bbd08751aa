//! Turns pointer gestures into document edits.
//!
//! A gesture starts on pointer-down. Far from every line it creates a new
//! line; near one it drags that line's start, end, or the whole line,
//! depending on how close the pointer is to the line's clipped ends.

use crate::document::{Document, LineRecord, append_line_with_relations};
use crate::error::{DocumentResult, ValidationError};
use crate::geometry::finite_point;
use crate::ids::{IdGenerator, LineId};
use crate::input::PointerEvent;
use crate::view::ViewStateEngine;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pointer-down closer than this to a line selects it.
pub const SELECTION_THRESHOLD: f64 = 32.0;
/// Within this distance of a clipped end, a drag moves that end.
pub const EDGE_THRESHOLD: f64 = 64.0;

/// Distance thresholds for gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub selection_threshold: f64,
    pub edge_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            selection_threshold: SELECTION_THRESHOLD,
            edge_threshold: EDGE_THRESHOLD,
        }
    }
}

impl GestureConfig {
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// Which part of a line a drag acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragMode {
    Start,
    End,
    /// Translate the whole line.
    Center,
}

/// State of the gesture machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// Drawing a new line that pivots around `origin`.
    Creating { line: LineId, origin: Point },
    Dragging {
        line: LineId,
        mode: DragMode,
        /// Clipped viewport crossings of the line at pointer-down.
        edges: [Point; 2],
        /// Pointer position of the previous event.
        last: Point,
    },
}

/// A mutation requested by a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEdit {
    AppendLine(LineRecord),
    UpdateLine { id: LineId, start: Point, end: Point },
}

impl DocumentEdit {
    /// Apply to `document`. Appended lines are related to every line
    /// already in it.
    pub fn apply<D: Document + ?Sized>(self, document: &mut D, ids: &mut dyn IdGenerator) -> DocumentResult<()> {
        match self {
            DocumentEdit::AppendLine(line) => append_line_with_relations(document, line, ids),
            DocumentEdit::UpdateLine { id, start, end } => document.update_line(&id, start, end),
        }
    }
}

/// The pointer state machine.
#[derive(Debug, Clone, Default)]
pub struct GestureAction {
    config: GestureConfig,
    state: GestureState,
}

impl GestureAction {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Dispatch a pointer event.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        view: &ViewStateEngine,
        ids: &mut dyn IdGenerator,
    ) -> Result<Option<DocumentEdit>, ValidationError> {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position, view, ids),
            PointerEvent::Move { position } => self.pointer_move(position, view),
            PointerEvent::Up { .. } => {
                self.pointer_up();
                Ok(None)
            }
        }
    }

    /// Start a gesture: select the nearest line or create a new one.
    /// Only creation edits the document.
    pub fn pointer_down(
        &mut self,
        position: Point,
        view: &ViewStateEngine,
        ids: &mut dyn IdGenerator,
    ) -> Result<Option<DocumentEdit>, ValidationError> {
        let position = finite_point("x", "y", position)?;
        if !self.is_idle() {
            log::debug!("Pointer down during {:?}, starting over", self.state);
        }

        if let Some(nearest) = view
            .nearest_line(position)
            .filter(|n| n.distance < self.config.selection_threshold)
        {
            let bounds = view.bounds();
            let edges = nearest.line.edges_for(bounds.w, bounds.h)?;
            let mode = if position.distance(edges[0]) <= self.config.edge_threshold {
                DragMode::Start
            } else if position.distance(edges[1]) <= self.config.edge_threshold {
                DragMode::End
            } else {
                DragMode::Center
            };
            let line = nearest.line.id().clone();
            log::debug!("Dragging line {} ({:?})", line, mode);
            self.state = GestureState::Dragging {
                line,
                mode,
                edges,
                last: position,
            };
            return Ok(None);
        }

        let record = LineRecord::new(ids.next_line_id(), position, position);
        log::debug!("Creating line {}", record.id);
        self.state = GestureState::Creating {
            line: record.id.clone(),
            origin: position,
        };
        Ok(Some(DocumentEdit::AppendLine(record)))
    }

    /// Continue the gesture. Moves while idle do nothing.
    pub fn pointer_move(
        &mut self,
        position: Point,
        view: &ViewStateEngine,
    ) -> Result<Option<DocumentEdit>, ValidationError> {
        let position = finite_point("x", "y", position)?;
        let edit = match &mut self.state {
            GestureState::Idle => None,
            GestureState::Creating { line, origin } => Some(DocumentEdit::UpdateLine {
                id: line.clone(),
                start: *origin,
                end: position,
            }),
            GestureState::Dragging {
                line,
                mode,
                edges,
                last,
            } => {
                let delta = position - *last;
                *last = position;
                match mode {
                    DragMode::Start => Some(DocumentEdit::UpdateLine {
                        id: line.clone(),
                        start: position,
                        end: edges[1],
                    }),
                    DragMode::End => Some(DocumentEdit::UpdateLine {
                        id: line.clone(),
                        start: edges[0],
                        end: position,
                    }),
                    DragMode::Center => match view.line(line) {
                        Some(current) => {
                            let mut moved = current.clone();
                            moved.translate(delta)?;
                            Some(DocumentEdit::UpdateLine {
                                id: line.clone(),
                                start: moved.start(),
                                end: moved.end(),
                            })
                        }
                        None => {
                            log::warn!("Dragged line {} is no longer cached", line);
                            None
                        }
                    },
                }
            }
        };
        Ok(edit)
    }

    /// Drop the current gesture, e.g. when its edit was rejected.
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            log::debug!("Cancelling {:?}", self.state);
        }
        self.state = GestureState::Idle;
    }

    /// End the gesture. The last move already committed the coordinates.
    pub fn pointer_up(&mut self) {
        self.state = GestureState::Idle;
    }
}
