//! Pointer stream normalisation.
//!
//! Hosts deliver press/move/release/cancel with absolute coordinates; the
//! explorer consumes a three-phase pan with totals relative to the press.

use crate::geometry::Point;

/// Raw pointer input from the host, in renderer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Pointer went down.
    Pressed(Point),
    /// Pointer moved.
    Moved(Point),
    /// Pointer went up.
    Released(Point),
    /// The platform aborted the gesture.
    Cancelled(Point),
}

/// Normalised pan gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanEvent {
    /// Press at the given point.
    Started(Point),
    /// Move while pressed.
    Running {
        /// Displacement from the press point.
        total: Point,
        /// Current pointer position.
        position: Point,
    },
    /// Release or cancel.
    Completed {
        /// Displacement from the press point.
        total: Point,
        /// Final pointer position.
        position: Point,
    },
}

impl PanEvent {
    /// Returns the tap position if this completes a pan that stayed within
    /// `slop` pixels of its press point.
    #[must_use]
    pub fn as_tap(&self, slop: f32) -> Option<Point> {
        match *self {
            Self::Completed { total, position } if total.length() <= slop => Some(position),
            _ => None,
        }
    }
}

/// Turns a pointer stream into pan events.
#[derive(Debug, Clone, Default)]
pub struct GestureNormalizer {
    press: Option<Point>,
}

impl GestureNormalizer {
    /// Creates an idle normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a press is being tracked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.press.is_some()
    }

    /// Feeds one pointer event. Moves and releases with no prior press
    /// are dropped; a press while already pressed restarts the gesture.
    pub fn handle(&mut self, event: PointerEvent) -> Option<PanEvent> {
        match event {
            PointerEvent::Pressed(position) => {
                self.press = Some(position);
                Some(PanEvent::Started(position))
            }
            PointerEvent::Moved(position) => {
                let start = self.press?;
                Some(PanEvent::Running { total: position - start, position })
            }
            PointerEvent::Released(position) | PointerEvent::Cancelled(position) => {
                let Some(start) = self.press.take() else {
                    tracing::trace!("release without press dropped");
                    return None;
                };
                Some(PanEvent::Completed { total: position - start, position })
            }
        }
    }
}

/// Maps a crossterm left-button mouse event to a pointer event in cell
/// coordinates. Other buttons and plain moves map to `None`.
#[cfg(feature = "crossterm")]
#[must_use]
pub fn pointer_from_mouse(event: crossterm::event::MouseEvent) -> Option<PointerEvent> {
    use crossterm::event::{MouseButton, MouseEventKind};

    let point = Point::new(f32::from(event.column), f32::from(event.row));
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(PointerEvent::Pressed(point)),
        MouseEventKind::Drag(MouseButton::Left) => Some(PointerEvent::Moved(point)),
        MouseEventKind::Up(MouseButton::Left) => Some(PointerEvent::Released(point)),
        _ => None,
    }
}
