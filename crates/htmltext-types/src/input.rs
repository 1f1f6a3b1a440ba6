//! Pointer input events.
//!
//! A surface receives pointer input as a [`PointerSequence`]: one gesture
//! from the first `Down` to the terminating `Up` or `Cancel`. Coordinates
//! are surface-relative pixels.

use serde::{Deserialize, Serialize};

/// A single pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Pointer pressed (touch down / mouse button down).
    Down { x: i32, y: i32 },
    /// Pointer moved while pressed.
    Move { x: i32, y: i32 },
    /// Pointer released.
    Up { x: i32, y: i32 },
    /// Gesture aborted by the platform.
    Cancel,
}

impl PointerEvent {
    /// Position of the event, if it carries one.
    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            Self::Down { x, y } | Self::Move { x, y } | Self::Up { x, y } => Some((x, y)),
            Self::Cancel => None,
        }
    }
}

/// One pointer gesture, down through up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerSequence {
    pub events: Vec<PointerEvent>,
}

impl PointerSequence {
    pub fn new(events: Vec<PointerEvent>) -> Self {
        Self { events }
    }

    /// A press and release at the same point.
    pub fn tap(x: i32, y: i32) -> Self {
        Self::new(vec![PointerEvent::Down { x, y }, PointerEvent::Up { x, y }])
    }

    /// A press at `from` dragged and released at `to`.
    pub fn drag(from: (i32, i32), to: (i32, i32)) -> Self {
        Self::new(vec![
            PointerEvent::Down {
                x: from.0,
                y: from.1,
            },
            PointerEvent::Move { x: to.0, y: to.1 },
            PointerEvent::Up { x: to.0, y: to.1 },
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointerEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when the gesture ends with a release (not a cancel).
    pub fn is_complete(&self) -> bool {
        matches!(self.events.last(), Some(PointerEvent::Up { .. }))
    }
}
