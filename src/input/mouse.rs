//! Mouse Button Tracking
//!
//! Tracks which buttons are held, which surface received each press, and
//! whether a press/release pair forms a completed click.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::input::coordinates::CursorPoint;
use crate::input::routing::SurfaceTarget;

/// Mouse button identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Left mouse button
    #[default]
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
    /// Back side button
    Back,
    /// Forward side button
    Forward,
}

impl MouseButton {
    /// DOM `MouseEvent.button` value
    pub fn dom_button(self) -> u8 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::Back => 3,
            MouseButton::Forward => 4,
        }
    }

    /// Convert from a DOM `MouseEvent.button` value
    pub fn from_dom_button(button: u8) -> Option<Self> {
        match button {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            3 => Some(MouseButton::Back),
            4 => Some(MouseButton::Forward),
            _ => None,
        }
    }

    /// Check if this is the primary button
    pub fn is_primary(self) -> bool {
        matches!(self, MouseButton::Left)
    }
}

/// A held button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressRecord {
    /// Surface that received the press
    pub target: SurfaceTarget,
    /// Cursor position at press time (chrome coordinates)
    pub origin: CursorPoint,
    /// Press timestamp
    pub at: Instant,
}

/// Result of a button release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonRelease {
    /// The matching press, if the button was held
    pub press: Option<PressRecord>,
    /// Whether press and release form a click
    pub completed_click: bool,
}

/// Button state tracker
#[derive(Debug, Clone)]
pub struct ButtonTracker {
    /// Held buttons
    pressed: HashMap<MouseButton, PressRecord>,

    /// Max cursor travel between press and release for a click (pixels)
    click_slop: f64,
}

impl ButtonTracker {
    /// Create a tracker
    pub fn new(click_slop: f64) -> Self {
        Self {
            pressed: HashMap::new(),
            click_slop: if click_slop.is_finite() {
                click_slop.max(0.0)
            } else {
                0.0
            },
        }
    }

    /// Record a press
    ///
    /// A repeated press without release replaces the older record.
    pub fn press(&mut self, button: MouseButton, target: SurfaceTarget, origin: CursorPoint) {
        debug!("Mouse button down: {:?} on {}", button, target);
        self.pressed.insert(
            button,
            PressRecord {
                target,
                origin,
                at: Instant::now(),
            },
        );
    }

    /// Record a release at the given position
    pub fn release(&mut self, button: MouseButton, at: CursorPoint) -> ButtonRelease {
        let press = self.pressed.remove(&button);
        let completed_click = press
            .map(|p| p.origin.distance_to(at) <= self.click_slop)
            .unwrap_or(false);

        debug!(
            "Mouse button up: {:?} (held: {}, click: {})",
            button,
            press.is_some(),
            completed_click
        );

        ButtonRelease {
            press,
            completed_click,
        }
    }

    /// Release everything, returning what was held
    pub fn release_all(&mut self) -> Vec<(MouseButton, PressRecord)> {
        let mut held: Vec<_> = self.pressed.drain().collect();
        held.sort_by_key(|(button, _)| button.dom_button());
        held
    }

    /// Check if a button is held
    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.pressed.contains_key(&button)
    }

    /// Number of held buttons
    pub fn held_count(&self) -> usize {
        self.pressed.len()
    }
}

impl Default for ButtonTracker {
    fn default() -> Self {
        Self::new(2.0)
    }
}
