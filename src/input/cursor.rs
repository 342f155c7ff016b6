//! Virtual Cursor Tracking
//!
//! Owns the single authoritative virtual cursor position and the input mode.
//! Relative deltas always compose onto the latest position, and no operation
//! can place the cursor outside the window.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace};

use crate::input::coordinates::{scale_delta, CursorPoint, Sensitivity, WindowBounds};

/// Where pointer and keyboard input goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// OS cursor and OS routing behave normally, overlay hidden
    #[default]
    Native,
    /// OS cursor suppressed, overlay receives raw input and this engine redirects it
    Virtual,
}

impl InputMode {
    /// Check if input is being virtualized
    pub fn is_virtual(self) -> bool {
        matches!(self, Self::Virtual)
    }

    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            Self::Native => Self::Virtual,
            Self::Virtual => Self::Native,
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "Native"),
            Self::Virtual => write!(f, "Virtual"),
        }
    }
}

/// Virtual cursor tracker
#[derive(Debug, Clone)]
pub struct VirtualCursor {
    /// Current position (chrome-surface coordinates)
    position: CursorPoint,

    /// Window the cursor is confined to
    bounds: WindowBounds,

    /// Enabled when in virtual mode
    mode: InputMode,

    /// Delta multiplier
    sensitivity: Sensitivity,

    /// Flip both axes
    invert: bool,

    /// Last time the position changed
    last_move: Option<Instant>,
}

impl VirtualCursor {
    /// Create a cursor centered in the window, in native mode
    pub fn new(bounds: WindowBounds, sensitivity: Sensitivity, invert: bool) -> Self {
        Self {
            position: bounds.center(),
            bounds,
            mode: InputMode::Native,
            sensitivity,
            invert,
            last_move: None,
        }
    }

    /// Apply a raw relative delta
    ///
    /// Returns the new position when it changed. Ignored in native mode.
    pub fn apply_delta(&mut self, dx: f64, dy: f64) -> Option<CursorPoint> {
        if !self.mode.is_virtual() {
            trace!("Ignoring delta ({}, {}) in native mode", dx, dy);
            return None;
        }

        let (sx, sy) = scale_delta(dx, dy, self.sensitivity, self.invert);
        let next = self.bounds.clamp(self.position.x + sx, self.position.y + sy);
        if next == self.position {
            return None;
        }

        self.position = next;
        self.last_move = Some(Instant::now());
        Some(next)
    }

    /// Place the cursor at an absolute position (clamped)
    pub fn set_absolute(&mut self, x: f64, y: f64) -> CursorPoint {
        self.position = self.bounds.clamp(x, y);
        self.last_move = Some(Instant::now());
        debug!(
            "Virtual cursor set to ({:.1}, {:.1})",
            self.position.x, self.position.y
        );
        self.position
    }

    /// Switch to virtual mode
    ///
    /// Returns true if the mode changed. The last position is kept.
    pub fn enable(&mut self) -> bool {
        self.set_mode(InputMode::Virtual)
    }

    /// Switch to native mode
    pub fn disable(&mut self) -> bool {
        self.set_mode(InputMode::Native)
    }

    /// Set the input mode, returning true if it changed
    pub fn set_mode(&mut self, mode: InputMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        true
    }

    /// Current input mode
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Current position
    pub fn position(&self) -> CursorPoint {
        self.position
    }

    /// Current bounds
    pub fn bounds(&self) -> WindowBounds {
        self.bounds
    }

    /// Update window bounds, re-clamping the cursor
    pub fn set_bounds(&mut self, bounds: WindowBounds) -> CursorPoint {
        self.bounds = bounds;
        self.position = bounds.clamp_point(self.position);
        self.position
    }

    /// Update sensitivity
    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
    }

    /// Current sensitivity
    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Enable or disable axis inversion
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    /// Check if axis inversion is enabled
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Time of the last position change
    pub fn last_move(&self) -> Option<Instant> {
        self.last_move
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn virtual_cursor(sensitivity: f64, invert: bool) -> VirtualCursor {
        let mut cursor = VirtualCursor::new(
            WindowBounds::new(1200.0, 800.0),
            Sensitivity::new(sensitivity),
            invert,
        );
        cursor.enable();
        cursor
    }

    #[test]
    fn test_starts_centered_in_native_mode() {
        let cursor = VirtualCursor::new(WindowBounds::new(1200.0, 800.0), Sensitivity::default(), false);
        assert_eq!(cursor.mode(), InputMode::Native);
        assert_eq!(cursor.position(), CursorPoint::new(600.0, 400.0));
    }

    #[test]
    fn test_delta_ignored_in_native_mode() {
        let mut cursor = virtual_cursor(1.0, false);
        cursor.disable();
        assert_eq!(cursor.apply_delta(10.0, 10.0), None);
        assert_eq!(cursor.position(), CursorPoint::new(600.0, 400.0));
    }

    #[test]
    fn test_delta_scaled_by_sensitivity() {
        let mut cursor = virtual_cursor(0.5, false);
        let moved = cursor.apply_delta(100.0, 0.0).unwrap();
        assert_eq!(moved, CursorPoint::new(650.0, 400.0));
    }

    #[test]
    fn test_deltas_accumulate_on_latest_position() {
        let mut cursor = virtual_cursor(1.0, false);
        for _ in 0..10 {
            cursor.apply_delta(3.0, -2.0);
        }
        assert_eq!(cursor.position(), CursorPoint::new(630.0, 380.0));
    }

    #[test]
    fn test_delta_clamped_at_edge() {
        let mut cursor = virtual_cursor(10.0, false);
        cursor.apply_delta(10_000.0, -10_000.0);
        assert_eq!(cursor.position(), CursorPoint::new(1200.0, 0.0));

        // Pushing further into the edge is not a move
        assert_eq!(cursor.apply_delta(5.0, -5.0), None);
    }

    #[test]
    fn test_position_persists_across_mode_toggle() {
        let mut cursor = virtual_cursor(1.0, false);
        cursor.apply_delta(40.0, 40.0);
        assert!(cursor.disable());
        assert!(cursor.enable());
        assert!(!cursor.enable());
        assert_eq!(cursor.position(), CursorPoint::new(640.0, 440.0));
    }

    #[test]
    fn test_resize_reclamps() {
        let mut cursor = virtual_cursor(1.0, false);
        cursor.set_absolute(1100.0, 700.0);
        let clamped = cursor.set_bounds(WindowBounds::new(800.0, 600.0));
        assert_eq!(clamped, CursorPoint::new(800.0, 600.0));
    }

    proptest! {
        #[test]
        fn prop_position_always_within_bounds(
            sensitivity in -1.0f64..20.0,
            invert in any::<bool>(),
            deltas in prop::collection::vec((-5000.0f64..5000.0, -5000.0f64..5000.0), 0..64),
        ) {
            let mut cursor = virtual_cursor(sensitivity, invert);
            for (dx, dy) in deltas {
                cursor.apply_delta(dx, dy);
                prop_assert!(cursor.bounds().contains(cursor.position()));
            }
        }

        #[test]
        fn prop_invert_equals_negated_delta(
            sensitivity in 0.01f64..10.0,
            deltas in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 1..32),
        ) {
            let mut inverted = virtual_cursor(sensitivity, true);
            let mut negated = virtual_cursor(sensitivity, false);
            for (dx, dy) in deltas {
                inverted.apply_delta(dx, dy);
                negated.apply_delta(-dx, -dy);
            }
            prop_assert_eq!(inverted.position(), negated.position());
        }
    }
}
