//! Coordinate Clamping and Scaling
//!
//! Pure math shared by the virtual cursor and the router: window bounds,
//! point clamping, sensitivity normalization and axis inversion. Everything
//! here is expressed in chrome-surface pixels (the whole host window).

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lowest accepted pointer sensitivity
pub const MIN_SENSITIVITY: f64 = 0.01;

/// Highest accepted pointer sensitivity
pub const MAX_SENSITIVITY: f64 = 10.0;

/// A point in chrome-surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorPoint {
    /// Horizontal position (pixels)
    pub x: f64,
    /// Vertical position (pixels)
    pub y: f64,
}

impl CursorPoint {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: CursorPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Host window bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    /// Window width (pixels)
    pub width: f64,
    /// Window height (pixels)
    pub height: f64,
}

impl WindowBounds {
    /// Create bounds, normalizing negative or non-finite sizes to zero
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: finite_or_zero(width).max(0.0),
            height: finite_or_zero(height).max(0.0),
        }
    }

    /// Check if a point lies within `[0, width] x [0, height]`
    pub fn contains(&self, point: CursorPoint) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    /// Clamp raw coordinates to the window
    ///
    /// NaN collapses to the origin on that axis; infinities clamp to the edge.
    pub fn clamp(&self, x: f64, y: f64) -> CursorPoint {
        CursorPoint {
            x: clamp_axis(x, self.width),
            y: clamp_axis(y, self.height),
        }
    }

    /// Clamp a point to the window
    pub fn clamp_point(&self, point: CursorPoint) -> CursorPoint {
        self.clamp(point.x, point.y)
    }

    /// Window center
    pub fn center(&self) -> CursorPoint {
        CursorPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    finite_or_zero(value).min(max).max(0.0)
}

/// Pointer sensitivity, always within `[MIN_SENSITIVITY, MAX_SENSITIVITY]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity(f64);

impl Sensitivity {
    /// Normalize a configured sensitivity
    ///
    /// Out-of-range values are clamped and non-finite values fall back to
    /// the default; a bad persisted setting is never rejected.
    pub fn new(raw: f64) -> Self {
        if !raw.is_finite() {
            debug!("Sensitivity {} is not finite, using default", raw);
            return Self::default();
        }

        let clamped = raw.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        if clamped != raw {
            debug!("Sensitivity {} out of range, normalized to {}", raw, clamped);
        }
        Self(clamped)
    }

    /// Multiplier value
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f64> for Sensitivity {
    fn from(raw: f64) -> Self {
        Self::new(raw)
    }
}

/// Scale a raw relative delta by sensitivity, flipping both axes if inverted
pub fn scale_delta(dx: f64, dy: f64, sensitivity: Sensitivity, invert: bool) -> (f64, f64) {
    let sign = if invert { -1.0 } else { 1.0 };
    let factor = sensitivity.value() * sign;
    (finite_or_zero(dx) * factor, finite_or_zero(dy) * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_bounds() {
        let bounds = WindowBounds::new(1200.0, 800.0);

        assert_eq!(bounds.clamp(-10.0, -10.0), CursorPoint::new(0.0, 0.0));
        assert_eq!(bounds.clamp(2000.0, 2000.0), CursorPoint::new(1200.0, 800.0));
        assert_eq!(bounds.clamp(600.0, 400.0), CursorPoint::new(600.0, 400.0));
    }

    #[test]
    fn test_clamp_non_finite() {
        let bounds = WindowBounds::new(100.0, 50.0);

        assert_eq!(bounds.clamp(f64::NAN, f64::INFINITY), CursorPoint::new(0.0, 50.0));
        assert_eq!(bounds.clamp(f64::NEG_INFINITY, 10.0), CursorPoint::new(0.0, 10.0));
    }

    #[test]
    fn test_bounds_normalize_negative_size() {
        let bounds = WindowBounds::new(-5.0, f64::NAN);
        assert_eq!(bounds.width, 0.0);
        assert_eq!(bounds.height, 0.0);
        assert!(bounds.contains(CursorPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_sensitivity_normalization() {
        assert_eq!(Sensitivity::new(0.5).value(), 0.5);
        assert_eq!(Sensitivity::new(0.0).value(), MIN_SENSITIVITY);
        assert_eq!(Sensitivity::new(-3.0).value(), MIN_SENSITIVITY);
        assert_eq!(Sensitivity::new(250.0).value(), MAX_SENSITIVITY);
        assert_eq!(Sensitivity::new(f64::NAN).value(), 1.0);
    }

    #[test]
    fn test_scale_delta() {
        let half = Sensitivity::new(0.5);
        assert_eq!(scale_delta(100.0, -40.0, half, false), (50.0, -20.0));
        assert_eq!(scale_delta(100.0, -40.0, half, true), (-50.0, 20.0));
        assert_eq!(scale_delta(f64::NAN, 2.0, half, false), (0.0, 1.0));
    }

    #[test]
    fn test_distance() {
        let a = CursorPoint::new(0.0, 0.0);
        let b = CursorPoint::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }
}
