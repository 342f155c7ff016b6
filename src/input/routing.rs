//! Routing Decision Engine
//!
//! Decides which surface receives a redirected pointer, wheel or keyboard
//! event and what coordinate transform applies. The chrome surface owns the
//! band above `ui_offset`; the content surface owns everything below it while
//! it is visible.
//!
//! Keyboard and wheel events are routed by the zone of the most recent
//! pointer position. There is no separately tracked keyboard focus surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::input::coordinates::CursorPoint;
use crate::input::cursor::InputMode;
use crate::surface::SurfaceId;

/// Surface an event is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "surface", content = "id", rename_all = "lowercase")]
pub enum SurfaceTarget {
    /// Application UI (tabs, search bar)
    Chrome,
    /// Embedded page surface
    Content(SurfaceId),
}

impl SurfaceTarget {
    /// Check if this is a content surface
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content(_))
    }
}

impl fmt::Display for SurfaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chrome => write!(f, "chrome"),
            Self::Content(id) => write!(f, "content:{}", id),
        }
    }
}

/// Where an event goes and at which surface-local point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteDecision {
    /// Receiving surface
    pub target: SurfaceTarget,
    /// Point in the target's own coordinates
    pub point: CursorPoint,
}

/// Zone-based router
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    /// Height of the chrome band (pixels)
    ui_offset: f64,

    /// Whether the content surface is currently shown
    content_visible: bool,
}

impl RoutingEngine {
    /// Create a routing engine
    pub fn new(ui_offset: f64, content_visible: bool) -> Self {
        Self {
            ui_offset: normalize_offset(ui_offset),
            content_visible,
        }
    }

    /// Route an event at the given cursor position
    ///
    /// Returns `None` in native mode; the OS routes input itself.
    pub fn route(
        &self,
        cursor: CursorPoint,
        mode: InputMode,
        active_content: Option<SurfaceId>,
    ) -> Option<RouteDecision> {
        if !mode.is_virtual() {
            return None;
        }

        let decision = match active_content {
            Some(id) if self.content_visible && cursor.y >= self.ui_offset => RouteDecision {
                target: SurfaceTarget::Content(id),
                point: CursorPoint::new(cursor.x, cursor.y - self.ui_offset),
            },
            _ => RouteDecision {
                target: SurfaceTarget::Chrome,
                point: cursor,
            },
        };
        Some(decision)
    }

    /// Translate a surface-local point back into chrome coordinates
    pub fn to_chrome_coordinates(&self, target: SurfaceTarget, point: CursorPoint) -> CursorPoint {
        match target {
            SurfaceTarget::Chrome => point,
            SurfaceTarget::Content(_) => CursorPoint::new(point.x, point.y + self.ui_offset),
        }
    }

    /// Translate a chrome point into a given surface's coordinates
    ///
    /// Used for releases that must go to the surface that got the press,
    /// even after the cursor left its zone.
    pub fn to_surface_coordinates(&self, target: SurfaceTarget, point: CursorPoint) -> CursorPoint {
        match target {
            SurfaceTarget::Chrome => point,
            SurfaceTarget::Content(_) => CursorPoint::new(point.x, point.y - self.ui_offset),
        }
    }

    /// Update the chrome band height
    ///
    /// Negative or non-finite offsets are normalized to zero. Returns the
    /// change (new minus old) so callers can shift anything already laid out
    /// in chrome coordinates.
    pub fn set_ui_offset(&mut self, offset: f64) -> f64 {
        let normalized = normalize_offset(offset);
        if normalized != offset {
            debug!("UI offset {} normalized to {}", offset, normalized);
        }
        let delta = normalized - self.ui_offset;
        self.ui_offset = normalized;
        delta
    }

    /// Current chrome band height
    pub fn ui_offset(&self) -> f64 {
        self.ui_offset
    }

    /// Show or hide the content surface
    pub fn set_content_visible(&mut self, visible: bool) {
        self.content_visible = visible;
    }

    /// Check if the content surface is shown
    pub fn content_visible(&self) -> bool {
        self.content_visible
    }
}

impl Default for RoutingEngine {
    fn default() -> Self {
        Self::new(96.0, true)
    }
}

fn normalize_offset(offset: f64) -> f64 {
    if offset.is_finite() && offset > 0.0 {
        offset
    } else {
        0.0
    }
}
