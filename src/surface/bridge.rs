//! Surface Bridge
//!
//! The router's view of the surfaces it redirects input into. The host owns
//! tab lifecycle and page rendering; it implements [`SurfaceBridge`] to
//! report the active page surface, replay synthetic events, and run probe
//! scripts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::input::keyboard::KeyModifiers;
use crate::input::mouse::MouseButton;
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::ProbeScript;

/// Identifier of a page (tab) surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub Uuid);

impl SurfaceId {
    /// Random id, as the host assigns to new tabs
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surface bridge errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface navigated or closed while a request was in flight
    #[error("Surface navigated away")]
    NavigatedAway,

    /// A script threw
    #[error("Script error: {0}")]
    Script(String),

    /// The host connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No such surface
    #[error("Surface unavailable")]
    Unavailable,
}

/// Pointer event kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerKind {
    /// Pointer moved
    Move,
    /// Button pressed
    Down,
    /// Button released
    Up,
    /// Wheel scrolled
    Wheel {
        /// Horizontal delta
        delta_x: f64,
        /// Vertical delta
        delta_y: f64,
    },
}

/// Synthetic pointer event in target-surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerReplay {
    /// Event kind
    #[serde(flatten)]
    pub kind: PointerKind,
    /// Surface-local x
    pub x: f64,
    /// Surface-local y
    pub y: f64,
    /// Button for down/up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
}

impl PointerReplay {
    /// Pointer move
    pub fn moved(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Move,
            x,
            y,
            button: None,
        }
    }

    /// Button press
    pub fn down(x: f64, y: f64, button: MouseButton) -> Self {
        Self {
            kind: PointerKind::Down,
            x,
            y,
            button: Some(button),
        }
    }

    /// Button release
    pub fn up(x: f64, y: f64, button: MouseButton) -> Self {
        Self {
            kind: PointerKind::Up,
            x,
            y,
            button: Some(button),
        }
    }

    /// Wheel scroll
    pub fn wheel(x: f64, y: f64, delta_x: f64, delta_y: f64) -> Self {
        Self {
            kind: PointerKind::Wheel { delta_x, delta_y },
            x,
            y,
            button: None,
        }
    }
}

/// Key event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Key pressed
    Down,
    /// Key released
    Up,
}

/// Synthetic key event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReplay {
    /// Event kind
    pub kind: KeyKind,
    /// DOM `key`
    pub key: String,
    /// DOM `code`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Modifier state
    pub modifiers: KeyModifiers,
}

/// Host-side surface operations
///
/// Calls for one surface are issued in order by a single dispatcher task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SurfaceBridge: Send + Sync {
    /// Currently active page surface, if any
    fn active_content_surface(&self) -> Option<SurfaceId>;

    /// Replay a pointer event into a surface
    async fn replay_pointer_event(
        &self,
        target: SurfaceTarget,
        event: PointerReplay,
    ) -> Result<(), SurfaceError>;

    /// Replay a key event into a surface
    async fn replay_key_event(&self, target: SurfaceTarget, event: KeyReplay) -> Result<(), SurfaceError>;

    /// Run a probe script and return its JSON result
    async fn execute_probe(
        &self,
        target: SurfaceTarget,
        script: ProbeScript,
    ) -> Result<serde_json::Value, SurfaceError>;
}
