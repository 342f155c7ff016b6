//! Router Messages
//!
//! Inbound commands and outbound notifications of the router task.
//!
//! ```text
//! chrome / overlay / host            InputRouter task             chrome / overlay
//! ━━━━━━━━━━━━━━━━━━━━━━            ━━━━━━━━━━━━━━━━             ━━━━━━━━━━━━━━━━
//!
//! RelativeMotion, keys, clicks ──mpsc──> owns all state ──broadcast──> CursorMoved
//! mirror commit/submit/deactivate         │                        MirrorShown/Hidden
//! SurfaceSettled, SetUiOffset, ...        │                        InputModeChanged
//!                                         │                        ShortcutTriggered
//!                                         └──dispatch──> SurfaceBridge replays/probes
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::input::coordinates::{CursorPoint, WindowBounds};
use crate::input::cursor::InputMode;
use crate::input::keyboard::KeyEvent;
use crate::input::mouse::MouseButton;
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::{ProbeOutcome, ProbeRequestId};
use crate::mirror::synchronizer::TextMirrorDescriptor;

/// Command to the router task
#[derive(Debug)]
pub enum RouterCommand {
    /// Raw relative pointer delta
    RelativeMotion {
        /// Horizontal delta
        dx: f64,
        /// Vertical delta
        dy: f64,
    },
    /// Place the virtual cursor (initial position)
    SetCursor {
        /// Chrome x
        x: f64,
        /// Chrome y
        y: f64,
    },
    /// Switch input mode
    SetInputMode(InputMode),
    /// Flip input mode
    ToggleInputMode,
    /// Button pressed
    PointerDown(MouseButton),
    /// Button released
    PointerUp(MouseButton),
    /// Full click (press and release) at the cursor
    Click(MouseButton),
    /// Wheel scroll at the cursor
    Wheel {
        /// Horizontal delta
        dx: f64,
        /// Vertical delta
        dy: f64,
    },
    /// Key pressed
    KeyDown(KeyEvent),
    /// Key released
    KeyUp(KeyEvent),
    /// Overlay text changed
    CommitMirrorValue(String),
    /// Overlay requested submit (Enter)
    SubmitMirror,
    /// Overlay blurred, Escape, or the page navigated
    DeactivateMirror,
    /// Chrome band height changed
    SetUiOffset(f64),
    /// Host window resized
    ResizeWindow {
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
    /// Content surface shown or hidden
    SetContentVisible(bool),
    /// A surface finished handling the last replayed click
    SurfaceSettled(SurfaceTarget),
    /// The host switched the active page surface
    ContentSurfaceChanged,
    /// Re-read the settings store
    ReloadSettings,
    /// Copy of the router state
    Snapshot(oneshot::Sender<RouterSnapshot>),
    /// Stop the router
    Shutdown,
}

impl RouterCommand {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RelativeMotion { .. } => "relative-motion",
            Self::SetCursor { .. } => "set-cursor",
            Self::SetInputMode(_) => "set-input-mode",
            Self::ToggleInputMode => "toggle-input-mode",
            Self::PointerDown(_) => "pointer-down",
            Self::PointerUp(_) => "pointer-up",
            Self::Click(_) => "click",
            Self::Wheel { .. } => "wheel",
            Self::KeyDown(_) => "key-down",
            Self::KeyUp(_) => "key-up",
            Self::CommitMirrorValue(_) => "commit-mirror-value",
            Self::SubmitMirror => "submit-mirror",
            Self::DeactivateMirror => "deactivate-mirror",
            Self::SetUiOffset(_) => "set-ui-offset",
            Self::ResizeWindow { .. } => "resize-window",
            Self::SetContentVisible(_) => "set-content-visible",
            Self::SurfaceSettled(_) => "surface-settled",
            Self::ContentSurfaceChanged => "content-surface-changed",
            Self::ReloadSettings => "reload-settings",
            Self::Snapshot(_) => "snapshot",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Probe task result, sent back to the router
#[derive(Debug)]
pub(crate) struct ProbeCompletion {
    pub(crate) id: ProbeRequestId,
    pub(crate) target: SurfaceTarget,
    pub(crate) outcome: ProbeOutcome,
}

/// Notification to chrome, overlay and host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// Virtual cursor moved (coalesced)
    CursorMoved {
        /// Chrome x
        x: f64,
        /// Chrome y
        y: f64,
    },
    /// Mirror shown or moved
    MirrorShown(TextMirrorDescriptor),
    /// Mirror hidden
    MirrorHidden {
        /// Mirror id
        id: ProbeRequestId,
    },
    /// Input mode changed
    InputModeChanged {
        /// New mode
        mode: InputMode,
    },
    /// A shortcut matched; the key was consumed
    ShortcutTriggered {
        /// Action name
        action: String,
    },
}

/// Router counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    /// Commands handled
    pub commands: u64,
    /// Relative deltas applied
    pub motions: u64,
    /// Cursor broadcasts sent
    pub broadcasts: u64,
    /// Pointer moves replayed into the content surface
    pub move_replays: u64,
    /// Pointer moves dropped on a full dispatch queue
    pub moves_dropped: u64,
    /// Key events replayed
    pub key_replays: u64,
    /// Key events consumed by shortcuts
    pub shortcuts: u64,
    /// Probes started
    pub probes_started: u64,
    /// Probes cancelled by a newer click or a mode/mirror change
    pub probes_cancelled: u64,
    /// Probe results discarded as stale
    pub probes_stale: u64,
    /// Mirrors shown
    pub mirrors_shown: u64,
}

/// Copy of the router state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterSnapshot {
    /// Input mode
    pub mode: InputMode,
    /// Virtual cursor (chrome coordinates)
    pub cursor: CursorPoint,
    /// Window bounds
    pub bounds: WindowBounds,
    /// Chrome band height
    pub ui_offset: f64,
    /// Content surface shown
    pub content_visible: bool,
    /// Active mirror
    pub mirror: Option<TextMirrorDescriptor>,
    /// Probe in flight
    pub pending_probe: Option<ProbeRequestId>,
    /// Buttons held
    pub held_buttons: usize,
    /// Counters
    pub stats: RouterStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_wire_shape() {
        let moved = Notification::CursorMoved { x: 1.0, y: 2.0 };
        assert_eq!(
            serde_json::to_value(&moved).unwrap(),
            json!({"type": "cursorMoved", "x": 1.0, "y": 2.0})
        );

        let mode = Notification::InputModeChanged {
            mode: InputMode::Virtual,
        };
        assert_eq!(
            serde_json::to_value(&mode).unwrap(),
            json!({"type": "inputModeChanged", "mode": "virtual"})
        );

        let hidden = Notification::MirrorHidden {
            id: ProbeRequestId(9),
        };
        assert_eq!(
            serde_json::to_value(&hidden).unwrap(),
            json!({"type": "mirrorHidden", "id": 9})
        );
    }

    #[test]
    fn test_mirror_shown_flattens_descriptor() {
        let desc = TextMirrorDescriptor {
            id: ProbeRequestId(1),
            target: SurfaceTarget::Chrome,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            value: "v".to_string(),
            input_type: None,
            is_active: true,
            style_snapshot: Default::default(),
        };
        let value = serde_json::to_value(Notification::MirrorShown(desc)).unwrap();
        assert_eq!(value["type"], "mirrorShown");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["target"], json!({"surface": "chrome"}));
    }
}
