//! Input Virtualization
//!
//! Pure, synchronous building blocks for redirecting a single pointer and
//! keyboard stream across the chrome, content and overlay surfaces. Nothing
//! in this module suspends or performs I/O; the router in [`crate::server`]
//! owns instances of these types and drives them from one task.
//!
//! # Features
//!
//! - **Virtual cursor**
//!   - Sensitivity scaling (normalized to `[0.01, 10]`) and axis inversion
//!   - Position always clamped to the window, even for NaN/infinite input
//!   - Position survives mode toggles
//!
//! - **Shortcut matching**
//!   - Multiple alternative bindings per action
//!   - Shift-typed symbols (`+`, `_`, ...) need no explicit shift token
//!   - Platform default primary modifier (Cmd on macOS, Ctrl elsewhere)
//!
//! - **Routing**
//!   - Chrome band above `ui_offset`, content surface below it
//!   - Content-local coordinates for replays
//!
//! # Architecture
//!
//! ```text
//! raw delta / key / button
//!       ↓
//! ┌──────────────┐   ┌─────────────────┐
//! │ VirtualCursor│   │ ShortcutMatcher │ ← consumes matched keys
//! └──────────────┘   └─────────────────┘
//!       ↓
//! ┌──────────────┐   ┌─────────────────┐
//! │ RoutingEngine│ → │  ButtonTracker  │ ← press target, click detection
//! └──────────────┘   └─────────────────┘
//!       ↓
//! chrome or content surface replay
//! ```

pub mod coordinates;
pub mod cursor;
pub mod error;
pub mod keyboard;
pub mod mouse;
pub mod routing;
pub mod shortcuts;

pub use coordinates::{scale_delta, CursorPoint, Sensitivity, WindowBounds};
pub use cursor::{InputMode, VirtualCursor};
pub use error::{classify_error, recovery_action, ErrorType, InputError, RecoveryAction, Result};
pub use keyboard::{normalize_key, KeyEvent, KeyModifiers};
pub use mouse::{ButtonRelease, ButtonTracker, MouseButton, PressRecord};
pub use routing::{RouteDecision, RoutingEngine, SurfaceTarget};
pub use shortcuts::{Platform, ShortcutAction, ShortcutBinding, ShortcutMatcher, ShortcutTable};
