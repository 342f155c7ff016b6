//! # radiant-input
//!
//! Input virtualization and cross-surface routing for a browser shell.
//!
//! The shell draws three surfaces on top of each other: the chrome (tabs,
//! search bar), the embedded page content, and a transparent overlay. This
//! crate lets one logical pointer/keyboard stream drive all three through a
//! software cursor, and makes form fields inside the page look directly
//! editable while keystrokes actually land in an overlay input.
//!
//! # Architecture
//!
//! ```text
//! radiant-input
//!   ├─> Virtual Cursor (delta scaling, inversion, clamping)
//!   ├─> Shortcut Matcher (platform primary modifier, shift-typed symbols)
//!   ├─> Routing Engine (chrome vs. content zone, coordinate translation)
//!   ├─> Focus Probe (hit-test + track scripts in the page surface)
//!   ├─> Text Mirror (overlay input ↔ hidden page element)
//!   ├─> Batcher (cursor broadcast coalescing, move replay throttle)
//!   └─> Input Router (single-owner actor tying it all together)
//! ```
//!
//! # Data Flow
//!
//! **Pointer Path:** Host → Router → Cursor → Routing → Dispatcher → Surface
//!
//! **Focus Path:** Click → Probe task → Page scripts → Router → Mirror shown
//!
//! **Text Path:** Overlay edits → Router → Mirror → Page element

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Engine configuration
pub mod config;

/// Cursor, keyboard, shortcut and routing primitives
pub mod input;

/// Focus probe scripts and the text mirror
pub mod mirror;

/// Broadcast coalescing and replay throttling
pub mod performance;

/// Router actor and its handle
pub mod server;

/// Surface bridge, settings store and the stdio host bridge
pub mod surface;

/// Utility functions
pub mod utils;

pub use config::Config;
pub use server::{InputRouter, Notification, RouterCommand, RouterHandle, RouterSnapshot};
pub use surface::{SettingsStore, SurfaceBridge, SurfaceError, SurfaceId};
