//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Initial window width in pixels
    #[serde(default = "default_window_width")]
    pub width: f64,

    /// Initial window height in pixels
    #[serde(default = "default_window_height")]
    pub height: f64,
}

fn default_window_width() -> f64 {
    1200.0
}

fn default_window_height() -> f64 {
    800.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Pointer and keyboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Virtual cursor sensitivity (normalized into 0.01..=10)
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Invert both pointer axes
    #[serde(default)]
    pub invert_mouse: bool,

    /// Shortcut platform ("auto", "macos", "other")
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Maximum pointer travel between down and up that still counts as a click
    #[serde(default = "default_click_slop_px")]
    pub click_slop_px: f64,
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_platform() -> String {
    "auto".to_string()
}

fn default_click_slop_px() -> f64 {
    2.0
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            invert_mouse: false,
            platform: default_platform(),
            click_slop_px: default_click_slop_px(),
        }
    }
}

/// Surface layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Height of the chrome band above the content surface
    #[serde(default = "default_ui_offset")]
    pub ui_offset: f64,

    /// Whether a content surface is shown at startup
    #[serde(default = "default_true")]
    pub content_visible: bool,
}

fn default_ui_offset() -> f64 {
    96.0
}

fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ui_offset: default_ui_offset(),
            content_visible: true,
        }
    }
}

/// Focus probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Wait for the host's settled signal before probing
    #[serde(default = "default_true")]
    pub wait_for_settle: bool,

    /// Longest wait for the settled signal (or the fixed delay when not waiting)
    #[serde(default = "default_probe_settle_fallback_ms")]
    pub probe_settle_fallback_ms: u64,
}

fn default_probe_settle_fallback_ms() -> u64 {
    50
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            wait_for_settle: true,
            probe_settle_fallback_ms: default_probe_settle_fallback_ms(),
        }
    }
}

/// Event rates and queue sizes
///
/// # Defaults
///
/// - Cursor broadcasts: one per 16 ms tick
/// - Pointer-move replays into the content surface: at most one per 16 ms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Cursor broadcast tick
    #[serde(default = "default_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Minimum spacing of pointer-move replays
    #[serde(default = "default_interval_ms")]
    pub move_replay_interval_ms: u64,

    /// Router command queue capacity
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,

    /// Surface dispatch queue capacity
    #[serde(default = "default_dispatch_queue")]
    pub dispatch_queue: usize,

    /// Notification broadcast buffer per subscriber
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_interval_ms() -> u64 {
    16
}

fn default_command_queue() -> usize {
    256
}

fn default_dispatch_queue() -> usize {
    128
}

fn default_notification_capacity() -> usize {
    64
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_interval_ms(),
            move_replay_interval_ms: default_interval_ms(),
            command_queue: default_command_queue(),
            dispatch_queue: default_dispatch_queue(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_file: None,
        }
    }
}
