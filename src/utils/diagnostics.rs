//! Startup Diagnostics
//!
//! Logs the runtime environment and the effective configuration once at
//! startup, so a bug report's log excerpt is enough to reproduce settings.

use tracing::info;

use crate::config::Config;

/// Build and host information
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system family (`linux`, `macos`, ...)
    pub os: &'static str,
    /// CPU architecture
    pub arch: &'static str,
    /// Logical CPUs available to the process
    pub cpu_count: usize,
}

impl SystemInfo {
    /// Gather system information
    pub fn gather() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Log system information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} ({})", self.os, self.arch);
        info!("  CPUs: {}", self.cpu_count);
    }
}

/// Log system information and the effective configuration
pub fn log_startup_diagnostics(config: &Config) {
    SystemInfo::gather().log();

    info!("=== Input Engine ===");
    info!(
        "  Window: {}x{}, chrome band {} px",
        config.window.width, config.window.height, config.routing.ui_offset
    );
    info!(
        "  Pointer: sensitivity {}, invert {}, click slop {} px",
        config.input.sensitivity, config.input.invert_mouse, config.input.click_slop_px
    );
    info!("  Shortcut platform: {}", config.platform());
    info!(
        "  Shortcut overrides: {}",
        if config.shortcuts.is_empty() {
            "none".to_string()
        } else {
            config
                .shortcuts
                .iter()
                .map(|s| s.action.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    info!(
        "  Focus probe: settle ack {}, fallback {} ms",
        config.focus.wait_for_settle, config.focus.probe_settle_fallback_ms
    );
    info!(
        "  Throttle: broadcast {} ms, move replay {} ms",
        config.throttle.broadcast_interval_ms, config.throttle.move_replay_interval_ms
    );
}
