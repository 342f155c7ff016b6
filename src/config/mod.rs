//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through the CLI)
//! - CLI arguments
//!
//! Every section is optional in the file; missing values take their
//! defaults. Structural problems (zero-sized window, zero intervals, unknown
//! platform or log format) are rejected by [`Config::validate`]. Values that
//! users tune at runtime, like sensitivity, are normalized instead.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::input::shortcuts::{Platform, ShortcutAction};

pub mod types;

pub use types::*;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Window configuration
    #[serde(default)]
    pub window: WindowConfig,
    /// Input configuration
    #[serde(default)]
    pub input: InputConfig,
    /// Routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Focus probe configuration
    #[serde(default)]
    pub focus: FocusConfig,
    /// Rates and queue sizes
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Shortcut overrides, applied over the default table in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shortcuts: Vec<ShortcutAction>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            window: WindowConfig::default(),
            input: InputConfig::default(),
            routing: RoutingConfig::default(),
            focus: FocusConfig::default(),
            throttle: ThrottleConfig::default(),
            logging: LoggingConfig::default(),
            shortcuts: Vec::new(),
        }
    }

    /// Per-user config location (`<config dir>/radiant/input.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("radiant").join("input.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let window = &self.window;
        if !(window.width.is_finite() && window.width > 0.0)
            || !(window.height.is_finite() && window.height > 0.0)
        {
            anyhow::bail!(
                "Invalid window size: {}x{}",
                window.width,
                window.height
            );
        }

        self.input
            .platform
            .parse::<Platform>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid input.platform")?;

        if !self.input.click_slop_px.is_finite() || self.input.click_slop_px < 0.0 {
            anyhow::bail!("Invalid click slop: {}", self.input.click_slop_px);
        }

        if self.focus.probe_settle_fallback_ms == 0 {
            anyhow::bail!("focus.probe_settle_fallback_ms must be greater than 0");
        }

        let throttle = &self.throttle;
        if throttle.broadcast_interval_ms == 0 {
            anyhow::bail!("throttle.broadcast_interval_ms must be greater than 0");
        }
        if throttle.move_replay_interval_ms == 0 {
            anyhow::bail!("throttle.move_replay_interval_ms must be greater than 0");
        }
        if throttle.command_queue == 0
            || throttle.dispatch_queue == 0
            || throttle.notification_capacity == 0
        {
            anyhow::bail!("Queue capacities must be greater than 0");
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        platform: Option<String>,
        sensitivity: Option<f64>,
        log_format: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        if let Some(platform) = platform {
            self.input.platform = platform;
        }
        if let Some(sensitivity) = sensitivity {
            self.input.sensitivity = sensitivity;
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }
        if log_file.is_some() {
            self.logging.log_file = log_file;
        }
        self
    }

    /// Shortcut platform; unknown names fall back to the build platform
    pub fn platform(&self) -> Platform {
        self.input.platform.parse().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.window.width, 1200.0);
        assert_eq!(config.window.height, 800.0);
        assert_eq!(config.routing.ui_offset, 96.0);
        assert_eq!(config.focus.probe_settle_fallback_ms, 50);
        assert!(config.shortcuts.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [input]
            sensitivity = 2.5
            platform = "macos"

            [[shortcuts]]
            action = "newTab"
            bindings = [["meta", "n"]]
            "#,
        )
        .unwrap();

        assert_eq!(config.input.sensitivity, 2.5);
        assert!(!config.input.invert_mouse);
        assert_eq!(config.platform(), Platform::MacOs);
        assert_eq!(config.throttle.broadcast_interval_ms, 16);
        assert_eq!(config.shortcuts.len(), 1);
        assert_eq!(config.shortcuts[0].action, "newTab");
    }

    #[test]
    fn test_config_validation_invalid_window() {
        let mut config = Config::default_config();
        config.window.width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_platform() {
        let mut config = Config::default_config();
        config.input.platform = "beos".to_string();
        assert!(config.validate().is_err());
        assert_eq!(config.platform(), Platform::current());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default_config();
        config.throttle.move_replay_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_format() {
        let mut config = Config::default_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_sensitivity_is_not_rejected() {
        let mut config = Config::default_config();
        config.input.sensitivity = 500.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default_config().with_overrides(
            Some("other".to_string()),
            Some(0.5),
            None,
            Some(PathBuf::from("/tmp/radiant.log")),
        );
        assert_eq!(config.platform(), Platform::Other);
        assert_eq!(config.input.sensitivity, 0.5);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.logging.log_file.is_some());
    }
}
