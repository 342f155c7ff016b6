//! Settings Store
//!
//! The router reads the shortcut table, pointer sensitivity and axis
//! inversion through [`SettingsStore`]. The host persists settings as a flat
//! key/value map; [`SettingsSnapshot::from_json_map`] reads that shape and
//! drops anything malformed instead of failing.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::input::coordinates::Sensitivity;
use crate::input::error::InputError;
use crate::input::shortcuts::{ShortcutAction, ShortcutBinding, ShortcutTable};

/// Known shortcut actions in match order
pub const KNOWN_ACTIONS: &[&str] = &[
    "history",
    "find",
    "closeTab",
    "reloadTab",
    "newTab",
    "zoominTab",
    "zoomoutTab",
    "zoomresetTab",
];

const SENSITIVITY_KEY: &str = "sensitivity";
const INVERT_KEY: &str = "invertMouse";

/// Read-only settings access
pub trait SettingsStore: Send + Sync {
    /// Shortcut table in match order
    fn shortcut_table(&self) -> ShortcutTable;

    /// Pointer sensitivity (already normalized)
    fn sensitivity(&self) -> Sensitivity;

    /// Whether both pointer axes are flipped
    fn invert_mouse(&self) -> bool;
}

/// Point-in-time copy of the input settings
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    /// Shortcut table
    pub shortcuts: ShortcutTable,
    /// Pointer sensitivity
    pub sensitivity: Sensitivity,
    /// Axis inversion
    pub invert_mouse: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            shortcuts: ShortcutTable::default_table(),
            sensitivity: Sensitivity::default(),
            invert_mouse: false,
        }
    }
}

impl SettingsSnapshot {
    /// Settings from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let shortcuts = if config.shortcuts.is_empty() {
            ShortcutTable::default_table()
        } else {
            let mut table = ShortcutTable::default_table();
            for action in &config.shortcuts {
                table.set(action.clone());
            }
            table
        };

        Self {
            shortcuts,
            sensitivity: Sensitivity::new(config.input.sensitivity),
            invert_mouse: config.input.invert_mouse,
        }
    }

    /// Settings from the host's flat key/value map
    ///
    /// Missing keys keep their defaults. Shortcut values are arrays of
    /// alternatives, each an array of tokens; keys that are not known
    /// actions are taken as shortcuts only if they have that shape.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut snapshot = Self::default();

        if let Some(value) = map.get(SENSITIVITY_KEY) {
            match value.as_f64() {
                Some(raw) => snapshot.sensitivity = Sensitivity::new(raw),
                None => report(SENSITIVITY_KEY, "not a number"),
            }
        }

        if let Some(value) = map.get(INVERT_KEY) {
            match value.as_bool() {
                Some(invert) => snapshot.invert_mouse = invert,
                None => report(INVERT_KEY, "not a boolean"),
            }
        }

        let mut table = ShortcutTable::default();
        for &action in KNOWN_ACTIONS {
            let bindings = match map.get(action) {
                Some(value) => match parse_bindings(value) {
                    Some(bindings) => bindings,
                    None => {
                        report(action, "not a list of key combinations");
                        default_bindings(action)
                    }
                },
                None => default_bindings(action),
            };
            table.set(ShortcutAction::new(action, bindings));
        }

        let mut extra: Vec<&String> = map
            .keys()
            .filter(|k| {
                let k = k.as_str();
                !KNOWN_ACTIONS.contains(&k) && k != SENSITIVITY_KEY && k != INVERT_KEY
            })
            .collect();
        extra.sort();
        for key in extra {
            if let Some(bindings) = map.get(key).and_then(parse_bindings) {
                debug!("Custom shortcut action {}", key);
                table.set(ShortcutAction::new(key.clone(), bindings));
            }
        }

        snapshot.shortcuts = table;
        snapshot
    }
}

fn default_bindings(action: &str) -> Vec<ShortcutBinding> {
    ShortcutTable::default_table()
        .get(action)
        .map(|a| a.bindings.clone())
        .unwrap_or_default()
}

/// Parse `[["ctrl","t"], ["cmd","t"]]`
///
/// Non-string tokens and empty alternatives are skipped. Returns `None` if
/// the value is not an array of arrays at all.
fn parse_bindings(value: &Value) -> Option<Vec<ShortcutBinding>> {
    let alternatives = value.as_array()?;
    if !alternatives.iter().all(Value::is_array) {
        return None;
    }

    let bindings = alternatives
        .iter()
        .filter_map(Value::as_array)
        .map(|tokens| ShortcutBinding::new(tokens.iter().filter_map(Value::as_str)))
        .filter(|binding| !binding.is_empty())
        .collect();
    Some(bindings)
}

fn report(key: &str, reason: &str) {
    let error = InputError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    warn!("Ignoring setting: {}", error);
}

impl SettingsStore for SettingsSnapshot {
    fn shortcut_table(&self) -> ShortcutTable {
        self.shortcuts.clone()
    }

    fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    fn invert_mouse(&self) -> bool {
        self.invert_mouse
    }
}

/// Settings that the host can replace at runtime
///
/// Replace, then send `ReloadSettings` to the router.
#[derive(Debug, Default)]
pub struct SharedSettings {
    inner: RwLock<SettingsSnapshot>,
}

impl SharedSettings {
    /// Wrap a snapshot
    pub fn new(snapshot: SettingsSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Replace all settings
    pub fn replace(&self, snapshot: SettingsSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.inner.read().clone()
    }
}

impl SettingsStore for SharedSettings {
    fn shortcut_table(&self) -> ShortcutTable {
        self.inner.read().shortcuts.clone()
    }

    fn sensitivity(&self) -> Sensitivity {
        self.inner.read().sensitivity
    }

    fn invert_mouse(&self) -> bool {
        self.inner.read().invert_mouse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keyboard::{KeyEvent, KeyModifiers};
    use crate::input::shortcuts::Platform;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_empty_map_gives_defaults() {
        let snapshot = SettingsSnapshot::from_json_map(&Map::new());
        assert_eq!(snapshot, SettingsSnapshot::default());
        assert_eq!(snapshot.shortcuts.len(), KNOWN_ACTIONS.len());
    }

    #[test]
    fn test_reads_flat_settings() {
        let snapshot = SettingsSnapshot::from_json_map(&map(json!({
            "sensitivity": 0.5,
            "invertMouse": true,
            "newTab": [["n"], ["shift", "n"]],
        })));

        assert_eq!(snapshot.sensitivity.value(), 0.5);
        assert!(snapshot.invert_mouse);
        let event = KeyEvent::new("n", KeyModifiers::ctrl());
        assert_eq!(
            snapshot.shortcuts.match_event(&event, Platform::Other),
            Some("newTab")
        );
    }

    #[test]
    fn test_malformed_values_ignored() {
        let snapshot = SettingsSnapshot::from_json_map(&map(json!({
            "sensitivity": "fast",
            "invertMouse": 1,
            "find": "ctrl+f",
            "history": [["y", 3], []],
        })));

        assert_eq!(snapshot, {
            let mut expected = SettingsSnapshot::default();
            expected.shortcuts.set(ShortcutAction::new(
                "history",
                vec![ShortcutBinding::new(["y"])],
            ));
            expected
        });
    }

    #[test]
    fn test_out_of_range_sensitivity_normalized() {
        let snapshot = SettingsSnapshot::from_json_map(&map(json!({ "sensitivity": 99 })));
        assert_eq!(snapshot.sensitivity.value(), 10.0);
    }

    #[test]
    fn test_unknown_actions_sorted_after_known() {
        let snapshot = SettingsSnapshot::from_json_map(&map(json!({
            "zzz": [["z"]],
            "devTools": [["shift", "i"]],
            "theme": "dark",
        })));

        let names: Vec<&str> = snapshot.shortcuts.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(&names[..KNOWN_ACTIONS.len()], KNOWN_ACTIONS);
        assert_eq!(&names[KNOWN_ACTIONS.len()..], &["devTools", "zzz"]);
    }

    #[test]
    fn test_shared_settings_replace() {
        let shared = SharedSettings::default();
        assert!(!shared.invert_mouse());
        shared.replace(SettingsSnapshot {
            invert_mouse: true,
            ..SettingsSnapshot::default()
        });
        assert!(shared.invert_mouse());
        assert!(shared.snapshot().invert_mouse);
    }
}
