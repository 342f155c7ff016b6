//! Keyboard Event Normalization
//!
//! Key events arrive from the chrome surface, the content surface and the
//! overlay in DOM shape (`key`, optional `code`, modifier flags). Everything
//! downstream (shortcut matching, replay) works on the normalized form.

use serde::{Deserialize, Serialize};

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyModifiers {
    /// Shift held
    pub shift: bool,
    /// Ctrl held
    pub ctrl: bool,
    /// Alt/Option held
    pub alt: bool,
    /// Meta/Cmd/Super held
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifiers
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Only ctrl
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Only meta
    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    /// Add shift
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Add alt
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// A keyboard event as delivered by any surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// DOM `key` value
    pub key: String,

    /// DOM `code` value, used when `key` is unidentified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Modifier state at the time of the event
    #[serde(flatten)]
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    /// Create a key event
    pub fn new(key: impl Into<String>, modifiers: KeyModifiers) -> Self {
        Self {
            key: key.into(),
            code: None,
            modifiers,
        }
    }

    /// Attach a DOM `code`
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Lower-cased primary key, resolved from `code` when `key` is unidentified
    pub fn normalized_key(&self) -> String {
        normalize_key(&self.key, self.code.as_deref())
    }

    /// Check if the key itself is a modifier (pressing Shift alone)
    pub fn is_modifier_only(&self) -> bool {
        is_modifier_key(&self.normalized_key())
    }
}

/// Normalize a DOM key name
///
/// `KeyA` → `a`, `Digit1` → `1`, other codes are lower-cased as-is.
pub fn normalize_key(key: &str, code: Option<&str>) -> String {
    let key = key.to_lowercase();
    if key != "unidentified" {
        return key;
    }

    match code {
        Some(code) if !code.is_empty() => {
            if let Some(letter) = code.strip_prefix("Key") {
                letter.to_lowercase()
            } else if let Some(digit) = code.strip_prefix("Digit") {
                digit.to_lowercase()
            } else {
                code.to_lowercase()
            }
        }
        _ => key,
    }
}

/// Check if a normalized key name is a bare modifier
pub fn is_modifier_key(key: &str) -> bool {
    matches!(key, "meta" | "control" | "alt" | "shift")
}
