//! Keyboard Shortcut Matching
//!
//! Matches normalized key events against a table of named actions, each with
//! one or more alternative bindings. Matching is pure and synchronous and
//! does not care which surface the event came from.
//!
//! # Rules
//!
//! - A binding is a list of lower-cased tokens; modifier tokens
//!   (`ctrl`/`control`, `meta`/`cmd`/`command`, `shift`, `alt`) are stripped
//!   and whatever remains is the primary key. No primary key, no match.
//! - Symbols that need shift to type (`+`, `_`, `{`, ...) ignore the shift
//!   state: the binding author wrote `+`, not `shift + +`. The same holds for
//!   keys whose shifted counterpart is such a symbol (`=`, `0`).
//! - A binding without an explicit ctrl or meta token gets the platform
//!   default: meta on macOS, ctrl elsewhere.
//! - Alt must match exactly.
//! - Actions are tried in table order; the first match wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::input::keyboard::{is_modifier_key, KeyEvent};

/// Characters that can only be typed with shift held
pub const SHIFT_REQUIRED_CHARS: &[&str] = &[
    "+", "_", "{", "}", "|", "~", "!", "@", "#", "$", "%", "^", "&", "*", "(", ")", ":", "<", ">",
    "?", "\"",
];

const CTRL_TOKENS: &[&str] = &["ctrl", "control"];
const META_TOKENS: &[&str] = &["meta", "cmd", "command"];
const SHIFT_TOKENS: &[&str] = &["shift"];
const ALT_TOKENS: &[&str] = &["alt"];

/// Check if a key is a symbol that requires shift
pub fn is_shift_required(key: &str) -> bool {
    SHIFT_REQUIRED_CHARS.contains(&key)
}

/// Shifted symbol produced by an unshifted key on a US layout
pub fn shifted_counterpart(key: &str) -> Option<&'static str> {
    let shifted = match key {
        "=" => "+",
        "-" => "_",
        "[" => "{",
        "]" => "}",
        "\\" => "|",
        "`" => "~",
        "1" => "!",
        "2" => "@",
        "3" => "#",
        "4" => "$",
        "5" => "%",
        "6" => "^",
        "7" => "&",
        "8" => "*",
        "9" => "(",
        "0" => ")",
        ";" => ":",
        "," => "<",
        "." => ">",
        "/" => "?",
        "'" => "\"",
        _ => return None,
    };
    Some(shifted)
}

fn is_modifier_token(token: &str) -> bool {
    CTRL_TOKENS.contains(&token)
        || META_TOKENS.contains(&token)
        || SHIFT_TOKENS.contains(&token)
        || ALT_TOKENS.contains(&token)
}

/// Platform class for the default primary modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Cmd is the primary modifier
    MacOs,
    /// Ctrl is the primary modifier
    Other,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::current()),
            "macos" | "mac" | "darwin" => Ok(Self::MacOs),
            "other" | "linux" | "windows" | "win32" => Ok(Self::Other),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// One key combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ShortcutBinding {
    tokens: Vec<String>,
}

impl ShortcutBinding {
    /// Create a binding from tokens (lower-cased, blanks dropped)
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    /// Record a binding from a key event, the way the settings page does
    ///
    /// The platform's primary modifier is left out so it gets synthesized on
    /// match; shift is left out for symbols that need it. Returns `None` for
    /// a bare modifier press.
    pub fn record(event: &KeyEvent, platform: Platform) -> Option<Self> {
        let key = event.normalized_key();
        if is_modifier_key(&key) {
            return None;
        }

        let mods = event.modifiers;
        let mut tokens: Vec<String> = Vec::with_capacity(4);
        match platform {
            Platform::MacOs if mods.ctrl => tokens.push("ctrl".to_string()),
            Platform::Other if mods.meta => tokens.push("cmd".to_string()),
            _ => {}
        }
        if mods.alt {
            tokens.push("alt".to_string());
        }
        if mods.shift && !is_shift_required(&key) {
            tokens.push("shift".to_string());
        }
        tokens.push(key);

        Some(Self { tokens })
    }

    /// Raw tokens
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Check if the binding is empty
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens that are not modifiers
    pub fn primary_keys(&self) -> impl Iterator<Item = &str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !is_modifier_token(t))
    }

    fn has_any(&self, names: &[&str]) -> bool {
        self.tokens.iter().any(|t| names.contains(&t.as_str()))
    }

    /// Test a key event against this binding
    pub fn matches(&self, event: &KeyEvent, platform: Platform) -> bool {
        let pressed = event.normalized_key();
        if is_modifier_key(&pressed) {
            return false;
        }

        let mods = event.modifiers;
        let has_ctrl = self.has_any(CTRL_TOKENS);
        let has_meta = self.has_any(META_TOKENS);
        let has_shift = self.has_any(SHIFT_TOKENS);
        let has_alt = self.has_any(ALT_TOKENS);

        let synthesize = !has_ctrl && !has_meta;
        let want_ctrl = has_ctrl || (synthesize && platform == Platform::Other);
        let want_meta = has_meta || (synthesize && platform == Platform::MacOs);

        if mods.ctrl != want_ctrl || mods.meta != want_meta || mods.alt != has_alt {
            return false;
        }

        self.primary_keys().any(|candidate| {
            if !key_matches(&pressed, candidate, mods.shift) {
                return false;
            }
            let shift_exempt = is_shift_required(&pressed)
                || shifted_counterpart(&pressed).is_some_and(is_shift_required)
                || is_shift_required(candidate);
            shift_exempt || mods.shift == has_shift
        })
    }
}

/// Compare a pressed key with a binding's primary key
///
/// Some platforms report the unshifted key (`=`) with shift held when the
/// user typed `+`; that still matches a `+` binding.
fn key_matches(pressed: &str, candidate: &str, shift: bool) -> bool {
    pressed == candidate || (shift && shifted_counterpart(pressed) == Some(candidate))
}

impl From<Vec<String>> for ShortcutBinding {
    fn from(tokens: Vec<String>) -> Self {
        Self::new(tokens)
    }
}

impl From<ShortcutBinding> for Vec<String> {
    fn from(binding: ShortcutBinding) -> Self {
        binding.tokens
    }
}

impl fmt::Display for ShortcutBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" + "))
    }
}

/// A named action with alternative bindings (OR semantics)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutAction {
    /// Action name (`newTab`, `zoominTab`, ...)
    pub action: String,

    /// Alternative bindings; empty ones never match
    #[serde(default)]
    pub bindings: Vec<ShortcutBinding>,
}

impl ShortcutAction {
    /// Create an action
    pub fn new(action: impl Into<String>, bindings: Vec<ShortcutBinding>) -> Self {
        Self {
            action: action.into(),
            bindings,
        }
    }

    /// Check if any binding matches
    pub fn matches(&self, event: &KeyEvent, platform: Platform) -> bool {
        self.bindings.iter().any(|b| b.matches(event, platform))
    }
}

/// Ordered table of shortcut actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortcutTable {
    actions: Vec<ShortcutAction>,
}

impl ShortcutTable {
    /// Create a table, keeping the given order
    pub fn new(actions: Vec<ShortcutAction>) -> Self {
        Self { actions }
    }

    /// Browser defaults
    pub fn default_table() -> Self {
        fn action(name: &str, alternatives: &[&[&str]]) -> ShortcutAction {
            ShortcutAction::new(
                name,
                alternatives
                    .iter()
                    .map(|tokens| ShortcutBinding::new(tokens.iter()))
                    .collect(),
            )
        }

        Self::new(vec![
            action("history", &[&["y"], &[]]),
            action("find", &[&["f"], &[]]),
            action("closeTab", &[&["w"], &[]]),
            action("reloadTab", &[&["r"], &[]]),
            action("newTab", &[&["t"], &[]]),
            action("zoominTab", &[&["+"], &["="]]),
            action("zoomoutTab", &[&["-"], &["_"]]),
            action("zoomresetTab", &[&["0"], &[]]),
        ])
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate actions in match order
    pub fn iter(&self) -> impl Iterator<Item = &ShortcutAction> {
        self.actions.iter()
    }

    /// Look up an action by name
    pub fn get(&self, action: &str) -> Option<&ShortcutAction> {
        self.actions.iter().find(|a| a.action == action)
    }

    /// Replace an action's bindings, or append it
    pub fn set(&mut self, action: ShortcutAction) {
        match self.actions.iter_mut().find(|a| a.action == action.action) {
            Some(existing) => existing.bindings = action.bindings,
            None => self.actions.push(action),
        }
    }

    /// First action matching the event
    pub fn match_event(&self, event: &KeyEvent, platform: Platform) -> Option<&str> {
        self.actions
            .iter()
            .find(|a| a.matches(event, platform))
            .map(|a| a.action.as_str())
    }
}

/// Shortcut matcher bound to a platform
#[derive(Debug, Clone)]
pub struct ShortcutMatcher {
    table: ShortcutTable,
    platform: Platform,
}

impl ShortcutMatcher {
    /// Create a matcher
    pub fn new(table: ShortcutTable, platform: Platform) -> Self {
        Self { table, platform }
    }

    /// Swap in a new table (settings reload)
    pub fn set_table(&mut self, table: ShortcutTable) {
        self.table = table;
    }

    /// Current table
    pub fn table(&self) -> &ShortcutTable {
        &self.table
    }

    /// Platform used for default modifiers
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// First action matching the event, if any
    pub fn match_event(&self, event: &KeyEvent) -> Option<&str> {
        self.table.match_event(event, self.platform)
    }
}
