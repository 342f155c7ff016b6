//! Content Surface Probe Scripts
//!
//! Scripts injected into a page surface to find the element under a point,
//! mark it as the tracked editable, and later push values into it, submit
//! it, or release it. Results come back as JSON values and are parsed here.
//!
//! The tracked element carries [`MIRROR_ATTR`] with the mirror id as value;
//! its original inline opacity is parked in [`PREV_OPACITY_ATTR`]. At most one
//! element per page carries the marker: `Track` clears any stale marker
//! before setting a new one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::input::error::{InputError, Result};

/// Attribute marking the tracked editable element
pub const MIRROR_ATTR: &str = "data-radiant-mirror";

/// Attribute holding the element's inline opacity before it was hidden
pub const PREV_OPACITY_ATTR: &str = "data-radiant-prev-opacity";

/// Monotonically increasing probe request id
///
/// A mirror created by a probe shares its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeRequestId(pub u64);

impl fmt::Display for ProbeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues probe request ids
#[derive(Debug, Default)]
pub struct ProbeIdGenerator {
    next: AtomicU64,
}

impl ProbeIdGenerator {
    /// Create a generator starting at 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Next id
    pub fn next_id(&self) -> ProbeRequestId {
        ProbeRequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A script to run in a page surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "script", rename_all = "camelCase")]
pub enum ProbeScript {
    /// Is there an editable element at this point?
    HitTest {
        /// Surface-local x
        x: f64,
        /// Surface-local y
        y: f64,
    },
    /// Mark, hide and measure the editable element at this point
    Track {
        /// Surface-local x
        x: f64,
        /// Surface-local y
        y: f64,
        /// Marker value
        id: ProbeRequestId,
    },
    /// Push a value into the tracked element
    CommitValue {
        /// Marker value
        id: ProbeRequestId,
        /// New text
        value: String,
    },
    /// Submit the enclosing form, or press Enter on the element
    Submit {
        /// Marker value
        id: ProbeRequestId,
    },
    /// Restore and unmark the tracked element
    Release {
        /// Marker value
        id: ProbeRequestId,
    },
}

const EDITABLE_FN: &str = r#"function radiantEditable(el) {
  if (!el) return null;
  if (el.disabled || el.readOnly) return null;
  var tag = el.tagName ? el.tagName.toLowerCase() : '';
  if (tag === 'textarea') return 'textarea';
  if (tag === 'input') {
    var t = (el.getAttribute('type') || 'text').toLowerCase();
    if (['text','search','email','url','tel','password','number'].indexOf(t) >= 0) return 'input';
    return null;
  }
  if (el.isContentEditable) return 'contenteditable';
  return null;
}"#;

const HIT_TEST_JS: &str = r#"(function () {
  __EDITABLE__
  var el = document.elementFromPoint(__X__, __Y__);
  var kind = radiantEditable(el);
  return { editable: kind !== null, kind: kind };
})()"#;

const TRACK_JS: &str = r#"(function () {
  __EDITABLE__
  document.querySelectorAll('[__ATTR__]').forEach(function (old) {
    old.style.opacity = old.getAttribute('__PREV__') || '';
    old.removeAttribute('__PREV__');
    old.removeAttribute('__ATTR__');
  });
  var el = document.elementFromPoint(__X__, __Y__);
  if (radiantEditable(el) === null) return null;
  var background = 'transparent';
  for (var node = el; node && node.nodeType === 1; node = node.parentElement) {
    var bg = getComputedStyle(node).backgroundColor;
    if (bg && bg !== 'transparent' && bg !== 'rgba(0, 0, 0, 0)') { background = bg; break; }
  }
  var cs = getComputedStyle(el);
  var style = {};
  ['font-family','font-size','font-weight','font-style','color','text-align','line-height',
   'letter-spacing','padding-top','padding-right','padding-bottom','padding-left','border-radius']
    .forEach(function (p) { style[p] = cs.getPropertyValue(p); });
  style.effectiveBackground = background;
  el.setAttribute('__PREV__', el.style.opacity || '');
  el.setAttribute('__ATTR__', '__ID__');
  el.style.opacity = '0';
  el.focus({ preventScroll: true });
  var r = el.getBoundingClientRect();
  var value = el.isContentEditable ? el.textContent : el.value;
  return {
    x: r.left, y: r.top, width: r.width, height: r.height,
    value: value || '',
    inputType: el.tagName.toLowerCase() === 'input' ? (el.getAttribute('type') || 'text') : null,
    style: style
  };
})()"#;

const COMMIT_JS: &str = r#"(function () {
  var el = document.querySelector('[__ATTR__="__ID__"]');
  if (!el) return false;
  var value = __VALUE__;
  if (el.isContentEditable) {
    el.textContent = value;
  } else {
    var proto = el.tagName.toLowerCase() === 'textarea'
      ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    var setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    setter.call(el, value);
  }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})()"#;

const SUBMIT_JS: &str = r#"(function () {
  var el = document.querySelector('[__ATTR__="__ID__"]');
  if (!el) return false;
  var form = el.form || el.closest('form');
  if (form) {
    if (typeof form.requestSubmit === 'function') form.requestSubmit(); else form.submit();
    return true;
  }
  var init = { key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true, cancelable: true };
  el.dispatchEvent(new KeyboardEvent('keydown', init));
  el.dispatchEvent(new KeyboardEvent('keyup', init));
  return true;
})()"#;

const RELEASE_JS: &str = r#"(function () {
  var el = document.querySelector('[__ATTR__="__ID__"]');
  if (!el) return false;
  el.style.opacity = el.getAttribute('__PREV__') || '';
  el.removeAttribute('__PREV__');
  el.removeAttribute('__ATTR__');
  el.blur();
  return true;
})()"#;

impl ProbeScript {
    /// Mirror id the script acts on, if any
    pub fn mirror_id(&self) -> Option<ProbeRequestId> {
        match self {
            Self::HitTest { .. } => None,
            Self::Track { id, .. }
            | Self::CommitValue { id, .. }
            | Self::Submit { id }
            | Self::Release { id } => Some(*id),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::HitTest { .. } => "hit-test",
            Self::Track { .. } => "track",
            Self::CommitValue { .. } => "commit-value",
            Self::Submit { .. } => "submit",
            Self::Release { .. } => "release",
        }
    }

    /// Render the script as JavaScript source
    pub fn to_js(&self) -> String {
        let template = match self {
            Self::HitTest { .. } => HIT_TEST_JS,
            Self::Track { .. } => TRACK_JS,
            Self::CommitValue { .. } => COMMIT_JS,
            Self::Submit { .. } => SUBMIT_JS,
            Self::Release { .. } => RELEASE_JS,
        };
        let mut source = template
            .replace("__EDITABLE__", EDITABLE_FN)
            .replace("__ATTR__", MIRROR_ATTR)
            .replace("__PREV__", PREV_OPACITY_ATTR);

        if let Self::HitTest { x, y } | Self::Track { x, y, .. } = self {
            source = source
                .replace("__X__", &js_number(*x))
                .replace("__Y__", &js_number(*y));
        }
        if let Some(id) = self.mirror_id() {
            source = source.replace("__ID__", &id.0.to_string());
        }
        // Page-provided text goes in last so it is never rewritten
        if let Self::CommitValue { value, .. } = self {
            source = source.replace("__VALUE__", &js_string(value));
        }
        source
    }
}

fn js_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "0".to_string()
    }
}

fn js_string(value: &str) -> String {
    // Serializing a str cannot fail
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Result of a hit test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitTestResult {
    /// Whether an editable element is at the point
    pub editable: bool,
    /// `input`, `textarea` or `contenteditable`
    #[serde(default)]
    pub kind: Option<String>,
}

/// Geometry, value and style of the tracked element
///
/// Geometry is in the page surface's own coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Current value
    #[serde(default)]
    pub value: String,
    /// `type` attribute of an input element
    #[serde(default)]
    pub input_type: Option<String>,
    /// Flattened computed style, plus `effectiveBackground`
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

/// Parse a hit test result
pub fn parse_hit_test(value: serde_json::Value) -> Result<HitTestResult> {
    if value.is_null() {
        return Ok(HitTestResult {
            editable: false,
            kind: None,
        });
    }
    serde_json::from_value(value).map_err(|e| InputError::MalformedProbeResult(e.to_string()))
}

/// Parse a track result
///
/// `Ok(None)` means the element was gone or no longer editable by the time
/// the script ran.
pub fn parse_track(value: serde_json::Value) -> Result<Option<TrackResult>> {
    if value.is_null() {
        return Ok(None);
    }
    let result: TrackResult = serde_json::from_value(value)
        .map_err(|e| InputError::MalformedProbeResult(e.to_string()))?;

    let finite = [result.x, result.y, result.width, result.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(InputError::MalformedProbeResult(
            "non-finite geometry".to_string(),
        ));
    }
    Ok(Some(result))
}

/// What a probe found
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// An editable element was tracked
    Editable(TrackResult),
    /// Nothing editable at the point
    NotEditable,
    /// The probe failed; treated like `NotEditable`
    Failed(String),
}

impl ProbeOutcome {
    /// Check if a mirror should be created
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_increase() {
        let ids = ProbeIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
        assert_eq!(a, ProbeRequestId(1));
    }

    #[test]
    fn test_scripts_have_no_placeholders_left() {
        let id = ProbeRequestId(7);
        let scripts = [
            ProbeScript::HitTest { x: 1.0, y: 2.0 },
            ProbeScript::Track { x: 1.0, y: 2.0, id },
            ProbeScript::CommitValue {
                id,
                value: "abc".to_string(),
            },
            ProbeScript::Submit { id },
            ProbeScript::Release { id },
        ];
        for script in &scripts {
            let js = script.to_js();
            assert!(!js.contains("__"), "{} left a placeholder", script.name());
        }
    }

    #[test]
    fn test_track_marks_with_id() {
        let js = ProbeScript::Track {
            x: 10.5,
            y: 20.0,
            id: ProbeRequestId(42),
        }
        .to_js();
        assert!(js.contains("elementFromPoint(10.5, 20)"));
        assert!(js.contains("el.setAttribute('data-radiant-mirror', '42')"));
        assert!(js.contains("effectiveBackground"));
    }

    #[test]
    fn test_commit_value_is_escaped() {
        let js = ProbeScript::CommitValue {
            id: ProbeRequestId(1),
            value: "it's \"quoted\"\n</script>".to_string(),
        }
        .to_js();
        assert!(js.contains(r#"var value = "it's \"quoted\"\n</script>";"#));
    }

    #[test]
    fn test_non_finite_coordinates_render_as_zero() {
        let js = ProbeScript::HitTest {
            x: f64::NAN,
            y: f64::INFINITY,
        }
        .to_js();
        assert!(js.contains("elementFromPoint(0, 0)"));
    }

    #[test]
    fn test_parse_track() {
        let value = json!({
            "x": 10.0, "y": 20.0, "width": 200.0, "height": 30.0,
            "value": "hello", "inputType": "search",
            "style": { "font-size": "14px", "effectiveBackground": "rgb(255, 255, 255)" }
        });
        let track = parse_track(value).unwrap().unwrap();
        assert_eq!(track.value, "hello");
        assert_eq!(track.input_type.as_deref(), Some("search"));
        assert_eq!(track.style["effectiveBackground"], "rgb(255, 255, 255)");
    }

    #[test]
    fn test_parse_failures_are_malformed() {
        assert!(matches!(
            parse_track(json!({"x": 1})),
            Err(InputError::MalformedProbeResult(_))
        ));
        assert!(matches!(
            parse_hit_test(json!("yes")),
            Err(InputError::MalformedProbeResult(_))
        ));
        assert_eq!(parse_track(json!(null)).unwrap(), None);
        assert!(!parse_hit_test(json!(null)).unwrap().editable);
    }
}
