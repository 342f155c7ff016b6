//! Focus Resolution and Text Mirroring
//!
//! [`probe`] holds the page-surface scripts and result parsing used to find
//! and track an editable element; [`synchronizer`] owns the overlay mirror
//! built from a successful probe and relays edits back to the real element.
//! The async side (waiting for the surface to settle, running the scripts)
//! lives in the router's probe task.

pub mod probe;
pub mod synchronizer;

pub use probe::{
    parse_hit_test, parse_track, HitTestResult, ProbeIdGenerator, ProbeOutcome, ProbeRequestId,
    ProbeScript, TrackResult, MIRROR_ATTR, PREV_OPACITY_ATTR,
};
pub use synchronizer::{MirrorEffect, MirrorSynchronizer, MirrorUpdate, TextMirrorDescriptor};
