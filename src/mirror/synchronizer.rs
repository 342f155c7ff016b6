//! Text Mirror Synchronizer
//!
//! Owns the single active mirror descriptor. Every operation returns the
//! scripts the router must run against the real element instead of running
//! them itself, so the state machine stays synchronous:
//!
//! ```text
//! Inactive ──activate──▶ Active ──deactivate / submit──▶ Inactive
//!                          │
//!                          └──commit_value (stays Active)
//! ```
//!
//! Commit, submit and deactivate are no-ops while inactive. A second
//! activation while active is rejected and the first mirror is untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::input::error::{InputError, Result};
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::{ProbeRequestId, ProbeScript, TrackResult};

/// Overlay-rendered stand-in for a tracked editable element
///
/// Geometry is in chrome-surface coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMirrorDescriptor {
    /// Mirror id (the probe request that created it)
    pub id: ProbeRequestId,
    /// Surface holding the real element
    pub target: SurfaceTarget,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Current text
    pub value: String,
    /// `type` attribute of an input element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// Whether the mirror is shown
    pub is_active: bool,
    /// Flattened style of the real element
    pub style_snapshot: BTreeMap<String, String>,
}

impl TextMirrorDescriptor {
    /// Build a descriptor from a track result
    ///
    /// `y_offset` is added to the surface-local top edge (the chrome band
    /// height for content surfaces, zero for chrome).
    pub fn from_track(
        id: ProbeRequestId,
        target: SurfaceTarget,
        track: TrackResult,
        y_offset: f64,
    ) -> Self {
        Self {
            id,
            target,
            x: track.x,
            y: track.y + y_offset,
            width: track.width,
            height: track.height,
            value: track.value,
            input_type: track.input_type,
            is_active: true,
            style_snapshot: track.style,
        }
    }
}

/// A script to run against a surface
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEffect {
    /// Surface to run on
    pub target: SurfaceTarget,
    /// Script to run
    pub script: ProbeScript,
}

/// Outcome of a synchronizer operation on the active mirror
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorUpdate {
    /// Mirror acted on
    pub id: ProbeRequestId,
    /// Scripts to run, in order
    pub effects: Vec<MirrorEffect>,
    /// Whether the mirror was closed
    pub closed: bool,
}

/// Single-slot mirror state machine
#[derive(Debug, Default)]
pub struct MirrorSynchronizer {
    active: Option<TextMirrorDescriptor>,
}

impl MirrorSynchronizer {
    /// Create an inactive synchronizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new descriptor
    ///
    /// Rejected with [`InputError::MirrorAlreadyActive`] while another mirror
    /// is active; the active one stays unchanged.
    pub fn activate(&mut self, mut descriptor: TextMirrorDescriptor) -> Result<&TextMirrorDescriptor> {
        if let Some(active) = &self.active {
            return Err(InputError::MirrorAlreadyActive {
                active: active.id,
                rejected: descriptor.id,
            });
        }

        descriptor.is_active = true;
        info!(
            "Mirror {} active on {} at ({:.0}, {:.0}) {}x{}",
            descriptor.id,
            descriptor.target,
            descriptor.x,
            descriptor.y,
            descriptor.width,
            descriptor.height
        );
        let active = self.active.insert(descriptor);
        Ok(&*active)
    }

    /// Push the overlay's text into the real element
    pub fn commit_value(&mut self, value: String) -> Option<MirrorUpdate> {
        let Some(active) = self.active.as_mut() else {
            debug!("Commit with no active mirror ignored");
            return None;
        };

        active.value = value.clone();
        Some(MirrorUpdate {
            id: active.id,
            effects: vec![MirrorEffect {
                target: active.target,
                script: ProbeScript::CommitValue {
                    id: active.id,
                    value,
                },
            }],
            closed: false,
        })
    }

    /// Submit the real element's form and close the mirror
    pub fn submit_form(&mut self) -> Option<MirrorUpdate> {
        let Some(active) = self.active.take() else {
            debug!("Submit with no active mirror ignored");
            return None;
        };

        info!("Mirror {} submitted", active.id);
        Some(MirrorUpdate {
            id: active.id,
            effects: vec![
                MirrorEffect {
                    target: active.target,
                    script: ProbeScript::Submit { id: active.id },
                },
                MirrorEffect {
                    target: active.target,
                    script: ProbeScript::Release { id: active.id },
                },
            ],
            closed: true,
        })
    }

    /// Hide the mirror and restore the real element
    pub fn deactivate(&mut self) -> Option<MirrorUpdate> {
        let Some(active) = self.active.take() else {
            debug!("Deactivate with no active mirror ignored");
            return None;
        };

        info!("Mirror {} deactivated", active.id);
        Some(MirrorUpdate {
            id: active.id,
            effects: vec![MirrorEffect {
                target: active.target,
                script: ProbeScript::Release { id: active.id },
            }],
            closed: true,
        })
    }

    /// Move a content-surface mirror after the chrome band changed height
    ///
    /// Returns the updated descriptor if it moved.
    pub fn shift_content_geometry(&mut self, dy: f64) -> Option<&TextMirrorDescriptor> {
        match self.active.as_mut() {
            Some(active) if active.target.is_content() && dy != 0.0 => {
                active.y += dy;
                Some(&*active)
            }
            _ => None,
        }
    }

    /// Active descriptor, if any
    pub fn active(&self) -> Option<&TextMirrorDescriptor> {
        self.active.as_ref()
    }

    /// Check if a mirror is shown
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Check if the given id is the active mirror
    pub fn is_current(&self, id: ProbeRequestId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == id)
    }
}
