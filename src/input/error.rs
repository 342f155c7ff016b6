//! Input Routing Error Types
//!
//! Error handling for the virtual input engine. Nothing in this subsystem is
//! fatal to the host process: every error is classified and mapped to a
//! recovery action, and most of them end in a log line.

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::mirror::probe::ProbeRequestId;
use crate::surface::SurfaceError;

/// Result type for input operations
pub type Result<T> = std::result::Result<T, InputError>;

/// Input module error types
#[derive(Error, Debug)]
pub enum InputError {
    /// A surface rejected a replay or probe
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Probe script threw or returned nothing usable
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// Probe result did not have the expected shape
    #[error("Malformed probe result: {0}")]
    MalformedProbeResult(String),

    /// Probe completed after it was superseded or cancelled
    #[error("Stale probe result {stale} (pending: {pending:?})")]
    StaleProbe {
        /// Request that completed
        stale: ProbeRequestId,
        /// Request currently pending, if any
        pending: Option<ProbeRequestId>,
    },

    /// A mirror is already active; the new one was rejected
    #[error("Mirror {active} already active, rejected {rejected}")]
    MirrorAlreadyActive {
        /// Mirror that stays active
        active: ProbeRequestId,
        /// Mirror that was rejected
        rejected: ProbeRequestId,
    },

    /// Setting value out of range or malformed
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Settings key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// Key event that cannot be matched or routed
    #[error("Invalid key event: {0}")]
    InvalidKeyEvent(String),

    /// Router task is gone
    #[error("Router command channel closed")]
    RouterClosed,

    /// Surface dispatch queue is saturated
    #[error("Dispatch queue is full")]
    DispatchQueueFull,
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Transient probe failure (script threw, surface navigated away)
    Probe,
    /// Async result that no longer matches the active request
    Stale,
    /// Out-of-range or malformed configuration
    Configuration,
    /// Second activation while a mirror is active
    DuplicateActivation,
    /// Replay rejected by a surface
    Surface,
    /// Backpressure on the dispatch queue
    Backpressure,
    /// Router channels closed
    Channel,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &InputError) -> ErrorType {
    match error {
        InputError::ProbeFailed(_) | InputError::MalformedProbeResult(_) => ErrorType::Probe,

        InputError::StaleProbe { .. } => ErrorType::Stale,

        InputError::InvalidSetting { .. } | InputError::InvalidKeyEvent(_) => {
            ErrorType::Configuration
        }

        InputError::MirrorAlreadyActive { .. } => ErrorType::DuplicateActivation,

        InputError::Surface(_) => ErrorType::Surface,

        InputError::DispatchQueueFull => ErrorType::Backpressure,

        InputError::RouterClosed => ErrorType::Channel,
    }
}

/// Recovery action to take after error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Treat as "no editable element found"
    Swallow,
    /// Drop the async result, keep current state
    Discard,
    /// Replace the bad value with the nearest valid one
    Normalize,
    /// Keep the first writer, ignore the newcomer
    Ignore,
    /// Skip this event
    Skip,
    /// Propagate to the caller
    Fail,
}

/// Determine recovery action for error
pub fn recovery_action(error: &InputError) -> RecoveryAction {
    match classify_error(error) {
        ErrorType::Probe => RecoveryAction::Swallow,
        ErrorType::Stale => RecoveryAction::Discard,
        ErrorType::Configuration => RecoveryAction::Normalize,
        ErrorType::DuplicateActivation => RecoveryAction::Ignore,
        ErrorType::Surface | ErrorType::Backpressure => RecoveryAction::Skip,
        ErrorType::Channel => RecoveryAction::Fail,
    }
}

/// Log an error at the level its recovery action warrants
///
/// Returns the action so callers can branch on `Fail`.
pub fn log_recovered(error: &InputError, context: &str) -> RecoveryAction {
    let action = recovery_action(error);
    match action {
        RecoveryAction::Swallow | RecoveryAction::Skip | RecoveryAction::Normalize => {
            warn!("{}: {} ({:?})", context, error, action);
        }
        RecoveryAction::Discard | RecoveryAction::Ignore => {
            debug!("{}: {} ({:?})", context, error, action);
        }
        RecoveryAction::Fail => {
            error!("{}: {}", context, error);
        }
    }
    action
}
