//! Surface Interfaces
//!
//! Everything the router consumes from the host: the page surfaces it replays
//! into ([`SurfaceBridge`]), the persisted input settings ([`SettingsStore`]),
//! and a JSON-lines transport that implements the bridge over a pair of byte
//! streams ([`stdio`]).

mod bridge;
mod settings;
pub mod stdio;

pub use bridge::{
    KeyKind, KeyReplay, PointerKind, PointerReplay, SurfaceBridge, SurfaceError, SurfaceId,
};
#[cfg(test)]
pub use bridge::MockSurfaceBridge;
pub use settings::{SettingsSnapshot, SettingsStore, SharedSettings, KNOWN_ACTIONS};
