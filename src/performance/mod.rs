//! Performance modules
//!
//! Rate limiting for the high-frequency paths:
//! - **Broadcast coalescing**: cursor-position notifications to chrome and
//!   overlay at most once per scheduling tick
//! - **Replay throttling**: pointer-move replay into the content surface at a
//!   fixed minimum spacing
//!
//! # Architecture
//!
//! ```text
//! RelativeMotion
//!   └─> VirtualCursor (position updated immediately)
//!       ├─> BroadcastCoalescer ──tick──> CursorMoved notification
//!       └─> ReplayThrottle ──now or tick──> content pointer-move replay
//! ```

mod batcher;

pub use batcher::{BroadcastCoalescer, CoalesceStats, ReplayThrottle, ThrottleStats};
