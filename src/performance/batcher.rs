//! Update Batching and Throttling
//!
//! Two independent rate limiters with different consumers:
//!
//! | Limiter | Consumer | Cost | Policy |
//! |---------|----------|------|--------|
//! | [`BroadcastCoalescer`] | chrome + overlay cursor redraw | cheap | latest position, once per tick |
//! | [`ReplayThrottle`] | content-surface pointer-move replay | expensive | leading edge, then trailing flush |
//!
//! Both take the current [`Instant`] from the caller so they can be driven
//! deterministically in tests.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::input::coordinates::CursorPoint;

/// Coalescing statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalesceStats {
    /// Positions marked
    pub marked: u64,
    /// Broadcasts emitted
    pub emitted: u64,
}

impl CoalesceStats {
    /// Positions that never produced their own broadcast
    pub fn coalesced(&self) -> u64 {
        self.marked.saturating_sub(self.emitted)
    }
}

/// Collapses cursor moves into at most one broadcast per tick
#[derive(Debug, Default)]
pub struct BroadcastCoalescer {
    pending: Option<CursorPoint>,
    last_sent: Option<CursorPoint>,
    stats: CoalesceStats,
}

impl BroadcastCoalescer {
    /// Create an empty coalescer
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest cursor position
    pub fn mark(&mut self, point: CursorPoint) {
        self.pending = Some(point);
        self.stats.marked += 1;
    }

    /// Take the position to broadcast this tick, if any
    ///
    /// Skips positions equal to the last one sent.
    pub fn take(&mut self) -> Option<CursorPoint> {
        let point = self.pending.take()?;
        if self.last_sent == Some(point) {
            trace!("Coalesced broadcast skipped, position unchanged");
            return None;
        }
        self.last_sent = Some(point);
        self.stats.emitted += 1;
        Some(point)
    }

    /// Check if a broadcast is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Statistics
    pub fn stats(&self) -> CoalesceStats {
        self.stats
    }
}

/// Throttle statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Items offered
    pub offered: u64,
    /// Items fired (leading or trailing)
    pub fired: u64,
    /// Items overwritten by a newer one before firing
    pub dropped: u64,
}

/// Leading-edge throttle with a trailing flush
///
/// The first item after a quiet period fires immediately. Items arriving
/// inside the interval replace each other; the latest one fires from
/// [`poll`](Self::poll) once the interval has elapsed.
#[derive(Debug)]
pub struct ReplayThrottle<T> {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
    stats: ThrottleStats,
}

impl<T> ReplayThrottle<T> {
    /// Create a throttle with the given minimum spacing
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: None,
            stats: ThrottleStats::default(),
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_fired
            .map(|last| now.saturating_duration_since(last) >= self.interval)
            .unwrap_or(true)
    }

    /// Offer an item, returning it if it may fire now
    pub fn offer(&mut self, item: T, now: Instant) -> Option<T> {
        self.stats.offered += 1;
        if self.ready(now) {
            if self.pending.take().is_some() {
                self.stats.dropped += 1;
            }
            self.last_fired = Some(now);
            self.stats.fired += 1;
            return Some(item);
        }

        if self.pending.replace(item).is_some() {
            self.stats.dropped += 1;
        }
        None
    }

    /// Flush the pending item if the interval has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_none() || !self.ready(now) {
            return None;
        }
        self.last_fired = Some(now);
        self.stats.fired += 1;
        self.pending.take()
    }

    /// Drop the pending item
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Check if an item is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Minimum spacing
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Statistics
    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalescer_emits_latest_once() {
        let mut coalescer = BroadcastCoalescer::new();
        for i in 0..10 {
            coalescer.mark(CursorPoint::new(f64::from(i), 0.0));
        }
        assert_eq!(coalescer.take(), Some(CursorPoint::new(9.0, 0.0)));
        assert_eq!(coalescer.take(), None);

        let stats = coalescer.stats();
        assert_eq!(stats.marked, 10);
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.coalesced(), 9);
    }

    #[test]
    fn test_coalescer_skips_unchanged_position() {
        let mut coalescer = BroadcastCoalescer::new();
        coalescer.mark(CursorPoint::new(1.0, 1.0));
        assert!(coalescer.take().is_some());
        coalescer.mark(CursorPoint::new(1.0, 1.0));
        assert!(coalescer.take().is_none());
    }

    #[test]
    fn test_throttle_leading_edge() {
        let start = Instant::now();
        let mut throttle = ReplayThrottle::new(Duration::from_millis(16));

        assert_eq!(throttle.offer(1, start), Some(1));
        assert_eq!(throttle.offer(2, start + Duration::from_millis(5)), None);
        assert_eq!(throttle.offer(3, start + Duration::from_millis(10)), None);
        assert!(throttle.has_pending());
    }

    #[test]
    fn test_throttle_trailing_flush_delivers_latest() {
        let start = Instant::now();
        let mut throttle = ReplayThrottle::new(Duration::from_millis(16));

        throttle.offer(1, start);
        throttle.offer(2, start + Duration::from_millis(4));
        throttle.offer(3, start + Duration::from_millis(8));

        assert_eq!(throttle.poll(start + Duration::from_millis(12)), None);
        assert_eq!(throttle.poll(start + Duration::from_millis(16)), Some(3));
        assert_eq!(throttle.poll(start + Duration::from_millis(40)), None);

        let stats = throttle.stats();
        assert_eq!(stats.offered, 3);
        assert_eq!(stats.fired, 2);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_throttle_spacing_after_flush() {
        let start = Instant::now();
        let mut throttle = ReplayThrottle::new(Duration::from_millis(16));

        throttle.offer(1, start);
        throttle.offer(2, start + Duration::from_millis(8));
        assert_eq!(throttle.poll(start + Duration::from_millis(20)), Some(2));
        // Next offer is measured from the flush, not the first fire
        assert_eq!(throttle.offer(3, start + Duration::from_millis(30)), None);
        assert_eq!(throttle.offer(4, start + Duration::from_millis(36)), Some(4));
    }

    #[test]
    fn test_throttle_clear() {
        let start = Instant::now();
        let mut throttle = ReplayThrottle::new(Duration::from_millis(16));
        throttle.offer(1, start);
        throttle.offer(2, start + Duration::from_millis(1));
        throttle.clear();
        assert_eq!(throttle.poll(start + Duration::from_secs(1)), None);
    }
}
