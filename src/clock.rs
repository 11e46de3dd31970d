//! Tick sources.
//!
//! The engine never reads time itself; it consumes a monotonically
//! increasing tick counter (the block-height analogue of the original
//! deployment) through this seam so tests can drive phases manually.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current tick. Implementations must be monotonic.
pub trait TickSource: Send + Sync {
    fn now_tick(&self) -> u64;
}

/// Wall-clock ticks: one tick per second since the UNIX epoch.
#[derive(Debug, Default)]
pub struct SystemClock;

impl TickSource for SystemClock {
    fn now_tick(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    tick: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            tick: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, ticks: u64) {
        self.tick.fetch_add(ticks, Ordering::SeqCst);
    }

    pub fn set(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }
}

impl TickSource for ManualClock {
    fn now_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now_tick(), 10);
        clock.advance(5);
        assert_eq!(clock.now_tick(), 15);
        clock.set(100);
        assert_eq!(clock.now_tick(), 100);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now_tick();
        let b = clock.now_tick();
        assert!(b >= a);
    }
}
