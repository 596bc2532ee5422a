//! Injectable time source with a test-settable offset.
//!
//! Every component takes an `Arc<Clock>` at construction instead of
//! reading the wall clock directly, so tests can move time forward
//! deterministically and restore it afterward.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Clock with an atomic signed offset in seconds added to wall time.
#[derive(Debug, Default)]
pub struct Clock {
    offset_secs: AtomicI64,
}

impl Clock {
    /// Create a clock with zero offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time: wall clock plus the configured offset.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.offset_secs.load(Ordering::Relaxed))
    }

    /// Current offset in seconds.
    pub fn offset(&self) -> i64 {
        self.offset_secs.load(Ordering::Relaxed)
    }

    /// Set the offset in seconds. Negative offsets move time backward.
    pub fn set_offset(&self, secs: i64) {
        self.offset_secs.store(secs, Ordering::Relaxed);
    }

    /// Reset the offset to zero.
    pub fn reset(&self) {
        self.set_offset(0);
    }

    /// Set the offset for the lifetime of the returned guard; the
    /// previous offset is restored on drop, on all exit paths.
    pub fn scoped_offset(self: &Arc<Self>, secs: i64) -> OffsetGuard {
        let previous = self.offset();
        self.set_offset(secs);
        OffsetGuard {
            clock: Arc::clone(self),
            previous,
        }
    }
}

/// Restores the clock's previous offset when dropped.
pub struct OffsetGuard {
    clock: Arc<Clock>,
    previous: i64,
}

impl Drop for OffsetGuard {
    fn drop(&mut self) {
        self.clock.set_offset(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_moves_time_forward() {
        let clock = Clock::new();
        let before = clock.now();
        clock.set_offset(3600);
        let after = clock.now();
        assert!(after - before >= Duration::seconds(3599));
        clock.reset();
        assert_eq!(clock.offset(), 0);
    }

    #[test]
    fn test_scoped_offset_restores_on_drop() {
        let clock = Arc::new(Clock::new());
        clock.set_offset(100);
        {
            let _guard = clock.scoped_offset(5000);
            assert_eq!(clock.offset(), 5000);
        }
        assert_eq!(clock.offset(), 100);
    }
}
