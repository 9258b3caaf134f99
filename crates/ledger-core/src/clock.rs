//! Wall-clock abstraction. The engine never calls `SystemTime` directly so
//! tests can drive vesting and day rollover deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::SECONDS_PER_DAY;

pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            Err(_) => 0,
        }
    }
}

/// Manually advanced clock. Cloned handles share the same instant, so a test
/// can hold a handle while the engine owns the boxed clock.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_unix: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_unix)),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now_unix: i64) {
        self.now.store(now_unix, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Platform day index for a unix timestamp under a fixed UTC offset.
/// Day boundaries fall at local midnight of the configured offset.
pub fn day_key(now_unix: i64, utc_offset_secs: i64) -> i64 {
    (now_unix + utc_offset_secs).div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::UTC_OFFSET_SECS;

    #[test]
    fn day_rolls_over_at_ist_midnight() {
        // 2024-01-01T00:00:00 IST == 2023-12-31T18:30:00 UTC.
        let ist_midnight_utc = 1_704_047_400;
        assert_eq!(
            day_key(ist_midnight_utc, UTC_OFFSET_SECS),
            day_key(ist_midnight_utc - 1, UTC_OFFSET_SECS) + 1
        );
    }

    #[test]
    fn manual_clock_handles_share_state() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance(500);
        assert_eq!(clock.now_unix(), 1_500);
    }
}
