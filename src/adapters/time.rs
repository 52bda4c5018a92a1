//! Host clock adapter.
//!
//! Provides the [`ClockPort`] for the simulator binary:
//!
//! - uptime from `std::time::Instant` (monotonic),
//! - wall-clock seconds from `std::time::SystemTime`, reported as `None`
//!   while the clock is obviously unsynced (before 2020-01-01).

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::ports::{ClockPort, Timestamp};

/// 2020-01-01T00:00:00Z.
const EPOCH_2020: u64 = 1_577_836_800;

pub struct SystemClock {
    start: Instant,
    /// Offset applied to wall-clock seconds to get local time.
    utc_offset_secs: i64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_utc_offset(0)
    }

    pub fn with_utc_offset(utc_offset_secs: i64) -> Self {
        Self {
            start: Instant::now(),
            utc_offset_secs,
        }
    }

    /// Milliseconds since this clock was created (monotonic).
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Local wall-clock seconds, `None` if the system clock is not set.
    pub fn wall_secs(&self) -> Option<u64> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        if secs < EPOCH_2020 {
            return None;
        }
        secs.checked_add_signed(self.utc_offset_secs)
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp {
            uptime_ms: self.uptime_ms(),
            wall_secs: self.wall_secs(),
        }
    }
}
