//! Per-pump runtime accounting.
//!
//! Time is accumulated in milliseconds from the monotonic uptime clock, so
//! irregular tick spacing neither drifts nor double-counts.  Day rollover
//! compares a day index against the last one observed instead of running a
//! 24-hour timer.
//!
//! Counters are volatile: they live in RAM only and restart from zero after
//! a power cycle.

use log::info;
use serde::Serialize;

use crate::supervisor::PumpId;

const MS_PER_SEC: u64 = 1_000;
const MS_PER_MIN: u64 = 60 * MS_PER_SEC;
const MS_PER_HOUR: u64 = 60 * MS_PER_MIN;

/// Runtime counters for one pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpRuntime {
    daily_ms: u64,
    total_ms: u64,
    /// Uptime (ms) at which the pump was commanded on, `None` while off.
    active_since_ms: Option<u64>,
}

impl PumpRuntime {
    pub fn daily_secs(&self) -> u64 {
        self.daily_ms / MS_PER_SEC
    }

    pub fn total_secs(&self) -> u64 {
        self.total_ms / MS_PER_SEC
    }

    pub fn active_since_ms(&self) -> Option<u64> {
        self.active_since_ms
    }

    /// Seconds the current run has lasted, 0 while off.
    pub fn active_for_secs(&self, now_ms: u64) -> u64 {
        self.active_since_ms
            .map_or(0, |since| now_ms.saturating_sub(since) / MS_PER_SEC)
    }
}

/// Tracks daily and cumulative runtime for both pumps.
#[derive(Debug, Default)]
pub struct RuntimeLedger {
    pumps: [PumpRuntime; 2],
    last_tick_ms: Option<u64>,
    last_rollover_day: Option<u64>,
}

impl RuntimeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pump(&self, pump: PumpId) -> &PumpRuntime {
        &self.pumps[pump.index()]
    }

    /// Open a run.  Idempotent: an already-open run keeps its start time.
    pub fn mark_started(&mut self, pump: PumpId, now_ms: u64) {
        let rt = &mut self.pumps[pump.index()];
        if rt.active_since_ms.is_none() {
            rt.active_since_ms = Some(now_ms);
        }
    }

    /// Close the current run, crediting the time since the last tick.
    pub fn mark_stopped(&mut self, pump: PumpId, now_ms: u64) {
        self.credit(pump, now_ms, true);
        self.pumps[pump.index()].active_since_ms = None;
    }

    pub fn is_active(&self, pump: PumpId) -> bool {
        self.pumps[pump.index()].active_since_ms.is_some()
    }

    /// Advance the ledger to `now_ms`.
    ///
    /// If `day_index` differs from the last observed day, both daily
    /// counters are zeroed and the interval since the previous tick counts
    /// towards the totals only, however many days it spans.  Returns `true`
    /// when that happened; a gap crossing several boundaries is one rollover.
    pub fn tick(&mut self, now_ms: u64, day_index: u64) -> bool {
        let rolled = match self.last_rollover_day {
            Some(day) if day != day_index => {
                info!("Runtime: day rollover {} -> {}", day, day_index);
                self.reset_daily();
                true
            }
            _ => false,
        };
        self.last_rollover_day = Some(day_index);

        for pump in PumpId::ALL {
            self.credit(pump, now_ms, !rolled);
        }
        self.last_tick_ms = Some(now_ms);
        rolled
    }

    /// Commanded-on duration strictly exceeds the configured limit.
    pub fn is_max_runtime_exceeded(&self, pump: PumpId, now_ms: u64, max_runtime_minutes: u32) -> bool {
        self.pumps[pump.index()]
            .active_since_ms
            .is_some_and(|since| now_ms.saturating_sub(since) > u64::from(max_runtime_minutes) * MS_PER_MIN)
    }

    pub fn is_maintenance_due(&self, pump: PumpId, maintenance_hours: u32) -> bool {
        self.pumps[pump.index()].total_ms > u64::from(maintenance_hours) * MS_PER_HOUR
    }

    pub fn reset_daily(&mut self) {
        for rt in &mut self.pumps {
            rt.daily_ms = 0;
        }
    }

    /// Zero every counter.  Open runs stay open and restart from `now`
    /// on the next credit.
    pub fn reset_all(&mut self) {
        for rt in &mut self.pumps {
            rt.daily_ms = 0;
            rt.total_ms = 0;
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Add the active time since the later of the run start and the last
    /// tick.  Called from `tick` and when a run closes.
    fn credit(&mut self, pump: PumpId, now_ms: u64, to_daily: bool) {
        let last_tick = self.last_tick_ms;
        let rt = &mut self.pumps[pump.index()];
        let Some(since) = rt.active_since_ms else {
            return;
        };
        let from = last_tick.map_or(since, |t| t.max(since));
        let delta = now_ms.saturating_sub(from);
        if to_daily {
            rt.daily_ms = rt.daily_ms.saturating_add(delta);
        }
        rt.total_ms = rt.total_ms.saturating_add(delta);
    }
}
