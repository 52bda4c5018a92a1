//! Condition latch and safety-phase verdicts.
//!
//! The latch runs **every tick** and remembers which plant conditions are
//! currently asserted.  It answers one question: did this condition just
//! become true?  Callers raise an alert only on that edge, which gives one
//! alert per episode instead of one per tick.
//!
//! ## Condition lifecycle
//!
//! 1. A condition is observed (e.g. the source reservoir reads Empty).
//! 2. [`ConditionLatch::observe`] sets the bit and returns `true` once.
//! 3. While the condition persists, `observe` keeps returning `false`.
//! 4. When the condition is observed false, the bit clears and the next
//!    assertion is a fresh episode.
//!
//! The safety phase itself is [`evaluate`]: max-runtime overrides and
//! maintenance edges for both pumps, derived from the runtime ledger.

use log::{info, warn};

use crate::config::ControllerConfig;
use crate::error::Condition;
use crate::runtime::RuntimeLedger;
use crate::supervisor::PumpId;

/// Edge-detecting bitfield of [`Condition`]s.
#[derive(Debug, Default)]
pub struct ConditionLatch {
    flags: u8,
}

impl ConditionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether `condition` currently holds.  Returns `true` only on
    /// the tick it becomes asserted.
    pub fn observe(&mut self, condition: Condition, asserted: bool) -> bool {
        let was_set = self.is_set(condition);
        if asserted {
            if !was_set {
                warn!("CONDITION SET: {condition}");
            }
            self.flags |= condition.mask();
            !was_set
        } else {
            if was_set {
                info!("CONDITION CLEARED: {condition}");
            }
            self.flags &= !condition.mask();
            false
        }
    }

    pub fn is_set(&self, condition: Condition) -> bool {
        self.flags & condition.mask() != 0
    }

    /// Raw bitmask, for status reporting.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn clear_all(&mut self) {
        self.flags = 0;
    }
}

/// What the safety phase wants done this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyVerdict {
    /// Pumps to force off because they exceeded `max_runtime_minutes`.
    pub runtime_stop: [bool; 2],
    /// Pumps whose maintenance interval was crossed this tick.
    pub maintenance_due: [bool; 2],
}

impl SafetyVerdict {
    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

fn maintenance_condition(pump: PumpId) -> Condition {
    match pump {
        PumpId::Primary => Condition::PrimaryMaintenanceDue,
        PumpId::Secondary => Condition::SecondaryMaintenanceDue,
    }
}

/// Evaluate the safety checks for both pumps.  Runs in every mode.
pub fn evaluate(
    ledger: &RuntimeLedger,
    latch: &mut ConditionLatch,
    config: &ControllerConfig,
    now_ms: u64,
) -> SafetyVerdict {
    let mut verdict = SafetyVerdict::default();
    for pump in PumpId::ALL {
        verdict.runtime_stop[pump.index()] =
            ledger.is_max_runtime_exceeded(pump, now_ms, config.max_runtime_minutes);
        let due = ledger.is_maintenance_due(pump, config.maintenance_hours);
        verdict.maintenance_due[pump.index()] = latch.observe(maintenance_condition(pump), due);
    }
    verdict
}
