//! Automatic fill policy.
//!
//! ```text
//!  overhead Empty/Low, nothing running ─┬─ source >= Low ─▶ Start(first available)
//!                                       ├─ none available ─▶ NoPumpAvailable
//!                                       └─ source Empty ───▶ SourceEmpty
//!  overhead Full, something running ──────────────────────▶ StopFull
//!  running pump Fault/DryRun ────────────────────────────▶ Failover { from, to }
//!  running while source Empty ───────────────────────────▶ SourceExhausted
//!  otherwise ────────────────────────────────────────────▶ Hold
//! ```
//!
//! Rules are checked in that order and the first match wins, so at most
//! one transition is applied per tick.

use crate::sensors::level::TankLevel;
use crate::supervisor::PumpId;

use super::context::PolicyInput;

/// What a policy wants the control loop to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Hold,
    /// Energise the given pump.
    Start(PumpId),
    /// Overhead reservoir is full: stop both pumps.
    StopFull,
    /// Stop `from`; keep or start `to` if there is one.
    Failover { from: PumpId, to: Option<PumpId> },
    /// Fill needed but the source is dry: start nothing.
    SourceEmpty,
    /// Fill needed but every pump is locked out.
    NoPumpAvailable,
    /// A pump is running against a dry source: stop both.
    SourceExhausted,
}

impl Decision {
    pub fn is_hold(self) -> bool {
        self == Decision::Hold
    }
}

pub fn auto_policy(input: &PolicyInput) -> Decision {
    // a. fill
    if input.overhead.needs_fill() && !input.any_active() {
        if !input.source_has_water() {
            return Decision::SourceEmpty;
        }
        return match PumpId::ALL.into_iter().find(|&p| input.is_available(p)) {
            Some(pump) => Decision::Start(pump),
            None => Decision::NoPumpAvailable,
        };
    }

    // b. full
    if input.overhead == TankLevel::Full && input.any_active() {
        return Decision::StopFull;
    }

    // c. failover
    if let Some(from) = input.failed_active() {
        let other = from.other();
        let to = if input.is_active(other)
            || (input.source_has_water() && input.is_available(other))
        {
            Some(other)
        } else {
            None
        };
        return Decision::Failover { from, to };
    }

    // d. source ran dry mid-fill
    if input.any_active() && input.source == TankLevel::Empty {
        return Decision::SourceExhausted;
    }

    Decision::Hold
}
