//! Read-only view handed to mode policies.
//!
//! `PolicyInput` is assembled by the control loop after the sensing phase.
//! Policies never see the supervisor or the ledger directly, which keeps
//! them pure functions of this struct.

use crate::sensors::level::TankLevel;
use crate::supervisor::{PumpHealth, PumpId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyInput {
    /// Level of the reservoir being filled.
    pub overhead: TankLevel,
    /// Level of the reservoir being drawn from.
    pub source: TankLevel,
    /// Commanded-on state per pump.
    pub active: [bool; 2],
    pub health: [PumpHealth; 2],
    /// Whether the automatic policy may start each pump (no lockout).
    pub available: [bool; 2],
}

impl PolicyInput {
    pub fn is_active(&self, pump: PumpId) -> bool {
        self.active[pump.index()]
    }

    pub fn any_active(&self) -> bool {
        self.active.iter().any(|&on| on)
    }

    pub fn is_available(&self, pump: PumpId) -> bool {
        self.available[pump.index()]
    }

    pub fn health(&self, pump: PumpId) -> PumpHealth {
        self.health[pump.index()]
    }

    /// The source can feed a pump.
    pub fn source_has_water(&self) -> bool {
        self.source >= TankLevel::Low
    }

    /// First active pump whose health is Fault or DryRun, Primary first.
    pub fn failed_active(&self) -> Option<PumpId> {
        PumpId::ALL
            .into_iter()
            .find(|&p| self.is_active(p) && self.health(p).is_failed())
    }
}
