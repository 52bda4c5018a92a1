//! Read-only status surface.
//!
//! Built fresh on every request by
//! [`ControlLoop::status`](super::service::ControlLoop::status) and
//! serialised as-is by the transport layer.

use heapless::Vec;
use serde::Serialize;

use crate::alerts::{ALERT_LOG_CAPACITY, Alert};
use crate::config::ControllerConfig;
use crate::modes::SystemMode;
use crate::scheduler::DeferredStop;
use crate::sensors::level::{FloatSwitches, TankId, TankLevel};
use crate::supervisor::{Lockout, PumpHealth, PumpId};

#[derive(Debug, Clone, Serialize)]
pub struct TankStatus {
    pub tank: TankId,
    pub level: TankLevel,
    pub switches: FloatSwitches,
}

#[derive(Debug, Clone, Serialize)]
pub struct PumpStatus {
    pub pump: PumpId,
    pub active: bool,
    pub health: PumpHealth,
    pub current_a: f32,
    pub daily_runtime_secs: u64,
    pub total_runtime_secs: u64,
    /// Length of the current run, 0 while off.
    pub run_secs: u64,
    pub maintenance_due: bool,
    pub lockout: Lockout,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub mode: SystemMode,
    pub emergency_stop: bool,
    pub uptime_ms: u64,
    pub tick: u64,
    /// Ticks since the current mode was entered.
    pub ticks_in_mode: u64,
    pub tanks: [TankStatus; 2],
    pub pumps: [PumpStatus; 2],
    /// Oldest first.
    pub alerts: Vec<Alert, ALERT_LOG_CAPACITY>,
    pub pending_tests: Vec<DeferredStop, 2>,
    /// Raw latched-condition bitmask.
    pub conditions: u8,
    pub config: ControllerConfig,
}

impl StatusReport {
    pub fn pump(&self, pump: PumpId) -> &PumpStatus {
        &self.pumps[pump.index()]
    }

    pub fn tank(&self, tank: TankId) -> &TankStatus {
        &self.tanks[tank.index()]
    }
}
