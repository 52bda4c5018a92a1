//! Pump supervisor.
//!
//! The supervisor is the **only** component that touches the relays.  It
//! owns each pump's commanded on/off state and the health derived from the
//! measured current draw.
//!
//! ## Health lifecycle
//!
//! 1. `command_on` energises the relay; health starts as a provisional
//!    `Running` until the next tick's measurement.
//! 2. Every tick `update_health` re-derives health from the current band.
//!    Nothing is latched: a bad reading that recovers recovers.
//! 3. A transition *into* `Fault` or `DryRun` is reported exactly once so
//!    the caller can raise a single Critical alert per transition.
//! 4. `command_off` de-energises the relay; health is `Off`.
//!
//! Lockouts are separate from health.  They record that the automatic
//! policy must not start a pump again on its own (after a failover trip or
//! during a post-max-runtime cool-down); operator commands clear them.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ActuatorPort;
use crate::error::Rejection;

/// Pump identity.  Exactly two exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpId {
    Primary,
    Secondary,
}

impl PumpId {
    pub const ALL: [PumpId; 2] = [PumpId::Primary, PumpId::Secondary];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn other(self) -> PumpId {
        match self {
            PumpId::Primary => PumpId::Secondary,
            PumpId::Secondary => PumpId::Primary,
        }
    }
}

/// Derived operational state of a pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpHealth {
    #[default]
    Off,
    Running,
    Fault,
    DryRun,
}

impl PumpHealth {
    /// Pure mapping from commanded state and current draw to health.
    pub fn classify(commanded_on: bool, current_a: f32, min_a: f32, max_a: f32) -> Self {
        if !commanded_on {
            PumpHealth::Off
        } else if current_a < min_a {
            PumpHealth::DryRun
        } else if current_a > max_a {
            PumpHealth::Fault
        } else {
            PumpHealth::Running
        }
    }

    pub fn is_failed(self) -> bool {
        matches!(self, PumpHealth::Fault | PumpHealth::DryRun)
    }
}

/// Why the automatic policy may not start a pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "until_ms", rename_all = "snake_case")]
pub enum Lockout {
    #[default]
    None,
    /// Stopped after Fault/DryRun; held until an operator command.
    Tripped,
    /// Resting after a max-runtime stop, until the given uptime (ms).
    Cooldown(u64),
}

#[derive(Debug, Clone, Copy, Default)]
struct PumpChannel {
    commanded_on: bool,
    health: PumpHealth,
    current_a: f32,
    /// Tick on which the relay was last energised.
    started_tick: u64,
    lockout: Lockout,
}

/// A health change worth reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthTransition {
    pub pump: PumpId,
    pub from: PumpHealth,
    pub to: PumpHealth,
    pub current_a: f32,
}

/// Owns both pumps' commanded state and health.
#[derive(Debug, Default)]
pub struct PumpSupervisor {
    pumps: [PumpChannel; 2],
}

impl PumpSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Energise `pump`.  Refused while the emergency stop is engaged.
    ///
    /// Returns `Ok(true)` if the relay changed, `Ok(false)` if the pump was
    /// already on (its start tick is kept).
    pub fn command_on(
        &mut self,
        pump: PumpId,
        emergency: bool,
        tick: u64,
        hw: &mut impl ActuatorPort,
    ) -> Result<bool, Rejection> {
        if emergency {
            warn!("Pump {:?}: start blocked by emergency stop", pump);
            return Err(Rejection::EmergencyActive);
        }
        let ch = &mut self.pumps[pump.index()];
        if ch.commanded_on {
            return Ok(false);
        }
        hw.set_relay(pump, true);
        ch.commanded_on = true;
        ch.health = PumpHealth::Running;
        ch.started_tick = tick;
        info!("Pump {:?}: relay ON", pump);
        Ok(true)
    }

    /// De-energise `pump`.  Returns `true` if the relay changed.
    pub fn command_off(&mut self, pump: PumpId, hw: &mut impl ActuatorPort) -> bool {
        let ch = &mut self.pumps[pump.index()];
        if !ch.commanded_on {
            return false;
        }
        hw.set_relay(pump, false);
        ch.commanded_on = false;
        ch.health = PumpHealth::Off;
        info!("Pump {:?}: relay OFF", pump);
        true
    }

    /// Force both relays off, whatever the bookkeeping says.
    pub fn all_off(&mut self, hw: &mut impl ActuatorPort) -> [bool; 2] {
        let changed = [
            self.command_off(PumpId::Primary, hw),
            self.command_off(PumpId::Secondary, hw),
        ];
        hw.all_off();
        changed
    }

    /// Re-derive health from the latest current readings.
    ///
    /// A pump energised on `tick` keeps its provisional health until the
    /// next tick.  Returns the transitions into `Fault`/`DryRun`, at most
    /// one per pump.
    pub fn update_health(
        &mut self,
        current_a: [f32; 2],
        min_a: f32,
        max_a: f32,
        tick: u64,
    ) -> [Option<HealthTransition>; 2] {
        let mut out = [None, None];
        for pump in PumpId::ALL {
            let ch = &mut self.pumps[pump.index()];
            ch.current_a = current_a[pump.index()];
            if ch.commanded_on && ch.started_tick == tick {
                continue;
            }
            let next = PumpHealth::classify(ch.commanded_on, ch.current_a, min_a, max_a);
            if next == ch.health {
                continue;
            }
            let from = ch.health;
            ch.health = next;
            if next.is_failed() {
                warn!(
                    "Pump {:?}: health {:?} -> {:?} ({:.2} A)",
                    pump, from, next, ch.current_a
                );
                out[pump.index()] = Some(HealthTransition {
                    pump,
                    from,
                    to: next,
                    current_a: ch.current_a,
                });
            } else {
                info!("Pump {:?}: health {:?} -> {:?}", pump, from, next);
            }
        }
        out
    }

    pub fn health(&self, pump: PumpId) -> PumpHealth {
        self.pumps[pump.index()].health
    }

    pub fn is_active(&self, pump: PumpId) -> bool {
        self.pumps[pump.index()].commanded_on
    }

    pub fn current(&self, pump: PumpId) -> f32 {
        self.pumps[pump.index()].current_a
    }

    pub fn active_count(&self) -> usize {
        PumpId::ALL.iter().filter(|&&p| self.is_active(p)).count()
    }

    /// The single active pump, if exactly one is on.
    pub fn sole_active(&self) -> Option<PumpId> {
        match (self.is_active(PumpId::Primary), self.is_active(PumpId::Secondary)) {
            (true, false) => Some(PumpId::Primary),
            (false, true) => Some(PumpId::Secondary),
            _ => None,
        }
    }

    // ── Lockouts ──────────────────────────────────────────────

    pub fn lockout(&self, pump: PumpId) -> Lockout {
        self.pumps[pump.index()].lockout
    }

    pub fn set_lockout(&mut self, pump: PumpId, lockout: Lockout) {
        self.pumps[pump.index()].lockout = lockout;
    }

    pub fn clear_lockout(&mut self, pump: PumpId) {
        let ch = &mut self.pumps[pump.index()];
        if ch.lockout != Lockout::None {
            info!("Pump {:?}: lockout {:?} cleared", pump, ch.lockout);
        }
        ch.lockout = Lockout::None;
    }

    /// Whether the automatic policy may start `pump` at `now_ms`.
    pub fn is_available(&self, pump: PumpId, now_ms: u64) -> bool {
        match self.pumps[pump.index()].lockout {
            Lockout::None => true,
            Lockout::Tripped => false,
            Lockout::Cooldown(until) => now_ms >= until,
        }
    }
}
