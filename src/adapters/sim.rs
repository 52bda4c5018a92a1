//! Simulated plant for the host binary and tests.
//!
//! Two reservoirs, two pumps, float-switch ladders and current sensors.
//! Running pumps move water from the secondary reservoir into the overhead
//! one; household demand drains the overhead tank and the mains refills the
//! source.  A pump whose intake is above the water line draws dry-run
//! current; an injected fault makes it draw locked-rotor current.

use log::{debug, info};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::sensors::current::CurrentCalibration;
use crate::sensors::level::{FloatSwitches, TankId};
use crate::supervisor::PumpId;

/// Fill fraction at which each float switch (bottom to top) is submerged.
pub const SWITCH_MARKS: [f32; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

/// Injectable pump failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// Locked rotor: draws far above rated current.
    Seized,
    /// Lost prime: draws dry-run current even with water available.
    LostPrime,
}

#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub overhead_capacity_l: f32,
    pub source_capacity_l: f32,
    /// Pump delivery while primed (litres per minute).
    pub pump_flow_lpm: [f32; 2],
    /// Running current while primed (amps).
    pub rated_current_a: [f32; 2],
    /// Current drawn when running dry (amps).
    pub dry_current_a: f32,
    /// Household draw from the overhead tank (litres per minute).
    pub demand_lpm: f32,
    /// Mains refill of the source reservoir (litres per minute).
    pub inflow_lpm: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            overhead_capacity_l: 500.0,
            source_capacity_l: 2000.0,
            pump_flow_lpm: [40.0, 30.0],
            rated_current_a: [3.2, 2.8],
            dry_current_a: 0.2,
            demand_lpm: 5.0,
            inflow_lpm: 2.0,
        }
    }
}

pub struct SimPlant {
    params: SimParams,
    calibration: CurrentCalibration,
    /// Litres held, indexed by [`TankId::index`].
    volume_l: [f32; 2],
    relays: [bool; 2],
    faults: [Option<SimFault>; 2],
}

impl SimPlant {
    pub fn new(params: SimParams) -> Self {
        Self {
            volume_l: [params.overhead_capacity_l * 0.4, params.source_capacity_l * 0.8],
            params,
            calibration: CurrentCalibration::default(),
            relays: [false; 2],
            faults: [None; 2],
        }
    }

    fn capacity(&self, tank: TankId) -> f32 {
        match tank {
            TankId::Overhead => self.params.overhead_capacity_l,
            TankId::Secondary => self.params.source_capacity_l,
        }
    }

    pub fn fraction(&self, tank: TankId) -> f32 {
        self.volume_l[tank.index()] / self.capacity(tank)
    }

    pub fn set_fraction(&mut self, tank: TankId, fraction: f32) {
        self.volume_l[tank.index()] = fraction.clamp(0.0, 1.0) * self.capacity(tank);
    }

    pub fn inject_fault(&mut self, pump: PumpId, fault: Option<SimFault>) {
        info!("Sim: pump {:?} fault -> {:?}", pump, fault);
        self.faults[pump.index()] = fault;
    }

    pub fn relay(&self, pump: PumpId) -> bool {
        self.relays[pump.index()]
    }

    /// Pump intake is below the water line.
    fn primed(&self, pump: PumpId) -> bool {
        self.fraction(TankId::Secondary) >= SWITCH_MARKS[0]
            && self.faults[pump.index()] != Some(SimFault::LostPrime)
    }

    /// Current a pump draws right now.
    pub fn draw_a(&self, pump: PumpId) -> f32 {
        let i = pump.index();
        if !self.relays[i] {
            0.0
        } else if self.faults[i] == Some(SimFault::Seized) {
            self.params.rated_current_a[i] * 3.0
        } else if self.primed(pump) {
            self.params.rated_current_a[i]
        } else {
            self.params.dry_current_a
        }
    }

    /// Advance the physics by `dt_ms`.
    pub fn advance(&mut self, dt_ms: u64) {
        let minutes = dt_ms as f32 / 60_000.0;
        let (o, s) = (TankId::Overhead.index(), TankId::Secondary.index());

        for pump in PumpId::ALL {
            let delivering = self.relays[pump.index()]
                && self.primed(pump)
                && self.faults[pump.index()].is_none();
            if delivering {
                let moved = (self.params.pump_flow_lpm[pump.index()] * minutes).min(self.volume_l[s]);
                self.volume_l[s] -= moved;
                self.volume_l[o] += moved;
            }
        }
        self.volume_l[o] = (self.volume_l[o] - self.params.demand_lpm * minutes)
            .clamp(0.0, self.params.overhead_capacity_l);
        self.volume_l[s] = (self.volume_l[s] + self.params.inflow_lpm * minutes)
            .clamp(0.0, self.params.source_capacity_l);

        debug!(
            "Sim: overhead {:.1} L ({:.0}%), source {:.1} L ({:.0}%)",
            self.volume_l[o],
            self.fraction(TankId::Overhead) * 100.0,
            self.volume_l[s],
            self.fraction(TankId::Secondary) * 100.0
        );
    }
}

impl Default for SimPlant {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl SensorPort for SimPlant {
    fn float_switches(&mut self, tank: TankId) -> FloatSwitches {
        let fraction = self.fraction(tank);
        FloatSwitches(SWITCH_MARKS.map(|mark| fraction >= mark))
    }

    fn current_samples(&mut self, pump: PumpId, buf: &mut [u16]) {
        buf.fill(self.calibration.raw_for_amps(self.draw_a(pump)));
    }
}

impl ActuatorPort for SimPlant {
    fn set_relay(&mut self, pump: PumpId, energised: bool) {
        self.relays[pump.index()] = energised;
    }

    fn all_off(&mut self) {
        self.relays = [false; 2];
    }
}
