//! Sensor subsystem: float-switch ladders, current sensors and the
//! aggregating [`SensorReader`].
//!
//! The reader pulls raw inputs through the [`SensorPort`] and produces a
//! [`SensorSnapshot`] each tick.  It keeps no state of its own beyond the
//! calibration; a level is recomputed every tick, never carried over.

pub mod current;
pub mod level;

use serde::Serialize;

use crate::app::ports::SensorPort;
use crate::supervisor::PumpId;
use current::{CurrentCalibration, SAMPLES_PER_READING};
use level::{FloatSwitches, TankId, TankLevel};

/// A point-in-time view of every input the control loop consumes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SensorSnapshot {
    /// Raw switch states, indexed by [`TankId::index`].
    pub switches: [FloatSwitches; 2],
    /// Classified levels, indexed by [`TankId::index`].
    pub levels: [TankLevel; 2],
    /// Averaged current draw in amps, indexed by [`PumpId::index`].
    pub current_a: [f32; 2],
}

impl SensorSnapshot {
    pub fn level(&self, tank: TankId) -> TankLevel {
        self.levels[tank.index()]
    }

    pub fn current(&self, pump: PumpId) -> f32 {
        self.current_a[pump.index()]
    }
}

/// Converts raw port readings into levels and amps.
pub struct SensorReader {
    calibration: [CurrentCalibration; 2],
}

impl Default for SensorReader {
    fn default() -> Self {
        Self::new(CurrentCalibration::default(), CurrentCalibration::default())
    }
}

impl SensorReader {
    pub fn new(primary: CurrentCalibration, secondary: CurrentCalibration) -> Self {
        Self {
            calibration: [primary, secondary],
        }
    }

    pub fn read_level(&self, port: &mut impl SensorPort, tank: TankId) -> (FloatSwitches, TankLevel) {
        let switches = port.float_switches(tank);
        (switches, switches.classify())
    }

    pub fn read_current(&self, port: &mut impl SensorPort, pump: PumpId) -> f32 {
        let mut samples = [0u16; SAMPLES_PER_READING];
        port.current_samples(pump, &mut samples);
        self.calibration[pump.index()].amps(&samples)
    }

    /// Read every input and return a unified snapshot.
    pub fn read_all(&self, port: &mut impl SensorPort) -> SensorSnapshot {
        let mut snap = SensorSnapshot::default();
        for tank in TankId::ALL {
            let (switches, level) = self.read_level(port, tank);
            snap.switches[tank.index()] = switches;
            snap.levels[tank.index()] = level;
        }
        for pump in PumpId::ALL {
            snap.current_a[pump.index()] = self.read_current(port, pump);
        }
        snap
    }
}
