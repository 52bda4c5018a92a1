//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the float-switch inputs, the relay outputs and the current-sense
//! ADC, exposing them through [`SensorPort`] and [`ActuatorPort`].  This
//! is the only module in the system that touches actual hardware.  Pins
//! are any `embedded-hal` 1.0 digital pins, so the same adapter runs on a
//! board HAL or on test doubles.
//!
//! Read failures never reach the domain: a pin that cannot be read is
//! reported as "not submerged" and an ADC channel that cannot be read
//! returns the sensor's zero-offset count.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::sensors::current::CurrentCalibration;
use crate::sensors::level::{FloatSwitches, TankId};
use crate::supervisor::PumpId;

/// One raw conversion per call from the current-sense channel of `pump`.
pub trait CurrentAdc {
    type Error: core::fmt::Debug;

    fn read_raw(&mut self, pump: PumpId) -> Result<u16, Self::Error>;
}

/// Electrical sense of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// High = asserted.
    #[default]
    ActiveHigh,
    /// Low = asserted (pull-up inputs, most opto-isolated relay boards).
    ActiveLow,
}

impl Polarity {
    fn asserted(self, high: bool) -> bool {
        match self {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        }
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I, O, A> {
    /// Float switches, `[tank][mark]`, bottom mark first.
    switches: [[I; 5]; 2],
    relays: [O; 2],
    adc: A,
    switch_polarity: Polarity,
    relay_polarity: Polarity,
    /// Raw count substituted for a failed conversion.
    rest_raw: [u16; 2],
}

impl<I, O, A> HardwareAdapter<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: CurrentAdc,
{
    pub fn new(
        overhead: [I; 5],
        secondary: [I; 5],
        relays: [O; 2],
        adc: A,
        calibration: [CurrentCalibration; 2],
    ) -> Self {
        Self {
            switches: [overhead, secondary],
            relays,
            adc,
            switch_polarity: Polarity::ActiveHigh,
            relay_polarity: Polarity::ActiveHigh,
            rest_raw: calibration.map(|c| c.zero_offset_raw()),
        }
    }

    pub fn with_switch_polarity(mut self, polarity: Polarity) -> Self {
        self.switch_polarity = polarity;
        self
    }

    pub fn with_relay_polarity(mut self, polarity: Polarity) -> Self {
        self.relay_polarity = polarity;
        self
    }

    fn drive(&mut self, pump: PumpId, energised: bool) {
        let high = match self.relay_polarity {
            Polarity::ActiveHigh => energised,
            Polarity::ActiveLow => !energised,
        };
        let pin = &mut self.relays[pump.index()];
        let result = if high { pin.set_high() } else { pin.set_low() };
        if let Err(e) = result {
            warn!("Relay {:?}: write failed: {:?}", pump, e);
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I, O, A> SensorPort for HardwareAdapter<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: CurrentAdc,
{
    fn float_switches(&mut self, tank: TankId) -> FloatSwitches {
        let polarity = self.switch_polarity;
        let mut out = FloatSwitches::DRY;
        for (mark, pin) in self.switches[tank.index()].iter_mut().enumerate() {
            out.0[mark] = match pin.is_high() {
                Ok(high) => polarity.asserted(high),
                Err(e) => {
                    warn!("Float switch {:?}[{}]: read failed: {:?}", tank, mark, e);
                    false
                }
            };
        }
        out
    }

    fn current_samples(&mut self, pump: PumpId, buf: &mut [u16]) {
        let rest = self.rest_raw[pump.index()];
        let mut failures = 0usize;
        for slot in buf.iter_mut() {
            *slot = self.adc.read_raw(pump).unwrap_or_else(|_| {
                failures += 1;
                rest
            });
        }
        if failures > 0 {
            warn!("Current ADC {:?}: {} of {} samples failed", pump, failures, buf.len());
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I, O, A> ActuatorPort for HardwareAdapter<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: CurrentAdc,
{
    fn set_relay(&mut self, pump: PumpId, energised: bool) {
        self.drive(pump, energised);
    }

    fn all_off(&mut self) {
        for pump in PumpId::ALL {
            self.drive(pump, false);
        }
    }
}
