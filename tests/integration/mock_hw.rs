//! Mock hardware adapter for integration tests.
//!
//! Records every actuator call so tests can assert on the full relay
//! history, and serves float-switch ladders and current readings that the
//! test sets directly.

use tankguard::app::commands::{Command, CommandEnvelope, CommandOutcome};
use tankguard::app::events::AppEvent;
use tankguard::app::ports::{ActuatorPort, EventSink, SensorPort, Timestamp};
use tankguard::app::service::{ControlLoop, TickReport};
use tankguard::config::ControllerConfig;
use tankguard::sensors::current::CurrentCalibration;
use tankguard::sensors::level::{FloatSwitches, TankId, TankLevel};
use tankguard::supervisor::PumpId;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    SetRelay { pump: PumpId, on: bool },
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    /// Levels served for each tank, indexed by `TankId::index`.
    pub levels: [TankLevel; 2],
    /// Draw of each pump while its relay is on.
    pub amps: [f32; 2],
    relays: [bool; 2],
    calibration: CurrentCalibration,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            levels: [TankLevel::Medium, TankLevel::Medium],
            amps: [3.0, 3.0],
            relays: [false; 2],
            calibration: CurrentCalibration::default(),
        }
    }

    pub fn with_levels(overhead: TankLevel, secondary: TankLevel) -> Self {
        let mut hw = Self::new();
        hw.set_levels(overhead, secondary);
        hw
    }

    pub fn set_levels(&mut self, overhead: TankLevel, secondary: TankLevel) {
        self.levels = [overhead, secondary];
    }

    pub fn set_amps(&mut self, pump: PumpId, amps: f32) {
        self.amps[pump.index()] = amps;
    }

    pub fn relay(&self, pump: PumpId) -> bool {
        self.relays[pump.index()]
    }

    pub fn relay_writes(&self, pump: PumpId) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::SetRelay { pump: p, .. } if *p == pump))
            .count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set_relay(&mut self, pump: PumpId, energised: bool) {
        self.relays[pump.index()] = energised;
        self.calls.push(ActuatorCall::SetRelay {
            pump,
            on: energised,
        });
    }

    fn all_off(&mut self) {
        self.relays = [false; 2];
        self.calls.push(ActuatorCall::AllOff);
    }
}

impl SensorPort for MockHardware {
    fn float_switches(&mut self, tank: TankId) -> FloatSwitches {
        FloatSwitches::up_to(self.levels[tank.index()])
    }

    fn current_samples(&mut self, pump: PumpId, buf: &mut [u16]) {
        let amps = if self.relays[pump.index()] {
            self.amps[pump.index()]
        } else {
            0.0
        };
        buf.fill(self.calibration.raw_for_amps(amps));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejections(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::CommandRejected { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig: loop + hardware + sink + clock ───────────────────────

pub struct Rig {
    pub cl: ControlLoop,
    pub hw: MockHardware,
    pub sink: RecordingSink,
    pub now_ms: u64,
    next_id: u32,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: ControllerConfig, hw: MockHardware) -> Self {
        let mut rig = Self {
            cl: ControlLoop::new(config),
            hw,
            sink: RecordingSink::new(),
            now_ms: 0,
            next_id: 1,
        };
        rig.cl.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    pub fn auto(hw: MockHardware) -> Self {
        Self::new(ControllerConfig::default(), hw)
    }

    /// Queue `command` and return its request id.
    pub fn send(&mut self, command: Command) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.cl
            .enqueue(CommandEnvelope::new(id, command))
            .expect("queue has room");
        id
    }

    /// Advance the clock by `ms` and run one tick.
    pub fn tick_after(&mut self, ms: u64) -> TickReport {
        self.now_ms += ms;
        self.cl.tick(
            Timestamp::from_uptime_ms(self.now_ms),
            &mut self.hw,
            &mut self.sink,
        )
    }

    /// One tick, one second after the previous one.
    pub fn tick(&mut self) -> TickReport {
        self.tick_after(1_000)
    }

    /// Send a single command, tick once and return its outcome.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let id = self.send(command);
        let report = self.tick();
        *report
            .outcomes
            .iter()
            .find(|o| o.id == id)
            .expect("outcome reported")
    }

    pub fn alerts_titled(&self, title: &str) -> usize {
        self.cl.alerts().count_titled(title)
    }
}
