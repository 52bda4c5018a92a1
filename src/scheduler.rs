//! Deferred test-stop records.
//!
//! A `TestPump` run is not a blocking delay: the command energises the pump
//! and leaves a record `{pump, stop_at_tick}` here.  The control loop polls
//! [`DeferredStops::take_due`] once per tick and stops whatever has expired.
//!
//! ```text
//!   TestPump(p) ──▶ schedule(p, tick + N)
//!                        │
//!   tick k ──▶ take_due(k) ──▶ command_off(p)   (when k >= stop_at_tick)
//!
//!   Emergency / StopAll / Reset ──▶ cancel_all()
//!   StartPump(p)                ──▶ cancel(p)
//! ```

use log::info;
use serde::Serialize;

use crate::supervisor::PumpId;

/// One pending automatic stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeferredStop {
    pub pump: PumpId,
    pub stop_at_tick: u64,
}

/// At most one pending stop per pump (stack-allocated slots).
#[derive(Debug, Default)]
pub struct DeferredStops {
    slots: [Option<DeferredStop>; 2],
}

impl DeferredStops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a stop for `pump`, replacing any stop already pending for it.
    pub fn schedule(&mut self, pump: PumpId, stop_at_tick: u64) {
        info!("Deferred stop: {:?} at tick {}", pump, stop_at_tick);
        self.slots[pump.index()] = Some(DeferredStop { pump, stop_at_tick });
    }

    /// Remove and return the stops that are due at `tick`.
    pub fn take_due(&mut self, tick: u64) -> [Option<DeferredStop>; 2] {
        let mut due = [None, None];
        for (slot, out) in self.slots.iter_mut().zip(due.iter_mut()) {
            if slot.is_some_and(|s| tick >= s.stop_at_tick) {
                *out = slot.take();
            }
        }
        due
    }

    /// Returns `true` if a stop was pending for `pump`.
    pub fn cancel(&mut self, pump: PumpId) -> bool {
        let had = self.slots[pump.index()].take().is_some();
        if had {
            info!("Deferred stop: {:?} cancelled", pump);
        }
        had
    }

    pub fn cancel_all(&mut self) {
        for pump in PumpId::ALL {
            self.cancel(pump);
        }
    }

    pub fn is_pending(&self, pump: PumpId) -> bool {
        self.slots[pump.index()].is_some()
    }

    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    pub fn pending(&self) -> impl Iterator<Item = &DeferredStop> {
        self.slots.iter().flatten()
    }
}
