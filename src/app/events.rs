//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, push to a connected
//! client, record in a test.

use crate::alerts::{AlertCategory, Severity};
use crate::error::Rejection;
use crate::modes::SystemMode;
use crate::supervisor::{PumpHealth, PumpId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The control loop has started (carries the initial mode).
    Started(SystemMode),

    /// The system mode changed.
    ModeChanged { from: SystemMode, to: SystemMode },

    /// A relay was switched.
    PumpSwitched { pump: PumpId, on: bool },

    /// A pump's derived health changed.
    HealthChanged {
        pump: PumpId,
        from: PumpHealth,
        to: PumpHealth,
        current_a: f32,
    },

    /// An alert was appended to the log.
    AlertRaised {
        id: u32,
        severity: Severity,
        category: AlertCategory,
        title: &'static str,
    },

    /// A command failed its preconditions.
    CommandRejected {
        id: u32,
        command: &'static str,
        reason: Rejection,
    },
}
