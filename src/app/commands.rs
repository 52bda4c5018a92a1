//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (remote client,
//! serial console, tests) that the [`ControlLoop`](super::service::ControlLoop)
//! validates and applies at the start of its next tick.  The transport
//! layer builds them; nothing string-keyed crosses into the core.

use serde::Serialize;

use crate::config::ConfigPatch;
use crate::error::Rejection;
use crate::modes::SystemMode;
use crate::supervisor::PumpId;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one pump under operator control.  Switches the mode to Manual.
    StartPump(PumpId),

    /// Stop both pumps.  Always accepted.
    StopAll,

    /// Stop the single running pump and start the other.
    SwitchPump,

    /// Run one pump for `pump_test_secs`, then stop it automatically.
    TestPump(PumpId),

    SetMode(SystemMode),

    /// Merge the present fields into the live config and persist it.
    SetConfig(ConfigPatch),

    /// Stop pumps, return to Auto, clear alerts and counters, restore
    /// the default config.
    Reset,

    AcknowledgeAlert(u32),

    ClearAlerts,
}

impl Command {
    /// Commands still honoured after an emergency stop is engaged earlier
    /// in the same tick.
    pub fn is_safety(&self) -> bool {
        matches!(self, Command::StopAll | Command::SetMode(_) | Command::Reset)
    }

    /// Short name for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartPump(_) => "start_pump",
            Command::StopAll => "stop_all",
            Command::SwitchPump => "switch_pump",
            Command::TestPump(_) => "test_pump",
            Command::SetMode(_) => "set_mode",
            Command::SetConfig(_) => "set_config",
            Command::Reset => "reset",
            Command::AcknowledgeAlert(_) => "ack_alert",
            Command::ClearAlerts => "clear_alerts",
        }
    }
}

/// A command tagged with the caller's request id.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    pub id: u32,
    pub command: Command,
}

impl CommandEnvelope {
    pub fn new(id: u32, command: Command) -> Self {
        Self { id, command }
    }
}

/// Synchronous answer to one command, reported in the tick it was applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub id: u32,
    pub result: Result<(), Rejection>,
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
