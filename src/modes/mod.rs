//! System modes and the mode descriptor table.
//!
//! Same table-driven shape as a classic embedded FSM, but the table rows
//! describe *operating modes* rather than process states:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                   │
//! │  ┌───────────┬──────────────┬───────────────┬─────────────┐  │
//! │  │ Mode      │ policy       │ accepts_start │ entry_note  │  │
//! │  ├───────────┼──────────────┼───────────────┼─────────────┤  │
//! │  │ Auto      │ auto_policy  │ yes           │ -           │  │
//! │  │ Manual    │ -            │ yes           │ -           │  │
//! │  │ Scheduled │ auto_policy  │ yes           │ fallback    │  │
//! │  │ Emergency │ -            │ no            │ -           │  │
//! │  └───────────┴──────────────┴───────────────┴─────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`ModeMachine`] only tracks which row is current.  Side effects of
//! entering a mode (the emergency stop, alerts) belong to the control loop.

pub mod context;
pub mod policies;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use context::PolicyInput;
use policies::Decision;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SystemMode {
    Auto = 0,
    Manual = 1,
    Scheduled = 2,
    Emergency = 3,
}

impl SystemMode {
    /// Total number of modes: used to size the table array.
    pub const COUNT: usize = 4;

    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Auto,
            1 => Self::Manual,
            2 => Self::Scheduled,
            _ => Self::Emergency,
        }
    }

    pub fn is_emergency(self) -> bool {
        self == Self::Emergency
    }
}

impl core::str::FromStr for SystemMode {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            "emergency" => Ok(Self::Emergency),
            _ => Err(Rejection::InvalidMode),
        }
    }
}

impl core::fmt::Display for SystemMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Per-tick decision handler for a mode.
pub type PolicyFn = fn(&PolicyInput) -> Decision;

pub struct ModeDescriptor {
    pub mode: SystemMode,
    pub name: &'static str,
    /// `None` means the mode makes no automatic decisions.
    pub policy: Option<PolicyFn>,
    /// Whether StartPump / SwitchPump / TestPump are accepted.
    pub accepts_start: bool,
    /// Logged once on entry.
    pub entry_note: Option<&'static str>,
}

/// Build the static mode table.  Indexed by `SystemMode as usize`.
pub fn build_mode_table() -> [ModeDescriptor; SystemMode::COUNT] {
    [
        ModeDescriptor {
            mode: SystemMode::Auto,
            name: "Auto",
            policy: Some(policies::auto_policy),
            accepts_start: true,
            entry_note: None,
        },
        ModeDescriptor {
            mode: SystemMode::Manual,
            name: "Manual",
            policy: None,
            accepts_start: true,
            entry_note: None,
        },
        ModeDescriptor {
            mode: SystemMode::Scheduled,
            name: "Scheduled",
            policy: Some(policies::auto_policy),
            accepts_start: true,
            entry_note: Some("no schedule window configured, following the Auto policy"),
        },
        ModeDescriptor {
            mode: SystemMode::Emergency,
            name: "Emergency",
            policy: None,
            accepts_start: false,
            entry_note: Some("all pumps held off until the mode is changed"),
        },
    ]
}

// ---------------------------------------------------------------------------
// Mode machine
// ---------------------------------------------------------------------------

pub struct ModeMachine {
    table: [ModeDescriptor; SystemMode::COUNT],
    current: usize,
    /// Tick on which the current mode was entered.
    entered_tick: u64,
}

impl ModeMachine {
    pub fn new(initial: SystemMode) -> Self {
        Self {
            table: build_mode_table(),
            current: initial as usize,
            entered_tick: 0,
        }
    }

    pub fn current(&self) -> SystemMode {
        SystemMode::from_index(self.current)
    }

    pub fn descriptor(&self) -> &ModeDescriptor {
        &self.table[self.current]
    }

    /// Switch to `next`.  Returns the previous mode if it changed.
    pub fn set(&mut self, next: SystemMode, tick: u64) -> Option<SystemMode> {
        let next_idx = next as usize;
        if next_idx == self.current {
            return None;
        }
        let prev = self.current();
        info!(
            "Mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );
        self.current = next_idx;
        self.entered_tick = tick;
        if let Some(note) = self.table[next_idx].entry_note {
            info!("{}: {}", self.table[next_idx].name, note);
        }
        Some(prev)
    }

    pub fn ticks_in_mode(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.entered_tick)
    }

    /// Run the current mode's policy, if it has one.
    pub fn decide(&self, input: &PolicyInput) -> Option<Decision> {
        self.descriptor().policy.map(|policy| policy(input))
    }
}
