//! Error and condition types shared by the control core.
//!
//! Nothing here is fatal.  A [`Rejection`] is a precondition violation that
//! goes back to whoever issued the command; a [`Condition`] is a latched
//! plant condition used to throttle alerts and by the safety phase.
//! Both are `Copy` so they pass through the tick without allocation.

use core::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Rejected commands
// ---------------------------------------------------------------------------

/// Why a command was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    /// Emergency mode blocks start, switch and test commands.
    EmergencyActive,
    /// `SwitchPump` needs exactly one active pump; none is running.
    NoActivePump,
    /// `SwitchPump` needs exactly one active pump; both are running.
    BothPumpsActive,
    /// The requested mode name is not a [`SystemMode`](crate::modes::SystemMode).
    InvalidMode,
    /// The merged configuration failed range validation.
    InvalidConfig(&'static str),
    /// No alert with this id is in the log.
    AlertNotFound(u32),
    /// The pending-command queue is full.
    QueueFull,
    /// The request could not be decoded into a command.
    Malformed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmergencyActive => write!(f, "emergency stop active"),
            Self::NoActivePump => write!(f, "no active pump"),
            Self::BothPumpsActive => write!(f, "both pumps active"),
            Self::InvalidMode => write!(f, "invalid mode"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::AlertNotFound(id) => write!(f, "alert {id} not found"),
            Self::QueueFull => write!(f, "command queue full"),
            Self::Malformed => write!(f, "malformed request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Latched conditions
// ---------------------------------------------------------------------------

/// Conditions tracked in a bitfield so that each one raises a single alert
/// per episode and can be cleared individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Condition {
    /// Secondary reservoir too low to draw from.
    SourceEmpty = 0b0000_0001,
    /// Fill requested but every pump is locked out.
    NoPumpAvailable = 0b0000_0010,
    /// Primary pump exceeded its maintenance interval.
    PrimaryMaintenanceDue = 0b0000_0100,
    /// Secondary pump exceeded its maintenance interval.
    SecondaryMaintenanceDue = 0b0000_1000,
}

impl Condition {
    /// Return the bitmask for this condition.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceEmpty => write!(f, "source empty"),
            Self::NoPumpAvailable => write!(f, "no pump available"),
            Self::PrimaryMaintenanceDue => write!(f, "primary maintenance due"),
            Self::SecondaryMaintenanceDue => write!(f, "secondary maintenance due"),
        }
    }
}
