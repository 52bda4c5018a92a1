//! Five-point float-switch ladders for the overhead and secondary reservoirs.
//!
//! Each reservoir carries five float switches, mounted bottom to top.  A
//! switch reads `true` when submerged.  The ladder is read as a monotonic
//! staircase: the highest submerged switch wins, and the switches below it
//! are assumed submerged as well.
//!
//! ```text
//!   [4] Full   ─┐
//!   [3] High    │  highest `true` index → SWITCH_LEVELS[index]
//!   [2] Medium  │  no `true` at all     → Empty
//!   [1] Low     │
//!   [0] intake ─┘  water at the intake only: still Low, never Empty
//! ```

use serde::{Deserialize, Serialize};

/// Reservoir identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TankId {
    /// The elevated tank that the pumps fill.
    Overhead,
    /// The source reservoir the pumps draw from.
    Secondary,
}

impl TankId {
    pub const ALL: [TankId; 2] = [TankId::Overhead, TankId::Secondary];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Ordered reservoir level.  Comparisons follow declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TankLevel {
    #[default]
    Empty,
    Low,
    Medium,
    High,
    Full,
}

impl TankLevel {
    /// Levels in ascending order.
    pub const LADDER: [TankLevel; 5] = [
        TankLevel::Empty,
        TankLevel::Low,
        TankLevel::Medium,
        TankLevel::High,
        TankLevel::Full,
    ];

    /// `true` for the levels at which the overhead tank asks for water.
    pub fn needs_fill(self) -> bool {
        self <= TankLevel::Low
    }
}

/// Level reported when switch `i` is the highest submerged one.
pub const SWITCH_LEVELS: [TankLevel; 5] = [
    TankLevel::Low,
    TankLevel::Low,
    TankLevel::Medium,
    TankLevel::High,
    TankLevel::Full,
];

/// Raw switch states for one reservoir, bottom (index 0) to top (index 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FloatSwitches(pub [bool; 5]);

impl FloatSwitches {
    /// Every switch at rest ("not submerged"), which is also how a
    /// disconnected ladder reads.
    pub const DRY: FloatSwitches = FloatSwitches([false; 5]);

    /// Ladder submerged up to and including the marks for `level`.
    pub fn up_to(level: TankLevel) -> Self {
        if level == TankLevel::Empty {
            return Self::DRY;
        }
        Self(SWITCH_LEVELS.map(|mark| mark <= level))
    }

    pub fn classify(&self) -> TankLevel {
        classify_level(self)
    }
}

/// Highest active threshold; `Empty` iff no switch is active.
pub fn classify_level(switches: &FloatSwitches) -> TankLevel {
    switches
        .0
        .iter()
        .rposition(|&wet| wet)
        .map_or(TankLevel::Empty, |i| SWITCH_LEVELS[i])
}
