//! Controller configuration parameters
//!
//! All tunable parameters for the TankGuard controller.  Loaded once at
//! startup through the [`ConfigPort`]; mutated only by `SetConfig` and
//! `Reset`.  Every mutation is persisted.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Pump health band ---
    /// Below this draw (amps) a running pump is dry-running
    pub current_threshold_min: f32,
    /// Above this draw (amps) a running pump is faulted
    pub current_threshold_max: f32,

    // --- Runtime limits ---
    /// Longest continuous run before the safety phase stops a pump (minutes)
    pub max_runtime_minutes: u32,
    /// Cumulative runtime after which maintenance is due (hours)
    pub maintenance_hours: u32,
    /// Rest period after a max-runtime stop before automatic restart (minutes)
    pub cooldown_minutes: u32,

    // --- Modes ---
    /// Start in Auto (true) or Manual (false)
    pub auto_mode_default: bool,
    /// Duration of a TestPump run (seconds)
    pub pump_test_secs: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Health band
            current_threshold_min: 0.5,
            current_threshold_max: 8.0,

            // Runtime limits
            max_runtime_minutes: 60,
            maintenance_hours: 500,
            cooldown_minutes: 10,

            // Modes
            auto_mode_default: true,
            pump_test_secs: 10,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..30.0).contains(&self.current_threshold_min) {
            return Err(ConfigError::ValidationFailed(
                "current_threshold_min must be 0.0–30.0 A",
            ));
        }
        if !(self.current_threshold_max > self.current_threshold_min
            && self.current_threshold_max <= 30.0)
        {
            return Err(ConfigError::ValidationFailed(
                "current_threshold_max must be above current_threshold_min and at most 30.0 A",
            ));
        }
        if !(1..=1440).contains(&self.max_runtime_minutes) {
            return Err(ConfigError::ValidationFailed(
                "max_runtime_minutes must be 1–1440",
            ));
        }
        if !(1..=100_000).contains(&self.maintenance_hours) {
            return Err(ConfigError::ValidationFailed(
                "maintenance_hours must be 1–100000",
            ));
        }
        if self.cooldown_minutes > 1440 {
            return Err(ConfigError::ValidationFailed(
                "cooldown_minutes must be 0–1440",
            ));
        }
        if !(1..=300).contains(&self.pump_test_secs) {
            return Err(ConfigError::ValidationFailed("pump_test_secs must be 1–300"));
        }
        if !(100..=10_000).contains(&self.control_loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be 100–10000",
            ));
        }
        Ok(())
    }

    /// Ticks a TestPump run lasts, at least one.
    pub fn test_duration_ticks(&self) -> u64 {
        let ms = u64::from(self.pump_test_secs) * 1000;
        ms.div_ceil(u64::from(self.control_loop_interval_ms.max(1))).max(1)
    }

    /// Apply the fields present in `patch` and return the merged result.
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.current_threshold_min {
            next.current_threshold_min = v;
        }
        if let Some(v) = patch.current_threshold_max {
            next.current_threshold_max = v;
        }
        if let Some(v) = patch.max_runtime_minutes {
            next.max_runtime_minutes = v;
        }
        if let Some(v) = patch.maintenance_hours {
            next.maintenance_hours = v;
        }
        if let Some(v) = patch.cooldown_minutes {
            next.cooldown_minutes = v;
        }
        if let Some(v) = patch.auto_mode_default {
            next.auto_mode_default = v;
        }
        if let Some(v) = patch.pump_test_secs {
            next.pump_test_secs = v;
        }
        if let Some(v) = patch.control_loop_interval_ms {
            next.control_loop_interval_ms = v;
        }
        next
    }
}

/// Partial update for `SetConfig`.  Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub current_threshold_min: Option<f32>,
    pub current_threshold_max: Option<f32>,
    pub max_runtime_minutes: Option<u32>,
    pub maintenance_hours: Option<u32>,
    pub cooldown_minutes: Option<u32>,
    pub auto_mode_default: Option<bool>,
    pub pump_test_secs: Option<u32>,
    pub control_loop_interval_ms: Option<u32>,
}

/// Load the stored configuration, or install and persist the defaults if
/// none is stored or the stored copy is unusable.
pub fn load_or_install(port: &impl ConfigPort) -> ControllerConfig {
    match port.load() {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => {
                info!("Config loaded from storage");
                return cfg;
            }
            Err(e) => warn!("Stored config rejected ({}), installing defaults", e),
        },
        Err(ConfigError::NotFound) => info!("No stored config, installing defaults"),
        Err(e) => warn!("Config load failed ({}), installing defaults", e),
    }

    let defaults = ControllerConfig::default();
    if let Err(e) = port.save(&defaults) {
        warn!("Persisting default config failed: {}", e);
    }
    defaults
}
