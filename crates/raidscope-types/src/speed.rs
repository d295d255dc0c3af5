use serde::{Deserialize, Serialize};

use crate::units::UnitType;

/// World and unit speed multipliers applied to every base travel time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedConfig {
    pub world_speed: f64,
    pub unit_speed: f64,
}

impl SpeedConfig {
    pub const MIN_FACTOR: f64 = 0.1;
    pub const MAX_FACTOR: f64 = 10.0;

    /// Builds a config with both factors clamped into `[MIN_FACTOR, MAX_FACTOR]`.
    pub fn clamped(world_speed: f64, unit_speed: f64) -> Self {
        Self {
            world_speed: clamp_factor(world_speed),
            unit_speed: clamp_factor(unit_speed),
        }
    }

    /// Same factors, clamped. Deserialized or hand-built configs go through here before use.
    pub fn sanitized(self) -> Self {
        Self::clamped(self.world_speed, self.unit_speed)
    }

    pub fn multiplier(&self) -> f64 {
        self.world_speed * self.unit_speed
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            world_speed: 1.0,
            unit_speed: 1.0,
        }
    }
}

/// Non-finite factors fall back to 1.0; everything else is clamped.
pub fn clamp_factor(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(SpeedConfig::MIN_FACTOR, SpeedConfig::MAX_FACTOR)
    } else {
        1.0
    }
}

/// Minutes per field for `base_speed` under `config`.
///
/// Unguarded: a zero factor yields infinity. Use a clamped config.
pub fn effective_speed(base_speed: f64, config: &SpeedConfig) -> f64 {
    base_speed / (config.world_speed * config.unit_speed)
}

/// Per-unit travel times under a fixed speed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedModel {
    config: SpeedConfig,
}

impl SpeedModel {
    pub fn new(config: SpeedConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> SpeedConfig {
        self.config
    }

    pub fn minutes_per_field(&self, unit: UnitType) -> f64 {
        effective_speed(unit.base_speed(), &self.config)
    }

    pub fn travel_minutes(&self, unit: UnitType, distance: f64) -> f64 {
        distance * self.minutes_per_field(unit)
    }
}
