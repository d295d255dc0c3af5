use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{speed::SpeedConfig, RaidscopeError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    pub world_speed: f64,
    pub unit_speed: f64,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            world_speed: 1.0,
            unit_speed: 1.0,
        }
    }
}

impl From<SpeedSettings> for SpeedConfig {
    fn from(settings: SpeedSettings) -> Self {
        SpeedConfig::clamped(settings.world_speed, settings.unit_speed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub max_observations: usize,
    pub match_tolerance_minutes: f64,
    pub rescan_interval_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            max_observations: 100,
            match_tolerance_minutes: 2.0,
            rescan_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    /// JSON key-value file backing the persisted tracker state.
    pub state_path: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            state_path: "raidscope-state.json".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidscopeConfig {
    pub speed: SpeedSettings,
    pub tracker: TrackerSettings,
    pub ops: OpsConfig,
}

impl RaidscopeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            RaidscopeError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            RaidscopeError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !factor_in_range(self.speed.world_speed) {
            return Err(RaidscopeError::Configuration(
                "speed.world_speed must be in (0, 10]".into(),
            ));
        }
        if !factor_in_range(self.speed.unit_speed) {
            return Err(RaidscopeError::Configuration(
                "speed.unit_speed must be in (0, 10]".into(),
            ));
        }
        if self.tracker.max_observations == 0 {
            return Err(RaidscopeError::Configuration(
                "tracker.max_observations must be greater than zero".into(),
            ));
        }
        let tolerance = self.tracker.match_tolerance_minutes;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(RaidscopeError::Configuration(
                "tracker.match_tolerance_minutes must be a non-negative number".into(),
            ));
        }
        if self.tracker.rescan_interval_ms == 0 {
            return Err(RaidscopeError::Configuration(
                "tracker.rescan_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn factor_in_range(value: f64) -> bool {
    value > 0.0 && value <= SpeedConfig::MAX_FACTOR
}
