//! Runtime configuration — per-robot tuning knobs loaded from JSON.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::driver::PulseRange;

/// Top-level robot configuration, loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Lower end of the servo pulse window in microseconds.
    #[serde(default = "default_pulse_min_us")]
    pub pulse_min_us: f64,

    /// Upper end of the servo pulse window in microseconds.
    #[serde(default = "default_pulse_max_us")]
    pub pulse_max_us: f64,

    /// Oscillation cycles per wave gesture.
    #[serde(default = "default_wave_cycles")]
    pub wave_cycles: u32,

    /// Pause between consecutive walking steps, milliseconds.
    #[serde(default = "default_step_pause_ms")]
    pub step_pause_ms: u64,
}

fn default_pulse_min_us() -> f64 {
    500.0
}

fn default_pulse_max_us() -> f64 {
    3000.0
}

fn default_wave_cycles() -> u32 {
    3
}

fn default_step_pause_ms() -> u64 {
    500
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            pulse_min_us: default_pulse_min_us(),
            pulse_max_us: default_pulse_max_us(),
            wave_cycles: default_wave_cycles(),
            step_pause_ms: default_step_pause_ms(),
        }
    }
}

impl RobotConfig {
    /// Load configuration from a JSON file. Falls back to defaults if the
    /// file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read robot config")?;
        let config: RobotConfig =
            serde_json::from_str(&contents).context("Failed to parse robot config JSON")?;
        Ok(config)
    }

    pub fn pulse_range(&self) -> PulseRange {
        PulseRange {
            min_us: self.pulse_min_us,
            max_us: self.pulse_max_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: RobotConfig = serde_json::from_str(r#"{"pulse_min_us": 300.0}"#).unwrap();
        assert_eq!(config.pulse_min_us, 300.0);
        assert_eq!(config.pulse_max_us, 3000.0);
        assert_eq!(config.wave_cycles, 3);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = RobotConfig::load(Path::new("/nonexistent/robot_config.json")).unwrap();
        assert_eq!(config.pulse_range(), PulseRange::default());
    }
}
