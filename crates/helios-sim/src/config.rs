//! Engine configuration.

use serde::{Deserialize, Serialize};

use helios_core::constants::*;

/// Configuration for starting a new simulation.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same sun.
    pub seed: u64,
    /// Clamp for operator-commanded panel velocity (rad/s).
    pub max_panel_velocity: f64,
    /// Length of the sun occlusion ray (world units).
    pub occlusion_check_distance: f64,
    /// Minimum seconds between console pushes.
    pub console_interval_secs: f64,
    /// Rated output of panels spawned without an explicit rating (watts).
    pub panel_max_output: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_panel_velocity: MAX_PANEL_VELOCITY,
            occlusion_check_distance: SUN_OCCLUSION_CHECK_DISTANCE,
            console_interval_secs: CONSOLE_UPDATE_INTERVAL_SECS,
            panel_max_output: DEFAULT_PANEL_MAX_OUTPUT,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_panel_velocity, MAX_PANEL_VELOCITY);
        assert_eq!(config.occlusion_check_distance, 20.0);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(SimConfig::from_json("{seed: }").is_err());
    }
}
