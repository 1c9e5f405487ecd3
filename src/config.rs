//! Engine configuration
//!
//! Break geometry (swell window, offshore wind axis, sensor distance) and model
//! fitting parameters. Defaults describe Chocomount Beach, RI/NY border, with
//! the NDBC 44097 buoy as the upstream swell sensor.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ComputeError;

/// Minimum usable log entries before a model is fitted
pub const DEFAULT_MIN_SAMPLES: usize = 8;

/// Ridge term added to the diagonal of `XᵗX` for conditioning
pub const DEFAULT_RIDGE_LAMBDA: f64 = 0.001;

/// Pivots smaller than this mark the system as singular
pub const DEFAULT_PIVOT_EPSILON: f64 = 1e-10;

/// Farthest upstream sensor a break may be configured with
pub const MAX_SENSOR_DISTANCE_MILES: f64 = 2000.0;

/// Compass range considered exposed to swell at the break
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwellWindow {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl SwellWindow {
    pub fn new(min_deg: f64, max_deg: f64) -> Self {
        Self { min_deg, max_deg }
    }

    pub fn center(&self) -> f64 {
        (self.min_deg + self.max_deg) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.max_deg - self.min_deg) / 2.0
    }

    /// Inclusive containment test
    pub fn contains(&self, direction_deg: f64) -> bool {
        direction_deg >= self.min_deg && direction_deg <= self.max_deg
    }
}

/// Break-specific geometry and data-source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakConfig {
    /// Human-readable break name
    pub name: String,
    pub swell_window: SwellWindow,
    /// Degrees either side of the window still treated as marginal
    pub swell_window_edge_deg: f64,
    /// Wind direction (from) that blows straight offshore
    pub offshore_center_deg: f64,
    /// Angular distance from the offshore center at which the score reaches 0
    pub offshore_half_window_deg: f64,
    /// Wind direction (from) that blows straight onshore
    pub onshore_axis_deg: f64,
    /// Distance from the swell sensor to the break (statute miles)
    pub sensor_distance_miles: f64,
    /// Sessions newer than this are looked up in the short-range source
    pub recency_threshold_days: f64,
    /// Secondary swell below this height is ignored
    pub secondary_min_height_ft: f64,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            name: "Chocomount Beach".to_string(),
            swell_window: SwellWindow::new(115.0, 158.0),
            swell_window_edge_deg: 5.0,
            offshore_center_deg: 337.5, // NNW
            offshore_half_window_deg: 90.0,
            onshore_axis_deg: 90.0,
            sensor_distance_miles: 50.0,
            recency_threshold_days: 5.0,
            secondary_min_height_ft: 0.3,
        }
    }
}

/// Regression fitting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub min_samples: usize,
    pub ridge_lambda: f64,
    pub pivot_epsilon: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            ridge_lambda: DEFAULT_RIDGE_LAMBDA,
            pivot_epsilon: DEFAULT_PIVOT_EPSILON,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "break", default)]
    pub break_config: BreakConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl EngineConfig {
    /// Check invariants the engine relies on
    pub fn validate(&self) -> Result<(), ComputeError> {
        let b = &self.break_config;
        if b.swell_window.max_deg <= b.swell_window.min_deg {
            return Err(ComputeError::InvalidConfig(format!(
                "swell window [{}, {}] is empty",
                b.swell_window.min_deg, b.swell_window.max_deg
            )));
        }
        if b.offshore_half_window_deg <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "offshore_half_window_deg must be positive".to_string(),
            ));
        }
        if !(0.0..=MAX_SENSOR_DISTANCE_MILES).contains(&b.sensor_distance_miles) {
            return Err(ComputeError::InvalidConfig(format!(
                "sensor_distance_miles must be within [0, {MAX_SENSOR_DISTANCE_MILES}]"
            )));
        }
        if self.model.min_samples == 0 {
            return Err(ComputeError::InvalidConfig(
                "min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ComputeError> {
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let config = Self::from_json(&contents)?;
                tracing::debug!(
                    path = %path.as_ref().display(),
                    break_name = %config.break_config.name,
                    "loaded engine configuration"
                );
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.as_ref().display(),
                    "no configuration file found, using defaults"
                );
                Ok(Self::default())
            }
            Err(e) => Err(ComputeError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_geometry() {
        let window = BreakConfig::default().swell_window;
        assert!((window.center() - 136.5).abs() < 1e-12);
        assert!((window.half_width() - 21.5).abs() < 1e-12);
        assert!(window.contains(115.0));
        assert!(window.contains(158.0));
        assert!(!window.contains(158.5));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed = EngineConfig::from_json(r#"{"model":{"min_samples":10,"ridge_lambda":0.01,"pivot_epsilon":1e-9}}"#)
            .unwrap();
        assert_eq!(parsed.model.min_samples, 10);
        assert_eq!(parsed.break_config.name, "Chocomount Beach");
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let mut config = EngineConfig::default();
        config.break_config.swell_window = SwellWindow::new(200.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_sensor_distance_is_bounded() {
        let mut value = serde_json::to_value(EngineConfig::default()).unwrap();
        value["break"]["sensor_distance_miles"] = serde_json::json!(1e13);
        assert!(matches!(
            EngineConfig::from_json(&value.to_string()),
            Err(ComputeError::InvalidConfig(_))
        ));

        let mut config = EngineConfig::default();
        config.break_config.sensor_distance_miles = f64::NAN;
        assert!(config.validate().is_err());
        config.break_config.sensor_distance_miles = MAX_SENSOR_DISTANCE_MILES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = EngineConfig::load_from_path("/nonexistent/surf-match.json").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("surf-match-config-{}.json", std::process::id()));
        let mut config = EngineConfig::default();
        config.break_config.name = "Test Reef".to_string();
        fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.break_config.name, "Test Reef");

        let _ = fs::remove_file(&path);
    }
}
