//! Count sensor configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use summary_core_count::{
    require_field, validate_confidences, validate_thresholds, ConfigError, CountRules,
};

/// Poll frequency used when `poll_frequency_hz` is zero or absent
pub const DEFAULT_POLL_FREQUENCY_HZ: f64 = 1.0;

/// Attributes of a `count-sensor` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Detector to query
    #[serde(default)]
    pub detector_name: String,

    /// Camera the detector looks through
    #[serde(default)]
    pub camera_name: String,

    /// Label -> minimum confidence; labels are matched case-insensitively
    #[serde(default)]
    pub chosen_labels: BTreeMap<String, f64>,

    /// Label -> inclusive upper bound of its count range; values must be unique
    #[serde(default)]
    pub count_thresholds: BTreeMap<String, i64>,

    /// Polls per second; `0` means [`DEFAULT_POLL_FREQUENCY_HZ`]
    #[serde(default)]
    pub poll_frequency_hz: f64,
}

impl SensorConfig {
    /// Check the configuration and return its implicit dependencies
    /// (`[detector_name, camera_name]`).
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        require_field("detector_name", &self.detector_name)?;
        require_field("camera_name", &self.camera_name)?;
        validate_thresholds(&self.count_thresholds)?;
        if self.poll_frequency_hz.is_nan() || self.poll_frequency_hz.is_infinite() {
            return Err(ConfigError::InvalidFrequency(self.poll_frequency_hz));
        }
        if self.poll_frequency_hz < 0.0 {
            return Err(ConfigError::NegativeFrequency(self.poll_frequency_hz));
        }
        validate_confidences(&self.chosen_labels)?;

        Ok(vec![self.detector_name.clone(), self.camera_name.clone()])
    }

    /// Effective poll frequency in Hz
    pub fn poll_frequency(&self) -> f64 {
        if self.poll_frequency_hz > 0.0 {
            self.poll_frequency_hz
        } else {
            DEFAULT_POLL_FREQUENCY_HZ
        }
    }

    /// Target time between the starts of two polls
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.poll_frequency()).unwrap_or(Duration::MAX)
    }

    /// Counting rules for a generation built from this config
    pub fn rules(&self) -> CountRules {
        CountRules::new(&self.chosen_labels, &self.count_thresholds)
    }
}
