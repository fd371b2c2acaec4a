/*!
 * Configuration types for Vision Summary
 */

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Raw per-resource attributes, decoded by the resource's model
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Top-level module configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Detectors the resources can depend on
    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,

    /// Resources to build
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging verbosity
    #[serde(default)]
    pub level: LogLevel,

    /// Write JSON log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Shorthand for `level = "debug"`
    #[serde(default)]
    pub verbose: bool,
}

/// A detector made available to resources under `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub name: String,

    #[serde(default)]
    pub kind: DetectorKind,

    /// Replay file, relative to the config file's directory
    pub path: PathBuf,
}

/// Detector implementations the module can build itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Replays recorded detections from a JSON file
    #[default]
    Replay,
}

/// One resource to construct from a registered model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,

    pub api: Api,

    /// Model triple, e.g. `viam:vision-summary:count-sensor`
    pub model: String,

    #[serde(default)]
    pub attributes: Attributes,
}

/// Resource API a model implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    Sensor,
    Vision,
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Api::Sensor => write!(f, "sensor"),
            Api::Vision => write!(f, "vision"),
        }
    }
}

/// Logging verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Informational messages (default)
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl ModuleConfig {
    /// Load configuration from a TOML file, or JSON when the extension is `.json`
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(toml::from_str(&contents)?)
        }
    }

    /// Find a resource config by name
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }
}

impl ResourceConfig {
    /// Decode the attributes into a model's own config type
    pub fn decode_attributes<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::Value::Object(self.attributes.clone());
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use summary_count_sensor::SensorConfig;
    use tempfile::Builder;

    const MODULE_TOML: &str = r#"
        [logging]
        level = "debug"

        [[detectors]]
        name = "people-detector"
        path = "frames.json"

        [[resources]]
        name = "lobby-count"
        api = "sensor"
        model = "viam:vision-summary:count-sensor"

        [resources.attributes]
        detector_name = "people-detector"
        camera_name = "lobby"
        poll_frequency_hz = 2.5
        chosen_labels = { person = 0.6 }
        count_thresholds = { empty = 0, quiet = 5, busy = 20 }
    "#;

    #[test]
    fn test_parse_toml_module() {
        let config: ModuleConfig = toml::from_str(MODULE_TOML).unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.detectors.len(), 1);
        assert_eq!(config.detectors[0].kind, DetectorKind::Replay);

        let resource = config.resource("lobby-count").unwrap();
        assert_eq!(resource.api, Api::Sensor);

        let sensor: SensorConfig = resource.decode_attributes().unwrap();
        assert_eq!(sensor.camera_name, "lobby");
        assert_eq!(sensor.poll_frequency_hz, 2.5);
        assert_eq!(sensor.chosen_labels["person"], 0.6);
        assert_eq!(sensor.count_thresholds["busy"], 20);
        assert!(sensor.validate().is_ok());
    }

    #[test]
    fn test_from_file_toml_and_json() {
        let mut toml_file = Builder::new().suffix(".toml").tempfile().unwrap();
        toml_file.write_all(MODULE_TOML.as_bytes()).unwrap();
        let from_toml = ModuleConfig::from_file(toml_file.path()).unwrap();

        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        json_file
            .write_all(serde_json::to_string(&from_toml).unwrap().as_bytes())
            .unwrap();
        let from_json = ModuleConfig::from_file(json_file.path()).unwrap();

        assert_eq!(from_toml, from_json);
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config: ModuleConfig = toml::from_str("").unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(!config.logging.verbose);
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_missing_attributes_decode_to_defaults() {
        let resource: ResourceConfig = toml::from_str(
            r#"
            name = "bare"
            api = "vision"
            model = "viam:vision-summary:count-classifier"
            "#,
        )
        .unwrap();

        let sensor: SensorConfig = resource.decode_attributes().unwrap();
        assert_eq!(sensor, SensorConfig::default());
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
