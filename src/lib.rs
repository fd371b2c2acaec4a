/*!
 * Vision Summary - count what a detector sees
 *
 * Hosts two models on top of any object detector:
 * - count-sensor: polls a camera in the background and serves the latest
 *   bucketed count as sensor readings
 * - count-classifier: counts on demand and reports the bucket as a
 *   classification
 *
 * Both share the counting rules in `summary-core-count`: keep detections of
 * chosen labels above their confidence floor, then map the count onto a table
 * of named, inclusive upper bounds.
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod module;
pub mod replay;

// Re-export commonly used types
pub use config::{Api, DetectorConfig, LogLevel, LoggingConfig, ModuleConfig, ResourceConfig};
pub use error::{Result, SummaryError};
pub use module::{Model, ModelKind, Module};
pub use replay::{load_detectors, Dependencies, ReplaySource};

pub use summary_core_count::{CountRules, Detection, ThresholdTable, OVERFLOW_LABEL};
pub use summary_count_classifier::{ClassifierConfig, CountClassifier};
pub use summary_count_sensor::{CountSensor, SensorConfig, Snapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
