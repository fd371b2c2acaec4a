//! Error types for count configuration

use thiserror::Error;

/// Result type for count configuration checks
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Malformed or incomplete counting configuration.
///
/// Always raised before any background work is started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required attribute is missing or blank
    #[error("attribute {field} cannot be left blank")]
    MissingField { field: &'static str },

    /// `count_thresholds` has no entries
    #[error("attribute count_thresholds is required")]
    NoThresholds,

    /// Two labels share the same threshold value
    #[error(
        "cannot have two labels for the same threshold in count_thresholds. \
         Threshold value {value} appears more than once (labels {first:?} and {second:?})"
    )]
    DuplicateThreshold {
        value: i64,
        first: String,
        second: String,
    },

    /// A minimum confidence outside `[0, 1]`
    #[error("chosen_labels confidence for {label:?} must be within [0, 1], got {confidence}")]
    InvalidConfidence { label: String, confidence: f64 },

    /// Negative poll frequency
    #[error("attribute poll_frequency_hz cannot be negative, got {0}")]
    NegativeFrequency(f64),

    /// Poll frequency that is not a finite number
    #[error("attribute poll_frequency_hz must be a finite number, got {0}")]
    InvalidFrequency(f64),
}
