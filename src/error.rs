/*!
 * Error types for Vision Summary
 */

use crate::config::Api;
use std::io;
use summary_core_count::ConfigError;
use summary_count_classifier::ClassifierError;
use summary_count_sensor::SensorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_RUNTIME: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Module config file is not valid TOML
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Module config or replay file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Module-level configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Resource attributes failed the model's validation
    #[error("resource {resource}: {source}")]
    InvalidResource {
        resource: String,
        source: ConfigError,
    },

    /// No model registered under this API and name
    #[error("no model {model} registered for API {api}")]
    UnknownModel { api: Api, model: String },

    /// No live resource with this name
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A resource with this name already exists
    #[error("resource {0} already exists")]
    DuplicateResource(String),

    /// The resource exists but is not of the requested kind
    #[error("resource {resource} is not a {expected}")]
    WrongKind {
        resource: String,
        expected: &'static str,
    },

    /// A detector named by a resource is not among the dependencies
    #[error("resource {resource} depends on detector {dependency}, which is not available")]
    MissingDependency { resource: String, dependency: String },

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl SummaryError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SummaryError::Sensor(SensorError::NotReady(_)) | SummaryError::Classifier(_) => {
                EXIT_RUNTIME
            }
            _ => EXIT_FATAL,
        }
    }

    /// Whether the error stems from bad configuration rather than runtime state
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SummaryError::Toml(_)
                | SummaryError::Json(_)
                | SummaryError::Config(_)
                | SummaryError::InvalidResource { .. }
                | SummaryError::UnknownModel { .. }
                | SummaryError::DuplicateResource(_)
                | SummaryError::MissingDependency { .. }
                | SummaryError::Sensor(SensorError::Config(_))
                | SummaryError::Classifier(ClassifierError::Config(_))
        )
    }
}
