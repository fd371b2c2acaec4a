//! Error types for the count sensor

use summary_core_count::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorError>;

/// Why a snapshot could not be served
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    /// The caller's own context was cancelled before the read
    #[error("caller context cancelled, module might be configuring")]
    CallerCancelled,

    /// The generation was torn down and no successor is running
    #[error("lost connection with background vision service loop")]
    Disconnected,

    /// The sensor has not completed a poll yet
    #[error("no detections have been counted yet")]
    AwaitingFirstPoll,
}

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("invalid count sensor configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("count sensor not ready: {0}")]
    NotReady(NotReady),

    /// An invariant was broken; indicates a bug rather than a runtime condition
    #[error("count sensor internal error: {0}")]
    Internal(String),
}

impl SensorError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, SensorError::NotReady(_))
    }
}

impl From<NotReady> for SensorError {
    fn from(reason: NotReady) -> Self {
        SensorError::NotReady(reason)
    }
}
