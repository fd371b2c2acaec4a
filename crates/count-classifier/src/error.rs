//! Error types for the count classifier

use summary_core_count::ConfigError;
use summary_core_interface::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("invalid count classifier configuration: {0}")]
    Config(#[from] ConfigError),

    /// The wrapped detector failed; returned to the caller as-is
    #[error("error from underlying detector {detector}: {source}")]
    Detector {
        detector: String,
        source: SourceError,
    },
}
