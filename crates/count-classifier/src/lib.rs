//! Vision Summary Count Classifier
//!
//! The on-demand sibling of the count sensor. Instead of polling in the
//! background, it wraps a detector and counts on every request: each
//! classification call queries the detector once, reduces the detections
//! with the configured rules and answers with a single classification whose
//! label is the count bin.
//!
//! Detection calls pass straight through to the wrapped detector, and a full
//! capture is returned with its detections narrowed down to the ones that
//! were counted.

pub mod classifier;
pub mod config;
pub mod error;

pub use classifier::CountClassifier;
pub use config::ClassifierConfig;
pub use error::{ClassifierError, Result};
