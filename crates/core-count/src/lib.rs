//! Vision Summary Core Count: pure-logic detection counting
//!
//! # Overview
//!
//! This crate turns a list of labeled, scored detections into a bounded count
//! and a discrete label. It has two pieces:
//!
//! - **Threshold Table**: ordered `(upper_bound, label)` bins built from a
//!   `label -> threshold` mapping, with a lookup from count to label
//! - **Counting Reducer**: filters detections against per-label minimum
//!   confidences and maps the number that survive onto the table
//!
//! Like the rest of the `core-*` crates it has zero knowledge of cameras,
//! detectors, runtimes or threads. Everything here is deterministic and
//! side-effect free, so a generation's [`CountRules`] can be shared freely
//! between a background poller and on-demand callers.
//!
//! ```text
//!   detections ──► LabelConfidenceMap filter ──► count ──► ThresholdTable ──► label
//!                         │
//!                         └──► matched detections (input order)
//! ```
//!
//! # Example
//!
//! ```
//! use summary_core_count::{CountRules, Detection};
//! use std::collections::BTreeMap;
//!
//! let labels = BTreeMap::from([("Cat".to_string(), 0.5)]);
//! let thresholds = BTreeMap::from([
//!     ("low".to_string(), 2),
//!     ("mid".to_string(), 5),
//!     ("high".to_string(), 9),
//! ]);
//! let rules = CountRules::new(&labels, &thresholds);
//!
//! let tally = rules.count(&[
//!     Detection::new("cat", 0.9),
//!     Detection::new("cat", 0.4),
//!     Detection::new("dog", 0.9),
//! ]);
//! assert_eq!(tally.count, 1);
//! assert_eq!(tally.label, "low");
//! ```

pub mod config;
pub mod error;
pub mod reducer;
pub mod threshold;

pub use config::{require_field, validate_confidences, validate_thresholds};
pub use error::ConfigError;
pub use reducer::{reduce, BoundingBox, CountRules, Detection, LabelConfidenceMap, Tally};
pub use threshold::{Bin, ThresholdTable, OVERFLOW_LABEL};
