//! Vision Summary Count Sensor: the background sensing loop
//!
//! The count sensor repeatedly asks a detector what one camera sees, reduces
//! the answer to a count and a label, and keeps the latest result available
//! for any number of concurrent readers.
//!
//! # Generations
//!
//! ```text
//!  start(cfg₁) ──► generation 1 ──► reconfigure(cfg₂) ──► generation 2 ──► shutdown()
//!                  │                 │ cancel + join ₁                      │ cancel + join ₂
//!                  ▼                 ▼                                      ▼
//!            supervise ─► poll_loop  (never overlaps)                    Stopped
//! ```
//!
//! Every generation owns its own cancellation token, counting rules and
//! background task. A new generation is only launched after the previous
//! task has fully exited, so the snapshot never has two writers.
//!
//! # Failure policy
//!
//! A failed detector call ends the inner poll loop. The supervisor logs the
//! error and immediately starts a fresh loop under the same token, forever,
//! until the token is cancelled. Detector failures never reach readers.
//!
//! # Example
//!
//! ```no_run
//! use summary_count_sensor::{CountSensor, SensorConfig};
//! use summary_core_interface::DetectionSource;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(detector: Arc<dyn DetectionSource>) -> anyhow::Result<()> {
//! let config: SensorConfig = serde_json::from_str(r#"{
//!     "detector_name": "people-detector",
//!     "camera_name": "lobby",
//!     "chosen_labels": {"person": 0.6},
//!     "count_thresholds": {"empty": 0, "quiet": 5, "busy": 20}
//! }"#)?;
//!
//! let sensor = CountSensor::start("lobby-count", config, detector)?;
//!
//! let snapshot = sensor.read_snapshot(&CancellationToken::new())?;
//! println!("{} people ({})", snapshot.count, snapshot.label);
//!
//! sensor.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod metrics;
pub mod snapshot;

pub use config::{SensorConfig, DEFAULT_POLL_FREQUENCY_HZ};
pub use daemon::{CountSensor, SensorState};
pub use error::{NotReady, SensorError};
pub use metrics::PollStats;
pub use snapshot::{Readings, Snapshot};
