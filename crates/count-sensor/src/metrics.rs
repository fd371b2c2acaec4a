//! Count sensor metrics
//!
//! Tracks poll outcomes across generations so hosts can see whether the
//! detector is healthy even though detector failures never reach readers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Point-in-time view of the sensor's polling history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollStats {
    /// Configuration generation currently (or last) running; starts at 1
    pub generation: u64,

    /// Polls that produced a snapshot
    pub polls_succeeded: u64,

    /// Detector failures; each one restarted the poll loop
    pub polls_failed: u64,

    /// How long the most recent successful poll took
    pub last_poll_duration: Option<Duration>,

    /// Wall-clock time of the most recent successful poll
    pub last_success: Option<DateTime<Utc>>,

    /// Message of the most recent detector failure
    pub last_error: Option<String>,
}

impl PollStats {
    /// Fraction of polls that succeeded (1.0 when nothing ran yet)
    pub fn success_ratio(&self) -> f64 {
        let total = self.polls_succeeded + self.polls_failed;
        if total == 0 {
            1.0
        } else {
            self.polls_succeeded as f64 / total as f64
        }
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Generation {} | {} ok | {} failed ({:.1}% ok) | last error: {}",
            self.generation,
            self.polls_succeeded,
            self.polls_failed,
            self.success_ratio() * 100.0,
            self.last_error.as_deref().unwrap_or("none")
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct PollRecorder {
    stats: Mutex<PollStats>,
}

impl PollRecorder {
    pub(crate) fn begin_generation(&self, generation: u64) {
        self.stats.lock().generation = generation;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.stats.lock().generation
    }

    pub(crate) fn record_success(&self, took: Duration) {
        let mut stats = self.stats.lock();
        stats.polls_succeeded += 1;
        stats.last_poll_duration = Some(took);
        stats.last_success = Some(Utc::now());
    }

    pub(crate) fn record_failure(&self, error: &dyn std::error::Error) {
        let mut stats = self.stats.lock();
        stats.polls_failed += 1;
        stats.last_error = Some(error.to_string());
    }

    pub(crate) fn snapshot(&self) -> PollStats {
        self.stats.lock().clone()
    }
}
