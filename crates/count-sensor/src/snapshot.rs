//! The latest published count
//!
//! Label and count are swapped in together under one lock, so a reader always
//! sees a pair produced by the same poll. There is no skew between them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sensor readings as handed to a host: `{"label": ..., "count": ...}`
pub type Readings = serde_json::Map<String, Value>;

/// Result of the most recent successful poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub label: String,
    pub count: usize,
}

impl Snapshot {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }

    pub fn to_readings(&self) -> Readings {
        let mut readings = Readings::new();
        readings.insert("label".to_string(), Value::from(self.label.clone()));
        readings.insert("count".to_string(), Value::from(self.count));
        readings
    }
}

/// Single-writer, many-reader cell holding the latest [`Snapshot`].
///
/// Survives reconfiguration: the new generation overwrites it on its first
/// successful poll.
#[derive(Debug, Default)]
pub(crate) struct SnapshotCell {
    latest: RwLock<Option<Snapshot>>,
}

impl SnapshotCell {
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        *self.latest.write() = Some(snapshot);
    }

    pub(crate) fn load(&self) -> Option<Snapshot> {
        self.latest.read().clone()
    }
}
