//! Counting Reducer: filters detections and tallies the ones that qualify

use crate::threshold::ThresholdTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Axis-aligned box around a detected object, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

/// A labeled, scored observation produced by a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}

/// Lower-cased label -> minimum confidence a detection needs to be counted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelConfidenceMap {
    minimums: HashMap<String, f64>,
}

impl LabelConfidenceMap {
    /// Build the map from user input, folding every label to lower case.
    ///
    /// If two user labels fold to the same key, the one that sorts last wins.
    pub fn new(chosen_labels: &BTreeMap<String, f64>) -> Self {
        let minimums = chosen_labels
            .iter()
            .map(|(label, confidence)| (label.to_lowercase(), *confidence))
            .collect();
        Self { minimums }
    }

    /// Minimum confidence configured for a label, matched case-insensitively
    pub fn minimum_for(&self, label: &str) -> Option<f64> {
        self.minimums.get(&label.to_lowercase()).copied()
    }

    /// Whether a detection qualifies (inclusive at the minimum)
    pub fn accepts(&self, detection: &Detection) -> bool {
        self.minimum_for(&detection.label)
            .is_some_and(|minimum| detection.score >= minimum)
    }

    pub fn len(&self) -> usize {
        self.minimums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minimums.is_empty()
    }
}

/// Outcome of one reduction
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    /// Label of the bin the count fell into
    pub label: String,
    /// Number of detections that qualified
    pub count: usize,
    /// The qualifying detections, in input order
    pub matched: Vec<Detection>,
}

/// Count the detections that pass `label_confidence` and label the count.
pub fn reduce(
    detections: &[Detection],
    label_confidence: &LabelConfidenceMap,
    table: &ThresholdTable,
) -> Tally {
    let matched: Vec<Detection> = detections
        .iter()
        .filter(|d| label_confidence.accepts(d))
        .cloned()
        .collect();

    let count = matched.len();
    Tally {
        label: table.lookup(count).to_string(),
        count,
        matched,
    }
}

/// The immutable counting rules of one configuration generation.
///
/// Rebuilt from scratch on every reconfiguration; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountRules {
    labels: LabelConfidenceMap,
    table: ThresholdTable,
}

impl CountRules {
    pub fn new(chosen_labels: &BTreeMap<String, f64>, thresholds: &BTreeMap<String, i64>) -> Self {
        Self {
            labels: LabelConfidenceMap::new(chosen_labels),
            table: ThresholdTable::build(thresholds),
        }
    }

    pub fn count(&self, detections: &[Detection]) -> Tally {
        reduce(detections, &self.labels, &self.table)
    }

    pub fn labels(&self) -> &LabelConfidenceMap {
        &self.labels
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }
}
