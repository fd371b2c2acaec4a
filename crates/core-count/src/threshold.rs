//! Threshold Table: converts a raw count into a discrete label
//!
//! Users configure a `label -> threshold` mapping such as
//! `{"few": 2, "some": 5, "many": 9}`. Each threshold is the inclusive upper
//! bound of the count range its label covers, so the mapping above reads:
//!
//! ```text
//!   0..=2  -> "few"
//!   3..=5  -> "some"
//!   6..=9  -> "many"
//!   10..   -> "Overflow"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label returned when a count exceeds every configured threshold
pub const OVERFLOW_LABEL: &str = "Overflow";

/// A single `(upper_bound, label)` pair of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    /// Inclusive upper bound of the count range mapped to `label`
    pub upper_bound: i64,
    /// Label reported for counts that land in this bin
    pub label: String,
}

/// Immutable, ascending sequence of [`Bin`]s.
///
/// Built once per configuration generation and never re-sorted afterwards.
/// Bin counts are small (tens at most), so lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdTable {
    bins: Vec<Bin>,
}

impl ThresholdTable {
    /// Build the table from a `label -> threshold` mapping.
    ///
    /// Callers are expected to have run
    /// [`validate_thresholds`](crate::config::validate_thresholds) first so
    /// that every threshold value is unique. If two labels do share a value
    /// anyway, the one that sorts last by label wins.
    pub fn build(thresholds_by_label: &BTreeMap<String, i64>) -> Self {
        // invert the mapping, validation guarantees it is 1-1
        let inverted: BTreeMap<i64, &str> = thresholds_by_label
            .iter()
            .map(|(label, bound)| (*bound, label.as_str()))
            .collect();

        let bins = inverted
            .into_iter()
            .map(|(upper_bound, label)| Bin {
                upper_bound,
                label: label.to_string(),
            })
            .collect();

        Self { bins }
    }

    /// Map a count onto its label.
    ///
    /// Returns the label of the first bin whose upper bound is `>= count`,
    /// or [`OVERFLOW_LABEL`] when the count is above every bin.
    pub fn lookup(&self, count: usize) -> &str {
        self.find(count)
            .map(|bin| bin.label.as_str())
            .unwrap_or(OVERFLOW_LABEL)
    }

    /// The bin a count falls into, if any
    pub fn find(&self, count: usize) -> Option<&Bin> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        self.bins.iter().find(|bin| count <= bin.upper_bound)
    }

    /// Bins in ascending order of upper bound
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}
