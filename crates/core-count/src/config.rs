//! Validation helpers shared by every model that counts detections
//!
//! The per-model config structs live with their models; these functions hold
//! the invariants they all enforce before a generation is built.

use crate::error::{ConfigError, Result};
use std::collections::BTreeMap;

/// Reject a blank required attribute
pub fn require_field(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(())
}

/// `count_thresholds` must be non-empty and its values unique.
///
/// Labels are visited in sorted order, so the reported pair is stable.
pub fn validate_thresholds(thresholds: &BTreeMap<String, i64>) -> Result<()> {
    if thresholds.is_empty() {
        return Err(ConfigError::NoThresholds);
    }

    let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
    for (label, value) in thresholds {
        if let Some(first) = seen.insert(*value, label) {
            return Err(ConfigError::DuplicateThreshold {
                value: *value,
                first: first.to_string(),
                second: label.clone(),
            });
        }
    }
    Ok(())
}

/// Every minimum confidence must lie in `[0, 1]`
pub fn validate_confidences(chosen_labels: &BTreeMap<String, f64>) -> Result<()> {
    for (label, confidence) in chosen_labels {
        if !(0.0..=1.0).contains(confidence) {
            return Err(ConfigError::InvalidConfidence {
                label: label.clone(),
                confidence: *confidence,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field() {
        assert!(require_field("detector_name", "people").is_ok());

        let err = require_field("detector_name", "  ").unwrap_err();
        assert_eq!(err, ConfigError::MissingField { field: "detector_name" });
        assert!(err.to_string().contains("detector_name"));
    }

    #[test]
    fn test_empty_thresholds_rejected() {
        assert_eq!(
            validate_thresholds(&BTreeMap::new()),
            Err(ConfigError::NoThresholds)
        );
    }

    #[test]
    fn test_duplicate_threshold_names_value() {
        let thresholds = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 1)]);

        let err = validate_thresholds(&thresholds).unwrap_err();

        assert_eq!(
            err,
            ConfigError::DuplicateThreshold {
                value: 1,
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
        assert!(err.to_string().contains("Threshold value 1 appears more than once"));
    }

    #[test]
    fn test_unique_thresholds_accepted() {
        let thresholds = BTreeMap::from([
            ("low".to_string(), 2),
            ("mid".to_string(), 5),
            ("high".to_string(), 9),
        ]);

        assert!(validate_thresholds(&thresholds).is_ok());
    }

    #[test]
    fn test_confidence_bounds() {
        let ok = BTreeMap::from([("cat".to_string(), 0.0), ("dog".to_string(), 1.0)]);
        assert!(validate_confidences(&ok).is_ok());

        let too_high = BTreeMap::from([("cat".to_string(), 1.5)]);
        assert!(matches!(
            validate_confidences(&too_high),
            Err(ConfigError::InvalidConfidence { .. })
        ));

        let nan = BTreeMap::from([("cat".to_string(), f64::NAN)]);
        assert!(validate_confidences(&nan).is_err());
    }
}
