//! Count classifier configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use summary_core_count::{
    require_field, validate_confidences, validate_thresholds, ConfigError, CountRules,
};

/// Attributes of a `count-classifier` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub detector_name: String,

    #[serde(default)]
    pub chosen_labels: BTreeMap<String, f64>,

    #[serde(default)]
    pub count_thresholds: BTreeMap<String, i64>,
}

impl ClassifierConfig {
    /// Check the configuration and return its implicit dependencies
    /// (`[detector_name]`).
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        require_field("detector_name", &self.detector_name)?;
        validate_thresholds(&self.count_thresholds)?;
        validate_confidences(&self.chosen_labels)?;
        Ok(vec![self.detector_name.clone()])
    }

    pub fn rules(&self) -> CountRules {
        CountRules::new(&self.chosen_labels, &self.count_thresholds)
    }
}
