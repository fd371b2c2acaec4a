/*!
 * Module host: explicit model registration and resource lifecycle
 *
 * Nothing registers itself. The host builds a [`Module`], registers the
 * models it wants to serve, and then constructs resources from configs
 * plus the detectors they depend on.
 */

use crate::config::{Api, ResourceConfig};
use crate::error::{Result, SummaryError};
use crate::replay::Dependencies;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use summary_core_count::ConfigError;
use summary_core_interface::DetectionSource;
use summary_count_classifier::{ClassifierConfig, CountClassifier};
use summary_count_sensor::{CountSensor, Readings, SensorConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Model triple `namespace:family:name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Model {
    pub namespace: String,
    pub family: String,
    pub name: String,
}

impl Model {
    pub fn new(namespace: &str, family: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            family: family.to_string(),
            name: name.to_string(),
        }
    }

    /// The background count sensor
    pub fn count_sensor() -> Self {
        Self::new("viam", "vision-summary", "count-sensor")
    }

    /// The on-demand count classifier
    pub fn count_classifier() -> Self {
        Self::new("viam", "vision-summary", "count-classifier")
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.family, self.name)
    }
}

impl FromStr for Model {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [namespace, family, name] if parts.iter().all(|p| !p.is_empty()) => {
                Ok(Self::new(namespace, family, name))
            }
            _ => Err(SummaryError::Config(format!(
                "model {:?} is not of the form namespace:family:name",
                s
            ))),
        }
    }
}

/// Which implementation a registered model builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    CountSensor,
    CountClassifier,
}

enum Resource {
    Sensor(CountSensor),
    Classifier(Arc<CountClassifier>),
}

/// Attributes decoded into the model's own config
enum ResourceSettings {
    Sensor(SensorConfig),
    Classifier(ClassifierConfig),
}

impl ResourceSettings {
    fn detector_name(&self) -> &str {
        match self {
            ResourceSettings::Sensor(config) => &config.detector_name,
            ResourceSettings::Classifier(config) => &config.detector_name,
        }
    }
}

/// Registered models and the live resources built from them
#[derive(Default)]
pub struct Module {
    models: HashMap<(Api, Model), ModelKind>,
    resources: BTreeMap<String, Resource>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// A module serving both built-in models
    pub fn with_builtin_models() -> Self {
        let mut module = Self::new();
        module.add_model(Api::Sensor, Model::count_sensor(), ModelKind::CountSensor);
        module.add_model(Api::Vision, Model::count_classifier(), ModelKind::CountClassifier);
        module
    }

    pub fn add_model(&mut self, api: Api, model: Model, kind: ModelKind) {
        info!(%api, %model, "registered model");
        self.models.insert((api, model), kind);
    }

    fn kind_for(&self, config: &ResourceConfig) -> Result<ModelKind> {
        let model: Model = config.model.parse()?;
        self.models
            .get(&(config.api, model))
            .copied()
            .ok_or_else(|| SummaryError::UnknownModel {
                api: config.api,
                model: config.model.clone(),
            })
    }

    /// Decode and validate a resource's attributes
    fn settings(&self, config: &ResourceConfig) -> Result<(ResourceSettings, Vec<String>)> {
        let invalid = |source: ConfigError| SummaryError::InvalidResource {
            resource: config.name.clone(),
            source,
        };

        match self.kind_for(config)? {
            ModelKind::CountSensor => {
                let settings: SensorConfig = config.decode_attributes()?;
                let deps = settings.validate().map_err(invalid)?;
                Ok((ResourceSettings::Sensor(settings), deps))
            }
            ModelKind::CountClassifier => {
                let settings: ClassifierConfig = config.decode_attributes()?;
                let deps = settings.validate().map_err(invalid)?;
                Ok((ResourceSettings::Classifier(settings), deps))
            }
        }
    }

    /// Validate a resource config and return its implicit dependencies
    pub fn validate_resource(&self, config: &ResourceConfig) -> Result<Vec<String>> {
        self.settings(config).map(|(_, deps)| deps)
    }

    fn resolve_detector(
        config: &ResourceConfig,
        settings: &ResourceSettings,
        dependencies: &Dependencies,
    ) -> Result<Arc<dyn DetectionSource>> {
        let name = settings.detector_name();
        dependencies
            .get(name)
            .cloned()
            .ok_or_else(|| SummaryError::MissingDependency {
                resource: config.name.clone(),
                dependency: name.to_string(),
            })
    }

    /// Build a resource and start it
    pub async fn add_resource(
        &mut self,
        config: &ResourceConfig,
        dependencies: &Dependencies,
    ) -> Result<()> {
        if self.resources.contains_key(&config.name) {
            return Err(SummaryError::DuplicateResource(config.name.clone()));
        }

        let (settings, _) = self.settings(config)?;
        let detector = Self::resolve_detector(config, &settings, dependencies)?;

        let resource = match settings {
            ResourceSettings::Sensor(settings) => {
                Resource::Sensor(CountSensor::start(config.name.clone(), settings, detector)?)
            }
            ResourceSettings::Classifier(settings) => Resource::Classifier(Arc::new(
                CountClassifier::new(config.name.clone(), settings, detector)?,
            )),
        };

        info!(resource = %config.name, model = %config.model, "resource added");
        self.resources.insert(config.name.clone(), resource);
        Ok(())
    }

    /// Apply a new config to a live resource of the same kind
    pub async fn reconfigure_resource(
        &self,
        config: &ResourceConfig,
        dependencies: &Dependencies,
    ) -> Result<()> {
        let resource = self
            .resources
            .get(&config.name)
            .ok_or_else(|| SummaryError::UnknownResource(config.name.clone()))?;

        let (settings, _) = self.settings(config)?;
        let detector = Self::resolve_detector(config, &settings, dependencies)?;

        match (resource, settings) {
            (Resource::Sensor(sensor), ResourceSettings::Sensor(settings)) => {
                sensor.reconfigure(settings, detector).await?
            }
            (Resource::Classifier(classifier), ResourceSettings::Classifier(settings)) => {
                classifier.reconfigure(settings, detector)?
            }
            (Resource::Sensor(_), _) => {
                return Err(SummaryError::WrongKind {
                    resource: config.name.clone(),
                    expected: "count sensor",
                })
            }
            (Resource::Classifier(_), _) => {
                return Err(SummaryError::WrongKind {
                    resource: config.name.clone(),
                    expected: "count classifier",
                })
            }
        }

        info!(resource = %config.name, "resource reconfigured");
        Ok(())
    }

    pub fn sensor(&self, name: &str) -> Option<&CountSensor> {
        match self.resources.get(name) {
            Some(Resource::Sensor(sensor)) => Some(sensor),
            _ => None,
        }
    }

    pub fn classifier(&self, name: &str) -> Option<Arc<CountClassifier>> {
        match self.resources.get(name) {
            Some(Resource::Classifier(classifier)) => Some(classifier.clone()),
            _ => None,
        }
    }

    /// Latest readings of a sensor resource
    pub fn readings(&self, name: &str, caller: &CancellationToken) -> Result<Readings> {
        match self.resources.get(name) {
            Some(Resource::Sensor(sensor)) => Ok(sensor.readings(caller)?),
            Some(Resource::Classifier(_)) => Err(SummaryError::WrongKind {
                resource: name.to_string(),
                expected: "count sensor",
            }),
            None => Err(SummaryError::UnknownResource(name.to_string())),
        }
    }

    /// Names of every sensor resource, sorted
    pub fn sensor_names(&self) -> Vec<String> {
        self.resources
            .iter()
            .filter(|(_, resource)| matches!(resource, Resource::Sensor(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn resource_names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    /// Hand every sensor's readings to `report` each `interval` until
    /// `shutdown` is cancelled or `report` fails.
    ///
    /// The module is closed on the way out either way.
    pub async fn report_until<F>(
        &mut self,
        interval: Duration,
        shutdown: &CancellationToken,
        mut report: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Readings) -> std::io::Result<()>,
    {
        let caller = CancellationToken::new();
        let mut ticker = tokio::time::interval(interval);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = self.report_once(&caller, &mut report) {
                        break Err(e);
                    }
                }
            }
        };

        let closed = self.close().await;
        outcome.and(closed)
    }

    fn report_once<F>(&self, caller: &CancellationToken, report: &mut F) -> Result<()>
    where
        F: FnMut(&str, &Readings) -> std::io::Result<()>,
    {
        for name in self.sensor_names() {
            match self.readings(&name, caller) {
                Ok(readings) => report(&name, &readings)?,
                Err(SummaryError::Sensor(e)) if e.is_not_ready() => {
                    warn!(resource = %name, reason = %e, "sensor not ready");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Shut down every sensor and drop every resource.
    ///
    /// All sensors are joined even if one fails; the first failure is returned.
    pub async fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for (name, resource) in std::mem::take(&mut self.resources) {
            if let Resource::Sensor(sensor) = resource {
                if let Err(e) = sensor.shutdown().await {
                    error!(resource = %name, error = %e, "sensor did not shut down cleanly");
                    first_error.get_or_insert(SummaryError::from(e));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplaySource;
    use serde_json::json;
    use summary_count_sensor::{NotReady, SensorError, SensorState};

    fn detectors() -> Dependencies {
        let source = ReplaySource::from_json_str(
            "people",
            r#"{"cameras": {"lobby": [[
                {"label": "person", "score": 0.9},
                {"label": "Person", "score": 0.7},
                {"label": "dog", "score": 0.9}
            ]]}}"#,
        )
        .unwrap();
        let mut deps = Dependencies::new();
        deps.insert("people".to_string(), Arc::new(source) as Arc<dyn DetectionSource>);
        deps
    }

    fn resource(name: &str, api: Api, model: Model, attributes: serde_json::Value) -> ResourceConfig {
        ResourceConfig {
            name: name.to_string(),
            api,
            model: model.to_string(),
            attributes: attributes.as_object().cloned().unwrap_or_default(),
        }
    }

    fn sensor_config(thresholds: serde_json::Value) -> ResourceConfig {
        resource(
            "lobby-count",
            Api::Sensor,
            Model::count_sensor(),
            json!({
                "detector_name": "people",
                "camera_name": "lobby",
                "chosen_labels": {"person": 0.5},
                "count_thresholds": thresholds,
                "poll_frequency_hz": 10.0
            }),
        )
    }

    fn classifier_config() -> ResourceConfig {
        resource(
            "lobby-classifier",
            Api::Vision,
            Model::count_classifier(),
            json!({
                "detector_name": "people",
                "chosen_labels": {"person": 0.5},
                "count_thresholds": {"one": 1, "few": 3}
            }),
        )
    }

    #[test]
    fn test_model_parse_and_display() {
        let model: Model = "viam:vision-summary:count-sensor".parse().unwrap();
        assert_eq!(model, Model::count_sensor());
        assert_eq!(model.to_string(), "viam:vision-summary:count-sensor");

        assert!("count-sensor".parse::<Model>().is_err());
        assert!("viam::count-sensor".parse::<Model>().is_err());
    }

    #[test]
    fn test_validate_resource_dependencies() {
        let module = Module::with_builtin_models();

        let deps = module
            .validate_resource(&sensor_config(json!({"few": 3})))
            .unwrap();
        assert_eq!(deps, vec!["people".to_string(), "lobby".to_string()]);

        let deps = module.validate_resource(&classifier_config()).unwrap();
        assert_eq!(deps, vec!["people".to_string()]);
    }

    #[test]
    fn test_validate_duplicate_thresholds() {
        let module = Module::with_builtin_models();

        let err = module
            .validate_resource(&sensor_config(json!({"a": 1, "b": 1})))
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("Threshold value 1"));
    }

    #[test]
    fn test_unregistered_model() {
        let module = Module::new();

        let err = module
            .validate_resource(&sensor_config(json!({"few": 3})))
            .unwrap_err();

        assert!(matches!(err, SummaryError::UnknownModel { api: Api::Sensor, .. }));
    }

    #[test]
    fn test_model_registered_for_other_api() {
        let module = Module::with_builtin_models();
        let mut config = sensor_config(json!({"few": 3}));
        config.api = Api::Vision;

        assert!(matches!(
            module.validate_resource(&config),
            Err(SummaryError::UnknownModel { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_resource_lifecycle() {
        let mut module = Module::with_builtin_models();
        let deps = detectors();
        module
            .add_resource(&sensor_config(json!({"few": 3, "many": 10})), &deps)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let caller = CancellationToken::new();
        let readings = module.readings("lobby-count", &caller).unwrap();
        assert_eq!(readings["label"], "few");
        assert_eq!(readings["count"], 2);

        module
            .reconfigure_resource(&sensor_config(json!({"one": 1, "lots": 10})), &deps)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let readings = module.readings("lobby-count", &caller).unwrap();
        assert_eq!(readings["label"], "lots");
        assert_eq!(module.sensor("lobby-count").unwrap().state(), SensorState::Running);

        module.close().await.unwrap();
        assert!(module.resource_names().is_empty());
    }

    #[tokio::test]
    async fn test_missing_detector_dependency() {
        let mut module = Module::with_builtin_models();

        let err = module
            .add_resource(&sensor_config(json!({"few": 3})), &Dependencies::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SummaryError::MissingDependency { ref dependency, .. } if dependency == "people"
        ));
        assert!(module.sensor_names().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_resource_name() {
        let mut module = Module::with_builtin_models();
        let deps = detectors();
        module.add_resource(&classifier_config(), &deps).await.unwrap();

        let err = module
            .add_resource(&classifier_config(), &deps)
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::DuplicateResource(_)));
    }

    #[tokio::test]
    async fn test_classifier_resource() {
        let mut module = Module::with_builtin_models();
        module
            .add_resource(&classifier_config(), &detectors())
            .await
            .unwrap();

        let classifier = module.classifier("lobby-classifier").unwrap();
        let classes = classifier
            .classifications_from_camera("lobby", &Default::default())
            .await
            .unwrap();

        assert_eq!(classes[0].label, "few");
        assert!(matches!(
            module.readings("lobby-classifier", &CancellationToken::new()),
            Err(SummaryError::WrongKind { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readings_after_sensor_shutdown() {
        let mut module = Module::with_builtin_models();
        module
            .add_resource(&sensor_config(json!({"few": 3})), &detectors())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let sensor_name = "lobby-count".to_string();
        let caller = CancellationToken::new();
        module.sensor(&sensor_name).unwrap().shutdown().await.unwrap();

        let err = module.readings(&sensor_name, &caller).unwrap_err();
        assert!(matches!(
            err,
            SummaryError::Sensor(SensorError::NotReady(NotReady::Disconnected))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_until_shutdown_closes_module() {
        let mut module = Module::with_builtin_models();
        module
            .add_resource(&sensor_config(json!({"few": 3})), &detectors())
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(350)).await;
            stop.cancel();
        });

        let mut reported = Vec::new();
        module
            .report_until(Duration::from_millis(100), &shutdown, |name, readings| {
                reported.push((name.to_string(), readings["label"].clone()));
                Ok(())
            })
            .await
            .unwrap();

        assert!(reported.len() >= 2);
        assert!(reported.iter().all(|(name, _)| name == "lobby-count"));
        assert_eq!(reported.last().unwrap().1, "few");
        assert!(module.resource_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_failure_still_closes_module() {
        let mut module = Module::with_builtin_models();
        module
            .add_resource(&sensor_config(json!({"few": 3})), &detectors())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let err = module
            .report_until(Duration::from_millis(100), &CancellationToken::new(), |_, _| {
                Err(std::io::Error::other("broken pipe"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::Io(_)));
        assert!(module.resource_names().is_empty());
    }
}
