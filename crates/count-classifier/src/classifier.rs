//! The count classifier service

use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use summary_core_count::{CountRules, Detection};
use summary_core_interface::{
    CaptureOptions, Classification, DetectionSource, Extra, ImageFrame, Properties, SourceError,
    VisionCapture,
};
use tracing::{debug, info};

/// Counting classifications are certain by construction
const COUNT_CONFIDENCE: f64 = 1.0;

/// Detector and rules of one configuration generation
struct ClassifierGeneration {
    detector: Arc<dyn DetectionSource>,
    rules: CountRules,
}

impl ClassifierGeneration {
    fn detector_error(&self, source: SourceError) -> ClassifierError {
        ClassifierError::Detector {
            detector: self.detector.name().to_string(),
            source,
        }
    }

    fn classify(&self, detections: &[Detection]) -> Vec<Classification> {
        let tally = self.rules.count(detections);
        debug!(count = tally.count, label = %tally.label, "classified detections");
        vec![Classification::new(tally.label, COUNT_CONFIDENCE)]
    }
}

/// Vision service that labels how many qualifying objects a detector sees.
///
/// Reconfiguration swaps the whole generation at once; requests already in
/// flight finish against the generation they started with.
pub struct CountClassifier {
    name: String,
    current: RwLock<Arc<ClassifierGeneration>>,
}

impl CountClassifier {
    pub fn new(
        name: impl Into<String>,
        config: ClassifierConfig,
        detector: Arc<dyn DetectionSource>,
    ) -> Result<Self> {
        let generation = build(&config, detector)?;
        Ok(Self {
            name: name.into(),
            current: RwLock::new(Arc::new(generation)),
        })
    }

    /// Replace the detector and rules; an invalid config changes nothing
    pub fn reconfigure(
        &self,
        config: ClassifierConfig,
        detector: Arc<dyn DetectionSource>,
    ) -> Result<()> {
        let generation = build(&config, detector)?;
        *self.current.write() = Arc::new(generation);
        info!(classifier = %self.name, detector = %config.detector_name, "count classifier reconfigured");
        Ok(())
    }

    fn current(&self) -> Arc<ClassifierGeneration> {
        self.current.read().clone()
    }

    /// Count the detections in the current frame of `camera`
    pub async fn classifications_from_camera(
        &self,
        camera: &str,
        extra: &Extra,
    ) -> Result<Vec<Classification>> {
        let generation = self.current();
        let detections = generation
            .detector
            .detections_from_camera(camera, extra)
            .await
            .map_err(|e| generation.detector_error(e))?;
        Ok(generation.classify(&detections))
    }

    /// Count the detections in a caller-supplied image
    pub async fn classifications(
        &self,
        image: &ImageFrame,
        extra: &Extra,
    ) -> Result<Vec<Classification>> {
        let generation = self.current();
        let detections = generation
            .detector
            .detections(image, extra)
            .await
            .map_err(|e| generation.detector_error(e))?;
        Ok(generation.classify(&detections))
    }

    /// Unfiltered detections from the wrapped detector
    pub async fn detections_from_camera(&self, camera: &str, extra: &Extra) -> Result<Vec<Detection>> {
        let generation = self.current();
        generation
            .detector
            .detections_from_camera(camera, extra)
            .await
            .map_err(|e| generation.detector_error(e))
    }

    /// Unfiltered detections for a caller-supplied image
    pub async fn detections(&self, image: &ImageFrame, extra: &Extra) -> Result<Vec<Detection>> {
        let generation = self.current();
        generation
            .detector
            .detections(image, extra)
            .await
            .map_err(|e| generation.detector_error(e))
    }

    /// Capture from the detector with the count attached.
    ///
    /// Detections are always requested from the detector, then narrowed down
    /// to the ones that were counted.
    pub async fn capture_all_from_camera(
        &self,
        camera: &str,
        mut options: CaptureOptions,
        extra: &Extra,
    ) -> Result<VisionCapture> {
        options.return_detections = true;

        let generation = self.current();
        let mut capture = generation
            .detector
            .capture_all_from_camera(camera, options, extra)
            .await
            .map_err(|e| generation.detector_error(e))?;

        let tally = generation.rules.count(&capture.detections);
        capture.classifications = vec![Classification::new(tally.label, COUNT_CONFIDENCE)];
        capture.detections = tally.matched;
        Ok(capture)
    }

    pub fn properties(&self) -> Properties {
        Properties {
            classification_supported: true,
            detection_supported: true,
            object_point_clouds_supported: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn build(
    config: &ClassifierConfig,
    detector: Arc<dyn DetectionSource>,
) -> Result<ClassifierGeneration> {
    config.validate()?;
    Ok(ClassifierGeneration {
        detector,
        rules: config.rules(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use summary_core_count::{ConfigError, OVERFLOW_LABEL};

    struct StaticDetector {
        name: &'static str,
        detections: Vec<Detection>,
        fail: bool,
    }

    impl StaticDetector {
        fn new(detections: Vec<Detection>) -> Arc<Self> {
            Arc::new(Self {
                name: "static",
                detections,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                name: "broken",
                detections: Vec::new(),
                fail: true,
            })
        }

        fn answer(&self) -> summary_core_interface::Result<Vec<Detection>> {
            if self.fail {
                Err(SourceError::Unavailable("camera unplugged".to_string()))
            } else {
                Ok(self.detections.clone())
            }
        }
    }

    #[async_trait]
    impl DetectionSource for StaticDetector {
        fn name(&self) -> &str {
            self.name
        }

        async fn detections_from_camera(
            &self,
            _camera: &str,
            _extra: &Extra,
        ) -> summary_core_interface::Result<Vec<Detection>> {
            self.answer()
        }

        async fn detections(
            &self,
            _image: &ImageFrame,
            _extra: &Extra,
        ) -> summary_core_interface::Result<Vec<Detection>> {
            self.answer()
        }

        async fn capture_all_from_camera(
            &self,
            _camera: &str,
            options: CaptureOptions,
            _extra: &Extra,
        ) -> summary_core_interface::Result<VisionCapture> {
            let mut capture = VisionCapture {
                image: Some(ImageFrame {
                    width: 640,
                    height: 480,
                    mime_type: "image/jpeg".to_string(),
                    data: Vec::new(),
                }),
                ..Default::default()
            };
            if options.return_detections {
                capture.detections = self.answer()?;
            }
            Ok(capture)
        }
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig {
            detector_name: "static".to_string(),
            chosen_labels: BTreeMap::from([("cat".to_string(), 0.5)]),
            count_thresholds: BTreeMap::from([
                ("low".to_string(), 2),
                ("mid".to_string(), 5),
                ("high".to_string(), 9),
            ]),
        }
    }

    fn cats() -> Vec<Detection> {
        vec![
            Detection::new("cat", 0.9),
            Detection::new("cat", 0.4),
            Detection::new("dog", 0.9),
        ]
    }

    #[tokio::test]
    async fn test_classifications_from_camera() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::new(cats())).unwrap();

        let classes = classifier
            .classifications_from_camera("cam", &Extra::new())
            .await
            .unwrap();

        assert_eq!(classes, vec![Classification::new("low", 1.0)]);
    }

    #[tokio::test]
    async fn test_classifications_from_image_overflow() {
        let detector = StaticDetector::new(vec![Detection::new("CAT", 0.99); 10]);
        let classifier = CountClassifier::new("cc", config(), detector).unwrap();

        let classes = classifier
            .classifications(&ImageFrame::default(), &Extra::new())
            .await
            .unwrap();

        assert_eq!(classes[0].label, OVERFLOW_LABEL);
    }

    #[tokio::test]
    async fn test_detections_pass_through_unfiltered() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::new(cats())).unwrap();

        let detections = classifier
            .detections_from_camera("cam", &Extra::new())
            .await
            .unwrap();

        assert_eq!(detections, cats());
    }

    #[tokio::test]
    async fn test_image_detections_pass_through_unfiltered() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::new(cats())).unwrap();

        let detections = classifier
            .detections(&ImageFrame::default(), &Extra::new())
            .await
            .unwrap();
        assert_eq!(detections, cats());

        let broken = CountClassifier::new("cc", config(), StaticDetector::failing()).unwrap();
        let err = broken
            .detections(&ImageFrame::default(), &Extra::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Detector { .. }));
    }

    #[tokio::test]
    async fn test_capture_keeps_only_counted_detections() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::new(cats())).unwrap();

        let capture = classifier
            .capture_all_from_camera("cam", CaptureOptions::default(), &Extra::new())
            .await
            .unwrap();

        assert_eq!(capture.detections, vec![Detection::new("cat", 0.9)]);
        assert_eq!(capture.classifications, vec![Classification::new("low", 1.0)]);
        assert!(capture.image.is_some());
    }

    #[tokio::test]
    async fn test_detector_failure_is_wrapped() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::failing()).unwrap();

        let err = classifier
            .classifications_from_camera("cam", &Extra::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClassifierError::Detector { ref detector, .. } if detector == "broken"
        ));
        assert!(err.to_string().contains("camera unplugged"));
    }

    #[tokio::test]
    async fn test_reconfigure_swaps_rules_and_detector() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::failing()).unwrap();

        let mut next = config();
        next.count_thresholds = BTreeMap::from([("none".to_string(), 0), ("one".to_string(), 1)]);
        classifier
            .reconfigure(next, StaticDetector::new(cats()))
            .unwrap();

        let classes = classifier
            .classifications_from_camera("cam", &Extra::new())
            .await
            .unwrap();
        assert_eq!(classes[0].label, "one");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.count_thresholds.insert("twin".to_string(), 2);

        let err = CountClassifier::new("cc", bad, StaticDetector::new(Vec::new()))
            .err()
            .unwrap();

        assert!(matches!(
            err,
            ClassifierError::Config(ConfigError::DuplicateThreshold { value: 2, .. })
        ));
    }

    #[test]
    fn test_properties() {
        let classifier = CountClassifier::new("cc", config(), StaticDetector::new(Vec::new())).unwrap();
        let props = classifier.properties();

        assert!(props.classification_supported);
        assert!(props.detection_supported);
        assert!(!props.object_point_clouds_supported);
    }
}
