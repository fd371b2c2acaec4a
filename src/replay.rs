/*!
 * Replay detector: serves recorded detections from a JSON file
 *
 * File format:
 *
 * ```json
 * {
 *   "cameras": {
 *     "lobby": [
 *       [{"label": "person", "score": 0.92}, {"label": "chair", "score": 0.8}],
 *       {"error": "camera frame dropped"},
 *       []
 *     ]
 *   }
 * }
 * ```
 *
 * Every query for a camera returns its next frame and wraps around at the
 * end. Error frames make the query fail, which is how the restart policy of
 * the count sensor can be exercised without real hardware.
 */

use crate::config::{DetectorConfig, DetectorKind};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use summary_core_interface::{Detection, DetectionSource, Extra, SourceError};
use tracing::debug;

/// Detectors by name, as handed to the module host
pub type Dependencies = HashMap<String, Arc<dyn DetectionSource>>;

/// One recorded detector answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayFrame {
    /// The detector returned these detections
    Detections(Vec<Detection>),
    /// The detector failed with this message
    Failure { error: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReplayFile {
    #[serde(default)]
    cameras: HashMap<String, Vec<ReplayFrame>>,
}

/// File-backed [`DetectionSource`]
#[derive(Debug)]
pub struct ReplaySource {
    name: String,
    cameras: HashMap<String, Vec<ReplayFrame>>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl ReplaySource {
    pub fn new(name: impl Into<String>, cameras: HashMap<String, Vec<ReplayFrame>>) -> Self {
        Self {
            name: name.into(),
            cameras,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self> {
        let file: ReplayFile = serde_json::from_str(json)?;
        Ok(Self::new(name, file.cameras))
    }

    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(name, &contents)
    }

    /// Advance the camera's cursor and return the frame it pointed at
    fn next_frame(&self, camera: &str) -> Option<ReplayFrame> {
        let frames = self.cameras.get(camera)?;
        if frames.is_empty() {
            return Some(ReplayFrame::Detections(Vec::new()));
        }

        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(camera.to_string()).or_insert(0);
        let frame = frames[*cursor % frames.len()].clone();
        *cursor = (*cursor + 1) % frames.len();
        Some(frame)
    }
}

#[async_trait]
impl DetectionSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detections_from_camera(
        &self,
        camera: &str,
        _extra: &Extra,
    ) -> summary_core_interface::Result<Vec<Detection>> {
        match self.next_frame(camera) {
            Some(ReplayFrame::Detections(detections)) => {
                debug!(detector = %self.name, camera, detections = detections.len(), "replayed frame");
                Ok(detections)
            }
            Some(ReplayFrame::Failure { error }) => Err(SourceError::Unavailable(error)),
            None => Err(SourceError::CameraNotFound(camera.to_string())),
        }
    }
}

/// Build every configured detector, resolving paths against `base_dir`
pub fn load_detectors(configs: &[DetectorConfig], base_dir: &Path) -> Result<Dependencies> {
    let mut detectors = Dependencies::new();
    for config in configs {
        let source: Arc<dyn DetectionSource> = match config.kind {
            DetectorKind::Replay => Arc::new(ReplaySource::from_file(
                config.name.clone(),
                &base_dir.join(&config.path),
            )?),
        };
        detectors.insert(config.name.clone(), source);
    }
    Ok(detectors)
}
