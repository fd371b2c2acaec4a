//! Vision Summary Core Interface: the Detection Source capability
//!
//! Counting models never run detection themselves. They consume a detector
//! through the [`DetectionSource`] trait: "given a camera, return a list of
//! labeled, scored detections or fail". Production hosts plug in their own
//! vision service; the root crate ships a file-backed replay source and the
//! tests use scripted in-memory ones.
//!
//! # Cancellation
//!
//! Callers cancel a query by dropping its future (for example from a
//! `tokio::select!` against a cancellation token). Implementations must not
//! rely on a query always running to completion.
//!
//! # Example
//!
//! ```rust,no_run
//! use summary_core_interface::{DetectionSource, Extra};
//!
//! async fn people_in_view<S: DetectionSource>(source: &S) -> usize {
//!     match source.detections_from_camera("lobby", &Extra::new()).await {
//!         Ok(detections) => detections.iter().filter(|d| d.label == "person").count(),
//!         Err(_) => 0,
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use summary_core_count::{BoundingBox, Detection};

/// Free-form per-request parameters forwarded to the detector untouched
pub type Extra = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    #[error("camera not found: {0}")]
    CameraNotFound(String),

    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// An encoded image handed to a detector directly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// A single label with the confidence a model assigns to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Which parts of a capture the caller wants back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    #[serde(default)]
    pub return_image: bool,
    #[serde(default)]
    pub return_detections: bool,
    #[serde(default)]
    pub return_classifications: bool,
}

/// Everything a detector produced from one camera frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionCapture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageFrame>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
}

/// What a vision model can answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    pub classification_supported: bool,
    pub detection_supported: bool,
    pub object_point_clouds_supported: bool,
}

/// The external detector a counting model consumes.
///
/// Implementations must be `Send + Sync + 'static` so a single detector can
/// be shared between a background poller and on-demand callers.
#[async_trait]
pub trait DetectionSource: Send + Sync + 'static {
    /// Name the detector is registered under
    fn name(&self) -> &str;

    /// Detect objects in the current frame of `camera`
    async fn detections_from_camera(&self, camera: &str, extra: &Extra) -> Result<Vec<Detection>>;

    /// Detect objects in a caller-supplied image
    async fn detections(&self, _image: &ImageFrame, _extra: &Extra) -> Result<Vec<Detection>> {
        Err(SourceError::Unimplemented("detections from image"))
    }

    /// Capture a frame and everything the detector can say about it.
    ///
    /// The default only fills in detections, and only when asked to.
    async fn capture_all_from_camera(
        &self,
        camera: &str,
        options: CaptureOptions,
        extra: &Extra,
    ) -> Result<VisionCapture> {
        let mut capture = VisionCapture::default();
        if options.return_detections {
            capture.detections = self.detections_from_camera(camera, extra).await?;
        }
        Ok(capture)
    }

    fn properties(&self) -> Properties {
        Properties {
            detection_supported: true,
            ..Default::default()
        }
    }
}
