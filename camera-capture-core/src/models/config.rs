use serde::{Deserialize, Serialize};

use super::camera_models::{CameraSelector, RequestTemplate, Size};
use super::error::CaptureError;

/// Parameters of one camera capture instance.
///
/// Immutable once handed to `CameraCapture::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraCaptureConfig {
    /// Device to open, or `Auto` to let the provider pick the first available one.
    pub camera: CameraSelector,

    /// Frame size reported by `get_size`. Never renegotiated.
    pub size: Size,

    /// Template of the repeating request (default: `Record`).
    pub template: RequestTemplate,

    /// Name of the dedicated callback worker thread (default: "camera").
    pub worker_name: String,
}

impl CameraCaptureConfig {
    pub fn new(camera: CameraSelector, size: Size) -> Self {
        Self {
            camera,
            size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.size.is_empty() {
            return Err(format!("invalid capture size: {}", self.size));
        }
        if let CameraSelector::Explicit(id) = &self.camera {
            if id.trim().is_empty() {
                return Err("explicit camera id must not be empty".into());
            }
        }
        if self.worker_name.is_empty() {
            return Err("worker name must not be empty".into());
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::Configuration(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(CaptureError::Configuration)?;
        Ok(config)
    }
}

impl Default for CameraCaptureConfig {
    fn default() -> Self {
        Self {
            camera: CameraSelector::Auto,
            size: Size::new(1920, 1080),
            template: RequestTemplate::Record,
            worker_name: "camera".into(),
        }
    }
}
