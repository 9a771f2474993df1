use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::domain::camera_source::CameraConfig;
use crate::shared::constants::{
    DEFAULT_DETECTION_SCALE, DEFAULT_ENROLLMENT_SCALE, DEFAULT_FRAME_INTERVAL_MS,
    DEFAULT_JPEG_QUALITY, DEFAULT_MATCH_TOLERANCE, DEFAULT_QUEUE_TIMEOUT_MS,
    DEFAULT_SAMPLE_INTERVAL,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for capture, detection and streaming. Every field has a
/// default, so a config file only needs the values it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub camera: CameraConfig,
    /// Every Nth frame a stream captures is offered to detection.
    pub sample_interval: usize,
    pub frame_interval_ms: u64,
    pub queue_timeout_ms: u64,
    pub jpeg_quality: u8,
    pub match_tolerance: f64,
    /// Frames are shrunk by this factor before matching.
    pub detection_scale: f64,
    pub enrollment_scale: f64,
    pub known_faces_dir: PathBuf,
    pub criminal_faces_dir: PathBuf,
    /// Drop the last annotated frame and detections when recognition stops.
    pub clear_on_stop: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            queue_timeout_ms: DEFAULT_QUEUE_TIMEOUT_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            detection_scale: DEFAULT_DETECTION_SCALE,
            enrollment_scale: DEFAULT_ENROLLMENT_SCALE,
            known_faces_dir: PathBuf::from("images"),
            criminal_faces_dir: PathBuf::from("imageB"),
            clear_on_stop: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval == 0 {
            return Err(ConfigError::Invalid("sample_interval must be at least 1".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera resolution {}x{} is empty",
                self.camera.width, self.camera.height
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality {} outside 1..=100",
                self.jpeg_quality
            )));
        }
        for (name, scale) in [
            ("detection_scale", self.detection_scale),
            ("enrollment_scale", self.enrollment_scale),
        ] {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(ConfigError::Invalid(format!("{name} {scale} outside (0, 1]")));
            }
        }
        if self.match_tolerance.is_nan() || self.match_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "match_tolerance {} must be non-negative",
                self.match_tolerance
            )));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
}
