use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera {device} unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("failed to decode camera frame: {0}")]
    Decode(String),
    #[error("camera is not active")]
    Inactive,
}

/// Capture settings applied when the device is acquired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Driver-side buffer depth. 1 keeps latency at a single frame.
    pub buffer_frames: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            width: 640,
            height: 480,
            fps: 30,
            buffer_frames: 1,
        }
    }
}

/// Owns the physical capture device.
///
/// A source is acquired on start and released on stop; it must not be
/// read again without a fresh `acquire`. Callers serialise access, so
/// implementations only need to be `Send`.
pub trait CameraSource: Send {
    /// Opens the device. Fails with [`CameraError::DeviceUnavailable`]
    /// when it cannot be opened.
    fn acquire(&mut self) -> Result<(), CameraError>;

    /// Next raw frame, or `None` if the read failed or the source is
    /// inactive. Never blocks indefinitely.
    fn frame(&mut self) -> Option<Frame>;

    /// Idempotent; safe to call when inactive.
    fn release(&mut self);

    fn is_active(&self) -> bool;
}
