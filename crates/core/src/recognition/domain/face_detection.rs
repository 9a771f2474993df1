use std::time::SystemTime;

use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;

/// Category a recognised face falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceCategory {
    Known,
    Criminal,
    Unknown,
}

impl std::fmt::Display for FaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaceCategory::Known => write!(f, "known"),
            FaceCategory::Criminal => write!(f, "criminal"),
            FaceCategory::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub label: String,
    pub category: FaceCategory,
}

/// Ordered detections computed from a single captured frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSnapshot {
    pub faces: Vec<FaceDetection>,
    pub captured_at: Option<SystemTime>,
}

impl DetectionSnapshot {
    pub fn new(faces: Vec<FaceDetection>, captured_at: SystemTime) -> Self {
        Self {
            faces,
            captured_at: Some(captured_at),
        }
    }

    pub fn empty() -> Self {
        Self {
            faces: Vec::new(),
            captured_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
