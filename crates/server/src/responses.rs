use serde::Serialize;

use facewatch_core::pipeline::lifecycle_controller::{LifecycleError, StartOutcome, StopOutcome};
use facewatch_core::recognition::domain::face_detection::{DetectionSnapshot, FaceCategory};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn from_start(result: &Result<StartOutcome, LifecycleError>) -> Self {
        match result {
            Ok(StartOutcome::Started) => {
                Self::new("started", "Face recognition started successfully!")
            }
            Ok(StartOutcome::AlreadyRunning) => {
                Self::new("already_running", "Recognition is already running!")
            }
            Err(_) => Self::new("error", "Failed to start camera!"),
        }
    }

    pub fn from_stop(outcome: StopOutcome) -> Self {
        match outcome {
            StopOutcome::Stopped => Self::new("stopped", "Face recognition stopped!"),
            StopOutcome::AlreadyStopped => {
                Self::new("already_stopped", "Recognition is not running!")
            }
        }
    }

    pub fn alive() -> Self {
        Self::new("success", "Server is working!")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaceEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FaceCategory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaceDataResponse {
    pub faces: Vec<FaceEntry>,
}

impl From<&DetectionSnapshot> for FaceDataResponse {
    fn from(snapshot: &DetectionSnapshot) -> Self {
        Self {
            faces: snapshot
                .faces
                .iter()
                .map(|face| FaceEntry {
                    name: face.label.clone(),
                    kind: face.category,
                })
                .collect(),
        }
    }
}
