use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Fixed-length identity vector produced by a face encoder.
pub type Embedding = Vec<f32>;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("face model unavailable: {0}")]
    Model(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Domain interface for locating and encoding faces.
///
/// Boxes returned by `locate` are in the coordinate space of the frame
/// that was passed in. Implementations are shared between the enrollment
/// path and the detection worker, hence `&self` and `Sync`.
pub trait FaceMatcher: Send + Sync {
    fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, MatcherError>;

    fn encode(&self, frame: &Frame, face: &BoundingBox) -> Result<Embedding, MatcherError>;

    /// Locates every face and encodes each one, in detection order.
    fn encodings(&self, frame: &Frame) -> Result<Vec<(BoundingBox, Embedding)>, MatcherError> {
        self.locate(frame)?
            .into_iter()
            .map(|face| self.encode(frame, &face).map(|embedding| (face, embedding)))
            .collect()
    }
}
