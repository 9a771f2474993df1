//! Face matcher backed by two ONNX Runtime sessions: a YOLO face detector
//! for `locate` and an ArcFace model for `encode`.

use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use crate::recognition::domain::face_matcher::{Embedding, FaceMatcher, MatcherError};
use crate::recognition::infrastructure::math::{self, ScoredBox};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Fallback detector input resolution when the model doesn't specify it.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

const EMBED_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxFaceMatcher {
    detector: Mutex<ort::session::Session>,
    embedder: Mutex<ort::session::Session>,
    input_size: u32,
    confidence: f64,
}

impl OnnxFaceMatcher {
    pub fn new(
        detector_model: &Path,
        embedding_model: &Path,
        confidence: f64,
    ) -> Result<Self, MatcherError> {
        let detector = load_session(detector_model)?;
        let embedder = load_session(embedding_model)?;
        let input_size = model_input_size(&detector).unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!(
            "Loaded face models ({} / {}), detector input {input_size}px",
            detector_model.display(),
            embedding_model.display()
        );
        Ok(Self {
            detector: Mutex::new(detector),
            embedder: Mutex::new(embedder),
            input_size,
            confidence,
        })
    }
}

impl FaceMatcher for OnnxFaceMatcher {
    fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, MatcherError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(MatcherError::InvalidInput("empty frame".into()));
        }
        let (tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);
        let input = ort::value::Tensor::from_array(tensor).map_err(inference_err)?;

        let mut session = self
            .detector
            .lock()
            .map_err(|e| MatcherError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![input]).map_err(inference_err)?;
        require_outputs(outputs.len(), "detector")?;
        let output = outputs[0].try_extract_array::<f32>().map_err(inference_err)?;
        let shape = output.shape().to_vec();
        let data = output
            .as_slice()
            .ok_or_else(|| MatcherError::Inference("non-contiguous detector output".into()))?;

        let candidates = parse_detections(data, &shape, self.confidence, scale, pad_x, pad_y)?;
        Ok(math::nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| {
                BoundingBox::from_corners(c.bbox[0], c.bbox[1], c.bbox[2], c.bbox[3])
                    .clamped(frame.width(), frame.height())
            })
            .filter(|b| !b.is_empty())
            .collect())
    }

    fn encode(&self, frame: &Frame, face: &BoundingBox) -> Result<Embedding, MatcherError> {
        let face = face.clamped(frame.width(), frame.height());
        if face.is_empty() {
            return Err(MatcherError::InvalidInput(format!(
                "face box {face:?} lies outside the frame"
            )));
        }
        let tensor = preprocess_crop(frame, &face);
        let input = ort::value::Tensor::from_array(tensor).map_err(inference_err)?;

        let mut session = self
            .embedder
            .lock()
            .map_err(|e| MatcherError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![input]).map_err(inference_err)?;
        require_outputs(outputs.len(), "embedder")?;
        let output = outputs[0].try_extract_array::<f32>().map_err(inference_err)?;
        let mut embedding: Embedding = output.iter().copied().collect();
        if embedding.is_empty() {
            return Err(MatcherError::Inference("empty embedding".into()));
        }
        math::l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

fn load_session(path: &Path) -> Result<ort::session::Session, MatcherError> {
    ort::session::Session::builder()
        .map_err(model_err)?
        .commit_from_file(path)
        .map_err(|e| MatcherError::Model(format!("{}: {e}", path.display())))
}

/// Square input side from an NCHW model signature, if static.
fn model_input_size(session: &ort::session::Session) -> Option<u32> {
    session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            if shape.len() >= 4 && shape[2] > 0 {
                return Some(shape[2] as u32);
            }
        }
        None
    })
}

/// Both models are read through their first output.
fn require_outputs(count: usize, model: &str) -> Result<(), MatcherError> {
    if count == 0 {
        return Err(MatcherError::Inference(format!("{model} produced no outputs")));
    }
    Ok(())
}

fn model_err(e: impl Display) -> MatcherError {
    MatcherError::Model(e.to_string())
}

fn inference_err(e: impl Display) -> MatcherError {
    MatcherError::Inference(e.to_string())
}

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Decodes `[1, features, detections]` or `[1, detections, features]`
/// output rows of `[cx, cy, w, h, conf, ...]` into frame-space boxes.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
) -> Result<Vec<ScoredBox>, MatcherError> {
    if shape.len() != 3 {
        return Err(MatcherError::Inference(format!(
            "unexpected detector output shape: {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(MatcherError::Inference(format!(
            "detector output too small for shape {shape:?}"
        )));
    }

    let at = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let unpad_x = |v: f64| (v - pad_x as f64) / scale;
    let unpad_y = |v: f64| (v - pad_y as f64) / scale;

    Ok((0..num_dets)
        .filter(|&i| at(i, 4) >= confidence)
        .map(|i| {
            let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
            ScoredBox {
                bbox: [
                    unpad_x(cx - w / 2.0),
                    unpad_y(cy - h / 2.0),
                    unpad_x(cx + w / 2.0),
                    unpad_y(cy + h / 2.0),
                ],
                score: at(i, 4),
            }
        })
        .collect())
}

/// Samples the face crop to 112x112, normalised, NCHW.
fn preprocess_crop(frame: &Frame, face: &BoundingBox) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let crop_w = face.width() as f64;
    let crop_h = face.height() as f64;
    let max_x = frame.width() as usize - 1;
    let max_y = frame.height() as usize - 1;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, EMBED_SIZE, EMBED_SIZE));
    for y in 0..EMBED_SIZE {
        let src_y = face.top as usize
            + ((y as f64 + 0.5) * crop_h / EMBED_SIZE as f64) as usize;
        let src_y = src_y.min(max_y);
        for x in 0..EMBED_SIZE {
            let src_x = face.left as usize
                + ((x as f64 + 0.5) * crop_w / EMBED_SIZE as f64) as usize;
            let src_x = src_x.min(max_x);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}
