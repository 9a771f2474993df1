//! Test doubles shared by the pipeline and enrollment tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::capture::domain::camera_source::{CameraError, CameraSource};
use crate::pipeline::stream_generator::{ChunkSink, SinkClosed};
use crate::recognition::domain::face_matcher::{Embedding, FaceMatcher, MatcherError};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];

/// Frame whose left and right halves are filled with the given colours.
pub fn split_frame(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..height {
        for x in 0..width {
            data.extend_from_slice(if x < width / 2 { &left } else { &right });
        }
    }
    Frame::new(data, width, height, 0, SystemTime::now())
}

pub fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> Frame {
    split_frame(width, height, color, color)
}

/// Call counters observable after the camera has moved into a context.
#[derive(Clone, Default)]
pub struct CameraProbe {
    pub acquires: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl CameraProbe {
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Camera that replays a script, then repeats its fallback frame.
///
/// A `None` entry in the script simulates a failed read.
pub struct StubCamera {
    script: VecDeque<Option<Frame>>,
    fallback: Option<Frame>,
    fail_acquire: bool,
    active: bool,
    next_index: u64,
    probe: CameraProbe,
}

impl StubCamera {
    pub fn repeating(frame: Frame) -> Self {
        Self::scripted(Vec::new(), Some(frame))
    }

    pub fn scripted(script: Vec<Option<Frame>>, fallback: Option<Frame>) -> Self {
        Self {
            script: script.into(),
            fallback,
            fail_acquire: false,
            active: false,
            next_index: 0,
            probe: CameraProbe::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_acquire: true,
            ..Self::scripted(Vec::new(), None)
        }
    }

    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

impl CameraSource for StubCamera {
    fn acquire(&mut self) -> Result<(), CameraError> {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire {
            return Err(CameraError::DeviceUnavailable {
                device: "stub".into(),
                reason: "unplugged".into(),
            });
        }
        self.active = true;
        Ok(())
    }

    fn frame(&mut self) -> Option<Frame> {
        if !self.active {
            return None;
        }
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())?;
        let frame = Frame::new(
            next.data().to_vec(),
            next.width(),
            next.height(),
            self.next_index,
            SystemTime::now(),
        );
        self.next_index += 1;
        Some(frame)
    }

    fn release(&mut self) {
        if self.active {
            self.probe.releases.fetch_add(1, Ordering::SeqCst);
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Treats each non-black half of a frame as a face whose embedding is the
/// mean colour of that half, scaled to `[0, 1]`.
#[derive(Default)]
pub struct ColorMatcher {
    pub calls: AtomicUsize,
}

impl ColorMatcher {
    fn halves(frame: &Frame) -> [BoundingBox; 2] {
        let (w, h) = (frame.width() as i32, frame.height() as i32);
        [
            BoundingBox::new(0, w / 2, h, 0),
            BoundingBox::new(0, w, h, w / 2),
        ]
    }
}

impl FaceMatcher for ColorMatcher {
    fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, MatcherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut faces = Vec::new();
        for half in Self::halves(frame) {
            let mean = self.encode(frame, &half)?;
            if mean.iter().sum::<f32>() > 0.1 {
                faces.push(half);
            }
        }
        Ok(faces)
    }

    fn encode(&self, frame: &Frame, face: &BoundingBox) -> Result<Embedding, MatcherError> {
        let view = frame.as_ndarray();
        let mut sum = [0f64; 3];
        let mut count = 0f64;
        for y in face.top.max(0)..face.bottom.min(frame.height() as i32) {
            for x in face.left.max(0)..face.right.min(frame.width() as i32) {
                for (c, total) in sum.iter_mut().enumerate() {
                    *total += view[[y as usize, x as usize, c]] as f64;
                }
                count += 1.0;
            }
        }
        if count == 0.0 {
            return Err(MatcherError::InvalidInput("empty face box".into()));
        }
        Ok(sum.iter().map(|s| (s / count / 255.0) as f32).collect())
    }
}

/// Matcher whose every call fails.
pub struct FailingMatcher;

impl FaceMatcher for FailingMatcher {
    fn locate(&self, _frame: &Frame) -> Result<Vec<BoundingBox>, MatcherError> {
        Err(MatcherError::Inference("model exploded".into()))
    }

    fn encode(&self, _frame: &Frame, _face: &BoundingBox) -> Result<Embedding, MatcherError> {
        Err(MatcherError::Inference("model exploded".into()))
    }
}

/// Collects emitted chunks; reports the client gone once `limit` is reached.
#[derive(Default)]
pub struct CollectingSink {
    pub chunks: Vec<Vec<u8>>,
    limit: Option<usize>,
}

impl CollectingSink {
    pub fn closing_after(limit: usize) -> Self {
        Self {
            chunks: Vec::new(),
            limit: Some(limit),
        }
    }
}

impl ChunkSink for CollectingSink {
    fn emit(&mut self, chunk: Vec<u8>) -> Result<(), SinkClosed> {
        if self.limit.is_some_and(|limit| self.chunks.len() >= limit) {
            return Err(SinkClosed);
        }
        self.chunks.push(chunk);
        Ok(())
    }
}
