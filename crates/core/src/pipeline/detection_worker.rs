use std::sync::Arc;
use std::thread::JoinHandle;

use crate::pipeline::overlay;
use crate::pipeline::pipeline_context::PipelineContext;
use crate::recognition::domain::face_detection::{DetectionSnapshot, FaceDetection};
use crate::recognition::domain::face_matcher::MatcherError;
use crate::shared::frame::Frame;

/// Result of running the matcher over one frame.
#[derive(Debug)]
pub enum FrameAnalysis {
    Detected(Vec<FaceDetection>),
    /// The matcher failed; the frame counts as having no faces.
    MatcherFailed(MatcherError),
}

impl FrameAnalysis {
    pub fn faces(&self) -> &[FaceDetection] {
        match self {
            FrameAnalysis::Detected(faces) => faces,
            FrameAnalysis::MatcherFailed(_) => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub frames_processed: usize,
    pub faces_detected: usize,
    pub matcher_failures: usize,
}

/// Background consumer of the detection queue.
///
/// Runs while the running flag is set, matching each sampled frame and
/// publishing the annotated result. A failing matcher never ends the loop.
pub struct DetectionWorker {
    ctx: Arc<PipelineContext>,
}

impl DetectionWorker {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<WorkerStats>> {
        std::thread::Builder::new()
            .name("detection-worker".into())
            .spawn(move || self.run())
    }

    pub fn run(&self) -> WorkerStats {
        let timeout = self.ctx.config().queue_timeout();
        let mut stats = WorkerStats::default();
        log::info!("Detection worker started");

        while self.ctx.is_running() {
            let Some(frame) = self.ctx.queue().dequeue(timeout) else {
                continue;
            };
            let analysis = self.process(frame);
            stats.frames_processed += 1;
            match &analysis {
                FrameAnalysis::Detected(faces) => stats.faces_detected += faces.len(),
                FrameAnalysis::MatcherFailed(_) => stats.matcher_failures += 1,
            }
        }

        log::info!(
            "Detection worker stopped: {} frames, {} faces, {} matcher failures",
            stats.frames_processed,
            stats.faces_detected,
            stats.matcher_failures
        );
        stats
    }

    /// Analyses one frame and publishes the annotated copy together with
    /// its detections.
    pub fn process(&self, frame: Frame) -> FrameAnalysis {
        let analysis = self.analyze(&frame);
        let faces = analysis.faces().to_vec();
        let annotated = overlay::annotate(&frame, &faces);
        self.ctx
            .state()
            .publish(annotated, DetectionSnapshot::new(faces, frame.captured_at()));
        analysis
    }

    pub fn analyze(&self, frame: &Frame) -> FrameAnalysis {
        let config = self.ctx.config();
        let scale = config.detection_scale;
        let small = frame.scaled(scale);

        let encodings = match self.ctx.matcher().encodings(&small) {
            Ok(encodings) => encodings,
            Err(e) => {
                log::warn!("Face matching failed on frame {}: {e}", frame.index());
                return FrameAnalysis::MatcherFailed(e);
            }
        };

        let known = self.ctx.known_faces();
        let faces: Vec<FaceDetection> = encodings
            .into_iter()
            .map(|(bbox, embedding)| {
                let identity = known.identify(&embedding, config.match_tolerance);
                FaceDetection {
                    bbox: bbox
                        .unscaled(scale)
                        .clamped(frame.width(), frame.height()),
                    label: identity.label,
                    category: identity.category,
                }
            })
            .collect();

        if !faces.is_empty() {
            log::debug!(
                "Frame {}: {}",
                frame.index(),
                faces
                    .iter()
                    .map(|f| format!("{} ({})", f.label, f.category))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        FrameAnalysis::Detected(faces)
    }
}
