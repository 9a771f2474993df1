use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::pipeline::detection_queue::EnqueueOutcome;
use crate::pipeline::pipeline_context::PipelineContext;
use crate::shared::constants::MULTIPART_BOUNDARY;
use crate::shared::frame::Frame;

/// The receiving side of a stream went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination for encoded multipart chunks, one per emitted frame.
pub trait ChunkSink {
    fn emit(&mut self, chunk: Vec<u8>) -> Result<(), SinkClosed>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    Stopped,
    ClientDisconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames_emitted: usize,
    pub frames_captured: usize,
    pub frames_sampled: usize,
    pub frames_queued: usize,
    pub blank_frames: usize,
    pub end: StreamEnd,
}

/// Per-client MJPEG producer.
///
/// Pulls frames from the shared camera, offers every Nth captured frame to
/// the detection queue, and emits the latest annotated snapshot (or the raw
/// frame when there is none) at a fixed pace. A failed camera read is
/// replaced by a blank frame so the stream keeps flowing.
pub struct StreamGenerator {
    ctx: Arc<PipelineContext>,
    captured: usize,
    blank_chunk: Option<Vec<u8>>,
}

impl StreamGenerator {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            ctx,
            captured: 0,
            blank_chunk: None,
        }
    }

    /// Runs until the running flag clears or the sink closes.
    pub fn run(&mut self, sink: &mut dyn ChunkSink) -> StreamSummary {
        let pace = self.ctx.config().frame_interval();
        let mut summary = StreamSummary {
            frames_emitted: 0,
            frames_captured: 0,
            frames_sampled: 0,
            frames_queued: 0,
            blank_frames: 0,
            end: StreamEnd::Stopped,
        };
        log::info!("Stream client connected");

        while self.ctx.is_running() {
            if let Some(chunk) = self.next_chunk(&mut summary) {
                if sink.emit(chunk).is_err() {
                    summary.end = StreamEnd::ClientDisconnected;
                    break;
                }
                summary.frames_emitted += 1;
            }
            std::thread::sleep(pace);
        }

        log::info!(
            "Stream client {} after {} frames",
            match summary.end {
                StreamEnd::Stopped => "stopped",
                StreamEnd::ClientDisconnected => "disconnected",
            },
            summary.frames_emitted
        );
        summary
    }

    fn next_chunk(&mut self, summary: &mut StreamSummary) -> Option<Vec<u8>> {
        let Some(raw) = self.ctx.read_frame() else {
            summary.blank_frames += 1;
            return self.blank_chunk();
        };

        if self.captured % self.ctx.config().sample_interval.max(1) == 0 {
            summary.frames_sampled += 1;
            if self.ctx.queue().try_enqueue(raw.clone()) == EnqueueOutcome::Queued {
                summary.frames_queued += 1;
            }
        }
        self.captured += 1;
        summary.frames_captured += 1;

        let quality = self.ctx.config().jpeg_quality;
        let encoded = match self.ctx.state().load() {
            Some(snapshot) => encode_part(&snapshot.frame, quality),
            None => encode_part(&raw, quality),
        };
        match encoded {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                log::warn!("Failed to encode frame {}: {e}", raw.index());
                None
            }
        }
    }

    fn blank_chunk(&mut self) -> Option<Vec<u8>> {
        if self.blank_chunk.is_none() {
            let camera = &self.ctx.config().camera;
            let blank = Frame::blank(camera.width, camera.height);
            match encode_part(&blank, self.ctx.config().jpeg_quality) {
                Ok(chunk) => self.blank_chunk = Some(chunk),
                Err(e) => log::warn!("Failed to encode blank frame: {e}"),
            }
        }
        self.blank_chunk.clone()
    }
}

pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode(
        frame.data(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// One `multipart/x-mixed-replace` part carrying a JPEG of `frame`.
pub fn encode_part(frame: &Frame, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let jpeg = encode_jpeg(frame, quality)?;
    let header = format!("--{MULTIPART_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(&jpeg);
    part.extend_from_slice(b"\r\n");
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera_source::CameraConfig;
    use crate::pipeline::pipeline_config::PipelineConfig;
    use crate::recognition::domain::face_detection::DetectionSnapshot;
    use crate::testing::{solid_frame, CollectingSink, ColorMatcher, StubCamera, BLUE, RED};
    use std::time::Duration;

    const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

    // --- Helpers ---

    fn config() -> PipelineConfig {
        PipelineConfig {
            camera: CameraConfig {
                width: 32,
                height: 24,
                ..CameraConfig::default()
            },
            frame_interval_ms: 1,
            ..PipelineConfig::default()
        }
    }

    fn running_context(camera: StubCamera) -> Arc<PipelineContext> {
        let ctx = Arc::new(PipelineContext::new(
            config(),
            Box::new(camera),
            Arc::new(ColorMatcher::default()),
        ));
        ctx.camera().unwrap().acquire().unwrap();
        ctx.state().set_running(true);
        ctx
    }

    fn decode_part(part: &[u8]) -> image::RgbImage {
        assert!(part.starts_with(PART_HEADER));
        assert!(part.ends_with(b"\r\n"));
        let jpeg = &part[PART_HEADER.len()..part.len() - 2];
        image::load_from_memory(jpeg).unwrap().to_rgb8()
    }

    /// Clears the running flag once `after` chunks have been accepted.
    struct StopAfter {
        ctx: Arc<PipelineContext>,
        after: usize,
        seen: usize,
    }

    impl ChunkSink for StopAfter {
        fn emit(&mut self, _chunk: Vec<u8>) -> Result<(), SinkClosed> {
            self.seen += 1;
            if self.seen >= self.after {
                self.ctx.state().set_running(false);
            }
            Ok(())
        }
    }

    // --- Tests ---

    #[test]
    fn test_part_has_multipart_framing() {
        let part = encode_part(&solid_frame(16, 8, RED), 70).unwrap();
        let image = decode_part(&part);
        assert_eq!(image.dimensions(), (16, 8));
    }

    #[test]
    fn test_every_third_captured_frame_is_offered() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        let mut sink = CollectingSink::closing_after(7);

        let summary = StreamGenerator::new(Arc::clone(&ctx)).run(&mut sink);

        // The 8th capture is encoded before the sink reports closed.
        assert_eq!(summary.frames_emitted, 7);
        assert_eq!(summary.frames_captured, 8);
        // Captures 0, 3 and 6 are offered; only the first finds the slot free.
        assert_eq!(summary.frames_sampled, 3);
        assert_eq!(summary.frames_queued, 1);
        assert_eq!(summary.end, StreamEnd::ClientDisconnected);

        let queued = ctx.queue().dequeue(Duration::from_millis(10)).unwrap();
        assert_eq!(queued.index(), 0);
    }

    #[test]
    fn test_failed_reads_emit_blank_frames_without_sampling() {
        let ctx = running_context(StubCamera::scripted(
            vec![None, None, None, None],
            Some(solid_frame(16, 16, RED)),
        ));
        let mut sink = CollectingSink::closing_after(3);

        let summary = StreamGenerator::new(Arc::clone(&ctx)).run(&mut sink);

        // The fourth blank is produced before the sink reports closed.
        assert_eq!(summary.blank_frames, 4);
        assert_eq!(summary.frames_captured, 0);
        assert_eq!(summary.frames_sampled, 0);
        let image = decode_part(&sink.chunks[0]);
        assert_eq!(image.dimensions(), (32, 24));
        assert!(image.pixels().all(|p| p.0.iter().all(|&c| c < 16)));
    }

    #[test]
    fn test_displays_published_snapshot_over_raw_frame() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        ctx.state()
            .publish(solid_frame(32, 24, BLUE), DetectionSnapshot::empty());
        let mut sink = CollectingSink::closing_after(1);

        StreamGenerator::new(Arc::clone(&ctx)).run(&mut sink);

        let center = *decode_part(&sink.chunks[0]).get_pixel(16, 12);
        assert!(center.0[2] > 200 && center.0[0] < 60, "got {center:?}");
    }

    #[test]
    fn test_displays_raw_frame_without_snapshot() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        let mut sink = CollectingSink::closing_after(1);

        StreamGenerator::new(Arc::clone(&ctx)).run(&mut sink);

        let center = *decode_part(&sink.chunks[0]).get_pixel(16, 12);
        assert!(center.0[0] > 200 && center.0[2] < 60, "got {center:?}");
    }

    #[test]
    fn test_stops_when_running_flag_clears() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        let mut sink = StopAfter {
            ctx: Arc::clone(&ctx),
            after: 3,
            seen: 0,
        };

        let summary = StreamGenerator::new(Arc::clone(&ctx)).run(&mut sink);

        assert_eq!(summary.end, StreamEnd::Stopped);
        assert_eq!(summary.frames_emitted, 3);
    }

    #[test]
    fn test_not_running_ends_immediately() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        ctx.state().set_running(false);
        let mut sink = CollectingSink::default();

        let summary = StreamGenerator::new(ctx).run(&mut sink);

        assert_eq!(summary.end, StreamEnd::Stopped);
        assert!(sink.chunks.is_empty());
    }

    #[test]
    fn test_each_client_counts_its_own_frames() {
        let ctx = running_context(StubCamera::repeating(solid_frame(32, 24, RED)));
        let mut first = CollectingSink::closing_after(2);
        let mut second = CollectingSink::closing_after(2);

        let a = StreamGenerator::new(Arc::clone(&ctx)).run(&mut first);
        let b = StreamGenerator::new(Arc::clone(&ctx)).run(&mut second);

        // Three captures each: the first of every client is sampled.
        assert_eq!(a.frames_sampled, 1);
        assert_eq!(b.frames_sampled, 1);
        assert_eq!(ctx.queue().len(), 1);
    }
}
