use std::time::SystemTime;

use crate::capture::domain::camera_source::{CameraConfig, CameraError, CameraSource};
use crate::shared::frame::Frame;

/// Packets read per `frame()` call before giving up on a decodable frame.
const MAX_PACKETS_PER_FRAME: usize = 64;

#[cfg(target_os = "linux")]
const CAPTURE_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const CAPTURE_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAPTURE_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_FORMAT: &str = "";

/// Live capture through libavdevice (ffmpeg-next).
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
pub struct FfmpegCamera {
    config: CameraConfig,
    session: Option<CaptureSession>,
    frames_read: u64,
}

struct CaptureSession {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegCamera is only touched by one thread at a time; the owner
// keeps it behind a mutex. The raw pointers inside ffmpeg types are never
// shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            session: None,
            frames_read: 0,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> CameraError {
        CameraError::DeviceUnavailable {
            device: self.config.device.clone(),
            reason: reason.to_string(),
        }
    }

    fn open(&self) -> Result<CaptureSession, CameraError> {
        ffmpeg_next::init().map_err(|e| self.unavailable(e))?;
        ffmpeg_next::device::register_all();

        let ictx = open_input(&self.config).map_err(|e| self.unavailable(e))?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| self.unavailable("no video stream"))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| self.unavailable(e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| self.unavailable(e))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| self.unavailable(e))?;

        Ok(CaptureSession {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        })
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let session = self.session.as_mut().ok_or(CameraError::Inactive)?;
        let pixels = session.read()?;
        let frame = Frame::new(
            pixels,
            session.width,
            session.height,
            self.frames_read,
            SystemTime::now(),
        );
        self.frames_read += 1;
        Ok(frame)
    }
}

impl CameraSource for FfmpegCamera {
    fn acquire(&mut self) -> Result<(), CameraError> {
        if self.session.is_some() {
            return Ok(());
        }
        let session = self.open()?;
        log::info!(
            "Camera {} opened at {}x{} ({} fps requested)",
            self.config.device,
            session.width,
            session.height,
            self.config.fps
        );
        self.session = Some(session);
        self.frames_read = 0;
        Ok(())
    }

    fn frame(&mut self) -> Option<Frame> {
        match self.read_frame() {
            Ok(frame) => Some(frame),
            Err(CameraError::Inactive) => None,
            Err(e) => {
                log::debug!("Camera read failed: {e}");
                None
            }
        }
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            log::info!(
                "Camera {} released after {} frames",
                self.config.device,
                self.frames_read
            );
        }
    }

    fn is_active(&self) -> bool {
        self.session.is_some()
    }
}

impl CaptureSession {
    fn read(&mut self) -> Result<Vec<u8>, CameraError> {
        for _ in 0..MAX_PACKETS_PER_FRAME {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                return Err(CameraError::Decode("capture stream ended".into()));
            };
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| CameraError::Decode(e.to_string()))?;

            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb)
                    .map_err(|e| CameraError::Decode(e.to_string()))?;
                return Ok(extract_rgb_pixels(&rgb, self.width, self.height));
            }
        }
        Err(CameraError::Decode(format!(
            "no frame decoded after {MAX_PACKETS_PER_FRAME} packets"
        )))
    }
}

fn capture_options(config: &CameraConfig) -> ffmpeg_next::Dictionary<'static> {
    let mut options = ffmpeg_next::Dictionary::new();
    options.set("video_size", &format!("{}x{}", config.width, config.height));
    options.set("framerate", &config.fps.to_string());
    if config.buffer_frames <= 1 {
        options.set("fflags", "nobuffer");
    }
    options
}

/// Opens the device through the platform capture format when libavdevice
/// provides one, otherwise lets libavformat probe the path.
fn open_input(
    config: &CameraConfig,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    let capture_format =
        ffmpeg_next::device::input::video().find(|format| format.name() == CAPTURE_FORMAT);

    match capture_format {
        Some(format) => {
            let ctx = ffmpeg_next::format::open_with(
                &config.device,
                &ffmpeg_next::Format::Input(format),
                capture_options(config),
            )?;
            match ctx {
                ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
                ffmpeg_next::format::context::Context::Output(_) => {
                    Err(ffmpeg_next::Error::InvalidData)
                }
            }
        }
        None => ffmpeg_next::format::input_with_dictionary(&config.device, capture_options(config)),
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping the per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
