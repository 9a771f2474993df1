pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Maximum embedding distance accepted as a positive match.
pub const DEFAULT_MATCH_TOLERANCE: f64 = 0.6;

/// Every Nth frame a stream pulls is offered to the detection queue.
pub const DEFAULT_SAMPLE_INTERVAL: usize = 3;

/// Stream pacing, ~30 frames per second.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// How long the detection worker waits for a frame before re-checking
/// the running flag.
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 1000;

pub const DEFAULT_JPEG_QUALITY: u8 = 70;

pub const DEFAULT_DETECTION_SCALE: f64 = 0.5;
pub const DEFAULT_ENROLLMENT_SCALE: f64 = 0.5;

pub const ENROLLMENT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const CRIMINAL_LABEL_PREFIX: &str = "Criminal: ";
pub const UNKNOWN_LABEL: &str = "Unknown";

pub const MULTIPART_BOUNDARY: &str = "frame";
