mod page;
mod responses;
mod routes;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::Parser;

use facewatch_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use facewatch_core::pipeline::lifecycle_controller::LifecycleController;
use facewatch_core::pipeline::pipeline_config::PipelineConfig;
use facewatch_core::pipeline::pipeline_context::PipelineContext;
use facewatch_core::recognition::infrastructure::onnx_face_matcher::{
    OnnxFaceMatcher, DEFAULT_CONFIDENCE,
};
use facewatch_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facewatch_core::shared::model_resolver::ModelStore;

/// Live camera stream with face recognition against enrolled faces.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// JSON pipeline configuration; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "5000")]
    port: u16,

    /// Capture device, e.g. /dev/video0.
    #[arg(long)]
    device: Option<String>,

    /// Directory of known face images (filename = label).
    #[arg(long)]
    known_dir: Option<PathBuf>,

    /// Directory of criminal face images (filename = label).
    #[arg(long)]
    criminal_dir: Option<PathBuf>,

    /// Maximum embedding distance accepted as a match.
    #[arg(long)]
    tolerance: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Directory holding bundled model files, checked before the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = load_config(&cli)?;

    let store = ModelStore::user_cache(cli.models_dir.clone())?;
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let detector_model = store.resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let embedding_model = store.resolve(
        EMBEDDING_MODEL_NAME,
        EMBEDDING_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;

    let matcher = OnnxFaceMatcher::new(&detector_model, &embedding_model, cli.confidence)?;
    let camera = FfmpegCamera::new(config.camera.clone());
    let ctx = PipelineContext::new(config, Box::new(camera), Arc::new(matcher));
    let controller = web::Data::new(LifecycleController::new(Arc::new(ctx)));

    let app_controller = controller.clone();
    log::info!("Listening on http://{}:{}", cli.host, cli.port);
    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(app_controller.clone())
                .configure(routes::configure)
        })
        .bind((cli.host.as_str(), cli.port))?
        .run()
        .await
    })?;

    controller.stop();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(device) = &cli.device {
        config.camera.device = device.clone();
    }
    if let Some(dir) = &cli.known_dir {
        config.known_faces_dir = dir.clone();
    }
    if let Some(dir) = &cli.criminal_dir {
        config.criminal_faces_dir = dir.clone();
    }
    if let Some(tolerance) = cli.tolerance {
        config.match_tolerance = tolerance;
    }
    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(dir) = &cli.models_dir {
        if !dir.is_dir() {
            return Err(format!("Models directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("facewatch").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_listen_on_port_5000() {
        let cli = parse(&[]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 5000);
        assert_eq!(cli.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_cli_values_override_config() {
        let cli = parse(&[
            "--device",
            "/dev/video2",
            "--known-dir",
            "staff",
            "--criminal-dir",
            "watchlist",
            "--tolerance",
            "0.4",
        ]);

        let config = load_config(&cli).unwrap();

        assert_eq!(config.camera.device, "/dev/video2");
        assert_eq!(config.known_faces_dir, PathBuf::from("staff"));
        assert_eq!(config.criminal_faces_dir, PathBuf::from("watchlist"));
        assert_eq!(config.match_tolerance, 0.4);
        assert_eq!(config.sample_interval, 3);
    }

    #[test]
    fn test_negative_tolerance_is_rejected() {
        let cli = parse(&["--tolerance=-1"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        let cli = parse(&["--confidence", "1.5"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_missing_config_file_is_rejected() {
        let cli = parse(&["--config", "no-such-dir/facewatch.json"]);
        assert!(validate(&cli).is_err());
    }
}
