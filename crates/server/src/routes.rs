use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use async_stream::stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use facewatch_core::pipeline::lifecycle_controller::LifecycleController;
use facewatch_core::pipeline::pipeline_context::PipelineContext;
use facewatch_core::pipeline::stream_generator::{ChunkSink, SinkClosed};
use facewatch_core::shared::constants::MULTIPART_BOUNDARY;

use crate::page::INDEX_HTML;
use crate::responses::{FaceDataResponse, StatusResponse};

/// Encoded parts buffered between a stream thread and its HTTP body.
const STREAM_BUFFER: usize = 2;

/// How often a stream thread re-checks the running flag while the client
/// is not draining its body.
const SEND_RETRY: Duration = Duration::from_millis(10);

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/video_feed", web::get().to(video_feed))
        .route("/start_recognition", web::get().to(start_recognition))
        .route("/stop_recognition", web::get().to(stop_recognition))
        .route("/get_face_data", web::get().to(face_data))
        .route("/test", web::get().to(liveness));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Forwards generator output to the response body. The receiver is dropped
/// with the body, which is how a disconnect reaches the generator.
///
/// A stalled client never pins the stream thread: while the buffer is full
/// the sink keeps polling the running flag and gives up once it clears.
struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
    ctx: Arc<PipelineContext>,
}

impl ChunkSink for ChannelSink {
    fn emit(&mut self, mut chunk: Vec<u8>) -> Result<(), SinkClosed> {
        loop {
            match self.tx.try_send(chunk) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Closed(_)) => return Err(SinkClosed),
                Err(TrySendError::Full(pending)) => {
                    if !self.ctx.is_running() {
                        return Err(SinkClosed);
                    }
                    chunk = pending;
                    std::thread::sleep(SEND_RETRY);
                }
            }
        }
    }
}

async fn video_feed(controller: web::Data<LifecycleController>) -> HttpResponse {
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(STREAM_BUFFER);
    let mut generator = controller.stream();
    let mut sink = ChannelSink {
        tx,
        ctx: Arc::clone(controller.context()),
    };

    let spawned = std::thread::Builder::new()
        .name("stream-client".into())
        .spawn(move || {
            generator.run(&mut sink);
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn stream thread: {e}");
        return HttpResponse::InternalServerError().finish();
    }

    let body = stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, actix_web::Error>(Bytes::from(chunk));
        }
    };

    HttpResponse::Ok()
        .append_header(("Cache-Control", "no-cache"))
        .content_type(format!(
            "multipart/x-mixed-replace; boundary={MULTIPART_BOUNDARY}"
        ))
        .streaming(body)
}

async fn start_recognition(
    controller: web::Data<LifecycleController>,
) -> actix_web::Result<HttpResponse> {
    let controller = controller.into_inner();
    let result = web::block(move || controller.start()).await?;
    Ok(HttpResponse::Ok().json(StatusResponse::from_start(&result)))
}

async fn stop_recognition(
    controller: web::Data<LifecycleController>,
) -> actix_web::Result<HttpResponse> {
    let controller = controller.into_inner();
    let outcome = web::block(move || controller.stop()).await?;
    Ok(HttpResponse::Ok().json(StatusResponse::from_stop(outcome)))
}

async fn face_data(controller: web::Data<LifecycleController>) -> HttpResponse {
    HttpResponse::Ok().json(FaceDataResponse::from(&controller.face_data()))
}

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse::alive())
}
