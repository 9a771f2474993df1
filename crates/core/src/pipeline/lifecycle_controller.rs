use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;

use crate::capture::domain::camera_source::CameraError;
use crate::enrollment::enroll_faces_use_case::EnrollFacesUseCase;
use crate::pipeline::detection_worker::{DetectionWorker, WorkerStats};
use crate::pipeline::pipeline_context::PipelineContext;
use crate::pipeline::stream_generator::StreamGenerator;
use crate::recognition::domain::face_detection::DetectionSnapshot;
use crate::recognition::domain::known_face_set::{EnrolledCategory, KnownFaceSet};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to start camera: {0}")]
    Camera(#[from] CameraError),
    #[error("failed to spawn detection worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("camera lock poisoned")]
    CameraLock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

struct ControllerInner {
    state: LifecycleState,
    worker: Option<JoinHandle<WorkerStats>>,
}

/// Starts and stops the camera and the detection worker together.
///
/// Calls are serialised on an internal lock, so at most one worker is ever
/// alive. Both `start` and `stop` are idempotent and report when they had
/// nothing to do.
pub struct LifecycleController {
    ctx: Arc<PipelineContext>,
    enrollment: EnrollFacesUseCase,
    inner: Mutex<ControllerInner>,
}

impl LifecycleController {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        let enrollment =
            EnrollFacesUseCase::new(Arc::clone(ctx.matcher()), ctx.config().enrollment_scale);
        Self {
            ctx,
            enrollment,
            inner: Mutex::new(ControllerInner {
                state: LifecycleState::Stopped,
                worker: None,
            }),
        }
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    pub fn start(&self) -> Result<StartOutcome, LifecycleError> {
        let mut inner = self.lock();
        if inner.state == LifecycleState::Running {
            return Ok(StartOutcome::AlreadyRunning);
        }

        inner.state = LifecycleState::Starting;
        match self.start_locked(&mut inner) {
            Ok(()) => {
                inner.state = LifecycleState::Running;
                log::info!("Recognition started");
                Ok(StartOutcome::Started)
            }
            Err(e) => {
                inner.state = LifecycleState::Stopped;
                log::warn!("Recognition failed to start: {e}");
                Err(e)
            }
        }
    }

    fn start_locked(&self, inner: &mut ControllerInner) -> Result<(), LifecycleError> {
        self.ensure_enrolled();

        self.ctx
            .camera()
            .ok_or(LifecycleError::CameraLock)?
            .acquire()?;

        self.ctx.queue().drain();
        self.ctx.state().set_running(true);

        match DetectionWorker::new(Arc::clone(&self.ctx)).spawn() {
            Ok(handle) => {
                inner.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.ctx.state().set_running(false);
                if let Some(mut camera) = self.ctx.camera() {
                    camera.release();
                }
                Err(LifecycleError::WorkerSpawn(e))
            }
        }
    }

    pub fn stop(&self) -> StopOutcome {
        let mut inner = self.lock();
        if inner.state == LifecycleState::Stopped {
            return StopOutcome::AlreadyStopped;
        }

        inner.state = LifecycleState::Stopping;
        self.ctx.state().set_running(false);
        if let Some(mut camera) = self.ctx.camera() {
            camera.release();
        }
        let drained = self.ctx.queue().drain();
        if drained > 0 {
            log::debug!("Discarded {drained} pending detection frame(s)");
        }

        if let Some(worker) = inner.worker.take() {
            if worker.join().is_err() {
                log::warn!("Detection worker panicked");
            }
        }
        if self.ctx.config().clear_on_stop {
            self.ctx.state().clear();
        }

        inner.state = LifecycleState::Stopped;
        log::info!("Recognition stopped");
        StopOutcome::Stopped
    }

    /// Enrolls the configured directories if no faces are loaded yet.
    /// Returns whether enrollment ran. Only called with the controller
    /// lock held.
    fn ensure_enrolled(&self) -> bool {
        if !self.ctx.known_faces().is_empty() {
            return false;
        }
        let config = self.ctx.config();
        let mut set = KnownFaceSet::new();
        self.enrollment
            .execute(&config.known_faces_dir, EnrolledCategory::Known, &mut set);
        self.enrollment
            .execute(&config.criminal_faces_dir, EnrolledCategory::Criminal, &mut set);
        log::info!(
            "Known face set loaded: {} known, {} criminal",
            set.count(EnrolledCategory::Known),
            set.count(EnrolledCategory::Criminal)
        );
        self.ctx.replace_known_faces(set);
        true
    }

    /// Detections of the most recently published snapshot.
    pub fn face_data(&self) -> DetectionSnapshot {
        self.ctx.state().detections()
    }

    /// A fresh generator for one streaming client.
    pub fn stream(&self) -> StreamGenerator {
        StreamGenerator::new(Arc::clone(&self.ctx))
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
