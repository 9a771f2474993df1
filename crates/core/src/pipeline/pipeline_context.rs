use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

use crate::capture::domain::camera_source::CameraSource;
use crate::pipeline::detection_queue::DetectionQueue;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::published_state::PublishedState;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::shared::frame::Frame;

/// Everything the pipeline tasks share, reached through one `Arc`.
///
/// The camera sits behind a mutex so reads from concurrent streams are
/// serialised. The known-face set is swapped in whole after enrollment.
pub struct PipelineContext {
    config: PipelineConfig,
    camera: Mutex<Box<dyn CameraSource>>,
    matcher: Arc<dyn FaceMatcher>,
    known_faces: ArcSwap<KnownFaceSet>,
    queue: DetectionQueue,
    state: PublishedState,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        camera: Box<dyn CameraSource>,
        matcher: Arc<dyn FaceMatcher>,
    ) -> Self {
        Self {
            config,
            camera: Mutex::new(camera),
            matcher,
            known_faces: ArcSwap::from_pointee(KnownFaceSet::new()),
            queue: DetectionQueue::new(),
            state: PublishedState::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Arc<dyn FaceMatcher> {
        &self.matcher
    }

    pub fn queue(&self) -> &DetectionQueue {
        &self.queue
    }

    pub fn state(&self) -> &PublishedState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn known_faces(&self) -> Arc<KnownFaceSet> {
        self.known_faces.load_full()
    }

    pub fn replace_known_faces(&self, set: KnownFaceSet) {
        self.known_faces.store(Arc::new(set));
    }

    /// Locks the camera for exclusive use. `None` if a previous holder
    /// panicked.
    pub fn camera(&self) -> Option<MutexGuard<'_, Box<dyn CameraSource>>> {
        match self.camera.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                log::warn!("Camera lock poisoned: {e}");
                None
            }
        }
    }

    /// Next raw frame from the shared camera, `None` if it is inactive or
    /// the read failed.
    pub fn read_frame(&self) -> Option<Frame> {
        let mut camera = self.camera()?;
        if !camera.is_active() {
            return None;
        }
        camera.frame()
    }
}
