use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::recognition::domain::face_detection::DetectionSnapshot;
use crate::shared::frame::Frame;

/// An annotated frame together with the detections drawn on it.
///
/// Both halves come from the same capture and are only ever published
/// as one value.
#[derive(Debug)]
pub struct Snapshot {
    pub frame: Frame,
    pub detections: DetectionSnapshot,
}

/// Latest snapshot plus the running flag, shared by the worker, the
/// lifecycle controller and every stream.
///
/// Readers load an `Arc` to the current snapshot and never block the
/// writer; publishing swaps the whole handle.
pub struct PublishedState {
    snapshot: ArcSwapOption<Snapshot>,
    running: AtomicBool,
}

impl PublishedState {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwapOption::empty(),
            running: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, frame: Frame, detections: DetectionSnapshot) {
        self.snapshot
            .store(Some(Arc::new(Snapshot { frame, detections })));
    }

    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    /// Detections of the latest snapshot, empty if nothing was published.
    pub fn detections(&self) -> DetectionSnapshot {
        self.load()
            .map(|s| s.detections.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.snapshot.store(None);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl Default for PublishedState {
    fn default() -> Self {
        Self::new()
    }
}
