use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// A frame was already pending; the new one was discarded.
    Dropped,
}

/// Single-slot hand-off from the stream generators to the detection worker.
///
/// Producers never block. A frame that arrives while one is pending is
/// dropped rather than queued behind it.
pub struct DetectionQueue {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
}

impl DetectionQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self { tx, rx }
    }

    pub fn try_enqueue(&self, frame: Frame) -> EnqueueOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                EnqueueOutcome::Dropped
            }
        }
    }

    /// Waits up to `timeout` for a frame. `None` on timeout.
    pub fn dequeue(&self, timeout: Duration) -> Option<Frame> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Discards any pending frame, returning how many were removed.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for DetectionQueue {
    fn default() -> Self {
        Self::new()
    }
}
