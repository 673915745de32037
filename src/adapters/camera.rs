//! Camera adapters.
//!
//! - [`SyntheticCamera`]: no hardware; emits a moving test pattern marked
//!   synthetic so downstream consumers can tell it from real captures.
//! - [`ReplayCamera`]: plays back the frames of a saved snapshot in a loop,
//!   for offline runs against recorded scenes.

use log::{info, warn};

use crate::app::ports::CameraPort;
use crate::error::PersistenceError;
use crate::sample::{Frame, FrameShape};
use crate::snapshot::Snapshot;

// ───────────────────────────────────────────────────────────────
// Synthetic
// ───────────────────────────────────────────────────────────────

pub struct SyntheticCamera {
    shape: FrameShape,
    seq: u64,
}

impl SyntheticCamera {
    pub fn new(shape: FrameShape) -> Self {
        warn!(
            "SyntheticCamera: no camera attached, generating {}x{}x{} test frames",
            shape.channels, shape.height, shape.width
        );
        Self { shape, seq: 0 }
    }
}

impl CameraPort for SyntheticCamera {
    fn capture_frame(&mut self) -> Frame {
        let frame = Frame::synthetic(self.shape, self.seq);
        self.seq = self.seq.wrapping_add(1);
        frame
    }

    fn shape(&self) -> FrameShape {
        self.shape
    }
}

// ───────────────────────────────────────────────────────────────
// Replay
// ───────────────────────────────────────────────────────────────

pub struct ReplayCamera {
    snapshot: Snapshot,
    next: usize,
}

impl ReplayCamera {
    /// Replay `snapshot`.  An empty snapshot is rejected.
    pub fn new(snapshot: Snapshot) -> Result<Self, PersistenceError> {
        if snapshot.is_empty() {
            return Err(PersistenceError::Decode);
        }
        info!(
            "ReplayCamera: {} frames of {:?}",
            snapshot.len(),
            snapshot.shape()
        );
        Ok(Self { snapshot, next: 0 })
    }

    /// Load and replay the artifact at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PersistenceError> {
        Self::new(crate::snapshot::load(path)?)
    }

    /// Frames in one pass of the recording.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

impl CameraPort for ReplayCamera {
    fn capture_frame(&mut self) -> Frame {
        let shape = self.snapshot.shape();
        let synthetic = self.snapshot.records()[self.next].synthetic;
        let frame = match self.snapshot.frame(self.next) {
            Some(data) => Frame::from_parts(shape, data.into(), synthetic),
            None => Frame::synthetic(shape, self.next as u64),
        };
        self.next = (self.next + 1) % self.snapshot.len();
        frame
    }

    fn shape(&self) -> FrameShape {
        self.snapshot.shape()
    }
}
