//! Background snapshot persistence.
//!
//! The control loop must not stall on disk I/O while it is pacing ticks.
//! [`QueuedSnapshotStore`] resolves the artifact name, then hands an owned
//! snapshot to a bounded `embassy-sync` channel; [`run_snapshot_writer`]
//! runs as a second task on the same single-threaded executor and writes
//! each job as it arrives.
//!
//! ```text
//!  ┌──────────────┐ SnapshotJob ┌─────────────────┐
//!  │ Control Loop │────────────▶│  Writer task    │──▶ storage dir
//!  │  (tick)      │  depth = 4  │  (async, same   │
//!  └──────────────┘             │   executor)     │
//!                               └─────────────────┘
//! ```
//!
//! A full queue rejects the export with [`PersistenceError::QueueFull`];
//! the buffer keeps its contents either way.  On shutdown, call
//! [`drain_snapshot_queue`] so queued jobs are not lost.

use std::path::{Path, PathBuf};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use log::{error, info, warn};

use crate::app::ports::SnapshotStore;
use crate::error::PersistenceError;
use crate::snapshot::{Snapshot, SnapshotId};

use super::file_store::{SnapshotNamer, prepare_dir, write_snapshot};

/// Channel depth for pending snapshot writes.
pub const QUEUE_DEPTH: usize = 4;

/// One pending write: a fully resolved destination and its contents.
pub struct SnapshotJob {
    pub path: PathBuf,
    pub snapshot: Snapshot,
}

/// Bounded hand-off between the control loop and the writer task.
/// Executor-local; never shared across threads.
pub type SnapshotQueue = Channel<NoopRawMutex, SnapshotJob, QUEUE_DEPTH>;

// ── Producer side ────────────────────────────────────────────

pub struct QueuedSnapshotStore<'q> {
    queue: &'q SnapshotQueue,
    dir: PathBuf,
    namer: SnapshotNamer,
}

impl<'q> QueuedSnapshotStore<'q> {
    pub fn new(queue: &'q SnapshotQueue, dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = prepare_dir(dir)?;
        info!(
            "QueuedSnapshotStore: writing to {} (queue depth {})",
            dir.display(),
            QUEUE_DEPTH
        );
        Ok(Self {
            queue,
            dir,
            namer: SnapshotNamer::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for QueuedSnapshotStore<'_> {
    /// The returned id is where the writer task will place the artifact.
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError> {
        let path = self.namer.resolve(&self.dir, &snapshot, name)?;
        let id = SnapshotId::new(path.clone());
        if self.queue.try_send(SnapshotJob { path, snapshot }).is_err() {
            warn!("QueuedSnapshotStore: writer queue full, dropping {}", id);
            return Err(PersistenceError::QueueFull);
        }
        Ok(id)
    }
}

// ── Consumer side ────────────────────────────────────────────

fn write_job(job: &SnapshotJob) -> bool {
    match write_snapshot(&job.path, &job.snapshot) {
        Ok(()) => true,
        Err(e) => {
            error!("Snapshot writer: {} failed: {}", job.path.display(), e);
            false
        }
    }
}

/// Writer task.  Wakes when the loop enqueues a job; never returns.
pub async fn run_snapshot_writer(queue: &SnapshotQueue) {
    info!("Snapshot writer started");
    loop {
        let job = queue.receive().await;
        write_job(&job);
    }
}

/// Write every job still queued.  Returns how many were written.
pub fn drain_snapshot_queue(queue: &SnapshotQueue) -> usize {
    let mut written = 0;
    while let Ok(job) = queue.try_receive() {
        if write_job(&job) {
            written += 1;
        }
    }
    if written > 0 {
        info!("Snapshot writer: drained {} queued snapshots", written);
    }
    written
}
