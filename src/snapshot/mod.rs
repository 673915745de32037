//! Durable snapshot of the sample buffer.
//!
//! A snapshot is an immutable copy of every buffered sample at export
//! time: the frames as one chronological array plus a parallel list of
//! per-sample records.  It is written once and never re-read by the
//! running service.
//!
//! ## Artifact layout
//!
//! ```text
//! ┌──────────┬─────────┬───────┬────────────────────────────────┐
//! │ "LWSNAP" │ version │ flags │ payload (postcard, maybe DEFLATE)│
//! │  6 bytes │  1 byte │ 1 byte│                                │
//! └──────────┴─────────┴───────┴────────────────────────────────┘
//!   flags bit 0 = payload is DEFLATE-compressed
//! ```
//!
//! The payload is `{ shape, frames, records }` where `frames` holds
//! `records.len() × shape.len()` bytes, oldest frame first.

pub mod compress;

use core::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::sample::{Frame, FrameShape, LightState, Sample};

/// Leading bytes of every snapshot artifact.
pub const MAGIC: &[u8; 6] = b"LWSNAP";

/// Current artifact version.
pub const VERSION: u8 = 1;

/// File extension used by the file store.
pub const EXTENSION: &str = "snap";

/// Header flag: payload is DEFLATE-compressed.
pub const FLAG_COMPRESSED: u8 = 0x01;

const HEADER_LEN: usize = MAGIC.len() + 2;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Per-sample metadata stored alongside the frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: i64,
    pub light_on: bool,
    pub brightness: u8,
    pub color_temperature: u16,
    /// Frame was generated, not captured.
    pub synthetic: bool,
}

impl SampleRecord {
    fn of(sample: &Sample) -> Self {
        let light = sample.light();
        Self {
            timestamp: sample.timestamp(),
            light_on: light.on,
            brightness: light.brightness,
            color_temperature: light.color_temperature,
            synthetic: sample.frame().is_synthetic(),
        }
    }

    pub fn light_state(&self) -> LightState {
        LightState {
            on: self.light_on,
            brightness: self.brightness,
            color_temperature: self.color_temperature,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    shape: FrameShape,
    frames: Vec<u8>,
    records: Vec<SampleRecord>,
}

impl Snapshot {
    /// Copy `samples` (oldest first) into a new snapshot.
    ///
    /// Fails with [`PersistenceError::ShapeMismatch`] if the frames do not
    /// share one shape, and with [`PersistenceError::Encode`] when there is
    /// nothing to copy.
    pub fn capture<'a>(
        samples: impl ExactSizeIterator<Item = &'a Sample>,
    ) -> Result<Self, PersistenceError> {
        let mut samples = samples.peekable();
        let shape = samples
            .peek()
            .map(|s| s.frame().shape())
            .ok_or(PersistenceError::Encode)?;

        let count = samples.len();
        let mut frames = Vec::with_capacity(count * shape.len());
        let mut records = Vec::with_capacity(count);
        for sample in samples {
            if sample.frame().shape() != shape {
                return Err(PersistenceError::ShapeMismatch);
            }
            frames.extend_from_slice(sample.frame().data());
            records.push(SampleRecord::of(sample));
        }

        Ok(Self {
            shape,
            frames,
            records,
        })
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All frame bytes, `[len, C, H, W]`.
    pub fn frames(&self) -> &[u8] {
        &self.frames
    }

    /// Bytes of frame `i`.
    pub fn frame(&self, i: usize) -> Option<&[u8]> {
        if i >= self.records.len() {
            return None;
        }
        let n = self.shape.len();
        self.frames.get(i * n..(i + 1) * n)
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Rebuild the samples, oldest first.
    pub fn to_samples(&self) -> Vec<Sample> {
        let n = self.shape.len();
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let data: Box<[u8]> = self.frames[i * n..(i + 1) * n].into();
                let frame = Frame::from_parts(self.shape, data, r.synthetic);
                Sample::new(r.timestamp, frame, r.light_state())
            })
            .collect()
    }

    // ── Codec ────────────────────────────────────────────────

    /// Serialise into the artifact layout described at module level.
    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        let payload = postcard::to_allocvec(self).map_err(|_| PersistenceError::Encode)?;
        let (flags, body) = match compress::compress(&payload) {
            Some(deflated) => (FLAG_COMPRESSED, deflated),
            None => (0, payload),
        };

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.push(flags);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Parse an artifact.  Never panics on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(PersistenceError::Decode);
        }
        let version = bytes[MAGIC.len()];
        let flags = bytes[MAGIC.len() + 1];
        if version != VERSION || flags & !FLAG_COMPRESSED != 0 {
            return Err(PersistenceError::Decode);
        }

        let body = &bytes[HEADER_LEN..];
        let inflated;
        let payload = if flags & FLAG_COMPRESSED != 0 {
            inflated = compress::decompress(body).ok_or(PersistenceError::Decode)?;
            &inflated[..]
        } else {
            body
        };

        let snapshot: Self = postcard::from_bytes(payload).map_err(|_| PersistenceError::Decode)?;
        let expected = snapshot
            .shape
            .checked_len()
            .filter(|&n| n > 0)
            .and_then(|n| n.checked_mul(snapshot.records.len()))
            .ok_or(PersistenceError::Decode)?;
        if snapshot.frames.len() != expected {
            return Err(PersistenceError::Decode);
        }
        Ok(snapshot)
    }
}

/// Read a snapshot artifact from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Snapshot, PersistenceError> {
    let bytes = std::fs::read(path).map_err(|e| PersistenceError::Read(e.kind()))?;
    Snapshot::decode(&bytes)
}

// ---------------------------------------------------------------------------
// Identity & outcome
// ---------------------------------------------------------------------------

/// Where a persisted snapshot ended up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId(PathBuf);

impl SnapshotId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Result of [`SampleBuffer::export`](crate::buffer::SampleBuffer::export).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(SnapshotId),
    /// Nothing was buffered; no artifact was produced.
    Empty,
}
