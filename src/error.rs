//! Unified error types for lightwatch.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level control loop's error handling uniform.  All variants are
//! `Copy` so they can be passed through events and tick outcomes without
//! allocation.

use core::fmt;
use std::io::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The light or the camera could not be reached.
    Device(DeviceError),
    /// Not enough buffered samples for detection or inference.
    InsufficientHistory { required: usize, available: usize },
    /// The scorer rejected the batch or produced garbage.
    Scorer(ScorerError),
    /// A snapshot could not be written or read back.
    Persistence(PersistenceError),
    /// The scorer could not be initialised.  Fatal in autonomous mode.
    ModelLoad(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(e) => write!(f, "device: {e}"),
            Self::InsufficientHistory {
                required,
                available,
            } => write!(
                f,
                "insufficient history: {available} of {required} samples"
            ),
            Self::Scorer(e) => write!(f, "scorer: {e}"),
            Self::Persistence(e) => write!(f, "persistence: {e}"),
            Self::ModelLoad(msg) => write!(f, "model load: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Network or bus connectivity failed.
    Unreachable,
    /// The device did not answer within the configured timeout.
    Timeout,
    /// The device answered but refused the request.
    Rejected,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "device unreachable"),
            Self::Timeout => write!(f, "device timed out"),
            Self::Rejected => write!(f, "device rejected request"),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

// ---------------------------------------------------------------------------
// Scorer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerError {
    /// Frames in the window disagree on shape, or the model expects a
    /// different input size.
    ShapeMismatch,
    /// The scorer returned NaN or infinity.
    NonFinite,
    /// The scoring backend failed internally.
    Backend,
}

impl fmt::Display for ScorerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch => write!(f, "input shape mismatch"),
            Self::NonFinite => write!(f, "non-finite score"),
            Self::Backend => write!(f, "backend failure"),
        }
    }
}

impl std::error::Error for ScorerError {}

impl From<ScorerError> for Error {
    fn from(e: ScorerError) -> Self {
        Self::Scorer(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceError {
    /// The storage directory could not be created.
    CreateDir(ErrorKind),
    /// Writing or renaming the artifact failed.
    Write(ErrorKind),
    /// Reading the artifact failed.
    Read(ErrorKind),
    /// Serialisation of the snapshot failed.
    Encode,
    /// The artifact is corrupt, truncated, or of an unknown version.
    Decode,
    /// Buffered frames disagree on shape and cannot form one array.
    ShapeMismatch,
    /// An explicit snapshot name is not a plain file name.
    InvalidName,
    /// The background writer queue is full; the snapshot was dropped.
    QueueFull,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir(kind) => write!(f, "create storage dir failed ({kind})"),
            Self::Write(kind) => write!(f, "write failed ({kind})"),
            Self::Read(kind) => write!(f, "read failed ({kind})"),
            Self::Encode => write!(f, "encode failed"),
            Self::Decode => write!(f, "corrupt or unsupported snapshot"),
            Self::ShapeMismatch => write!(f, "frame shape mismatch"),
            Self::InvalidName => write!(f, "invalid snapshot name"),
            Self::QueueFull => write!(f, "writer queue full"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<PersistenceError> for Error {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
