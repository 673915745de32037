//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (camera, light, clock, scorer, snapshot storage, event
//! sinks) implement these traits.  The [`ControlLoop`](super::service::ControlLoop)
//! consumes them via generics, so the domain core never touches devices
//! or the filesystem directly.
//!
//! ## Contract notes
//!
//! - **LightPort** calls may suspend; they are the only device calls that do.
//! - **CameraPort** never fails.  Missing hardware is a synthetic frame.
//! - **ConfigPort** implementations MUST validate before persisting.

use crate::config::SystemConfig;
use crate::error::{DeviceError, PersistenceError, ScorerError};
use crate::inference::Batch;
use crate::sample::{Frame, FrameShape, LightState};
use crate::snapshot::{Snapshot, SnapshotId};

// ───────────────────────────────────────────────────────────────
// Camera port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the loop grabs one frame per tick.
pub trait CameraPort {
    /// Capture the current frame.  Infallible; a camera that is absent or
    /// failing returns a frame marked synthetic.
    fn capture_frame(&mut self) -> Frame;

    /// Shape of every frame this camera produces.
    fn shape(&self) -> FrameShape;
}

impl<T: CameraPort + ?Sized> CameraPort for Box<T> {
    fn capture_frame(&mut self) -> Frame {
        (**self).capture_frame()
    }

    fn shape(&self) -> FrameShape {
        (**self).shape()
    }
}

// ───────────────────────────────────────────────────────────────
// Light port (driven adapter: domain ↔ networked device)
// ───────────────────────────────────────────────────────────────

/// The smart light.  Each call is one network round trip.
///
/// Timeouts are the implementation's concern; wrap a client in
/// [`TimeoutLight`](crate::adapters::light::TimeoutLight) to bound them.
#[allow(async_fn_in_trait)]
pub trait LightPort {
    async fn get_state(&mut self) -> Result<LightState, DeviceError>;

    async fn turn_on(&mut self) -> Result<(), DeviceError>;

    async fn turn_off(&mut self) -> Result<(), DeviceError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for sample timestamps and snapshot names.
pub trait ClockPort {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Scorer port (opaque model)
// ───────────────────────────────────────────────────────────────

/// The opaque model.  Given a normalised `[S, C, H, W]` batch, returns
/// one logit.  Must be deterministic for a given batch.
pub trait Scorer {
    fn score(&mut self, batch: &Batch) -> Result<f32, ScorerError>;
}

impl<T: Scorer + ?Sized> Scorer for Box<T> {
    fn score(&mut self, batch: &Batch) -> Result<f32, ScorerError> {
        (**self).score(batch)
    }
}

// ───────────────────────────────────────────────────────────────
// Snapshot store port (driven adapter: domain → durable storage)
// ───────────────────────────────────────────────────────────────

/// Durable destination for buffer exports.
///
/// Takes ownership of the snapshot so an implementation may hand it to a
/// background writer without copying again.
pub trait SnapshotStore {
    /// Persist `snapshot`.  `name` overrides the generated artifact name.
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for &mut T {
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError> {
        (**self).persist(snapshot, name)
    }
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Box<T> {
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError> {
        (**self).persist(snapshot, name)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed to parse.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the backing file.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}
