//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, record them in tests, or
//! forward them elsewhere.

use crate::config::OperatingMode;
use crate::error::{DeviceError, PersistenceError, ScorerError};
use crate::sample::LightState;
use crate::snapshot::SnapshotId;

use super::service::ChangeCause;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The loop has started (carries its derived parameters).
    Started {
        mode: OperatingMode,
        capacity: usize,
        lag: usize,
        sequence_len: usize,
    },

    /// The detector confirmed a light transition.  `cause` is the decision
    /// state at the moment of confirmation.
    TransitionDetected { to_on: bool, cause: ChangeCause },

    /// The buffer was exported.
    SnapshotSaved(SnapshotId),

    /// An export failed; the buffer is unaffected.
    SnapshotFailed(PersistenceError),

    /// The scorer produced an intent.
    Prediction { predicted_on: bool, probability: f32 },

    /// A light command succeeded.
    Actuated { on: bool },

    /// A light command failed; no self-induced change is expected.
    ActuationFailed { on: bool, error: DeviceError },

    /// A command was not confirmed by the detector within the settle
    /// window.  Emitted once per command; the loop keeps waiting.
    CommandUnconfirmed { on: bool, ticks: u64 },

    /// Polling the light failed; the tick used the fail-closed default.
    LightUnavailable(DeviceError),

    /// The scorer failed; this tick's actuation decision was skipped.
    ScorerFailed(ScorerError),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub tick_count: u64,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
    pub light: LightState,
    pub cause: ChangeCause,
    pub snapshots_saved: u64,
    pub snapshot_failures: u64,
    pub commands_issued: u64,
    pub command_failures: u64,
    pub light_failures: u64,
    pub scorer_failures: u64,
    /// Ticks that overran their period.  `None` when the loop is not
    /// being paced (tests, manual stepping).
    pub deadline_misses: Option<u64>,
}
