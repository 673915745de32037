//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns the sample buffer, the transition detector, the
//! inference adapter and the decision state.  All I/O flows through port
//! traits injected at call sites, making the loop testable with mock
//! devices.
//!
//! ```text
//!  CameraPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   LightPort ◀──▶│         ControlLoop          │
//!   ClockPort ──▶ │ Buffer · Detector · Inference│ ──▶ SnapshotStore
//!                 └──────────────────────────────┘
//! ```
//!
//! ## Decision state
//!
//! ```text
//!             mismatch + command ok
//!    None ─────────────────────────────▶ SelfInduced
//!     ▲ │                                   │
//!     │ │ polled `on` flips                  │ genuine transition (no export)
//!     │ ▼                                   │
//!  ExternalOrUnknown ───────────────────────┤
//!     genuine transition (export) or        ▼
//!     flicker settles                      None
//! ```
//!
//! While the cause is `SelfInduced` no further command is issued, so the
//! detector's lagging confirmation of our own change can never trigger a
//! second one.  A command still unconfirmed after the settle window is
//! reported once; the loop keeps waiting for the transition (or a
//! [`LoopCommand::Reset`]).

use log::{debug, info, warn};

use crate::buffer::SampleBuffer;
use crate::config::{OperatingMode, SystemConfig};
use crate::detector::{Transition, TransitionDetector};
use crate::error::{DeviceError, Error, PersistenceError};
use crate::inference::{InferenceAdapter, Prediction};
use crate::sample::{LightState, Sample};
use crate::snapshot::ExportOutcome;

use super::commands::LoopCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{CameraPort, ClockPort, EventSink, LightPort, Scorer, SnapshotStore};

// ───────────────────────────────────────────────────────────────
// Decision state
// ───────────────────────────────────────────────────────────────

/// Who is believed to have caused the light change in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeCause {
    /// No change in progress.
    #[default]
    None,
    /// The loop commanded the light and awaits confirmation.
    SelfInduced,
    /// The light flipped without a command from us.
    ExternalOrUnknown,
}

/// A command that succeeded and is waiting for the detector to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCommand {
    on: bool,
    issued_tick: u64,
    /// `CommandUnconfirmed` already emitted for this command.
    reported: bool,
}

/// A light command issued during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedCommand {
    pub on: bool,
    pub result: Result<(), DeviceError>,
}

/// Running totals since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopCounters {
    pub transitions: u64,
    pub snapshots_saved: u64,
    pub snapshot_failures: u64,
    pub commands_issued: u64,
    pub command_failures: u64,
    pub commands_unconfirmed: u64,
    pub light_failures: u64,
    pub scorer_failures: u64,
}

/// Everything one tick observed and did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub timestamp: i64,
    /// Polled state, or the fail-closed default when the light was unreachable.
    pub light: LightState,
    pub light_available: bool,
    pub transition: Transition,
    /// Present only when a genuine transition asked for an export.
    pub export: Option<Result<ExportOutcome, PersistenceError>>,
    /// Present only in autonomous mode when the scorer succeeded.
    pub prediction: Option<Prediction>,
    pub command: Option<IssuedCommand>,
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

/// The per-tick orchestrator.
pub struct ControlLoop {
    buffer: SampleBuffer,
    detector: TransitionDetector,
    adapter: InferenceAdapter,
    mode: OperatingMode,
    capture_overrides: bool,
    scorer: Option<Box<dyn Scorer>>,

    cause: ChangeCause,
    pending: Option<PendingCommand>,
    /// Tick at which an external flip was first seen.
    external_since: u64,
    settle_ticks: u64,
    last_observed: Option<LightState>,

    tick_count: u64,
    counters: LoopCounters,
}

impl ControlLoop {
    /// Build a loop in the mode the configuration selects.
    ///
    /// Autonomous mode without a scorer is a [`Error::ModelLoad`].  In
    /// observe-only mode any scorer passed in is dropped.
    pub fn new(config: &SystemConfig, scorer: Option<Box<dyn Scorer>>) -> Result<Self, Error> {
        match (config.mode, scorer) {
            (OperatingMode::ObserveOnly, _) => Ok(Self::observe_only(config)),
            (OperatingMode::Autonomous, Some(scorer)) => Ok(Self::autonomous(config, scorer)),
            (OperatingMode::Autonomous, None) => {
                Err(Error::ModelLoad("autonomous mode requires a scorer"))
            }
        }
    }

    /// Persist every confirmed genuine transition; never actuate.
    pub fn observe_only(config: &SystemConfig) -> Self {
        Self::build(config, OperatingMode::ObserveOnly, None)
    }

    /// Actuate from `scorer`'s predictions.
    pub fn autonomous(config: &SystemConfig, scorer: Box<dyn Scorer>) -> Self {
        Self::build(config, OperatingMode::Autonomous, Some(scorer))
    }

    fn build(config: &SystemConfig, mode: OperatingMode, scorer: Option<Box<dyn Scorer>>) -> Self {
        Self {
            buffer: SampleBuffer::new(config.buffer_capacity()),
            detector: TransitionDetector::new(config.detect_lag()),
            adapter: InferenceAdapter::from_config(config),
            mode,
            capture_overrides: config.capture_overrides,
            scorer,
            cause: ChangeCause::None,
            pending: None,
            external_since: 0,
            settle_ticks: config.actuation_settle_ticks(),
            last_observed: None,
            tick_count: 0,
            counters: LoopCounters::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            mode: self.mode,
            capacity: self.buffer.capacity(),
            lag: self.detector.lag(),
            sequence_len: self.adapter.sequence_len(),
        });
        info!(
            "ControlLoop started: mode={:?} capacity={} lag={} seq={}",
            self.mode,
            self.buffer.capacity(),
            self.detector.lag(),
            self.adapter.sequence_len()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cycle: poll light → capture frame → append → detect →
    /// (autonomous) predict → maybe command.
    ///
    /// The `rig` parameter satisfies **all three** device ports, which
    /// avoids juggling several mutable borrows while keeping the port
    /// boundary explicit.  No error escapes a tick.
    pub async fn tick(
        &mut self,
        rig: &mut (impl CameraPort + LightPort + ClockPort),
        store: &mut impl SnapshotStore,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        self.tick_count += 1;
        let timestamp = rig.now_secs();

        // 1. Poll the light; unreachable collapses to the fail-closed default
        let (light, light_available) = match rig.get_state().await {
            Ok(state) => (state, true),
            Err(e) => {
                self.counters.light_failures += 1;
                warn!("ControlLoop: light unavailable ({}), assuming off", e);
                sink.emit(&AppEvent::LightUnavailable(e));
                (LightState::default(), false)
            }
        };

        // 2. Capture and record
        let frame = rig.capture_frame();
        self.observe(light);
        self.buffer.append(Sample::new(timestamp, frame, light));

        // 3. Detect
        let transition = self
            .detector
            .classify(&self.buffer.suffix(self.detector.window_len()));
        let export = match transition {
            Transition::GenuineTransition { to_on } => self.on_transition(to_on, store, sink),
            _ => None,
        };
        self.expire_stale_cause(sink);

        // 4. Predict and actuate
        let (prediction, command) = match self.mode {
            OperatingMode::Autonomous => self.decide(rig, light.on, sink).await,
            OperatingMode::ObserveOnly => (None, None),
        };

        TickOutcome {
            tick: self.tick_count,
            timestamp,
            light,
            light_available,
            transition,
            export,
            prediction,
            command,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command between ticks.
    ///
    /// Returns the export outcome for [`LoopCommand::SaveSnapshot`] and
    /// `None` for commands that do not export.
    pub fn handle_command(
        &mut self,
        cmd: LoopCommand,
        store: &mut impl SnapshotStore,
        sink: &mut impl EventSink,
    ) -> Option<Result<ExportOutcome, PersistenceError>> {
        match cmd {
            LoopCommand::Reset => {
                self.buffer.clear();
                self.cause = ChangeCause::None;
                self.pending = None;
                self.last_observed = None;
                info!("ControlLoop: history and decision state reset");
                None
            }
            LoopCommand::SaveSnapshot { name } => {
                Some(self.export(store, name.as_deref(), sink))
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot.
    /// `deadline_misses`: overrun count from the pacer, when there is one.
    pub fn build_telemetry(&self, deadline_misses: Option<u64>) -> TelemetryData {
        TelemetryData {
            tick_count: self.tick_count,
            buffer_len: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            light: self.last_observed.unwrap_or_default(),
            cause: self.cause,
            snapshots_saved: self.counters.snapshots_saved,
            snapshot_failures: self.counters.snapshot_failures,
            commands_issued: self.counters.commands_issued,
            command_failures: self.counters.command_failures,
            light_failures: self.counters.light_failures,
            scorer_failures: self.counters.scorer_failures,
            deadline_misses,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Current decision state.
    pub fn cause(&self) -> ChangeCause {
        self.cause
    }

    /// Target of the command awaiting confirmation, if any.
    pub fn pending_command(&self) -> Option<bool> {
        self.pending.map(|p| p.on)
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn detector(&self) -> &TransitionDetector {
        &self.detector
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn counters(&self) -> LoopCounters {
        self.counters
    }

    // ── Internal ──────────────────────────────────────────────

    /// Track raw flips of the polled `on` flag.
    fn observe(&mut self, light: LightState) {
        let flipped = self.last_observed.is_some_and(|prev| prev.on != light.on);
        if flipped && self.cause == ChangeCause::None {
            self.cause = ChangeCause::ExternalOrUnknown;
            self.external_since = self.tick_count;
            debug!("ControlLoop: light flipped {} without a command", on_off(light.on));
        }
        self.last_observed = Some(light);
    }

    /// A genuine transition completed: attribute it, maybe export, reset.
    fn on_transition(
        &mut self,
        to_on: bool,
        store: &mut impl SnapshotStore,
        sink: &mut impl EventSink,
    ) -> Option<Result<ExportOutcome, PersistenceError>> {
        self.counters.transitions += 1;
        let cause = self.cause;
        sink.emit(&AppEvent::TransitionDetected { to_on, cause });

        let persist = match (cause, self.mode) {
            (ChangeCause::SelfInduced, _) => {
                match self.pending {
                    Some(p) if p.on == to_on => {
                        info!("ControlLoop: own command confirmed (light {})", on_off(to_on));
                    }
                    _ => warn!(
                        "ControlLoop: light went {} while a command was pending; attributed to self",
                        on_off(to_on)
                    ),
                }
                false
            }
            (_, OperatingMode::ObserveOnly) => true,
            (_, OperatingMode::Autonomous) => {
                info!("ControlLoop: external override (light {})", on_off(to_on));
                self.capture_overrides
            }
        };

        self.cause = ChangeCause::None;
        self.pending = None;

        persist.then(|| self.export(store, None, sink))
    }

    /// Report overdue commands and drop external flips that never held.
    ///
    /// `SelfInduced` only ends on a genuine transition; a slow bulb must
    /// not earn a second command for the same intent.
    fn expire_stale_cause(&mut self, sink: &mut impl EventSink) {
        match self.cause {
            ChangeCause::SelfInduced => {
                let Some(p) = self.pending.as_mut() else {
                    self.cause = ChangeCause::None;
                    return;
                };
                let waited = self.tick_count.saturating_sub(p.issued_tick);
                if waited >= self.settle_ticks && !p.reported {
                    p.reported = true;
                    self.counters.commands_unconfirmed += 1;
                    warn!(
                        "ControlLoop: command to turn {} unconfirmed after {} ticks, still waiting",
                        on_off(p.on),
                        waited
                    );
                    sink.emit(&AppEvent::CommandUnconfirmed {
                        on: p.on,
                        ticks: waited,
                    });
                }
            }
            ChangeCause::ExternalOrUnknown => {
                if self.tick_count.saturating_sub(self.external_since) >= self.detector.lag() as u64 {
                    debug!("ControlLoop: unconfirmed flip settled");
                    self.cause = ChangeCause::None;
                }
            }
            ChangeCause::None => {}
        }
    }

    /// Autonomous steps 3–4.  At most one command per call.
    async fn decide(
        &mut self,
        light: &mut impl LightPort,
        observed_on: bool,
        sink: &mut impl EventSink,
    ) -> (Option<Prediction>, Option<IssuedCommand>) {
        let Some(scorer) = self.scorer.as_mut() else {
            return (None, None);
        };
        let window = self.buffer.suffix(self.adapter.sequence_len());
        let prediction = match self.adapter.predict(&window, scorer) {
            Ok(p) => p,
            Err(e) => {
                self.counters.scorer_failures += 1;
                warn!("ControlLoop: scorer failed ({}), skipping actuation", e);
                sink.emit(&AppEvent::ScorerFailed(e));
                return (None, None);
            }
        };

        let Prediction::Intent(intent) = prediction else {
            return (Some(prediction), None);
        };
        sink.emit(&AppEvent::Prediction {
            predicted_on: intent.predicted_on,
            probability: intent.probability,
        });

        if self.cause == ChangeCause::SelfInduced || intent.predicted_on == observed_on {
            return (Some(prediction), None);
        }

        let on = intent.predicted_on;
        let result = if on {
            light.turn_on().await
        } else {
            light.turn_off().await
        };
        match result {
            Ok(()) => {
                self.counters.commands_issued += 1;
                self.cause = ChangeCause::SelfInduced;
                self.pending = Some(PendingCommand {
                    on,
                    issued_tick: self.tick_count,
                    reported: false,
                });
                info!(
                    "ControlLoop: turned light {} (p={:.3})",
                    on_off(on),
                    intent.probability
                );
                sink.emit(&AppEvent::Actuated { on });
            }
            Err(e) => {
                self.counters.command_failures += 1;
                warn!("ControlLoop: turn {} failed: {}", on_off(on), e);
                sink.emit(&AppEvent::ActuationFailed { on, error: e });
            }
        }
        (Some(prediction), Some(IssuedCommand { on, result }))
    }

    fn export(
        &mut self,
        store: &mut impl SnapshotStore,
        name: Option<&str>,
        sink: &mut impl EventSink,
    ) -> Result<ExportOutcome, PersistenceError> {
        let outcome = self.buffer.export(store, name);
        match &outcome {
            Ok(ExportOutcome::Written(id)) => {
                self.counters.snapshots_saved += 1;
                sink.emit(&AppEvent::SnapshotSaved(id.clone()));
            }
            Ok(ExportOutcome::Empty) => debug!("ControlLoop: nothing buffered to export"),
            Err(e) => {
                self.counters.snapshot_failures += 1;
                warn!("ControlLoop: snapshot export failed: {}", e);
                sink.emit(&AppEvent::SnapshotFailed(*e));
            }
        }
        outcome
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
