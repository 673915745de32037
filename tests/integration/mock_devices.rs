//! Mock devices for integration tests.
//!
//! Records every light call so tests can assert on the full command
//! history, and scripts external light flips, outages and scorer output
//! without a camera, a bulb or a model.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use lightwatch::app::events::AppEvent;
use lightwatch::app::ports::{
    CameraPort, ClockPort, EventSink, LightPort, Scorer, SnapshotStore,
};
use lightwatch::app::service::{ControlLoop, TickOutcome};
use lightwatch::config::{OperatingMode, SystemConfig};
use lightwatch::error::{DeviceError, PersistenceError, ScorerError};
use lightwatch::inference::Batch;
use lightwatch::sample::{Frame, FrameShape, LightState};
use lightwatch::snapshot::{Snapshot, SnapshotId};

pub const SHAPE: FrameShape = FrameShape::new(1, 2, 2);
pub const BASE_TS: i64 = 1_700_000_000;

/// Small, fast configuration: N = 12, D = 2, S = 4, settle = 4 ticks.
pub fn test_config(mode: OperatingMode) -> SystemConfig {
    SystemConfig {
        fps: 2.0,
        retention_minutes: 0.1,
        change_detect_secs: 1.0,
        sequence_len: 4,
        image_mean: 0.0,
        image_std: 1.0,
        frame_channels: SHAPE.channels,
        frame_height: SHAPE.height,
        frame_width: SHAPE.width,
        mode,
        capture_overrides: false,
        ..SystemConfig::default()
    }
}

// ── Light call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCall {
    GetState,
    TurnOn,
    TurnOff,
}

// ── MockRig ───────────────────────────────────────────────────

/// Camera + light + clock in one.  Commands take effect on the next poll.
pub struct MockRig {
    pub light: LightState,
    pub calls: Vec<LightCall>,
    pub polls: u64,
    /// `(poll number, on)`: the user flips the switch on that poll.
    pub flips: Vec<(u64, bool)>,
    pub unreachable: bool,
    pub fail_commands: bool,
    /// Accept commands but leave the bulb as it was.
    pub ignore_commands: bool,
    frames: u64,
}

impl MockRig {
    pub fn new() -> Self {
        Self {
            light: LightState {
                on: false,
                brightness: 80,
                color_temperature: 3000,
            },
            calls: Vec::new(),
            polls: 0,
            flips: Vec::new(),
            unreachable: false,
            fail_commands: false,
            ignore_commands: false,
            frames: 0,
        }
    }

    pub fn with_flips(mut self, flips: &[(u64, bool)]) -> Self {
        self.flips = flips.to_vec();
        self
    }

    pub fn commands(&self) -> Vec<LightCall> {
        self.calls
            .iter()
            .copied()
            .filter(|c| *c != LightCall::GetState)
            .collect()
    }

    /// Largest number of commands issued between two polls.
    pub fn max_commands_per_tick(&self) -> usize {
        self.calls
            .split(|c| *c == LightCall::GetState)
            .map(<[LightCall]>::len)
            .max()
            .unwrap_or(0)
    }

    fn command(&mut self, on: bool) -> Result<(), DeviceError> {
        self.calls.push(if on {
            LightCall::TurnOn
        } else {
            LightCall::TurnOff
        });
        if self.unreachable {
            return Err(DeviceError::Unreachable);
        }
        if self.fail_commands {
            return Err(DeviceError::Rejected);
        }
        if !self.ignore_commands {
            self.light.on = on;
        }
        Ok(())
    }
}

impl Default for MockRig {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraPort for MockRig {
    fn capture_frame(&mut self) -> Frame {
        self.frames += 1;
        Frame::new(SHAPE, vec![self.frames as u8; SHAPE.len()]).unwrap()
    }

    fn shape(&self) -> FrameShape {
        SHAPE
    }
}

impl ClockPort for MockRig {
    fn now_secs(&self) -> i64 {
        BASE_TS + self.polls as i64
    }
}

impl LightPort for MockRig {
    async fn get_state(&mut self) -> Result<LightState, DeviceError> {
        self.calls.push(LightCall::GetState);
        if self.unreachable {
            return Err(DeviceError::Unreachable);
        }
        self.polls += 1;
        if let Some(&(_, on)) = self.flips.iter().find(|(p, _)| *p == self.polls) {
            self.light.on = on;
        }
        Ok(self.light)
    }

    async fn turn_on(&mut self) -> Result<(), DeviceError> {
        self.command(true)
    }

    async fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.command(false)
    }
}

// ── Scripted scorer ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ScorerScript {
    /// Logits returned in order, cycling.
    pub logits: Vec<f32>,
    pub fail: bool,
    pub calls: usize,
}

pub type ScorerHandle = Rc<RefCell<ScorerScript>>;

pub struct ScriptedScorer(ScorerHandle);

impl ScriptedScorer {
    /// A boxed scorer plus a handle to steer it after the loop owns it.
    pub fn new(logits: Vec<f32>) -> (Box<dyn Scorer>, ScorerHandle) {
        let handle = Rc::new(RefCell::new(ScorerScript {
            logits,
            ..ScorerScript::default()
        }));
        (Box::new(Self(handle.clone())), handle)
    }

    pub fn constant(logit: f32) -> (Box<dyn Scorer>, ScorerHandle) {
        Self::new(vec![logit])
    }
}

impl Scorer for ScriptedScorer {
    fn score(&mut self, batch: &Batch) -> Result<f32, ScorerError> {
        let mut s = self.0.borrow_mut();
        assert_eq!(batch.frame_shape(), SHAPE);
        s.calls += 1;
        if s.fail {
            return Err(ScorerError::Backend);
        }
        let n = s.logits.len().max(1);
        Ok(s.logits.get((s.calls - 1) % n).copied().unwrap_or(0.0))
    }
}

// ── Recording store ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingStore {
    pub saved: Vec<(Snapshot, Option<String>)>,
    pub fail: Option<PersistenceError>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for RecordingStore {
    fn persist(
        &mut self,
        snapshot: Snapshot,
        name: Option<&str>,
    ) -> Result<SnapshotId, PersistenceError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.saved.push((snapshot, name.map(str::to_owned)));
        Ok(SnapshotId::new(format!("mem/{}", self.saved.len())))
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Driving helpers ───────────────────────────────────────────

/// Run `n` ticks synchronously and collect their outcomes.
pub fn run_ticks(
    lp: &mut ControlLoop,
    rig: &mut MockRig,
    store: &mut RecordingStore,
    sink: &mut RecordingSink,
    n: usize,
) -> Vec<TickOutcome> {
    (0..n)
        .map(|_| futures_lite::future::block_on(lp.tick(rig, store, sink)))
        .collect()
}
