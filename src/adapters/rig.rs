//! Device rig: bundles the camera, light and clock behind the port traits.
//!
//! The control loop takes one `&mut` that satisfies [`CameraPort`],
//! [`LightPort`] and [`ClockPort`] together.  [`DeviceRig`] is that value:
//! it owns one adapter per port and forwards each call.

use crate::app::ports::{CameraPort, ClockPort, LightPort};
use crate::error::DeviceError;
use crate::sample::{Frame, FrameShape, LightState};

/// Concrete adapter that combines all devices behind port traits.
pub struct DeviceRig<C, L, K> {
    camera: C,
    light: L,
    clock: K,
}

impl<C, L, K> DeviceRig<C, L, K> {
    pub fn new(camera: C, light: L, clock: K) -> Self {
        Self {
            camera,
            light,
            clock,
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn light(&self) -> &L {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut L {
        &mut self.light
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }
}

// ── CameraPort implementation ─────────────────────────────────

impl<C: CameraPort, L, K> CameraPort for DeviceRig<C, L, K> {
    fn capture_frame(&mut self) -> Frame {
        self.camera.capture_frame()
    }

    fn shape(&self) -> FrameShape {
        self.camera.shape()
    }
}

// ── LightPort implementation ──────────────────────────────────

impl<C, L: LightPort, K> LightPort for DeviceRig<C, L, K> {
    async fn get_state(&mut self) -> Result<LightState, DeviceError> {
        self.light.get_state().await
    }

    async fn turn_on(&mut self) -> Result<(), DeviceError> {
        self.light.turn_on().await
    }

    async fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.light.turn_off().await
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl<C, L, K: ClockPort> ClockPort for DeviceRig<C, L, K> {
    fn now_secs(&self) -> i64 {
        self.clock.now_secs()
    }
}
