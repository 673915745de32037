//! Smart-light adapters.
//!
//! - [`SimulatedLight`]: in-memory bulb for host runs and tests.  Can be
//!   scripted to flip on its own (a simulated user) or to go unreachable.
//! - [`TimeoutLight`]: wraps any [`LightPort`] and bounds every call with
//!   an `async-io-mini` reactor timer.

use core::future::Future;
use core::time::Duration;

use log::{debug, info};

use crate::app::ports::LightPort;
use crate::error::DeviceError;
use crate::sample::LightState;

/// Timeout applied to light calls when none is configured.
pub const DEFAULT_LIGHT_TIMEOUT: Duration = Duration::from_secs(3);

// ───────────────────────────────────────────────────────────────
// Simulated light
// ───────────────────────────────────────────────────────────────

pub struct SimulatedLight {
    state: LightState,
    reachable: bool,
    /// Flip the light every `n` polls, as a user at the switch would.
    toggle_every: Option<u64>,
    polls: u64,
    commands: u64,
}

impl SimulatedLight {
    pub fn new(initial: LightState) -> Self {
        Self {
            state: initial,
            reachable: true,
            toggle_every: None,
            polls: 0,
            commands: 0,
        }
    }

    /// Flip the light on its own every `polls` state queries.
    pub fn with_user_toggle(mut self, polls: u64) -> Self {
        self.toggle_every = (polls > 0).then_some(polls);
        self
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    /// Successful commands received.
    pub fn commands(&self) -> u64 {
        self.commands
    }

    fn set_on(&mut self, on: bool) -> Result<(), DeviceError> {
        if !self.reachable {
            return Err(DeviceError::Unreachable);
        }
        self.state.on = on;
        if on && self.state.brightness == 0 {
            self.state.brightness = 100;
        }
        self.commands += 1;
        debug!("SimulatedLight: switched {}", if on { "on" } else { "off" });
        Ok(())
    }
}

impl Default for SimulatedLight {
    fn default() -> Self {
        Self::new(LightState {
            on: false,
            brightness: 100,
            color_temperature: 2700,
        })
    }
}

impl LightPort for SimulatedLight {
    async fn get_state(&mut self) -> Result<LightState, DeviceError> {
        if !self.reachable {
            return Err(DeviceError::Unreachable);
        }
        self.polls += 1;
        if self.toggle_every.is_some_and(|n| self.polls % n == 0) {
            self.state.on = !self.state.on;
            info!("SimulatedLight: user switched light {}", if self.state.on { "on" } else { "off" });
        }
        Ok(self.state)
    }

    async fn turn_on(&mut self) -> Result<(), DeviceError> {
        self.set_on(true)
    }

    async fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.set_on(false)
    }
}

// ───────────────────────────────────────────────────────────────
// Timeout wrapper
// ───────────────────────────────────────────────────────────────

/// Bounds each call of the wrapped light.  A call still pending when the
/// timer fires is dropped and reported as [`DeviceError::Timeout`].
pub struct TimeoutLight<L> {
    inner: L,
    timeout: Duration,
}

impl<L: LightPort> TimeoutLight<L> {
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, DeviceError>>,
) -> Result<T, DeviceError> {
    futures_lite::future::or(call, async {
        async_io_mini::Timer::after(timeout).await;
        Err(DeviceError::Timeout)
    })
    .await
}

impl<L: LightPort> LightPort for TimeoutLight<L> {
    async fn get_state(&mut self) -> Result<LightState, DeviceError> {
        bounded(self.timeout, self.inner.get_state()).await
    }

    async fn turn_on(&mut self) -> Result<(), DeviceError> {
        bounded(self.timeout, self.inner.turn_on()).await
    }

    async fn turn_off(&mut self) -> Result<(), DeviceError> {
        bounded(self.timeout, self.inner.turn_off()).await
    }
}
