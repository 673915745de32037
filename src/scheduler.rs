//! Tick pacing and the top-level run loop.
//!
//! The control loop runs at a fixed rate.  [`TickPacer`] turns the time a
//! tick took into the wait before the next one and keeps overrun
//! statistics; [`run_loop`] drives [`ControlLoop::tick`] with it.
//!
//! ```text
//!   ┌────────┐  elapsed  ┌───────────┐  remaining  ┌──────────────┐
//!   │  tick  │──────────▶│ TickPacer │────────────▶│ Timer::after │──┐
//!   └────────┘           └───────────┘             └──────────────┘  │
//!       ▲                                                            │
//!       └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A tick that overruns its period is counted as a deadline miss and the
//! next tick starts immediately; missed ticks are never replayed.

use core::time::Duration;
use std::time::Instant;

use log::{debug, info};

use crate::app::events::AppEvent;
use crate::app::ports::{CameraPort, ClockPort, EventSink, LightPort, SnapshotStore};
use crate::app::service::ControlLoop;

// ═══════════════════════════════════════════════════════════════
//  TickPacer
// ═══════════════════════════════════════════════════════════════

/// Fixed-period pacing with overrun bookkeeping.
#[derive(Debug, Clone)]
pub struct TickPacer {
    period: Duration,
    ticks: u64,
    deadline_misses: u64,
    worst_tick: Duration,
}

impl TickPacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticks: 0,
            deadline_misses: 0,
            worst_tick: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait still owed for a tick that took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.period.saturating_sub(elapsed)
    }

    /// Record a finished tick and return the wait before the next one.
    pub fn record(&mut self, elapsed: Duration) -> Duration {
        self.ticks += 1;
        self.worst_tick = self.worst_tick.max(elapsed);
        if elapsed > self.period {
            self.deadline_misses += 1;
            debug!(
                "TickPacer: tick {} overran by {:?}",
                self.ticks,
                elapsed - self.period
            );
        }
        self.remaining(elapsed)
    }

    /// Ticks recorded so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn deadline_misses(&self) -> u64 {
        self.deadline_misses
    }

    /// Longest tick seen.
    pub fn worst_tick(&self) -> Duration {
        self.worst_tick
    }
}

// ═══════════════════════════════════════════════════════════════
//  Run loop
// ═══════════════════════════════════════════════════════════════

/// Limits and reporting cadence for [`run_loop`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Stop after this many ticks.  `None` runs forever.
    pub max_ticks: Option<u64>,
    /// Emit a telemetry event every this many ticks.
    pub telemetry_every: u64,
}

/// Start `control` and tick it at the pacer's rate.
///
/// Returns the number of ticks run, which only happens when
/// `options.max_ticks` is set.
pub async fn run_loop(
    control: &mut ControlLoop,
    rig: &mut (impl CameraPort + LightPort + ClockPort),
    store: &mut impl SnapshotStore,
    sink: &mut impl EventSink,
    pacer: &mut TickPacer,
    options: RunOptions,
) -> u64 {
    control.start(sink);
    let telemetry_every = options.telemetry_every.max(1);

    while options.max_ticks.is_none_or(|max| pacer.ticks() < max) {
        let started = Instant::now();
        control.tick(rig, store, sink).await;
        let wait = pacer.record(started.elapsed());

        if pacer.ticks() % telemetry_every == 0 {
            let telemetry = control.build_telemetry(Some(pacer.deadline_misses()));
            sink.emit(&AppEvent::Telemetry(telemetry));
        }

        if !wait.is_zero() {
            async_io_mini::Timer::after(wait).await;
        }
    }

    info!(
        "Run loop finished: {} ticks, {} deadline misses, worst tick {:?}",
        pacer.ticks(),
        pacer.deadline_misses(),
        pacer.worst_tick()
    );
    pacer.ticks()
}
