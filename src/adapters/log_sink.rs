//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (rendered by the binary's tracing subscriber).
//! Per-tick predictions go to `debug`; everything else is `info` or `warn`.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as a one-line record.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | ticks={} | buffer={}/{} | light={} bri={} ct={}K | cause={:?} | \
                     snaps={} (failed {}) | cmds={} (failed {}) | light_err={} scorer_err={} | \
                     overruns={}",
                    t.tick_count,
                    t.buffer_len,
                    t.buffer_capacity,
                    if t.light.on { "ON" } else { "OFF" },
                    t.light.brightness,
                    t.light.color_temperature,
                    t.cause,
                    t.snapshots_saved,
                    t.snapshot_failures,
                    t.commands_issued,
                    t.command_failures,
                    t.light_failures,
                    t.scorer_failures,
                    t.deadline_misses
                        .map_or_else(|| "-".to_owned(), |n| n.to_string()),
                );
            }
            AppEvent::Started {
                mode,
                capacity,
                lag,
                sequence_len,
            } => {
                info!(
                    "START | mode={:?} capacity={} lag={} seq={}",
                    mode, capacity, lag, sequence_len
                );
            }
            AppEvent::TransitionDetected { to_on, cause } => {
                info!(
                    "TRANS | light {} | cause={:?}",
                    if *to_on { "ON" } else { "OFF" },
                    cause
                );
            }
            AppEvent::SnapshotSaved(id) => info!("SNAP  | saved {}", id),
            AppEvent::SnapshotFailed(e) => warn!("SNAP  | failed: {}", e),
            AppEvent::Prediction {
                predicted_on,
                probability,
            } => {
                debug!(
                    "PRED  | {} p={:.3}",
                    if *predicted_on { "ON" } else { "OFF" },
                    probability
                );
            }
            AppEvent::Actuated { on } => {
                info!("ACT   | turned {}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::ActuationFailed { on, error } => {
                warn!(
                    "ACT   | turn {} failed: {}",
                    if *on { "ON" } else { "OFF" },
                    error
                );
            }
            AppEvent::CommandUnconfirmed { on, ticks } => {
                warn!(
                    "ACT   | turn {} unconfirmed after {} ticks",
                    if *on { "ON" } else { "OFF" },
                    ticks
                );
            }
            AppEvent::LightUnavailable(e) => warn!("LIGHT | unavailable: {}", e),
            AppEvent::ScorerFailed(e) => warn!("MODEL | scorer failed: {}", e),
        }
    }
}
