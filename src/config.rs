//! System configuration parameters
//!
//! All tunable parameters for the lightwatch service.
//! Values are loaded from a JSON file through [`ConfigPort`] and can be
//! overridden from the command line.
//!
//! [`ConfigPort`]: crate::app::ports::ConfigPort

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sample::FrameShape;

/// How the control loop behaves for the whole run.  Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Never actuate; persist every confirmed genuine transition.
    ObserveOnly,
    /// Actuate from model predictions; never persist self-induced changes.
    Autonomous,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop rate (ticks per second).
    pub fps: f32,
    /// How much history the sample buffer retains (minutes).
    pub retention_minutes: f32,
    /// How long a new light state must hold before it counts (seconds).
    pub change_detect_secs: f32,

    // --- Inference ---
    /// Number of samples the scorer consumes per prediction.
    pub sequence_len: usize,
    /// Normalisation mean applied to every frame value.
    pub image_mean: f32,
    /// Normalisation standard deviation applied to every frame value.
    pub image_std: f32,
    /// Path to the scorer's model file.
    pub model_path: String,

    // --- Frames ---
    pub frame_channels: usize,
    pub frame_height: usize,
    pub frame_width: usize,

    // --- Behaviour ---
    /// Observe-only or autonomous.
    pub mode: OperatingMode,
    /// In autonomous mode, also persist transitions a user caused
    /// (overriding the model).  Ignored in observe-only mode.
    pub capture_overrides: bool,

    // --- Storage ---
    /// Directory snapshots are written to.
    pub storage_dir: String,
    /// Hand snapshots to a background writer instead of writing inline.
    pub background_persistence: bool,

    // --- Devices ---
    /// Upper bound on a single light-device call (milliseconds).
    pub light_timeout_ms: u32,

    // --- Reporting ---
    /// Telemetry report interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            fps: 2.0,
            retention_minutes: 0.35, // 2 * 60 * 0.35 = 42 samples
            change_detect_secs: 2.5, // 5 ticks at 2 Hz

            // Inference
            sequence_len: 20,
            image_mean: 68.413,
            image_std: 63.906,
            model_path: "model.json".into(),

            // Frames
            frame_channels: 3,
            frame_height: 64,
            frame_width: 64,

            // Behaviour
            mode: OperatingMode::Autonomous,
            capture_overrides: false,

            // Storage
            storage_dir: "data".into(),
            background_persistence: true,

            // Devices
            light_timeout_ms: 3000,

            // Reporting
            telemetry_interval_secs: 60,
        }
    }
}

impl SystemConfig {
    /// Wall-clock duration of one tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps)
    }

    /// Sample buffer capacity `N`, derived from rate and retention.
    pub fn buffer_capacity(&self) -> usize {
        ((self.fps as f64 * 60.0 * self.retention_minutes as f64).round() as usize).max(1)
    }

    /// Detection lag `D` in ticks.  The detector inspects `D + 1` samples.
    pub fn detect_lag(&self) -> usize {
        ((self.change_detect_secs * self.fps).round() as usize).max(1)
    }

    /// Ticks after which a still-unconfirmed command is reported.
    pub fn actuation_settle_ticks(&self) -> u64 {
        (self.detect_lag() as u64 * 2).max(2)
    }

    /// Ticks between telemetry reports.
    pub fn telemetry_interval_ticks(&self) -> u64 {
        ((self.telemetry_interval_secs as f32 * self.fps).round() as u64).max(1)
    }

    pub fn frame_shape(&self) -> FrameShape {
        FrameShape::new(self.frame_channels, self.frame_height, self.frame_width)
    }

    pub fn light_timeout(&self) -> Duration {
        Duration::from_millis(self.light_timeout_ms as u64)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0 && self.fps <= 60.0) {
            return Err(ConfigError::ValidationFailed("fps must be in (0, 60]"));
        }
        if !(self.retention_minutes.is_finite()
            && self.retention_minutes > 0.0
            && self.retention_minutes <= 60.0)
        {
            return Err(ConfigError::ValidationFailed(
                "retention_minutes must be in (0, 60]",
            ));
        }
        if !(self.change_detect_secs.is_finite() && self.change_detect_secs > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "change_detect_secs must be positive",
            ));
        }
        if self.detect_lag() + 1 > self.buffer_capacity() {
            return Err(ConfigError::ValidationFailed(
                "detection window exceeds buffer capacity",
            ));
        }
        if self.sequence_len == 0 || self.sequence_len > self.buffer_capacity() {
            return Err(ConfigError::ValidationFailed(
                "sequence_len must be 1..=buffer capacity",
            ));
        }
        if !self.image_mean.is_finite() {
            return Err(ConfigError::ValidationFailed("image_mean must be finite"));
        }
        if !(self.image_std.is_finite() && self.image_std > 0.0) {
            return Err(ConfigError::ValidationFailed("image_std must be positive"));
        }
        if !(1..=4).contains(&self.frame_channels) {
            return Err(ConfigError::ValidationFailed("frame_channels must be 1–4"));
        }
        if !(1..=4096).contains(&self.frame_height) || !(1..=4096).contains(&self.frame_width) {
            return Err(ConfigError::ValidationFailed(
                "frame_height and frame_width must be 1–4096",
            ));
        }
        if self.storage_dir.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("storage_dir must not be empty"));
        }
        if !(100..=60_000).contains(&self.light_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "light_timeout_ms must be 100–60000",
            ));
        }
        if !(1..=3600).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be 1–3600",
            ));
        }
        Ok(())
    }
}
