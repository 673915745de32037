//! Inference adapter: turns a window of samples into a binary light intent.
//!
//! ```text
//!  Window (S samples) ──▶ normalise (x − mean) / std ──▶ Batch [S, C, H, W]
//!                                                          │
//!                          predicted_on = σ(logit) > 0.5 ◀─┘ Scorer::score
//! ```
//!
//! The scorer is opaque.  The adapter builds the batch, calls the scorer
//! exactly once, and drops the batch before returning.

use crate::app::ports::Scorer;
use crate::buffer::Window;
use crate::config::SystemConfig;
use crate::error::{Error, ScorerError};
use crate::sample::FrameShape;

/// Decision threshold on the squashed score.
pub const INTENT_THRESHOLD: f32 = 0.5;

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Normalised frames for one scorer call, chronological, channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    steps: usize,
    shape: FrameShape,
    data: Vec<f32>,
}

impl Batch {
    /// Number of frames (the sequence length `S`).
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn frame_shape(&self) -> FrameShape {
        self.shape
    }

    /// Flat `[S, C, H, W]` values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Normalised values of frame `t`.
    pub fn frame(&self, t: usize) -> &[f32] {
        let n = self.shape.len();
        &self.data[t * n..(t + 1) * n]
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// The model's opinion about the light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    /// Raw scorer output.
    pub logit: f32,
    /// Logistic of the logit.
    pub probability: f32,
    pub predicted_on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    /// Fewer than `S` samples buffered; the scorer was not invoked.
    Insufficient { available: usize, required: usize },
    Intent(Intent),
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct InferenceAdapter {
    sequence_len: usize,
    mean: f32,
    std: f32,
}

impl InferenceAdapter {
    pub fn new(sequence_len: usize, mean: f32, std: f32) -> Self {
        Self {
            sequence_len: sequence_len.max(1),
            mean,
            std,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.sequence_len, config.image_mean, config.image_std)
    }

    /// `S`, the number of samples one prediction consumes.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Normalise the last `S` frames of `window` into a batch.
    pub fn build_batch(&self, window: &Window<'_>) -> Result<Batch, Error> {
        if window.len() < self.sequence_len {
            return Err(Error::InsufficientHistory {
                required: self.sequence_len,
                available: window.len(),
            });
        }
        let skip = window.len() - self.sequence_len;
        let mut frames = window.iter().skip(skip).map(|s| s.frame());

        let Some(head) = frames.next() else {
            return Err(Error::InsufficientHistory {
                required: self.sequence_len,
                available: 0,
            });
        };
        let shape = head.shape();
        let mut data = Vec::with_capacity(shape.len() * self.sequence_len);
        let inv_std = 1.0 / self.std;

        for frame in core::iter::once(head).chain(frames) {
            if frame.shape() != shape {
                return Err(ScorerError::ShapeMismatch.into());
            }
            data.extend(frame.data().iter().map(|&v| (v as f32 - self.mean) * inv_std));
        }

        Ok(Batch {
            steps: self.sequence_len,
            shape,
            data,
        })
    }

    /// Score the last `S` samples.  Insufficient history is not an error;
    /// it yields [`Prediction::Insufficient`] without calling the scorer.
    pub fn predict(
        &self,
        window: &Window<'_>,
        scorer: &mut (impl Scorer + ?Sized),
    ) -> Result<Prediction, ScorerError> {
        let batch = match self.build_batch(window) {
            Ok(b) => b,
            Err(Error::InsufficientHistory {
                required,
                available,
            }) => {
                return Ok(Prediction::Insufficient {
                    available,
                    required,
                });
            }
            Err(Error::Scorer(e)) => return Err(e),
            Err(_) => return Err(ScorerError::Backend),
        };

        let logit = scorer.score(&batch)?;
        if !logit.is_finite() {
            return Err(ScorerError::NonFinite);
        }
        let probability = sigmoid(logit);
        Ok(Prediction::Intent(Intent {
            logit,
            probability,
            predicted_on: probability > INTENT_THRESHOLD,
        }))
    }
}

/// Logistic squashing function.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
