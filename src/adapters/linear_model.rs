//! Linear scorer over per-frame channel means.
//!
//! A small stand-in for a trained network, loadable from JSON:
//!
//! ```json
//! { "bias": -0.4, "weights": [0.1, 0.1, 0.1, ...] }
//! ```
//!
//! For a batch `[S, C, H, W]` the features are the `S × C` per-frame,
//! per-channel means of the normalised values (frame-major).  The logit
//! is `bias + Σ weights[i] · features[i]`.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::Scorer;
use crate::error::{Error, ScorerError};
use crate::inference::Batch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    bias: f32,
    weights: Vec<f32>,
}

impl LinearScorer {
    pub fn new(bias: f32, weights: Vec<f32>) -> Self {
        Self { bias, weights }
    }

    /// Read a model file.  Any failure is a [`Error::ModelLoad`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|_| Error::ModelLoad("model file unreadable"))?;
        let model: Self =
            serde_json::from_str(&text).map_err(|_| Error::ModelLoad("model file malformed"))?;
        if model.weights.is_empty() {
            return Err(Error::ModelLoad("model has no weights"));
        }
        if !model.bias.is_finite() || model.weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::ModelLoad("model has non-finite parameters"));
        }
        info!(
            "LinearScorer: loaded {} weights from {}",
            model.weights.len(),
            path.display()
        );
        Ok(model)
    }

    /// Number of features the model expects (`S × C`).
    pub fn input_len(&self) -> usize {
        self.weights.len()
    }

    /// Check the model fits the configured sequence length and channels.
    pub fn check_inputs(&self, sequence_len: usize, channels: usize) -> Result<(), Error> {
        if self.weights.len() == sequence_len * channels {
            Ok(())
        } else {
            Err(Error::ModelLoad(
                "model input size does not match sequence_len x frame_channels",
            ))
        }
    }
}

impl Scorer for LinearScorer {
    fn score(&mut self, batch: &Batch) -> Result<f32, ScorerError> {
        let shape = batch.frame_shape();
        let plane = shape.plane_len();
        if plane == 0 || batch.steps() * shape.channels != self.weights.len() {
            return Err(ScorerError::ShapeMismatch);
        }

        let features = (0..batch.steps()).flat_map(|t| {
            batch
                .frame(t)
                .chunks_exact(plane)
                .map(|channel| channel.iter().sum::<f32>() / plane as f32)
        });
        let logit = self.bias
            + features
                .zip(&self.weights)
                .map(|(f, w)| f * w)
                .sum::<f32>();

        if logit.is_finite() {
            Ok(logit)
        } else {
            Err(ScorerError::NonFinite)
        }
    }
}
