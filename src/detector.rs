//! Light transition detection.
//!
//! A pure comparator over the last `D + 1` light `on` flags, where `D` is
//! the configured lag in ticks.  With `first`, `second` and `last` at
//! window positions `0`, `1` and `D`:
//!
//! ```text
//!   genuine  ⇔  last ≠ first  ∧  last = second
//!
//!   D = 2     [off, on,  on ]  → GenuineTransition { to_on: true }
//!             [off, off, on ]  → NoChange   (not yet confirmed)
//!             [on,  off, on ]  → NoChange   (flicker)
//! ```
//!
//! Requiring `second` to already hold the new value means the new state
//! must be seen on at least two consecutive samples, which filters out
//! single-sample flicker.

use crate::buffer::Window;
use crate::sample::Sample;

/// Result of classifying one detection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Fewer than `D + 1` samples are buffered; no decision.
    Insufficient { available: usize, required: usize },
    /// The light holds its state, or the change is not yet confirmed.
    NoChange,
    /// The light changed to `to_on` and the change is confirmed.
    GenuineTransition { to_on: bool },
}

impl Transition {
    pub fn is_genuine(&self) -> bool {
        matches!(self, Self::GenuineTransition { .. })
    }
}

/// Stateless windowed comparator configured with the lag `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDetector {
    lag: usize,
}

impl TransitionDetector {
    /// `lag` is raised to at least one tick.
    pub fn new(lag: usize) -> Self {
        Self { lag: lag.max(1) }
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Number of samples one classification consumes (`D + 1`).
    pub fn window_len(&self) -> usize {
        self.lag + 1
    }

    /// Classify a buffer window.  Only the last `D + 1` entries count.
    pub fn classify(&self, window: &Window<'_>) -> Transition {
        let required = self.window_len();
        if window.len() < required {
            return Transition::Insufficient {
                available: window.len(),
                required,
            };
        }
        let offset = window.len() - required;
        let on = |i: usize| window.get(offset + i).is_some_and(Sample::is_on);
        Self::decide(on(0), on(1), on(self.lag))
    }

    /// Classify a literal sequence of `on` flags, oldest first.
    pub fn classify_states(&self, states: &[bool]) -> Transition {
        let required = self.window_len();
        if states.len() < required {
            return Transition::Insufficient {
                available: states.len(),
                required,
            };
        }
        let window = &states[states.len() - required..];
        Self::decide(window[0], window[1], window[self.lag])
    }

    fn decide(first: bool, second: bool, last: bool) -> Transition {
        if last != first && last == second {
            Transition::GenuineTransition { to_on: last }
        } else {
            Transition::NoChange
        }
    }
}
