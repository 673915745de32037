//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (an operator,
//! a test harness) that the [`ControlLoop`](super::service::ControlLoop)
//! interprets between ticks.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    /// Drop all buffered history and forget any pending actuation.
    Reset,

    /// Export the buffer now.  `name` overrides the generated file name.
    SaveSnapshot { name: Option<String> },
}
