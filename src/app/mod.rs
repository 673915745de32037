//! Application core: pure domain logic, no direct I/O.
//!
//! This module contains the decision rules for lightwatch: the per-tick
//! control loop, its decision state, and the events and commands that
//! cross its boundary.  All interaction with devices and storage happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without a camera or a light.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
