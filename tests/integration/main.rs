//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock devices.  All tests run on the host with no camera or
//! light attached.

mod control_loop_tests;
mod mock_devices;
