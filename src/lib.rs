//! Lightwatch library.
//!
//! Samples a camera and a networked smart light at a fixed rate, keeps a
//! bounded history of synchronized (frame, light-state) samples, persists
//! that history when the light genuinely changes state, and optionally
//! drives the light from a model's prediction without ever mistaking its
//! own command for someone else's.
//!
//! The domain core ([`buffer`], [`detector`], [`inference`], [`app`]) is
//! pure logic behind port traits; [`adapters`] holds the host
//! implementations the binary wires together.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod buffer;
pub mod config;
pub mod detector;
pub mod error;
pub mod inference;
pub mod sample;
pub mod scheduler;
pub mod snapshot;
