//! Irrigo watering controller library.
//!
//! Exposes the pure-logic modules for integration testing and the firmware
//! binary.  Board-specific code is behind the `espidf` feature; everything
//! else builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod calibration;
pub mod config;
pub mod error;
pub mod safety;
pub mod scheduler;
pub mod sequencer;

pub mod adapters;
pub mod drivers;
pub mod sensors;
