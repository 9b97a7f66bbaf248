//! Application core: pure domain logic, zero I/O.
//!
//! This module wires the watering rules together: the controller that owns
//! the safety gate, calibration engine, sequencer and scheduler, plus the
//! inbound commands and outbound events it speaks.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod console;
pub mod controller;
pub mod events;
pub mod ports;
