//! Unified error types for the Irrigo watering core.
//!
//! Every variant is `Copy` so results can be handed to the display layer
//! and logged without allocation.  None of these are fatal: each one is a
//! condition the user can resolve (wait, calibrate, pick another value).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level watering error
// ---------------------------------------------------------------------------

/// Every watering request (manual, automatic, calibration) funnels into this
/// type.  Results are surfaced to the caller unchanged; the core never
/// retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The safety gate refused the dispense.
    Denied(DenyReason),
    /// No calibration factor has been recorded yet.
    Uncalibrated,
    /// A duration, volume, or interval was non-positive or above the ceiling.
    InvalidDuration,
    /// The sequencer is already running a dispense sequence.
    Busy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied(reason) => write!(f, "denied: {reason}"),
            Self::Uncalibrated => write!(f, "pump not calibrated"),
            Self::InvalidDuration => write!(f, "invalid duration"),
            Self::Busy => write!(f, "watering already in progress"),
        }
    }
}

impl From<DenyReason> for Error {
    fn from(reason: DenyReason) -> Self {
        Self::Denied(reason)
    }
}

// ---------------------------------------------------------------------------
// Gate denial reasons
// ---------------------------------------------------------------------------

/// Why the safety gate refused a dispense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Soil moisture is at or above the saturation threshold.
    SoilSaturated,
    /// Standing water was detected under the plant.
    WaterAlreadyPresent,
    /// A reading could not be taken, so the gate fails closed.
    SensorFault(SensorError),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SoilSaturated => write!(f, "soil saturated"),
            Self::WaterAlreadyPresent => write!(f, "water already present"),
            Self::SensorFault(e) => write!(f, "sensor fault ({e})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// The sensor supply switch could not be driven.
    PowerSwitchFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::PowerSwitchFailed => write!(f, "sensor power switch failed"),
        }
    }
}

impl From<SensorError> for DenyReason {
    fn from(e: SensorError) -> Self {
        Self::SensorFault(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
