//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WateringController (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, clocks, event sinks, settings
//! storage) implement these traits.  The
//! [`WateringController`](super::controller::WateringController) consumes
//! them via generics, so the domain core never touches hardware directly.
//! Bounded hardware waits go through [`embedded_hal::delay::DelayNs`].

use crate::config::Settings;
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the soil and standing-water sensors.
///
/// The sensors are only powered while a reading is taken.  The caller owns
/// the bracket: `power_on`, wait, read, `power_off`.
pub trait SensorPort {
    /// Energise the sensor supply.
    fn power_on(&mut self) -> Result<(), SensorError>;

    /// De-energise the sensor supply.  Must be safe to call repeatedly.
    fn power_off(&mut self);

    /// Soil moisture, 0–100 %.
    fn read_moisture_percent(&mut self) -> Result<u8, SensorError>;

    /// `true` when standing water is detected.
    fn read_water_presence(&mut self) -> Result<bool, SensorError>;
}

/// One ADC channel.  `embedded-hal` 1.0 has no ADC trait, so the board
/// adapter wraps its driver in this.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the valve and pump.
///
/// Only the [`Sequencer`](crate::sequencer::Sequencer) holds an
/// implementation of this trait.  Methods are infallible: a write that
/// fails is logged by the adapter, never propagated, so an emergency stop
/// can always complete.
pub trait ActuatorPort {
    /// Drive the valve output open (`true`) or closed (`false`).
    fn set_valve(&mut self, open: bool);

    /// Energise the pump at the given duty (1–100).
    fn set_pump(&mut self, duty_percent: u8);

    /// Immediately de-energise the pump.
    fn stop_pump(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond counter, sampled once per main-loop cycle.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, LCD
/// status line, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: domain ↔ persistent settings)
// ───────────────────────────────────────────────────────────────

/// Loads and persists user [`Settings`].
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`SettingsError::ValidationFailed`] instead of clamping.
pub trait SettingsPort {
    /// Load settings.  Returns [`Settings::default()`] if nothing is stored.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Validate and persist settings.
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`SettingsPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// No settings found in storage (first boot).
    NotFound,
    /// Stored blob failed to deserialize.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "settings not found"),
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
