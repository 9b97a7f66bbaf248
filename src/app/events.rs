//! Outbound application events.
//!
//! The [`WateringController`](super::controller::WateringController) emits
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! on the other side decide what to do with them: log to serial, refresh
//! the LCD status line, and so on.

use serde::Serialize;

use crate::calibration::CalibrationOutcome;
use crate::error::{Error, SensorError};
use crate::sequencer::SequencePhase;

use super::commands::RequestSource;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has been constructed from the loaded settings.
    Started { calibrated: bool, auto_mode: bool },

    /// The sequencer moved between phases.
    PhaseChanged {
        from: SequencePhase,
        to: SequencePhase,
    },

    /// A dispense sequence was started.  `duration_ms` is `None` for an
    /// open-ended manual run.
    WateringStarted {
        source: RequestSource,
        duration_ms: Option<u32>,
    },

    /// A watering attempt was refused.
    WateringRejected { source: RequestSource, error: Error },

    /// A calibration trial was submitted.
    Calibration(CalibrationOutcome),

    AutoModeChanged(bool),

    /// A settings value changed and has not been saved yet.
    SettingsChanged,

    /// A non-watering command was refused.
    CommandRejected(Error),

    EmergencyStop,

    /// A sensor stopped answering while the pump was running.
    SensorFault(SensorError),

    /// Point-in-time status snapshot.
    Status(ControllerStatus),
}

/// A point-in-time status snapshot for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerStatus {
    pub phase: SequencePhase,
    /// Milliseconds left in the current phase, `None` when idle.
    pub phase_remaining_ms: Option<u64>,
    pub pump_energized: bool,
    /// Emergency stops since boot.
    pub emergency_stops: u32,
    pub auto_mode: bool,
    /// Milliseconds until the next automatic attempt, `None` when off.
    pub next_auto_ms: Option<u64>,
    pub calibration_factor_ms: Option<u32>,
    /// Hard ceiling on a single dispense.
    pub max_dispense_ms: u32,
    pub target_volume: f32,
    /// Clock time of the last dispense that actually started.
    pub last_watered_ms: Option<u64>,
    /// From the most recent gate evaluation.
    pub moisture_percent: Option<u8>,
    pub water_present: Option<bool>,
    pub settings_dirty: bool,
}
