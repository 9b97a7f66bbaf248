//! Inbound commands and watering requests.
//!
//! [`AppCommand`]s come from the outside world (front-panel buttons, the
//! menu layer, a serial console) and are interpreted by the
//! [`WateringController`](super::controller::WateringController).  Every
//! dispense path is turned into a transient [`WateringRequest`] that lives
//! only for the duration of one attempt.

use crate::config::PumpSpeed;

/// Commands that input adapters can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Manual control asserted: water until released.
    StartManual(PumpSpeed),

    /// Manual control released.
    StopManual,

    /// Run the pump for a literal duration as a calibration trial.
    CalibrationDispense { duration_ms: u32 },

    /// User verdict on the last calibration trial.
    ConfirmCalibration {
        test_duration_ms: u32,
        confirmed: bool,
    },

    /// Turn automatic mode on with the given interval.
    EnableAuto { interval_ms: u64 },

    DisableAuto,

    /// Volume dispensed per automatic watering, in calibration units.
    SetTargetVolume(f32),

    /// Speed tier used by automatic and calibration runs.
    SetAutoSpeed(PumpSpeed),

    /// Forget the calibration factor (also turns automatic mode off).
    ResetCalibration,

    /// Water the target volume now, outside the schedule.
    ForceWatering,

    EmergencyStop,
}

/// Who asked for water.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    Manual,
    Automatic,
    /// On-demand volume dispense ("water now").
    Forced,
    CalibrationTest,
}

/// What the request wants dispensed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispenseTarget {
    /// Volume in calibration units, converted through the calibration factor.
    Volume(f32),
    /// Literal pump run time; bypasses the calibration factor.
    Duration(u32),
    /// Open-ended run, ended by a stop call or the dispense ceiling.
    UntilStopped,
}

/// One watering attempt.  Never stored beyond the attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WateringRequest {
    pub target: DispenseTarget,
    pub speed: PumpSpeed,
    pub source: RequestSource,
}
