//! Serial console command interpreter.
//!
//! Turns one line of text into a [`ConsoleRequest`].  Words are separated
//! by whitespace and matched case-insensitively.
//!
//! | Line                       | Request                                   |
//! |----------------------------|-------------------------------------------|
//! | `water [low\|mid\|high]`   | manual watering, auto speed by default    |
//! | `stop`                     | end manual watering                       |
//! | `estop`                    | emergency stop                            |
//! | `force`                    | water the target volume now               |
//! | `cal <seconds>`            | calibration trial of that length          |
//! | `yes` / `no`               | verdict on the last trial                 |
//! | `auto on [minutes]`        | automatic mode, current interval default  |
//! | `auto off`                 | automatic mode off                        |
//! | `volume <units>`           | target volume per automatic watering      |
//! | `speed <low\|mid\|high>`   | speed for automatic and calibration runs  |
//! | `reset-cal`                | forget the calibration factor             |
//! | `save` / `status` / `debug` / `help` | console-only actions            |
//!
//! The interpreter remembers the length of the last `cal` trial so the
//! verdict can be given as a bare `yes` or `no`.

use core::fmt;

use crate::config::{PumpSpeed, Settings};

use super::commands::AppCommand;

/// Shown for `help` and after an unknown command.
pub const HELP: &str = "commands: water [low|mid|high], stop, estop, force, cal <s>, yes, no, \
auto on [min], auto off, volume <units>, speed <low|mid|high>, reset-cal, save, status, debug";

/// What a console line asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleRequest {
    /// Forward to the controller.
    Command(AppCommand),
    /// Persist the current settings.
    SaveSettings,
    /// Print a status snapshot.
    Status,
    /// Print raw sensor codes and actuator state.
    Debug,
    Help,
}

/// Why a console line was not understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    UnknownCommand,
    MissingArgument(&'static str),
    InvalidArgument(&'static str),
    /// `yes`/`no` without a preceding `cal`.
    NoTrialPending,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingArgument(what) => write!(f, "missing {what}"),
            Self::InvalidArgument(what) => write!(f, "invalid {what}"),
            Self::NoTrialPending => write!(f, "no calibration trial to confirm"),
        }
    }
}

/// Stateful line interpreter.
#[derive(Debug, Default)]
pub struct Console {
    pending_trial_ms: Option<u32>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the trial a `yes`/`no` would answer.
    pub fn pending_trial_ms(&self) -> Option<u32> {
        self.pending_trial_ms
    }

    /// Interpret one line.  `Ok(None)` for a blank line.  `current` supplies
    /// the defaults for optional arguments.
    pub fn interpret(
        &mut self,
        line: &str,
        current: &Settings,
    ) -> Result<Option<ConsoleRequest>, ConsoleError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let verb = verb.to_ascii_lowercase();

        let request = match verb.as_str() {
            "water" => {
                let speed = match arg {
                    Some(word) => parse_speed(word)?,
                    None => current.speed,
                };
                ConsoleRequest::Command(AppCommand::StartManual(speed))
            }
            "stop" => ConsoleRequest::Command(AppCommand::StopManual),
            "estop" => ConsoleRequest::Command(AppCommand::EmergencyStop),
            "force" => ConsoleRequest::Command(AppCommand::ForceWatering),
            "cal" => {
                let seconds: u32 = parse_arg(arg, "seconds")?;
                let duration_ms = seconds
                    .checked_mul(1_000)
                    .ok_or(ConsoleError::InvalidArgument("seconds"))?;
                self.pending_trial_ms = Some(duration_ms);
                ConsoleRequest::Command(AppCommand::CalibrationDispense { duration_ms })
            }
            "yes" | "no" => {
                let test_duration_ms = self
                    .pending_trial_ms
                    .take()
                    .ok_or(ConsoleError::NoTrialPending)?;
                ConsoleRequest::Command(AppCommand::ConfirmCalibration {
                    test_duration_ms,
                    confirmed: verb == "yes",
                })
            }
            "auto" => match arg.map(str::to_ascii_lowercase).as_deref() {
                Some("on") => {
                    let interval_ms = match words.next() {
                        Some(word) => {
                            let minutes: u64 = parse_arg(Some(word), "minutes")?;
                            minutes
                                .checked_mul(60_000)
                                .ok_or(ConsoleError::InvalidArgument("minutes"))?
                        }
                        None => current.interval_ms,
                    };
                    ConsoleRequest::Command(AppCommand::EnableAuto { interval_ms })
                }
                Some("off") => ConsoleRequest::Command(AppCommand::DisableAuto),
                Some(_) => return Err(ConsoleError::InvalidArgument("auto mode")),
                None => return Err(ConsoleError::MissingArgument("on/off")),
            },
            "volume" => {
                let volume: f32 = parse_arg(arg, "volume")?;
                ConsoleRequest::Command(AppCommand::SetTargetVolume(volume))
            }
            "speed" => {
                let word = arg.ok_or(ConsoleError::MissingArgument("speed"))?;
                ConsoleRequest::Command(AppCommand::SetAutoSpeed(parse_speed(word)?))
            }
            "reset-cal" => ConsoleRequest::Command(AppCommand::ResetCalibration),
            "save" => ConsoleRequest::SaveSettings,
            "status" => ConsoleRequest::Status,
            "debug" => ConsoleRequest::Debug,
            "help" | "?" => ConsoleRequest::Help,
            _ => return Err(ConsoleError::UnknownCommand),
        };
        Ok(Some(request))
    }
}

fn parse_arg<T: core::str::FromStr>(
    word: Option<&str>,
    what: &'static str,
) -> Result<T, ConsoleError> {
    word.ok_or(ConsoleError::MissingArgument(what))?
        .parse()
        .map_err(|_| ConsoleError::InvalidArgument(what))
}

fn parse_speed(word: &str) -> Result<PumpSpeed, ConsoleError> {
    if word.eq_ignore_ascii_case("low") {
        Ok(PumpSpeed::Low)
    } else if word.eq_ignore_ascii_case("mid") {
        Ok(PumpSpeed::Mid)
    } else if word.eq_ignore_ascii_case("high") {
        Ok(PumpSpeed::High)
    } else {
        Err(ConsoleError::InvalidArgument("speed"))
    }
}
