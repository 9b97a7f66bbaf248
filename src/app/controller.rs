//! Watering controller, the composition root.
//!
//! [`WateringController`] exclusively owns the safety gate, the calibration
//! engine, the sequencer and the scheduler, and exposes the single request
//! surface used by manual, automatic and calibration mode.
//!
//! ```text
//!  SensorPort ──▶ SafetyGate ─┐
//!                             ├─▶ WateringController ──▶ Sequencer ──▶ ActuatorPort
//!  CalibrationEngine ─────────┤            │
//!  Scheduler ─────────────────┘            └──▶ EventSink
//! ```
//!
//! Every dispense path funnels into one private routine:
//! busy check → fresh gate check → duration resolution → sequencer start.
//! Results are surfaced unchanged; the controller never retries on its own.
//!
//! While the pump runs, [`WateringController::supervise`] re-reads the
//! sensors every `health_check_interval_ms` and emergency-stops on a fault.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::calibration::{CalibrationEngine, CalibrationOutcome};
use crate::config::{
    MAX_INTERVAL_MS, MAX_TARGET_VOLUME, MIN_INTERVAL_MS, PumpSpeed, Settings, SystemConfig,
};
use crate::error::{Error, Result, SensorError};
use crate::safety::SafetyGate;
use crate::scheduler::{ScheduleState, Scheduler, Tick};
use crate::sequencer::{RunLength, SequencePhase, Sequencer};

use super::commands::{AppCommand, DispenseTarget, RequestSource, WateringRequest};
use super::events::{AppEvent, ControllerStatus};
use super::ports::{ActuatorPort, EventSink, SensorPort, SettingsError, SettingsPort};

/// Result of one automatic-mode check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOutcome {
    /// The interval has not elapsed (or automatic mode is off).
    NotDue,
    /// A timed dispense was started.
    Started { duration_ms: u32 },
}

pub struct WateringController<S, D, A> {
    gate: SafetyGate<S, D>,
    calibration: CalibrationEngine,
    sequencer: Sequencer<A>,
    scheduler: Scheduler,
    target_volume: f32,
    speed: PumpSpeed,
    /// Source of the sequence currently running, if any.
    active: Option<RequestSource>,
    last_watered_ms: Option<u64>,
    health_interval_ms: u64,
    last_health_ms: u64,
    settings_dirty: bool,
}

impl<S, D, A> WateringController<S, D, A>
where
    S: SensorPort,
    D: DelayNs,
    A: ActuatorPort,
{
    /// Build the controller from the fixed config and the loaded settings.
    ///
    /// Out-of-range settings fall back to their defaults field by field.
    /// A stored `auto_mode` without a usable calibration factor starts with
    /// automatic mode off.
    pub fn new(
        config: &SystemConfig,
        settings: &Settings,
        sensors: S,
        delay: D,
        actuators: A,
        now_ms: u64,
    ) -> Self {
        let defaults = Settings::default();
        let calibration =
            CalibrationEngine::restore(settings.calibration_factor_ms, config.max_dispense_ms);

        let interval_ms = if (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&settings.interval_ms) {
            settings.interval_ms
        } else {
            warn!(
                "Controller: stored interval {} ms out of range, using {} ms",
                settings.interval_ms, defaults.interval_ms
            );
            defaults.interval_ms
        };
        let target_volume = if volume_in_range(settings.target_volume) {
            settings.target_volume
        } else {
            warn!(
                "Controller: stored target volume {} out of range, using {}",
                settings.target_volume, defaults.target_volume
            );
            defaults.target_volume
        };

        let mut scheduler = Scheduler::new(interval_ms);
        if settings.auto_mode {
            if let Err(e) = scheduler.enable(interval_ms, now_ms, &calibration) {
                warn!("Controller: auto mode not restored: {}", e);
            }
        }

        info!(
            "Controller: up (calibrated={}, auto={})",
            calibration.is_calibrated(),
            scheduler.is_enabled()
        );

        Self {
            gate: SafetyGate::new(sensors, delay, config),
            calibration,
            sequencer: Sequencer::new(actuators, config),
            scheduler,
            target_volume,
            speed: settings.speed,
            active: None,
            last_watered_ms: None,
            health_interval_ms: u64::from(config.health_check_interval_ms),
            last_health_ms: now_ms,
            settings_dirty: false,
        }
    }

    /// Emit the startup event.
    pub fn announce(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            calibrated: self.calibration.is_calibrated(),
            auto_mode: self.scheduler.is_enabled(),
        });
    }

    // ── Request surface ───────────────────────────────────────

    /// Manual watering: runs until [`release_manual`](Self::release_manual)
    /// or the dispense ceiling, whichever comes first.
    pub fn request_manual(&mut self, speed: PumpSpeed, now_ms: u64) -> Result<()> {
        self.execute(
            WateringRequest {
                target: DispenseTarget::UntilStopped,
                speed,
                source: RequestSource::Manual,
            },
            now_ms,
        )
        .map(|_| ())
    }

    /// Manual control released at `now_ms`.  Only ends a manual run;
    /// returns `true` if one was cut short.
    pub fn release_manual(&mut self, now_ms: u64) -> bool {
        if self.active != Some(RequestSource::Manual) {
            return false;
        }
        self.sequencer.stop(now_ms)
    }

    /// Consult the scheduler and, when due, run a gated volume dispense.
    /// The attempt is recorded whatever its outcome.
    pub fn request_automatic(&mut self, now_ms: u64) -> Result<AutoOutcome> {
        if self.scheduler.tick(now_ms) == Tick::Wait {
            return Ok(AutoOutcome::NotDue);
        }
        let result = self.execute(
            WateringRequest {
                target: DispenseTarget::Volume(self.target_volume),
                speed: self.speed,
                source: RequestSource::Automatic,
            },
            now_ms,
        );
        self.scheduler.record_fired(now_ms);
        Ok(AutoOutcome::Started {
            duration_ms: result?.limit_ms(),
        })
    }

    /// Water the target volume now, outside the schedule.  Gated like any
    /// other request.  A run that starts also restarts the automatic
    /// interval, so the plant is not watered twice in a row.
    pub fn request_forced(&mut self, now_ms: u64) -> Result<u32> {
        let run = self.execute(
            WateringRequest {
                target: DispenseTarget::Volume(self.target_volume),
                speed: self.speed,
                source: RequestSource::Forced,
            },
            now_ms,
        )?;
        if self.scheduler.is_enabled() {
            self.scheduler.record_fired(now_ms);
        }
        Ok(run.limit_ms())
    }

    /// Calibration trial: gated dispense for a literal duration, bypassing
    /// the volume math.
    pub fn request_calibration_dispense(&mut self, duration_ms: u32, now_ms: u64) -> Result<()> {
        self.execute(
            WateringRequest {
                target: DispenseTarget::Duration(duration_ms),
                speed: self.speed,
                source: RequestSource::CalibrationTest,
            },
            now_ms,
        )
        .map(|_| ())
    }

    /// Cut the pump and close the valve, settling from `now_ms`.  Always
    /// succeeds; idempotent.
    pub fn emergency_stop(&mut self, now_ms: u64) {
        self.sequencer.emergency_stop(now_ms);
        self.active = None;
    }

    // ── Calibration and automatic-mode settings ───────────────

    pub fn record_calibration(
        &mut self,
        test_duration_ms: u32,
        confirmed: bool,
    ) -> Result<CalibrationOutcome> {
        let outcome = self
            .calibration
            .record_calibration(test_duration_ms, confirmed)?;
        if matches!(outcome, CalibrationOutcome::Calibrated { .. }) {
            self.settings_dirty = true;
        }
        Ok(outcome)
    }

    /// Forget the calibration factor.  Automatic mode needs one, so it is
    /// switched off as well.
    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
        self.scheduler.disable();
        self.settings_dirty = true;
    }

    /// Turn automatic mode on.  Fails with `Uncalibrated` until a
    /// calibration has been recorded.
    pub fn enable_auto(&mut self, interval_ms: u64, now_ms: u64) -> Result<()> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval_ms) {
            return Err(Error::InvalidDuration);
        }
        self.scheduler.enable(interval_ms, now_ms, &self.calibration)?;
        self.settings_dirty = true;
        Ok(())
    }

    pub fn disable_auto(&mut self) {
        if self.scheduler.is_enabled() {
            self.settings_dirty = true;
        }
        self.scheduler.disable();
    }

    pub fn set_target_volume(&mut self, volume: f32) -> Result<()> {
        if !volume_in_range(volume) {
            return Err(Error::InvalidDuration);
        }
        if volume != self.target_volume {
            self.target_volume = volume;
            self.settings_dirty = true;
        }
        Ok(())
    }

    pub fn set_auto_speed(&mut self, speed: PumpSpeed) {
        if speed != self.speed {
            self.speed = speed;
            self.settings_dirty = true;
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Advance the sequencer once.  Call every main-loop cycle.
    pub fn poll(&mut self, now_ms: u64, sink: &mut impl EventSink) -> SequencePhase {
        let before = self.sequencer.phase();
        let phase = self.sequencer.tick(now_ms);
        if phase != before {
            sink.emit(&AppEvent::PhaseChanged {
                from: before,
                to: phase,
            });
        }
        if phase == SequencePhase::Idle {
            self.active = None;
        }
        phase
    }

    /// Run the automatic check and report the outcome as events.
    pub fn service_automatic(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        match self.request_automatic(now_ms) {
            Ok(AutoOutcome::NotDue) => {}
            Ok(AutoOutcome::Started { duration_ms }) => sink.emit(&AppEvent::WateringStarted {
                source: RequestSource::Automatic,
                duration_ms: Some(duration_ms),
            }),
            Err(error) => sink.emit(&AppEvent::WateringRejected {
                source: RequestSource::Automatic,
                error,
            }),
        }
    }

    /// Re-check the sensors while the pump runs.  A sensor that stopped
    /// answering cuts the pump at once.  Returns the fault, if any.
    pub fn supervise(&mut self, now_ms: u64, sink: &mut impl EventSink) -> Option<SensorError> {
        if !self.sequencer.is_pump_energized()
            || now_ms.saturating_sub(self.last_health_ms) < self.health_interval_ms
        {
            return None;
        }
        self.last_health_ms = now_ms;
        let fault = self.gate.check_health().err()?;
        warn!("Controller: {} while dispensing, stopping", fault);
        self.emergency_stop(now_ms);
        sink.emit(&AppEvent::SensorFault(fault));
        sink.emit(&AppEvent::EmergencyStop);
        Some(fault)
    }

    /// Dispatch one inbound command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let result = match cmd {
            AppCommand::StartManual(speed) => {
                let r = self.request_manual(speed, now_ms).map(|()| None);
                report_watering(sink, RequestSource::Manual, r)
            }
            AppCommand::StopManual => {
                self.release_manual(now_ms);
                Ok(())
            }
            AppCommand::CalibrationDispense { duration_ms } => {
                let r = self
                    .request_calibration_dispense(duration_ms, now_ms)
                    .map(|()| Some(duration_ms));
                report_watering(sink, RequestSource::CalibrationTest, r)
            }
            AppCommand::ForceWatering => {
                let r = self.request_forced(now_ms).map(Some);
                report_watering(sink, RequestSource::Forced, r)
            }
            AppCommand::ConfirmCalibration {
                test_duration_ms,
                confirmed,
            } => self
                .record_calibration(test_duration_ms, confirmed)
                .map(|outcome| sink.emit(&AppEvent::Calibration(outcome))),
            AppCommand::EnableAuto { interval_ms } => self
                .enable_auto(interval_ms, now_ms)
                .map(|()| sink.emit(&AppEvent::AutoModeChanged(true))),
            AppCommand::DisableAuto => {
                self.disable_auto();
                sink.emit(&AppEvent::AutoModeChanged(false));
                Ok(())
            }
            AppCommand::SetTargetVolume(volume) => self
                .set_target_volume(volume)
                .map(|()| sink.emit(&AppEvent::SettingsChanged)),
            AppCommand::SetAutoSpeed(speed) => {
                self.set_auto_speed(speed);
                sink.emit(&AppEvent::SettingsChanged);
                Ok(())
            }
            AppCommand::ResetCalibration => {
                let was_auto = self.scheduler.is_enabled();
                self.reset_calibration();
                if was_auto {
                    sink.emit(&AppEvent::AutoModeChanged(false));
                }
                sink.emit(&AppEvent::SettingsChanged);
                Ok(())
            }
            AppCommand::EmergencyStop => {
                self.emergency_stop(now_ms);
                sink.emit(&AppEvent::EmergencyStop);
                Ok(())
            }
        };

        let watering = matches!(
            cmd,
            AppCommand::StartManual(_)
                | AppCommand::CalibrationDispense { .. }
                | AppCommand::ForceWatering
        );
        if let Err(e) = result {
            if !watering {
                sink.emit(&AppEvent::CommandRejected(e));
            }
        }
        result
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, now_ms: u64) -> ControllerStatus {
        let readings = self.gate.last_readings();
        ControllerStatus {
            phase: self.sequencer.phase(),
            phase_remaining_ms: self.sequencer.remaining_ms(now_ms),
            pump_energized: self.sequencer.is_pump_energized(),
            emergency_stops: self.sequencer.emergency_stop_count(),
            auto_mode: self.scheduler.is_enabled(),
            next_auto_ms: self.scheduler.time_until_next_ms(now_ms),
            calibration_factor_ms: self.calibration.factor_ms(),
            max_dispense_ms: self.calibration.max_dispense_ms(),
            target_volume: self.target_volume,
            last_watered_ms: self.last_watered_ms,
            moisture_percent: readings.moisture_percent,
            water_present: readings.water_present,
            settings_dirty: self.settings_dirty,
        }
    }

    pub fn phase(&self) -> SequencePhase {
        self.sequencer.phase()
    }

    pub fn is_pump_energized(&self) -> bool {
        self.sequencer.is_pump_energized()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn schedule_state(&self) -> ScheduleState {
        self.scheduler.state()
    }

    /// Source of the running sequence, `None` when idle or after an
    /// emergency stop.
    pub fn active_source(&self) -> Option<RequestSource> {
        self.active
    }

    /// Read-only access to the actuators owned by the sequencer.
    pub fn actuators(&self) -> &A {
        self.sequencer.actuators()
    }

    /// Read-only access to the sensors owned by the gate (debug view).
    pub fn sensors(&self) -> &S {
        self.gate.sensors()
    }

    /// When the last dispense started, `None` since boot.
    pub fn last_watered_ms(&self) -> Option<u64> {
        self.last_watered_ms
    }

    // ── Settings persistence ──────────────────────────────────

    /// Snapshot of the persisted subset.
    pub fn settings(&self) -> Settings {
        Settings {
            interval_ms: self.scheduler.interval_ms(),
            target_volume: self.target_volume,
            speed: self.speed,
            calibration_factor_ms: self.calibration.factor_ms(),
            auto_mode: self.scheduler.is_enabled(),
        }
    }

    /// Whether settings changed since the last successful save.
    pub fn settings_dirty(&self) -> bool {
        self.settings_dirty
    }

    /// Persist the current settings.  Only called on explicit request.
    pub fn save_settings(
        &mut self,
        store: &mut impl SettingsPort,
    ) -> core::result::Result<(), SettingsError> {
        store.save(&self.settings())?;
        self.settings_dirty = false;
        info!("Controller: settings saved");
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────

    fn execute(&mut self, request: WateringRequest, now_ms: u64) -> Result<RunLength> {
        if !self.sequencer.is_idle() {
            warn!("Controller: {:?} request while busy", request.source);
            return Err(Error::Busy);
        }
        self.gate.permit().into_result()?;
        let run = self.resolve(request.target)?;
        self.sequencer.start(run, request.speed, now_ms)?;
        self.active = Some(request.source);
        self.last_watered_ms = Some(now_ms);
        self.last_health_ms = now_ms;
        info!("Controller: {:?} watering, {:?}", request.source, run);
        Ok(run)
    }

    fn resolve(&self, target: DispenseTarget) -> Result<RunLength> {
        let ceiling_ms = self.calibration.max_dispense_ms();
        match target {
            DispenseTarget::Volume(volume) => self
                .calibration
                .duration_for_volume(volume)
                .map(RunLength::Timed),
            DispenseTarget::Duration(ms) if ms == 0 || ms > ceiling_ms => {
                Err(Error::InvalidDuration)
            }
            DispenseTarget::Duration(ms) => Ok(RunLength::Timed(ms)),
            DispenseTarget::UntilStopped => Ok(RunLength::UntilStopped {
                limit_ms: ceiling_ms,
            }),
        }
    }
}

fn volume_in_range(volume: f32) -> bool {
    volume.is_finite() && volume > 0.0 && volume <= MAX_TARGET_VOLUME
}

fn report_watering(
    sink: &mut impl EventSink,
    source: RequestSource,
    result: Result<Option<u32>>,
) -> Result<()> {
    match result {
        Ok(duration_ms) => {
            sink.emit(&AppEvent::WateringStarted {
                source,
                duration_ms,
            });
            Ok(())
        }
        Err(error) => {
            sink.emit(&AppEvent::WateringRejected { source, error });
            Err(error)
        }
    }
}
