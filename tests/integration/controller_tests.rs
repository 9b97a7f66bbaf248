//! End-to-end controller scenarios against mock hardware.

use irrigo::app::commands::{AppCommand, RequestSource};
use irrigo::app::controller::WateringController;
use irrigo::app::events::AppEvent;
use irrigo::calibration::CalibrationOutcome;
use irrigo::config::{PumpSpeed, Settings, SystemConfig};
use irrigo::error::{DenyReason, Error, SensorError};
use irrigo::sensors::SensorHub;
use irrigo::sequencer::SequencePhase;

use crate::mock_hw::{ActuatorCall, FixedAdc, MockOutputs, NoDelay, Rig, SupplyPin};

const HOUR: u64 = 3_600_000;

#[test]
fn automatic_cycle_dispenses_calibrated_volume() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller.enable_auto(HOUR, 0).unwrap();
    rig.controller.set_target_volume(1.5).unwrap();

    rig.run(0, HOUR - 100, 100);
    assert!(rig.outputs.calls().is_empty());

    // Pump may only be energised while dispensing.
    let mut now = HOUR;
    while now <= HOUR + 40_000 {
        rig.cycle(now);
        let dispensing = rig.controller.phase() == SequencePhase::Dispensing;
        assert_eq!(rig.outputs.pump_duty() > 0, dispensing, "at {now} ms");
        now += 100;
    }

    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert_eq!(
        rig.outputs.calls(),
        vec![
            ActuatorCall::Valve(true),
            ActuatorCall::Pump(59),
            ActuatorCall::PumpOff,
            ActuatorCall::Valve(false),
        ]
    );
    assert!(rig.sink.events.contains(&AppEvent::WateringStarted {
        source: RequestSource::Automatic,
        duration_ms: Some(30_000),
    }));
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::PhaseChanged { .. })),
        3
    );
    assert_eq!(rig.outputs.dry_runs(), 0);
}

#[test]
fn phase_timings_follow_settle_and_run_lengths() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller.request_calibration_dispense(10_000, 0).unwrap();
    rig.cycle(1_900);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveOpening);
    rig.cycle(2_000);
    assert_eq!(rig.controller.phase(), SequencePhase::Dispensing);
    rig.cycle(11_900);
    assert_eq!(rig.controller.phase(), SequencePhase::Dispensing);
    rig.cycle(12_000);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveClosing);
    assert_eq!(rig.outputs.pump_duty(), 0);
    assert!(rig.outputs.valve_open());
    rig.cycle(14_000);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert!(!rig.outputs.valve_open());
}

#[test]
fn denied_automatic_attempt_defers_a_full_interval() {
    let mut rig = Rig::calibrated(80, false);
    rig.controller.enable_auto(HOUR, 0).unwrap();

    rig.cycle(HOUR);
    assert!(rig.sink.events.contains(&AppEvent::WateringRejected {
        source: RequestSource::Automatic,
        error: Error::Denied(DenyReason::SoilSaturated),
    }));

    // Soil dries out straight away, but the next attempt waits an hour.
    rig.soil.set_moisture(Ok(30));
    rig.cycle(HOUR + 100);
    rig.cycle(2 * HOUR - 100);
    assert!(rig.outputs.calls().is_empty());
    rig.cycle(2 * HOUR);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveOpening);
}

#[test]
fn standing_water_blocks_automatic_watering() {
    let mut rig = Rig::calibrated(20, true);
    rig.controller.enable_auto(HOUR, 0).unwrap();
    rig.cycle(HOUR);
    assert!(rig.sink.events.contains(&AppEvent::WateringRejected {
        source: RequestSource::Automatic,
        error: Error::Denied(DenyReason::WaterAlreadyPresent),
    }));
    assert!(!rig.soil.is_powered());
}

#[test]
fn manual_hold_and_release() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller
        .handle_command(AppCommand::StartManual(PumpSpeed::High), 0, &mut rig.sink)
        .unwrap();
    rig.run(100, 10_000, 100);
    assert_eq!(rig.outputs.pump_duty(), 100);

    rig.controller
        .handle_command(AppCommand::StopManual, 10_000, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.outputs.pump_duty(), 0);
    rig.run(10_100, 12_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert_eq!(
        rig.outputs.calls(),
        vec![
            ActuatorCall::Valve(true),
            ActuatorCall::Pump(100),
            ActuatorCall::PumpOff,
            ActuatorCall::Valve(false),
        ]
    );
}

#[test]
fn manual_run_is_capped_by_dispense_ceiling() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller.request_manual(PumpSpeed::Low, 0).unwrap();
    rig.cycle(2_000);
    rig.cycle(301_900);
    assert_eq!(rig.controller.phase(), SequencePhase::Dispensing);
    rig.cycle(302_000);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveClosing);
    assert_eq!(rig.outputs.pump_duty(), 0);
}

#[test]
fn overlapping_automatic_fire_is_busy_and_still_recorded() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller.enable_auto(60_000, 0).unwrap();
    rig.controller.request_manual(PumpSpeed::Mid, 59_000).unwrap();
    rig.cycle(60_000);
    assert!(rig.sink.events.contains(&AppEvent::WateringRejected {
        source: RequestSource::Automatic,
        error: Error::Busy,
    }));
    assert_eq!(rig.controller.schedule_state().last_fire_ms, 60_000);
    assert_eq!(rig.controller.active_source(), Some(RequestSource::Manual));
}

#[test]
fn emergency_stop_in_every_phase_closes_the_valve() {
    // Opening, dispensing, closing.
    for stop_at in [500_u64, 5_000, 12_500] {
        let mut rig = Rig::calibrated(30, false);
        rig.controller.request_calibration_dispense(10_000, 0).unwrap();
        rig.run(100, stop_at, 100);
        rig.controller
            .handle_command(AppCommand::EmergencyStop, stop_at, &mut rig.sink)
            .unwrap();
        assert_eq!(rig.outputs.pump_duty(), 0, "stop at {stop_at}");
        assert_eq!(rig.controller.phase(), SequencePhase::ValveClosing);

        rig.run(stop_at + 100, stop_at + 2_000, 100);
        assert_eq!(rig.controller.phase(), SequencePhase::Idle, "stop at {stop_at}");
        assert!(!rig.outputs.valve_open());
        assert_eq!(rig.outputs.dry_runs(), 0);
    }
}

#[test]
fn emergency_stop_is_idempotent() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller.emergency_stop(0);
    rig.controller.emergency_stop(0);
    rig.run(0, 2_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert!(!rig.outputs.valve_open());
    assert_eq!(rig.outputs.pump_duty(), 0);
}

#[test]
fn sensor_fault_fails_closed() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.soil.set_moisture(Err(SensorError::AdcReadFailed));
    assert_eq!(
        rig.controller.request_manual(PumpSpeed::Low, 0),
        Err(Error::Denied(DenyReason::SensorFault(SensorError::AdcReadFailed)))
    );
    assert!(!rig.soil.is_powered());
    assert!(rig.outputs.calls().is_empty());

    rig.soil.set_moisture(Ok(30));
    rig.soil.set_water(Err(SensorError::OutOfRange));
    assert_eq!(
        rig.controller.request_manual(PumpSpeed::Low, 0),
        Err(Error::Denied(DenyReason::SensorFault(SensorError::OutOfRange)))
    );
    assert_eq!(rig.soil.0.borrow().unpowered_reads, 0);
}

#[test]
fn gate_takes_fresh_readings_for_every_request() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller.request_calibration_dispense(1_000, 0).unwrap();
    rig.run(100, 6_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);

    rig.soil.set_moisture(Ok(90));
    assert_eq!(
        rig.controller.request_manual(PumpSpeed::Low, 6_000),
        Err(Error::Denied(DenyReason::SoilSaturated))
    );
    assert_eq!(rig.soil.power_cycles(), 2);
}

#[test]
fn calibration_flow_enables_automatic_mode() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    let enable = AppCommand::EnableAuto { interval_ms: HOUR };
    assert_eq!(
        rig.controller.handle_command(enable, 0, &mut rig.sink),
        Err(Error::Uncalibrated)
    );

    // First trial is short of one cup.
    rig.controller
        .handle_command(AppCommand::CalibrationDispense { duration_ms: 18_000 }, 0, &mut rig.sink)
        .unwrap();
    rig.run(100, 22_000, 100);
    rig.controller
        .handle_command(
            AppCommand::ConfirmCalibration {
                test_duration_ms: 18_000,
                confirmed: false,
            },
            22_000,
            &mut rig.sink,
        )
        .unwrap();
    assert!(!rig.controller.is_calibrated());

    rig.controller
        .handle_command(
            AppCommand::CalibrationDispense { duration_ms: 20_000 },
            22_000,
            &mut rig.sink,
        )
        .unwrap();
    rig.run(22_100, 46_000, 100);
    rig.controller
        .handle_command(
            AppCommand::ConfirmCalibration {
                test_duration_ms: 20_000,
                confirmed: true,
            },
            46_000,
            &mut rig.sink,
        )
        .unwrap();
    rig.controller
        .handle_command(enable, 46_000, &mut rig.sink)
        .unwrap();

    let status = rig.controller.status(46_000);
    assert_eq!(status.calibration_factor_ms, Some(20_000));
    assert!(status.auto_mode);
    assert_eq!(status.next_auto_ms, Some(HOUR));
    assert!(rig.sink.events.contains(&AppEvent::Calibration(
        CalibrationOutcome::RetryRequired
    )));
    assert!(rig.sink.events.contains(&AppEvent::Calibration(
        CalibrationOutcome::Calibrated { factor_ms: 20_000 }
    )));
    assert!(rig.sink.events.contains(&AppEvent::AutoModeChanged(true)));
}

#[test]
fn automatic_request_on_uncalibrated_controller_is_not_due() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.run(0, 2 * HOUR, 60_000);
    assert!(rig.outputs.calls().is_empty());
    assert!(rig.sink.events.is_empty());
}

#[test]
fn emergency_stop_after_polling_gap_still_settles() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller.request_manual(PumpSpeed::Mid, 0).unwrap();
    rig.controller.poll(2_000, &mut rig.sink);
    assert!(rig.controller.is_pump_energized());

    // Nothing polled between 2 s and the stop at 60 s.
    rig.controller
        .handle_command(AppCommand::EmergencyStop, 60_000, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.controller.status(60_000).phase_remaining_ms, Some(2_000));
    rig.controller.poll(60_001, &mut rig.sink);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveClosing);
    assert!(rig.outputs.valve_open());
    rig.controller.poll(62_000, &mut rig.sink);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert!(!rig.outputs.valve_open());
}

#[test]
fn manual_release_after_polling_gap_still_settles() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller
        .handle_command(AppCommand::StartManual(PumpSpeed::Low), 0, &mut rig.sink)
        .unwrap();
    rig.controller.poll(2_000, &mut rig.sink);
    rig.controller
        .handle_command(AppCommand::StopManual, 45_000, &mut rig.sink)
        .unwrap();
    rig.controller.poll(46_999, &mut rig.sink);
    assert!(rig.outputs.valve_open());
    rig.controller.poll(47_000, &mut rig.sink);
    assert!(!rig.outputs.valve_open());
}

#[test]
fn sensor_fault_while_dispensing_cuts_the_pump() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller
        .handle_command(AppCommand::ForceWatering, 0, &mut rig.sink)
        .unwrap();
    rig.run(100, 4_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Dispensing);

    rig.soil.set_water(Err(SensorError::AdcReadFailed));
    rig.run(4_100, 5_000, 100);
    assert_eq!(rig.outputs.pump_duty(), 0);
    assert_eq!(rig.controller.phase(), SequencePhase::ValveClosing);
    assert!(rig.sink.events.contains(&AppEvent::SensorFault(
        SensorError::AdcReadFailed
    )));
    assert!(rig.sink.events.contains(&AppEvent::EmergencyStop));
    assert!(!rig.soil.is_powered());

    rig.run(5_100, 7_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert!(!rig.outputs.valve_open());
    assert_eq!(rig.controller.status(7_000).emergency_stops, 1);
}

#[test]
fn healthy_sensors_leave_a_long_run_alone() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller.request_calibration_dispense(30_000, 0).unwrap();
    rig.run(100, 34_000, 100);
    assert_eq!(rig.controller.phase(), SequencePhase::Idle);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::EmergencyStop)), 0);
    // Start check plus one re-check every five seconds of pumping.
    assert_eq!(rig.soil.power_cycles(), 1 + 6);
}

#[test]
fn last_watered_tracks_started_runs_only() {
    let mut rig = Rig::calibrated(30, false);
    rig.controller.enable_auto(HOUR, 0).unwrap();
    rig.controller
        .handle_command(AppCommand::ForceWatering, 1_000, &mut rig.sink)
        .unwrap();
    assert!(rig.sink.events.contains(&AppEvent::WateringStarted {
        source: RequestSource::Forced,
        duration_ms: Some(20_000),
    }));
    rig.run(1_100, 30_000, 100);
    assert_eq!(rig.controller.status(30_000).last_watered_ms, Some(1_000));

    // Soaked soil: the automatic attempt is refused and does not count.
    rig.soil.set_moisture(Ok(85));
    rig.run(HOUR, HOUR + 1_000, 100);
    assert_eq!(rig.controller.schedule_state().last_fire_ms, HOUR + 1_000);
    assert_eq!(rig.controller.last_watered_ms(), Some(1_000));
}

#[test]
fn debug_view_exposes_raw_codes_from_the_last_check() {
    let config = SystemConfig::default();
    let sensors = SensorHub::new(FixedAdc(590), FixedAdc(120), SupplyPin, SupplyPin, &config);
    let mut controller = WateringController::new(
        &config,
        &Settings::default(),
        sensors,
        NoDelay,
        MockOutputs::default(),
        0,
    );
    assert_eq!(controller.sensors().last_raw(), (None, None));
    controller.request_manual(PumpSpeed::Low, 0).unwrap();
    assert_eq!(controller.sensors().last_raw(), (Some(590), Some(120)));
    assert_eq!(controller.status(0).moisture_percent, Some(50));
}
