//! Settings persistence across a simulated power cycle.

use irrigo::adapters::nvs::NvsSettingsStore;
use irrigo::app::commands::AppCommand;
use irrigo::app::ports::{SettingsError, SettingsPort};
use irrigo::config::{PumpSpeed, Settings, SystemConfig};

use crate::mock_hw::{BrokenStore, Rig};

const HOUR: u64 = 3_600_000;

fn store() -> NvsSettingsStore {
    NvsSettingsStore::new(&SystemConfig::default()).unwrap()
}

#[test]
fn calibration_and_auto_mode_survive_restart() {
    let mut nvs = store();
    let mut rig = Rig::new(&nvs.load_or_default(), 30, false);
    rig.controller.record_calibration(20_000, true).unwrap();
    rig.controller.enable_auto(2 * HOUR, 0).unwrap();
    rig.controller.set_auto_speed(PumpSpeed::Low);
    rig.controller.set_target_volume(0.5).unwrap();
    assert!(rig.controller.settings_dirty());

    rig.controller.save_settings(&mut nvs).unwrap();
    assert!(!rig.controller.settings_dirty());

    // Power cycle: new controller from whatever was persisted.
    let restored = Rig::new(&nvs.load_or_default(), 30, false);
    let settings = restored.controller.settings();
    assert_eq!(settings.calibration_factor_ms, Some(20_000));
    assert_eq!(settings.interval_ms, 2 * HOUR);
    assert_eq!(settings.speed, PumpSpeed::Low);
    assert_eq!(settings.target_volume, 0.5);
    assert!(settings.auto_mode);
    assert!(!restored.controller.settings_dirty());
}

#[test]
fn restored_schedule_restarts_from_boot() {
    let settings = Settings {
        calibration_factor_ms: Some(10_000),
        auto_mode: true,
        ..Settings::default()
    };
    let mut rig = Rig::new(&settings, 30, false);
    rig.cycle(HOUR - 100);
    assert!(rig.outputs.calls().is_empty());
    rig.cycle(HOUR);
    assert!(rig.outputs.valve_open());
}

#[test]
fn nothing_is_written_without_an_explicit_save() {
    let nvs = store();
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller
        .handle_command(AppCommand::SetAutoSpeed(PumpSpeed::High), 0, &mut rig.sink)
        .unwrap();
    assert!(rig.controller.settings_dirty());
    assert_eq!(nvs.load(), Err(SettingsError::NotFound));
}

#[test]
fn failed_save_keeps_changes_marked_dirty() {
    let mut rig = Rig::new(&Settings::default(), 30, false);
    rig.controller.set_auto_speed(PumpSpeed::High);
    assert_eq!(
        rig.controller.save_settings(&mut BrokenStore),
        Err(SettingsError::IoError)
    );
    assert!(rig.controller.settings_dirty());
}

#[test]
fn reset_calibration_persists_auto_mode_off() {
    let mut nvs = store();
    let settings = Settings {
        calibration_factor_ms: Some(20_000),
        auto_mode: true,
        ..Settings::default()
    };
    let mut rig = Rig::new(&settings, 30, false);
    rig.controller
        .handle_command(AppCommand::ResetCalibration, 0, &mut rig.sink)
        .unwrap();
    rig.controller.save_settings(&mut nvs).unwrap();

    let loaded = nvs.load().unwrap();
    assert_eq!(loaded.calibration_factor_ms, None);
    assert!(!loaded.auto_mode);
}

#[test]
fn out_of_range_stored_values_fall_back_to_defaults() {
    let settings = Settings {
        interval_ms: 5,
        target_volume: f32::NAN,
        ..Settings::default()
    };
    let rig = Rig::new(&settings, 30, false);
    let effective = rig.controller.settings();
    assert_eq!(effective.interval_ms, Settings::default().interval_ms);
    assert_eq!(effective.target_volume, Settings::default().target_volume);
}
