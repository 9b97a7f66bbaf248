//! Mock hardware for integration tests.
//!
//! The controller takes ownership of its sensors and actuators, so the
//! mocks keep their state behind `Rc<RefCell<_>>` handles that the test
//! keeps a clone of.  Every actuator call is recorded so tests can assert
//! on the full command history.

use std::cell::RefCell;
use std::rc::Rc;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use irrigo::app::controller::WateringController;
use irrigo::app::events::AppEvent;
use irrigo::app::ports::{
    ActuatorPort, AnalogInput, EventSink, SensorPort, SettingsError, SettingsPort,
};
use irrigo::config::{Settings, SystemConfig};
use irrigo::error::SensorError;

// ── Sensors ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct SoilState {
    pub moisture: Result<u8, SensorError>,
    pub water: Result<bool, SensorError>,
    pub powered: bool,
    pub power_cycles: u32,
    /// Reads attempted while the supply was off.
    pub unpowered_reads: u32,
}

#[derive(Clone)]
pub struct MockSoil(pub Rc<RefCell<SoilState>>);

#[allow(dead_code)]
impl MockSoil {
    pub fn new(moisture: u8, water: bool) -> Self {
        Self(Rc::new(RefCell::new(SoilState {
            moisture: Ok(moisture),
            water: Ok(water),
            powered: false,
            power_cycles: 0,
            unpowered_reads: 0,
        })))
    }

    pub fn set_moisture(&self, moisture: Result<u8, SensorError>) {
        self.0.borrow_mut().moisture = moisture;
    }

    pub fn set_water(&self, water: Result<bool, SensorError>) {
        self.0.borrow_mut().water = water;
    }

    pub fn is_powered(&self) -> bool {
        self.0.borrow().powered
    }

    pub fn power_cycles(&self) -> u32 {
        self.0.borrow().power_cycles
    }
}

impl SensorPort for MockSoil {
    fn power_on(&mut self) -> Result<(), SensorError> {
        let mut s = self.0.borrow_mut();
        s.powered = true;
        s.power_cycles += 1;
        Ok(())
    }

    fn power_off(&mut self) {
        self.0.borrow_mut().powered = false;
    }

    fn read_moisture_percent(&mut self) -> Result<u8, SensorError> {
        let mut s = self.0.borrow_mut();
        if !s.powered {
            s.unpowered_reads += 1;
        }
        s.moisture
    }

    fn read_water_presence(&mut self) -> Result<bool, SensorError> {
        let mut s = self.0.borrow_mut();
        if !s.powered {
            s.unpowered_reads += 1;
        }
        s.water
    }
}

// ── Raw probe channels, for driving a real `SensorHub` ───────

/// ADC channel that always returns the same code.
pub struct FixedAdc(pub u16);

impl AnalogInput for FixedAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        Ok(self.0)
    }
}

/// Probe supply switch that accepts every write.
pub struct SupplyPin;

impl ErrorType for SupplyPin {
    type Error = Infallible;
}

impl OutputPin for SupplyPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Valve(bool),
    Pump(u8),
    PumpOff,
}

#[derive(Debug, Default)]
pub struct OutputState {
    pub calls: Vec<ActuatorCall>,
    pub valve_open: bool,
    pub pump_duty: u8,
    /// Pump energised while the valve was commanded closed.
    pub dry_runs: u32,
}

#[derive(Clone, Default)]
pub struct MockOutputs(pub Rc<RefCell<OutputState>>);

#[allow(dead_code)]
impl MockOutputs {
    pub fn valve_open(&self) -> bool {
        self.0.borrow().valve_open
    }

    pub fn pump_duty(&self) -> u8 {
        self.0.borrow().pump_duty
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.0.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn dry_runs(&self) -> u32 {
        self.0.borrow().dry_runs
    }
}

impl ActuatorPort for MockOutputs {
    fn set_valve(&mut self, open: bool) {
        let mut s = self.0.borrow_mut();
        s.valve_open = open;
        s.calls.push(ActuatorCall::Valve(open));
    }

    fn set_pump(&mut self, duty_percent: u8) {
        let mut s = self.0.borrow_mut();
        if !s.valve_open {
            s.dry_runs += 1;
        }
        s.pump_duty = duty_percent;
        s.calls.push(ActuatorCall::Pump(duty_percent));
    }

    fn stop_pump(&mut self) {
        let mut s = self.0.borrow_mut();
        s.pump_duty = 0;
        s.calls.push(ActuatorCall::PumpOff);
    }
}

// ── Delay, sink, settings ─────────────────────────────────────

#[derive(Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// Settings store whose writes always fail.
#[allow(dead_code)]
pub struct BrokenStore;

impl SettingsPort for BrokenStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Err(SettingsError::IoError)
    }

    fn save(&mut self, _settings: &Settings) -> Result<(), SettingsError> {
        Err(SettingsError::IoError)
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type Controller = WateringController<MockSoil, NoDelay, MockOutputs>;

pub struct Rig {
    pub controller: Controller,
    pub soil: MockSoil,
    pub outputs: MockOutputs,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(settings: &Settings, moisture: u8, water: bool) -> Self {
        let soil = MockSoil::new(moisture, water);
        let outputs = MockOutputs::default();
        let controller = WateringController::new(
            &SystemConfig::default(),
            settings,
            soil.clone(),
            NoDelay,
            outputs.clone(),
            0,
        );
        outputs.clear();
        Self {
            controller,
            soil,
            outputs,
            sink: RecordingSink::default(),
        }
    }

    /// A rig with a 20 s/unit calibration already stored.
    pub fn calibrated(moisture: u8, water: bool) -> Self {
        let settings = Settings {
            calibration_factor_ms: Some(20_000),
            ..Settings::default()
        };
        Self::new(&settings, moisture, water)
    }

    /// One main-loop cycle: sequencer, automatic check, health check.
    pub fn cycle(&mut self, now_ms: u64) {
        self.controller.poll(now_ms, &mut self.sink);
        self.controller.service_automatic(now_ms, &mut self.sink);
        self.controller.supervise(now_ms, &mut self.sink);
    }

    /// Run cycles every `step_ms` from `from_ms` up to and including `to_ms`.
    pub fn run(&mut self, from_ms: u64, to_ms: u64, step_ms: u64) {
        let mut now = from_ms;
        while now <= to_ms {
            self.cycle(now);
            now += step_ms;
        }
    }
}
