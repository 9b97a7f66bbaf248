//! Irrigo Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SensorHub      HardwareAdapter   LogEventSink   NvsSettings   │
//! │  (SensorPort)   (ActuatorPort)    (EventSink)    (Settings)    │
//! │  MonotonicClock ButtonBank                                     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            WateringController (pure logic)             │    │
//! │  │  SafetyGate · Calibration · Sequencer · Scheduler      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pin map (ESP32 DevKit)
//!
//! | Signal            | GPIO | Peripheral            |
//! |-------------------|------|-----------------------|
//! | Pump PWM          | 25   | LEDC ch0, 1 kHz 8-bit |
//! | Valve relay       | 26   | digital out           |
//! | Moisture probe    | 34   | ADC1                  |
//! | Water probe       | 35   | ADC1                  |
//! | Moisture supply   | 32   | digital out           |
//! | Water supply      | 33   | digital out           |
//! | Button: manual    | 13   | input, pull-up        |
//! | Button: auto      | 14   | input, pull-up        |
//! | Button: stop      | 27   | input, pull-up        |
//! | Button: save      | 12   | input, pull-up        |
//!
//! Calibration, volume, speed and interval are set from the serial
//! console (`help` lists the commands); the buttons cover day-to-day use.
#![deny(unused_must_use)]

use core::borrow::Borrow;

use anyhow::Result;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::{ADCPin, attenuation};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{IOPin, OutputPin as _, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use irrigo::adapters::hardware::HardwareAdapter;
use irrigo::adapters::log_sink::LogEventSink;
use irrigo::adapters::nvs::NvsSettingsStore;
use irrigo::adapters::serial_console;
use irrigo::adapters::time::MonotonicClock;
use irrigo::app::commands::AppCommand;
use irrigo::app::console::{Console, ConsoleRequest, HELP};
use irrigo::app::controller::WateringController;
use irrigo::app::events::AppEvent;
use irrigo::app::ports::{ActuatorPort, AnalogInput, Clock, EventSink, SensorPort};
use irrigo::config::SystemConfig;
use irrigo::drivers::button::{ButtonBank, ButtonEvent};
use irrigo::drivers::pump::PumpDriver;
use irrigo::drivers::valve::ValveDriver;
use irrigo::error::SensorError;
use irrigo::sensors::SensorHub;

const BTN_MANUAL: usize = 0;
const BTN_AUTO: usize = 1;
const BTN_STOP: usize = 2;
const BTN_SAVE: usize = 3;

/// Status line cadence on the console.
const STATUS_INTERVAL_MS: u64 = 10_000;

// ── ADC channel adapter ───────────────────────────────────────
//
// The probes were characterised on a 10-bit converter; the ESP32 oneshot
// driver reads 12 bits, so codes are shifted down to keep the thresholds
// in `SystemConfig` valid.

struct ProbeChannel<'d, T, M>(AdcChannelDriver<'d, T, M>)
where
    T: ADCPin,
    M: Borrow<AdcDriver<'d, T::Adc>>;

impl<'d, T, M> AnalogInput for ProbeChannel<'d, T, M>
where
    T: ADCPin,
    M: Borrow<AdcDriver<'d, T::Adc>>,
{
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.0.read_raw().map(|raw| raw >> 2).map_err(|e| {
            warn!("ADC read failed: {}", e);
            SensorError::AdcReadFailed
        })
    }
}

// ── Loop helpers ──────────────────────────────────────────────

/// Forward a command; outcomes are already reported through the sink.
fn dispatch<S: SensorPort, D: DelayNs, A: ActuatorPort>(
    controller: &mut WateringController<S, D, A>,
    command: AppCommand,
    now: u64,
    sink: &mut LogEventSink,
) {
    if let Err(e) = controller.handle_command(command, now, sink) {
        debug!("{:?} not applied: {}", command, e);
    }
}

fn save<S: SensorPort, D: DelayNs, A: ActuatorPort>(
    controller: &mut WateringController<S, D, A>,
    store: Option<&mut NvsSettingsStore>,
) {
    match store {
        Some(s) => {
            if let Err(e) = controller.save_settings(s) {
                warn!("Settings save failed: {}", e);
            }
        }
        None => warn!("Settings save skipped: no NVS"),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigo v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    if let Err(e) = config.validate() {
        // Compiled-in constants; a failure here is a build defect.
        anyhow::bail!("invalid SystemConfig: {e}");
    }

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ── 2. Actuators ──────────────────────────────────────────
    let pump_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(1.kHz().into())
            .resolution(Resolution::Bits8),
    )?;
    let pump_pwm = LedcDriver::new(peripherals.ledc.channel0, &pump_timer, pins.gpio25)?;
    let valve_pin = PinDriver::output(pins.gpio26)?;
    let actuators = HardwareAdapter::new(PumpDriver::new(pump_pwm), ValveDriver::new(valve_pin));

    // ── 3. Sensors ────────────────────────────────────────────
    let adc = AdcDriver::new(peripherals.adc1)?;
    let adc_config = AdcChannelConfig {
        attenuation: attenuation::DB_11,
        ..Default::default()
    };
    let moisture_adc = ProbeChannel(AdcChannelDriver::new(&adc, pins.gpio34, &adc_config)?);
    let water_adc = ProbeChannel(AdcChannelDriver::new(&adc, pins.gpio35, &adc_config)?);
    let sensors = SensorHub::new(
        moisture_adc,
        water_adc,
        PinDriver::output(pins.gpio32.downgrade_output())?,
        PinDriver::output(pins.gpio33.downgrade_output())?,
        &config,
    );

    // ── 4. Buttons ────────────────────────────────────────────
    let mut button_pins = [
        PinDriver::input(pins.gpio13.downgrade())?,
        PinDriver::input(pins.gpio14.downgrade())?,
        PinDriver::input(pins.gpio27.downgrade())?,
        PinDriver::input(pins.gpio12.downgrade())?,
    ];
    for pin in &mut button_pins {
        pin.set_pull(Pull::Up)?;
    }
    let mut buttons = ButtonBank::new(button_pins, config.debounce_ms);

    // ── 5. Settings + controller ──────────────────────────────
    let mut store = match NvsSettingsStore::new(&config) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("NVS init failed ({}), settings will not persist", e);
            None
        }
    };
    let settings = store
        .as_ref()
        .map(NvsSettingsStore::load_or_default)
        .unwrap_or_default();

    let clock = MonotonicClock::new();
    let mut log_sink = LogEventSink::new();
    let mut controller = WateringController::new(
        &config,
        &settings,
        sensors,
        FreeRtos,
        actuators,
        clock.now_ms(),
    );
    controller.announce(&mut log_sink);

    // ── 6. Serial console ─────────────────────────────────────
    let mut console = Console::new();
    if let Err(e) = serial_console::spawn_reader() {
        warn!("Console reader not started ({}), buttons only", e);
    }

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    let mut last_status_ms = 0;

    loop {
        let now = clock.now_ms();

        controller.poll(now, &mut log_sink);

        while let Some(line) = serial_console::try_recv_line() {
            match console.interpret(&line, &controller.settings()) {
                Ok(None) => {}
                Ok(Some(ConsoleRequest::Command(command))) => {
                    dispatch(&mut controller, command, now, &mut log_sink);
                }
                Ok(Some(ConsoleRequest::SaveSettings)) => save(&mut controller, store.as_mut()),
                Ok(Some(ConsoleRequest::Status)) => {
                    log_sink.emit(&AppEvent::Status(controller.status(now)));
                }
                Ok(Some(ConsoleRequest::Debug)) => {
                    let (moisture_raw, water_raw) = controller.sensors().last_raw();
                    let hw = controller.actuators();
                    info!(
                        "DEBUG | raw moisture={:?} water={:?} | pump={:?} valve={}",
                        moisture_raw,
                        water_raw,
                        hw.pump().state(),
                        if hw.valve().is_open() { "open" } else { "closed" }
                    );
                }
                Ok(Some(ConsoleRequest::Help)) => info!("{}", HELP),
                Err(e) => warn!("Console: {} in {:?} ({})", e, line.as_str(), HELP),
            }
        }

        for (index, event) in buttons.tick(now) {
            let command = match (index, event) {
                (BTN_MANUAL, ButtonEvent::Pressed) => {
                    Some(AppCommand::StartManual(controller.settings().speed))
                }
                (BTN_MANUAL, ButtonEvent::Released) => Some(AppCommand::StopManual),
                (BTN_AUTO, ButtonEvent::Pressed) => {
                    let current = controller.settings();
                    Some(if current.auto_mode {
                        AppCommand::DisableAuto
                    } else {
                        AppCommand::EnableAuto {
                            interval_ms: current.interval_ms,
                        }
                    })
                }
                (BTN_STOP, ButtonEvent::Pressed) => Some(AppCommand::EmergencyStop),
                (BTN_SAVE, ButtonEvent::Pressed) => {
                    save(&mut controller, store.as_mut());
                    None
                }
                _ => None,
            };
            if let Some(command) = command {
                dispatch(&mut controller, command, now, &mut log_sink);
            }
        }

        controller.service_automatic(now, &mut log_sink);
        controller.supervise(now, &mut log_sink);

        if now.saturating_sub(last_status_ms) >= STATUS_INTERVAL_MS {
            log_sink.emit(&AppEvent::Status(controller.status(now)));
            last_status_ms = now;
        }

        FreeRtos::delay_ms(config.control_loop_interval_ms);
    }
}
