//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the board).  Status snapshots are
//! rendered as one JSON object so they can be scraped from the console.

use log::{error, info, warn};

use crate::app::events::{AppEvent, ControllerStatus};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// JSON rendering of a status snapshot.
pub fn status_json(status: &ControllerStatus) -> Option<String> {
    serde_json::to_string(status).ok()
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                calibrated,
                auto_mode,
            } => {
                info!("START | calibrated={} auto={}", calibrated, auto_mode);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {:?} -> {:?}", from, to);
            }
            AppEvent::WateringStarted {
                source,
                duration_ms: Some(ms),
            } => {
                info!("WATER | {:?} started, {} ms", source, ms);
            }
            AppEvent::WateringStarted {
                source,
                duration_ms: None,
            } => {
                info!("WATER | {:?} started, until released", source);
            }
            AppEvent::WateringRejected { source, error } => {
                warn!("WATER | {:?} rejected: {}", source, error);
            }
            AppEvent::Calibration(outcome) => {
                info!("CALIB | {:?}", outcome);
            }
            AppEvent::AutoModeChanged(on) => {
                info!("AUTO  | {}", if *on { "on" } else { "off" });
            }
            AppEvent::SettingsChanged => {
                info!("SETUP | changed (unsaved)");
            }
            AppEvent::CommandRejected(error) => {
                warn!("CMD   | rejected: {}", error);
            }
            AppEvent::EmergencyStop => {
                warn!("ESTOP | pump cut, valve closing");
            }
            AppEvent::SensorFault(fault) => {
                error!("FAULT | {} while dispensing", fault);
            }
            AppEvent::Status(status) => match status_json(status) {
                Some(json) => info!("STATUS | {}", json),
                None => warn!("STATUS | serialisation failed"),
            },
        }
    }
}
