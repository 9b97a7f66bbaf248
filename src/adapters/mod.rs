//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                 |
//! |------------|--------------|-----------------------------|
//! | `hardware` | ActuatorPort | Pump PWM, valve relay GPIO  |
//! | `log_sink` | EventSink    | Serial log output           |
//! | `nvs`      | SettingsPort | NVS / in-memory store       |
//! | `time`     | Clock        | ESP32 system timer          |
//!
//! `serial_console` is inbound only: it queues console lines for the
//! control loop, which interprets them with
//! [`Console`](crate::app::console::Console).
//!
//! The sensor side ([`SensorPort`](crate::app::ports::SensorPort)) is
//! implemented by [`SensorHub`](crate::sensors::SensorHub).

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod serial_console;
pub mod time;
