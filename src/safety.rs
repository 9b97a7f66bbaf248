//! Safety gate.
//!
//! Answers one question before every dispense: *is it safe to water now?*
//!
//! ## Policy
//!
//! Evaluated in a fixed order, stopping at the first denial:
//!
//! 1. Moisture at or above the saturation threshold → `SoilSaturated`.
//! 2. Standing water detected → `WaterAlreadyPresent`.
//! 3. Otherwise → `Allowed`.
//!
//! A reading that cannot be taken denies with `SensorFault` at the step
//! that needed it.  The gate never caches a verdict: manual and automatic
//! triggers interleave, so every call powers the probes and reads afresh.
//!
//! ## Power bracket
//!
//! [`PoweredSensors`] switches the probe supply on when acquired and off
//! when dropped, so every exit path (including an early denial or a
//! failed power-on) leaves the probes unpowered.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::SensorPort;
use crate::config::SystemConfig;
use crate::error::{DenyReason, Error, SensorError};

/// Gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Allowed,
    Denied(DenyReason),
}

impl Permit {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// `Allowed` → `Ok(())`, `Denied(r)` → `Err(Error::Denied(r))`.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(reason) => Err(Error::Denied(reason)),
        }
    }
}

/// Readings taken during the most recent gate evaluation.  Fields are
/// `None` when the evaluation stopped before reaching that sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateReadings {
    pub moisture_percent: Option<u8>,
    pub water_present: Option<bool>,
}

/// Scoped sensor power.  Supply is on for the guard's lifetime.
struct PoweredSensors<'a, S: SensorPort> {
    sensors: &'a mut S,
}

impl<'a, S: SensorPort> PoweredSensors<'a, S> {
    fn acquire(sensors: &'a mut S) -> Result<Self, SensorError> {
        // Guard exists before power_on so a failed switch is still undone.
        let guard = Self { sensors };
        guard.sensors.power_on()?;
        Ok(guard)
    }
}

impl<S: SensorPort> Drop for PoweredSensors<'_, S> {
    fn drop(&mut self) {
        self.sensors.power_off();
    }
}

/// Safety gate.  Owns the sensor port and the warm-up delay.
pub struct SafetyGate<S, D> {
    sensors: S,
    delay: D,
    saturation_percent: u8,
    warm_ms: u32,
    last: GateReadings,
}

impl<S: SensorPort, D: DelayNs> SafetyGate<S, D> {
    pub fn new(sensors: S, delay: D, config: &SystemConfig) -> Self {
        Self {
            sensors,
            delay,
            saturation_percent: config.saturation_threshold_percent,
            warm_ms: config.sensor_warm_ms,
            last: GateReadings::default(),
        }
    }

    /// Take fresh readings and decide.
    pub fn permit(&mut self) -> Permit {
        self.last = GateReadings::default();
        let verdict = self.evaluate();
        match verdict {
            Permit::Allowed => debug!("Gate: allowed ({:?})", self.last),
            Permit::Denied(reason) => warn!("Gate: denied, {} ({:?})", reason, self.last),
        }
        verdict
    }

    /// Readings from the most recent [`permit`](Self::permit) call.
    pub fn last_readings(&self) -> GateReadings {
        self.last
    }

    /// Re-read both sensors inside the power bracket without applying the
    /// watering policy.  Used while a dispense is running, where only a
    /// sensor that stopped answering matters.
    pub fn check_health(&mut self) -> Result<(), SensorError> {
        let powered = PoweredSensors::acquire(&mut self.sensors)?;
        self.delay.delay_ms(self.warm_ms);
        let moisture = powered.sensors.read_moisture_percent()?;
        let water = powered.sensors.read_water_presence()?;
        self.last = GateReadings {
            moisture_percent: Some(moisture),
            water_present: Some(water),
        };
        Ok(())
    }

    /// Read-only access to the owned sensor port (diagnostics).
    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    fn evaluate(&mut self) -> Permit {
        let powered = match PoweredSensors::acquire(&mut self.sensors) {
            Ok(p) => p,
            Err(e) => return Permit::Denied(e.into()),
        };
        // Bounded warm-up; never data dependent.
        self.delay.delay_ms(self.warm_ms);

        let moisture = match powered.sensors.read_moisture_percent() {
            Ok(m) => m,
            Err(e) => return Permit::Denied(e.into()),
        };
        self.last.moisture_percent = Some(moisture);
        if moisture >= self.saturation_percent {
            return Permit::Denied(DenyReason::SoilSaturated);
        }

        let water = match powered.sensors.read_water_presence() {
            Ok(w) => w,
            Err(e) => return Permit::Denied(e.into()),
        };
        self.last.water_present = Some(water);
        if water {
            return Permit::Denied(DenyReason::WaterAlreadyPresent);
        }

        Permit::Allowed
    }
}
