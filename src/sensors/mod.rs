//! Sensor subsystem: individual probes and the aggregating [`SensorHub`].
//!
//! The hub owns both ADC channels and both probe supply switches and
//! implements [`SensorPort`].  Raw codes stay inside the hub; the domain
//! only ever sees a percentage and a boolean.

pub mod moisture;
pub mod water_presence;

use embedded_hal::digital::OutputPin;
use log::{error, warn};

use crate::app::ports::{AnalogInput, SensorPort};
use crate::config::SystemConfig;
use crate::error::SensorError;
use moisture::{MoistureReading, MoistureScale};
use water_presence::WaterPresenceReading;

/// Aggregates the moisture and water-presence probes.
pub struct SensorHub<M, W, P> {
    moisture_adc: M,
    water_adc: W,
    moisture_power: P,
    water_power: P,
    scale: MoistureScale,
    water_threshold: u16,
    powered: bool,
    last_moisture: Option<MoistureReading>,
    last_water: Option<WaterPresenceReading>,
}

impl<M, W, P> SensorHub<M, W, P>
where
    M: AnalogInput,
    W: AnalogInput,
    P: OutputPin,
{
    /// Construct a hub.  Both supplies are switched off immediately.
    pub fn new(
        moisture_adc: M,
        water_adc: W,
        moisture_power: P,
        water_power: P,
        config: &SystemConfig,
    ) -> Self {
        let mut hub = Self {
            moisture_adc,
            water_adc,
            moisture_power,
            water_power,
            scale: MoistureScale::from_config(config),
            water_threshold: config.water_detect_threshold_raw,
            powered: true,
            last_moisture: None,
            last_water: None,
        };
        hub.power_off();
        hub
    }

    /// Whether the probe supplies are currently commanded on.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Last raw codes, for the debug page only.
    pub fn last_raw(&self) -> (Option<u16>, Option<u16>) {
        (
            self.last_moisture.map(|r| r.raw),
            self.last_water.map(|r| r.raw),
        )
    }

    fn check_range(&self, raw: u16) -> Result<u16, SensorError> {
        if raw > self.scale.adc_max {
            warn!("SensorHub: water code {} above ADC range {}", raw, self.scale.adc_max);
            return Err(SensorError::OutOfRange);
        }
        Ok(raw)
    }
}

impl<M, W, P> SensorPort for SensorHub<M, W, P>
where
    M: AnalogInput,
    W: AnalogInput,
    P: OutputPin,
{
    fn power_on(&mut self) -> Result<(), SensorError> {
        let soil = self.moisture_power.set_high();
        let tray = self.water_power.set_high();
        self.powered = true;
        if let Err(e) = soil {
            error!("SensorHub: moisture supply on failed: {:?}", e);
            return Err(SensorError::PowerSwitchFailed);
        }
        if let Err(e) = tray {
            error!("SensorHub: water supply on failed: {:?}", e);
            return Err(SensorError::PowerSwitchFailed);
        }
        Ok(())
    }

    fn power_off(&mut self) {
        // Attempt both even if the first fails.
        if let Err(e) = self.moisture_power.set_low() {
            error!("SensorHub: moisture supply off failed: {:?}", e);
        }
        if let Err(e) = self.water_power.set_low() {
            error!("SensorHub: water supply off failed: {:?}", e);
        }
        self.powered = false;
    }

    fn read_moisture_percent(&mut self) -> Result<u8, SensorError> {
        let reading = MoistureReading::new(self.moisture_adc.read_raw()?);
        if !reading.is_plausible(&self.scale) {
            warn!("SensorHub: moisture code {} above ADC range", reading.raw);
            return Err(SensorError::OutOfRange);
        }
        self.last_moisture = Some(reading);
        Ok(reading.percent(&self.scale))
    }

    fn read_water_presence(&mut self) -> Result<bool, SensorError> {
        let raw = self.water_adc.read_raw()?;
        let raw = self.check_range(raw)?;
        let reading = WaterPresenceReading::from_raw(raw, self.water_threshold);
        self.last_water = Some(reading);
        Ok(reading.present)
    }
}
