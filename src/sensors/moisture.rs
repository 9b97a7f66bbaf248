//! Resistive soil-moisture probe.
//!
//! The probe is powered only during a reading (electrolysis corrodes the
//! tines otherwise).  Raw ADC codes are mapped linearly between two
//! calibrated references and clamped to 0–100 %.

use crate::config::SystemConfig;

/// Two-point scale for converting raw codes to a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureScale {
    /// Code at which the soil reads bone dry.
    pub dry_raw: u16,
    /// Code at which the soil reads saturated.
    pub wet_raw: u16,
    /// Largest code the ADC can legitimately produce.
    pub adc_max: u16,
}

impl MoistureScale {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            dry_raw: config.moisture_dry_raw,
            wet_raw: config.moisture_wet_raw,
            adc_max: config.adc_max_raw,
        }
    }
}

/// A single raw probe sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureReading {
    pub raw: u16,
}

impl MoistureReading {
    pub fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// A code above the ADC range means a wiring or driver fault.
    pub fn is_plausible(&self, scale: &MoistureScale) -> bool {
        self.raw <= scale.adc_max
    }

    /// Monotonic linear map onto 0–100 %, clamped at both references.
    pub fn percent(&self, scale: &MoistureScale) -> u8 {
        if self.raw <= scale.dry_raw {
            return 0;
        }
        if self.raw >= scale.wet_raw {
            return 100;
        }
        let span = u32::from(scale.wet_raw - scale.dry_raw);
        let offset = u32::from(self.raw - scale.dry_raw);
        (offset * 100 / span) as u8
    }
}
