//! System configuration parameters
//!
//! [`SystemConfig`] holds the fixed hardware and timing constants of the
//! board.  [`Settings`] is the small user-editable subset that survives a
//! power cycle (interval, target volume, speed, calibration, auto flag).

use serde::{Deserialize, Serialize};

/// Pump speed tier.  Each tier maps to a PWM duty via [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PumpSpeed {
    Low,
    #[default]
    Mid,
    High,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Moisture sensor ---
    /// Raw code at (or below) which the soil reads 0 %.
    pub moisture_dry_raw: u16,
    /// Raw code at (or above) which the soil reads 100 %.
    pub moisture_wet_raw: u16,
    /// Largest raw code the ADC can produce; anything above is a fault.
    pub adc_max_raw: u16,

    // --- Water presence sensor ---
    /// Presence is reported when the raw code is strictly above this.
    pub water_detect_threshold_raw: u16,

    // --- Safety ---
    /// Moisture percentage at which watering is refused (`>=`).
    pub saturation_threshold_percent: u8,
    /// Hard ceiling on a single dispense, in milliseconds.
    pub max_dispense_ms: u32,

    // --- Pump ---
    pub pump_low_duty_percent: u8,
    pub pump_mid_duty_percent: u8,
    pub pump_high_duty_percent: u8,

    // --- Timing ---
    /// Sensor warm-up after power-on, inside the power bracket.
    pub sensor_warm_ms: u32,
    /// Valve travel time, applied after opening and before closing.
    pub valve_settle_ms: u32,
    /// Stable-level window for button debouncing.
    pub debounce_ms: u32,
    /// Main loop polling period.
    pub control_loop_interval_ms: u32,
    /// Sensor health re-check period while the pump is running.
    pub health_check_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Moisture (10-bit codes)
            moisture_dry_raw: 300,
            moisture_wet_raw: 880,
            adc_max_raw: 1023,

            // Water presence
            water_detect_threshold_raw: 350,

            // Safety
            saturation_threshold_percent: 70,
            max_dispense_ms: 300_000, // 5 min

            // Pump tiers (90 / 150 / 255 of 255)
            pump_low_duty_percent: 35,
            pump_mid_duty_percent: 59,
            pump_high_duty_percent: 100,

            // Timing
            sensor_warm_ms: 200,
            valve_settle_ms: 2000,
            debounce_ms: 25,
            control_loop_interval_ms: 100, // 10 Hz
            health_check_interval_ms: 5_000,
        }
    }
}

impl SystemConfig {
    /// PWM duty (0-100) for a speed tier.
    pub fn duty_for(&self, speed: PumpSpeed) -> u8 {
        match speed {
            PumpSpeed::Low => self.pump_low_duty_percent,
            PumpSpeed::Mid => self.pump_mid_duty_percent,
            PumpSpeed::High => self.pump_high_duty_percent,
        }
    }

    /// Reject inconsistent constants before the controller is built.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.moisture_dry_raw >= self.moisture_wet_raw {
            return Err("moisture_dry_raw must be below moisture_wet_raw");
        }
        if self.moisture_wet_raw > self.adc_max_raw {
            return Err("moisture_wet_raw must not exceed adc_max_raw");
        }
        if self.saturation_threshold_percent == 0 || self.saturation_threshold_percent > 100 {
            return Err("saturation_threshold_percent must be 1-100");
        }
        for duty in [
            self.pump_low_duty_percent,
            self.pump_mid_duty_percent,
            self.pump_high_duty_percent,
        ] {
            if duty == 0 || duty > 100 {
                return Err("pump duty tiers must be 1-100");
            }
        }
        if self.valve_settle_ms == 0 || self.max_dispense_ms == 0 {
            return Err("valve_settle_ms and max_dispense_ms must be non-zero");
        }
        if self.health_check_interval_ms < self.sensor_warm_ms {
            return Err("health_check_interval_ms must cover the sensor warm-up");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Persisted user settings
// ---------------------------------------------------------------------------

/// Shortest automatic interval accepted from the user.
pub const MIN_INTERVAL_MS: u64 = 60_000;
/// Longest automatic interval accepted from the user (one week).
pub const MAX_INTERVAL_MS: u64 = 7 * 24 * 3_600_000;
/// Largest target volume accepted, in calibration units.
pub const MAX_TARGET_VOLUME: f32 = 20.0;

/// User settings, loaded once at boot and written back only on explicit
/// confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Automatic watering interval.
    pub interval_ms: u64,
    /// Volume dispensed per automatic watering, in calibration units.
    pub target_volume: f32,
    /// Speed tier used for automatic and calibration runs.
    pub speed: PumpSpeed,
    /// Milliseconds of pump time per unit volume; `None` until calibrated.
    pub calibration_factor_ms: Option<u32>,
    /// Whether automatic mode was on when last saved.
    pub auto_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_ms: 3_600_000, // 1 h
            target_volume: 1.0,
            speed: PumpSpeed::Mid,
            calibration_factor_ms: None,
            auto_mode: false,
        }
    }
}

impl Settings {
    /// Range-check every field against the board limits.
    pub fn validate(&self, config: &SystemConfig) -> Result<(), &'static str> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.interval_ms) {
            return Err("interval_ms must be 1 min - 7 days");
        }
        if !self.target_volume.is_finite()
            || self.target_volume <= 0.0
            || self.target_volume > MAX_TARGET_VOLUME
        {
            return Err("target_volume must be within (0, 20]");
        }
        if let Some(factor) = self.calibration_factor_ms {
            if factor == 0 || factor > config.max_dispense_ms {
                return Err("calibration_factor_ms must be 1..=max_dispense_ms");
            }
        }
        if self.auto_mode && self.calibration_factor_ms.is_none() {
            return Err("auto_mode requires a calibration factor");
        }
        Ok(())
    }
}
