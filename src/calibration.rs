//! Volume calibration.
//!
//! The pump is calibrated with a supervised test dispense: the user runs
//! the pump for a trial duration and confirms whether exactly one unit
//! (one cup on the reference jug) came out.  A confirmed trial duration
//! becomes the factor, in milliseconds per unit.  Until then every volume
//! request fails with `Uncalibrated`.

use log::{info, warn};

use crate::error::{Error, Result};

/// Result of submitting a calibration trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// The trial was confirmed and is now the active factor.
    Calibrated { factor_ms: u32 },
    /// The user did not confirm; adjust the trial duration and retry.
    RetryRequired,
}

pub struct CalibrationEngine {
    factor_ms: Option<u32>,
    max_dispense_ms: u32,
}

impl CalibrationEngine {
    /// An uncalibrated engine.
    pub fn new(max_dispense_ms: u32) -> Self {
        Self {
            factor_ms: None,
            max_dispense_ms,
        }
    }

    /// Restore a previously persisted factor.  Invalid factors are
    /// discarded and the engine starts uncalibrated.
    pub fn restore(factor_ms: Option<u32>, max_dispense_ms: u32) -> Self {
        let mut engine = Self::new(max_dispense_ms);
        match factor_ms {
            Some(f) if f > 0 && f <= max_dispense_ms => {
                info!("Calibration: restored factor {} ms/unit", f);
                engine.factor_ms = Some(f);
            }
            Some(f) => warn!("Calibration: discarding stored factor {} ms/unit", f),
            None => {}
        }
        engine
    }

    /// Submit a trial.  Only a confirmed trial overwrites the factor; a
    /// zero or over-ceiling trial is rejected and leaves the factor alone.
    pub fn record_calibration(
        &mut self,
        test_duration_ms: u32,
        confirmed_one_unit: bool,
    ) -> Result<CalibrationOutcome> {
        if test_duration_ms == 0 || test_duration_ms > self.max_dispense_ms {
            warn!("Calibration: rejected trial of {} ms", test_duration_ms);
            return Err(Error::InvalidDuration);
        }
        if !confirmed_one_unit {
            info!("Calibration: trial of {} ms not confirmed, retry", test_duration_ms);
            return Ok(CalibrationOutcome::RetryRequired);
        }
        self.factor_ms = Some(test_duration_ms);
        info!("Calibration: factor set to {} ms/unit", test_duration_ms);
        Ok(CalibrationOutcome::Calibrated {
            factor_ms: test_duration_ms,
        })
    }

    /// Pump run time for `volume` units, rounded to the nearest
    /// millisecond and clamped to the dispense ceiling.
    pub fn duration_for_volume(&self, volume: f32) -> Result<u32> {
        let factor = self.factor_ms.ok_or(Error::Uncalibrated)?;
        if !volume.is_finite() || volume <= 0.0 {
            return Err(Error::InvalidDuration);
        }
        let ms = (f64::from(volume) * f64::from(factor)).round();
        if ms < 1.0 {
            return Err(Error::InvalidDuration);
        }
        if ms > f64::from(self.max_dispense_ms) {
            warn!(
                "Calibration: {} units needs {} ms, clamped to {} ms",
                volume, ms, self.max_dispense_ms
            );
            return Ok(self.max_dispense_ms);
        }
        Ok(ms as u32)
    }

    pub fn factor_ms(&self) -> Option<u32> {
        self.factor_ms
    }

    pub fn is_calibrated(&self) -> bool {
        self.factor_ms.is_some()
    }

    /// Forget the factor.
    pub fn reset(&mut self) {
        if self.factor_ms.take().is_some() {
            info!("Calibration: factor cleared");
        }
    }

    pub fn max_dispense_ms(&self) -> u32 {
        self.max_dispense_ms
    }
}
