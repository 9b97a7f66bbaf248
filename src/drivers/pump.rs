//! Pump motor driver (low-side MOSFET on a PWM channel).
//!
//! Variable-speed control via any `embedded_hal::pwm::SetDutyCycle`
//! channel.  On the board that is an LEDC channel; in tests a fake.
//!
//! ## Safety contract
//!
//! The pump must only run while the valve is fully open.  That ordering is
//! enforced by the sequencer; this driver is a dumb actuator.  PWM write
//! failures are logged and never propagated, and the tracked state always
//! reflects what was *commanded*, so a stop is never skipped.

use embedded_hal::pwm::SetDutyCycle;
use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Stopped,
    Running { duty: u8 },
}

pub struct PumpDriver<P> {
    pwm: P,
    state: PumpState,
}

impl<P: SetDutyCycle> PumpDriver<P> {
    /// Wrap a PWM channel.  The output is driven fully off immediately.
    pub fn new(pwm: P) -> Self {
        let mut driver = Self {
            pwm,
            state: PumpState::Running { duty: 0 },
        };
        driver.stop();
        driver
    }

    /// Run at `duty` percent (clamped to 100).  Zero stops the pump.
    pub fn set(&mut self, duty: u8) {
        let duty = duty.min(100);
        if duty == 0 {
            self.stop();
            return;
        }
        if let Err(e) = self.pwm.set_duty_cycle_percent(duty) {
            error!("Pump: PWM write {}% failed: {:?}", duty, e);
        }
        self.state = PumpState::Running { duty };
    }

    pub fn stop(&mut self) {
        if let Err(e) = self.pwm.set_duty_cycle_fully_off() {
            error!("Pump: PWM off failed: {:?}", e);
        }
        self.state = PumpState::Stopped;
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, PumpState::Stopped)
    }

    pub fn current_duty(&self) -> u8 {
        match self.state {
            PumpState::Stopped => 0,
            PumpState::Running { duty } => duty,
        }
    }
}
