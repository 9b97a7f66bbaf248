//! Hardware adapter: bridges the pump and valve drivers to [`ActuatorPort`].
//!
//! Owned by the sequencer, which makes it the only writer to the physical
//! outputs.  The sensor side is served separately by
//! [`SensorHub`](crate::sensors::SensorHub), owned by the safety gate.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::ActuatorPort;
use crate::drivers::pump::PumpDriver;
use crate::drivers::valve::ValveDriver;

/// Concrete adapter that combines the actuators behind the port trait.
pub struct HardwareAdapter<P, V> {
    pump: PumpDriver<P>,
    valve: ValveDriver<V>,
}

impl<P: SetDutyCycle, V: OutputPin> HardwareAdapter<P, V> {
    pub fn new(pump: PumpDriver<P>, valve: ValveDriver<V>) -> Self {
        Self { pump, valve }
    }

    pub fn pump(&self) -> &PumpDriver<P> {
        &self.pump
    }

    pub fn valve(&self) -> &ValveDriver<V> {
        &self.valve
    }

    /// Everything off, valve closed.  Used by the top-level error path.
    pub fn all_off(&mut self) {
        self.pump.stop();
        self.valve.close();
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: SetDutyCycle, V: OutputPin> ActuatorPort for HardwareAdapter<P, V> {
    fn set_valve(&mut self, open: bool) {
        if open {
            self.valve.open();
        } else {
            self.valve.close();
        }
    }

    fn set_pump(&mut self, duty_percent: u8) {
        self.pump.set(duty_percent);
    }

    fn stop_pump(&mut self) {
        self.pump.stop();
    }
}
