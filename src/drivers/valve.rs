//! Solenoid valve driver.
//!
//! A single digital output through a relay.  Travel time is not handled
//! here: the sequencer waits out the settle window before energising the
//! pump.  GPIO errors are logged and the commanded state is kept, so that
//! a later close is never skipped.

use embedded_hal::digital::OutputPin;
use log::error;

pub struct ValveDriver<P> {
    pin: P,
    open: bool,
}

impl<P: OutputPin> ValveDriver<P> {
    /// Wrap the output.  The valve is commanded closed immediately.
    pub fn new(pin: P) -> Self {
        let mut driver = Self { pin, open: true };
        driver.close();
        driver
    }

    pub fn open(&mut self) {
        if let Err(e) = self.pin.set_high() {
            error!("Valve: open failed: {:?}", e);
        }
        self.open = true;
    }

    pub fn close(&mut self) {
        if let Err(e) = self.pin.set_low() {
            error!("Valve: close failed: {:?}", e);
        }
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
