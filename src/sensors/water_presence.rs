//! Conductivity probe for standing water in the drip tray.
//!
//! Two exposed contacts sit at the bottom of the tray; water bridging them
//! pulls the ADC code up.  A single threshold decides presence, there is
//! no hysteresis band.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterPresenceReading {
    pub raw: u16,
    pub present: bool,
}

impl WaterPresenceReading {
    /// Presence is `raw > threshold`.
    pub fn from_raw(raw: u16, threshold: u16) -> Self {
        Self {
            raw,
            present: raw > threshold,
        }
    }
}
