//! Polled, debounced push buttons.
//!
//! ## Hardware
//!
//! Active-low momentary switches with pull-ups.  There are no interrupts:
//! [`ButtonDriver::tick`] samples the pin once per main-loop cycle and runs
//! a non-blocking debounce, so button handling interleaves with the
//! sequencer and scheduler timers instead of busy-waiting on a pin.
//!
//! ## Debounce
//!
//! A level change must hold for `debounce_ms` before it is accepted.  Any
//! bounce restarts the window.  Accepted changes are reported as edges:
//!
//! | Stable level change | Event      |
//! |---------------------|------------|
//! | high → low          | `Pressed`  |
//! | low → high          | `Released` |

use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::warn;

/// Debounced edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

pub struct ButtonDriver<P> {
    pin: P,
    debounce_ms: u32,
    /// Accepted (debounced) level.
    pressed: bool,
    /// Last raw sample and when it was first seen.
    candidate: bool,
    candidate_since_ms: u64,
}

impl<P: InputPin> ButtonDriver<P> {
    pub fn new(pin: P, debounce_ms: u32) -> Self {
        Self {
            pin,
            debounce_ms,
            pressed: false,
            candidate: false,
            candidate_since_ms: 0,
        }
    }

    /// Sample the pin.  Call once per main-loop cycle.
    pub fn tick(&mut self, now_ms: u64) -> Option<ButtonEvent> {
        let raw = match self.pin.is_low() {
            Ok(level) => level,
            Err(e) => {
                warn!("Button: read failed: {:?}", e);
                return None;
            }
        };

        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
            return None;
        }

        let held = now_ms.saturating_sub(self.candidate_since_ms);
        if raw != self.pressed && held >= u64::from(self.debounce_ms) {
            self.pressed = raw;
            return Some(if raw {
                ButtonEvent::Pressed
            } else {
                ButtonEvent::Released
            });
        }
        None
    }

    /// Debounced level.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

/// A fixed set of buttons sampled together.
pub struct ButtonBank<P, const N: usize> {
    buttons: [ButtonDriver<P>; N],
}

impl<P: InputPin, const N: usize> ButtonBank<P, N> {
    pub fn new(pins: [P; N], debounce_ms: u32) -> Self {
        Self {
            buttons: pins.map(|pin| ButtonDriver::new(pin, debounce_ms)),
        }
    }

    /// Sample every button.  Returns `(index, edge)` pairs in index order.
    pub fn tick(&mut self, now_ms: u64) -> Vec<(usize, ButtonEvent), N> {
        let mut events = Vec::new();
        for (index, button) in self.buttons.iter_mut().enumerate() {
            if let Some(event) = button.tick(now_ms) {
                // At most one edge per button per tick, so N always fits.
                let _ = events.push((index, event));
            }
        }
        events
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).is_some_and(ButtonDriver::is_pressed)
    }
}
