//! Actuator sequencer: the only code path that energises the pump.
//!
//! ```text
//!          start()                settle               run elapsed / stop
//!  IDLE ───────────▶ VALVE_OPENING ──────▶ DISPENSING ────────────────────▶ VALVE_CLOSING
//!   ▲      valve open                      pump on       pump off               │
//!   │                                                                           │
//!   └───────────────────────────── settle, valve closed ───────────────────────┘
//!
//!  any state ──[emergency_stop]──▶ VALVE_CLOSING (pump off immediately)
//! ```
//!
//! All timing is non-blocking: [`Sequencer::tick`] compares the cycle's
//! `now_ms` against the timestamp saved on entry to the current phase and
//! performs at most one transition per call.
//!
//! The pump output is energised on entry to `Dispensing` and de-energised
//! on every exit from it, so it is never on while the valve is travelling.
//! The sequencer never consults the safety gate; the controller does that
//! before calling [`Sequencer::start`].

use log::{info, warn};
use serde::Serialize;

use crate::app::ports::ActuatorPort;
use crate::config::{PumpSpeed, SystemConfig};
use crate::error::{Error, Result};

/// Public view of the sequencer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequencePhase {
    Idle,
    ValveOpening,
    Dispensing,
    ValveClosing,
}

/// How long the pump runs once dispensing begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    /// Fixed run time.
    Timed(u32),
    /// Until [`Sequencer::stop`] is called, bounded by `limit_ms`.
    UntilStopped { limit_ms: u32 },
}

impl RunLength {
    /// Run time for `Timed`, the hard limit for `UntilStopped`.
    pub fn limit_ms(self) -> u32 {
        match self {
            Self::Timed(ms) | Self::UntilStopped { limit_ms: ms } => ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseState {
    Idle,
    ValveOpening { since_ms: u64, run: RunLength, duty: u8 },
    Dispensing { since_ms: u64, run: RunLength },
    ValveClosing { since_ms: u64 },
}

impl PhaseState {
    fn public(self) -> SequencePhase {
        match self {
            Self::Idle => SequencePhase::Idle,
            Self::ValveOpening { .. } => SequencePhase::ValveOpening,
            Self::Dispensing { .. } => SequencePhase::Dispensing,
            Self::ValveClosing { .. } => SequencePhase::ValveClosing,
        }
    }
}

pub struct Sequencer<A> {
    actuators: A,
    state: PhaseState,
    config: SystemConfig,
    pump_energized: bool,
    emergency_stops: u32,
}

impl<A: ActuatorPort> Sequencer<A> {
    /// Take ownership of the actuators and drive them to a safe state.
    pub fn new(mut actuators: A, config: &SystemConfig) -> Self {
        actuators.stop_pump();
        actuators.set_valve(false);
        Self {
            actuators,
            state: PhaseState::Idle,
            config: config.clone(),
            pump_energized: false,
            emergency_stops: 0,
        }
    }

    /// Begin a dispense sequence.  Only valid from `Idle`.
    pub fn start(&mut self, run: RunLength, speed: PumpSpeed, now_ms: u64) -> Result<()> {
        if self.state != PhaseState::Idle {
            return Err(Error::Busy);
        }
        if run.limit_ms() == 0 {
            return Err(Error::InvalidDuration);
        }
        let duty = self.config.duty_for(speed);
        self.actuators.set_valve(true);
        self.transition(PhaseState::ValveOpening {
            since_ms: now_ms,
            run,
            duty,
        });
        info!("Sequencer: start {:?} at {:?} ({}%)", run, speed, duty);
        Ok(())
    }

    /// Advance timers.  Call once per main-loop cycle.
    pub fn tick(&mut self, now_ms: u64) -> SequencePhase {
        let settle_ms = u64::from(self.config.valve_settle_ms);
        match self.state {
            PhaseState::Idle => {}
            PhaseState::ValveOpening { since_ms, run, duty } => {
                if elapsed(since_ms, now_ms) >= settle_ms {
                    self.actuators.set_pump(duty);
                    self.pump_energized = true;
                    self.transition(PhaseState::Dispensing {
                        since_ms: now_ms,
                        run,
                    });
                }
            }
            PhaseState::Dispensing { since_ms, run } => {
                if elapsed(since_ms, now_ms) >= u64::from(run.limit_ms()) {
                    if matches!(run, RunLength::UntilStopped { .. }) {
                        warn!("Sequencer: open-ended run hit its {} ms limit", run.limit_ms());
                    }
                    self.begin_closing(now_ms);
                }
            }
            PhaseState::ValveClosing { since_ms } => {
                if elapsed(since_ms, now_ms) >= settle_ms {
                    self.actuators.set_valve(false);
                    self.transition(PhaseState::Idle);
                }
            }
        }
        self.state.public()
    }

    /// End the current run early (control input released).  The closing
    /// settle starts at `now_ms`.  Returns `true` if a run was cut short.
    pub fn stop(&mut self, now_ms: u64) -> bool {
        match self.state {
            PhaseState::ValveOpening { .. } | PhaseState::Dispensing { .. } => {
                self.begin_closing(now_ms);
                true
            }
            PhaseState::Idle | PhaseState::ValveClosing { .. } => false,
        }
    }

    /// De-energise the pump now and force the valve-closing phase.
    ///
    /// Callable from any phase and never fails.  The closing settle starts
    /// at `now_ms`; a stop during `ValveClosing` keeps the timer already
    /// running.
    pub fn emergency_stop(&mut self, now_ms: u64) {
        self.actuators.stop_pump();
        self.pump_energized = false;
        self.emergency_stops = self.emergency_stops.saturating_add(1);
        warn!("Sequencer: EMERGENCY STOP in {:?}", self.state.public());
        if !matches!(self.state, PhaseState::ValveClosing { .. }) {
            self.transition(PhaseState::ValveClosing { since_ms: now_ms });
        }
    }

    pub fn phase(&self) -> SequencePhase {
        self.state.public()
    }

    pub fn is_idle(&self) -> bool {
        self.state == PhaseState::Idle
    }

    /// Whether the pump output is currently energised.
    pub fn is_pump_energized(&self) -> bool {
        self.pump_energized
    }

    /// Milliseconds left in the current phase, `None` when idle.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let (since_ms, span) = match self.state {
            PhaseState::Idle => return None,
            PhaseState::ValveOpening { since_ms, .. } | PhaseState::ValveClosing { since_ms } => {
                (since_ms, u64::from(self.config.valve_settle_ms))
            }
            PhaseState::Dispensing { since_ms, run } => (since_ms, u64::from(run.limit_ms())),
        };
        Some(span.saturating_sub(elapsed(since_ms, now_ms)))
    }

    /// Emergency stops since boot.
    pub fn emergency_stop_count(&self) -> u32 {
        self.emergency_stops
    }

    /// Read-only access to the owned actuators.
    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    fn begin_closing(&mut self, now_ms: u64) {
        self.actuators.stop_pump();
        self.pump_energized = false;
        self.transition(PhaseState::ValveClosing { since_ms: now_ms });
    }

    fn transition(&mut self, next: PhaseState) {
        let from = self.state.public();
        self.state = next;
        let to = next.public();
        if from != to {
            info!("Sequencer: {:?} -> {:?}", from, to);
        }
    }
}

fn elapsed(since_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}
