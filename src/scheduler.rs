//! Automatic-mode timer.
//!
//! The scheduler is a timer plus a flag.  It never touches hardware and
//! knows nothing about the gate or the sequencer: the controller asks
//! [`Scheduler::tick`] whether an attempt is due, runs the gated attempt,
//! and then reports back with [`Scheduler::record_fired`].
//!
//! ```text
//!   enable(now) ──▶ last_fire = now
//!                        │
//!        tick(now) ──────┤ now - last_fire <  interval ─▶ Wait
//!                        │ now - last_fire >= interval ─▶ Fire (latched)
//!                        │ latched                     ─▶ Wait
//!                        ▼
//!   record_fired(now) ─▶ last_fire = now, latch cleared
//! ```
//!
//! A denied attempt is still recorded, so a persistently wet pot defers the
//! next attempt by a full interval instead of being re-polled every cycle.

use log::info;

use crate::calibration::CalibrationEngine;
use crate::error::{Error, Result};

/// Scheduler verdict for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Fire,
    Wait,
}

/// Everything the scheduler knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    pub interval_ms: u64,
    pub last_fire_ms: u64,
    pub auto_mode_enabled: bool,
}

pub struct Scheduler {
    state: ScheduleState,
    /// Set when `Fire` has been returned and not yet acknowledged.
    fire_pending: bool,
}

impl Scheduler {
    /// A disabled scheduler holding `interval_ms` for later.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            state: ScheduleState {
                interval_ms,
                last_fire_ms: 0,
                auto_mode_enabled: false,
            },
            fire_pending: false,
        }
    }

    /// Turn automatic mode on.  The first attempt is due one full interval
    /// after `now_ms`.  Requires a calibrated pump.
    pub fn enable(
        &mut self,
        interval_ms: u64,
        now_ms: u64,
        calibration: &CalibrationEngine,
    ) -> Result<()> {
        if !calibration.is_calibrated() {
            return Err(Error::Uncalibrated);
        }
        if interval_ms == 0 {
            return Err(Error::InvalidDuration);
        }
        self.state = ScheduleState {
            interval_ms,
            last_fire_ms: now_ms,
            auto_mode_enabled: true,
        };
        self.fire_pending = false;
        info!("Scheduler: auto mode on, every {} ms", interval_ms);
        Ok(())
    }

    pub fn disable(&mut self) {
        if self.state.auto_mode_enabled {
            info!("Scheduler: auto mode off");
        }
        self.state.auto_mode_enabled = false;
        self.fire_pending = false;
    }

    /// Returns `Fire` exactly once per elapsed interval.  Further calls
    /// return `Wait` until [`record_fired`](Self::record_fired).
    pub fn tick(&mut self, now_ms: u64) -> Tick {
        if !self.state.auto_mode_enabled || self.fire_pending {
            return Tick::Wait;
        }
        if now_ms.saturating_sub(self.state.last_fire_ms) >= self.state.interval_ms {
            info!(
                "Scheduler: fire at {} ms ({} ms since last)",
                now_ms,
                now_ms.saturating_sub(self.state.last_fire_ms)
            );
            self.fire_pending = true;
            return Tick::Fire;
        }
        Tick::Wait
    }

    /// Acknowledge an attempt, successful or not.
    pub fn record_fired(&mut self, now_ms: u64) {
        self.state.last_fire_ms = now_ms;
        self.fire_pending = false;
    }

    /// Display helper.  `None` while automatic mode is off.
    pub fn time_until_next_ms(&self, now_ms: u64) -> Option<u64> {
        if !self.state.auto_mode_enabled {
            return None;
        }
        let due = self.state.last_fire_ms.saturating_add(self.state.interval_ms);
        Some(due.saturating_sub(now_ms))
    }

    pub fn is_enabled(&self) -> bool {
        self.state.auto_mode_enabled
    }

    pub fn interval_ms(&self) -> u64 {
        self.state.interval_ms
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }
}
