//! Fuzz target: `Sequencer` operation sequences
//!
//! Decodes the input as a stream of 3-byte operations (start, advance,
//! stop, emergency stop) and drives them through a sequencer backed by a
//! checking actuator.
//!
//! Invariants checked:
//! - No panics under any operation order
//! - The pump is never energised while the valve is closed
//! - The pump is energised exactly while the phase is `Dispensing`
//! - An emergency stop always ends in `Idle` with the valve closed
//!
//! cargo fuzz run fuzz_sequencer

#![no_main]

use irrigo::app::ports::ActuatorPort;
use irrigo::config::{PumpSpeed, SystemConfig};
use irrigo::sequencer::{RunLength, SequencePhase, Sequencer};
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Checked {
    valve_open: bool,
    pump_on: bool,
}

impl ActuatorPort for Checked {
    fn set_valve(&mut self, open: bool) {
        assert!(open || !self.pump_on, "valve closed under a running pump");
        self.valve_open = open;
    }

    fn set_pump(&mut self, _duty_percent: u8) {
        assert!(self.valve_open, "pump energised against a closed valve");
        self.pump_on = true;
    }

    fn stop_pump(&mut self) {
        self.pump_on = false;
    }
}

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig::default();
    let mut seq = Sequencer::new(Checked::default(), &config);
    let mut now: u64 = 0;

    for op in data.chunks_exact(3) {
        let arg = u16::from_le_bytes([op[1], op[2]]);
        match op[0] % 6 {
            0 => {
                let speed = match arg % 3 {
                    0 => PumpSpeed::Low,
                    1 => PumpSpeed::Mid,
                    _ => PumpSpeed::High,
                };
                let _ = seq.start(RunLength::Timed(u32::from(arg) * 10), speed, now);
            }
            1 => {
                let limit_ms = u32::from(arg) * 10;
                let _ = seq.start(RunLength::UntilStopped { limit_ms }, PumpSpeed::Mid, now);
            }
            2 | 3 => {
                now += u64::from(arg);
                seq.tick(now);
            }
            4 => {
                seq.stop(now);
            }
            _ => seq.emergency_stop(now),
        }
        assert_eq!(
            seq.actuators().pump_on,
            seq.phase() == SequencePhase::Dispensing
        );
    }

    seq.emergency_stop(now);
    for _ in 0..2 {
        now += u64::from(config.valve_settle_ms);
        seq.tick(now);
    }
    assert_eq!(seq.phase(), SequencePhase::Idle);
    assert!(!seq.actuators().valve_open);
});
