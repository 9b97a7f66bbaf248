//! Serial console input.
//!
//! A reader thread pulls lines from stdin (UART0 / USB-CDC on the board)
//! and hands them to the control loop through a bounded static channel.
//! The loop drains it with [`try_recv_line`] and never blocks on input.
//!
//! ```text
//! ┌──────────────┐    Line     ┌──────────────┐
//! │ console task │────────────▶│ control loop │
//! │ (stdin)      │  4 deep     │ (100 ms)     │
//! └──────────────┘             └──────────────┘
//! ```

use std::io::BufRead;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

/// Longest accepted console line, in bytes.
pub const LINE_CAPACITY: usize = 64;

/// Lines waiting for the control loop.
const LINE_DEPTH: usize = 4;

/// Back-off while the console has nothing to read.
const IDLE_POLL: Duration = Duration::from_millis(50);

pub type Line = heapless::String<LINE_CAPACITY>;

static LINE_CHANNEL: Channel<CriticalSectionRawMutex, Line, LINE_DEPTH> = Channel::new();

/// Queue one line for the control loop.  Returns `false` if the line was
/// blank, too long, or the queue is full.
pub fn feed_line(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    let Ok(line) = Line::try_from(text) else {
        warn!("Console: line over {} bytes dropped", LINE_CAPACITY);
        return false;
    };
    if LINE_CHANNEL.try_send(line).is_err() {
        warn!("Console: input queue full, dropping line");
        return false;
    }
    true
}

/// Next queued line, if any.
pub fn try_recv_line() -> Option<Line> {
    LINE_CHANNEL.try_receive().ok()
}

/// Spawn the stdin reader thread.
pub fn spawn_reader() -> std::io::Result<std::thread::JoinHandle<()>> {
    info!("Spawning 'console' (stack=4KB)");
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(read_loop)
}

fn read_loop() {
    let mut stdin = std::io::stdin().lock();
    let mut buf = String::new();
    loop {
        // The board console may be non-blocking: a read can return
        // nothing or half a line, so only complete lines are queued.
        match stdin.read_line(&mut buf) {
            Ok(n) if n > 0 && buf.ends_with('\n') => {
                feed_line(&buf);
                buf.clear();
            }
            Ok(_) | Err(_) => {
                if buf.len() > LINE_CAPACITY {
                    buf.clear();
                }
                std::thread::sleep(IDLE_POLL);
            }
        }
    }
}
