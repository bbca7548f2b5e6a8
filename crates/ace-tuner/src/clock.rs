//! Time within the current second

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Source of the position within the current second
///
/// On the device this is derived from the GPS pulse-per-second, so every
/// receiver in range agrees on where the second starts.
pub trait Clock: Send + Sync {
    /// Milliseconds since the start of the current second (0..1000)
    fn ms_in_second(&self) -> u16;
}

/// Wall clock, assumes the system time is GPS disciplined
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn ms_in_second(&self) -> u16 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_millis() as u16)
            .unwrap_or(0)
    }
}

/// Clock on the tokio timer, with the second starting at creation plus an offset
///
/// Follows paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
    offset_ms: u16,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Clock that reads `offset_ms` at creation
    pub fn with_offset(offset_ms: u16) -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: offset_ms % 1000,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn ms_in_second(&self) -> u16 {
        let elapsed = self.origin.elapsed().as_millis() + self.offset_ms as u128;
        (elapsed % 1000) as u16
    }
}
