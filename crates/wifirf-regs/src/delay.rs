use embedded_hal::delay::DelayNs;
use std::time::{Duration, Instant};

/// Busy-wait delay on the host clock.
///
/// The calibration loops bound their waits by iteration count, so the delay
/// has to spin rather than yield to the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = Instant::now() + Duration::from_nanos(ns as u64);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Zero-time delay that only accounts for the requested waits.
///
/// Lets the bounded polling loops run with deterministic iteration counts
/// in tests and in the simulator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingDelay {
    calls: u64,
    total_ns: u64,
}

impl CountingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delay calls issued.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn account(&mut self, ns: u64) {
        self.calls += 1;
        self.total_ns = self.total_ns.saturating_add(ns);
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.account(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.account(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.account(ms as u64 * 1_000_000);
    }
}
