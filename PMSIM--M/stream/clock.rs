use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic time source read by the rate gate.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Starts a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. With a non-zero step every read advances time after
/// returning, which models fixed per-iteration latency.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    step: Duration,
}

impl ManualClock {
    /// Clock frozen at zero until [`ManualClock::advance`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that moves forward by `step` after each read.
    #[must_use]
    pub fn ticking(step: Duration) -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
            step,
        }
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let mut now = self.now.lock();
        let current = *now;
        *now += self.step;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticking_clock_advances_per_read() {
        let clock = ManualClock::ticking(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(100));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_millis(1200));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
