//! Time sources for the control loop and the fixed-period pacing rule.

use std::time::{Duration, Instant};

/// Monotonic time since the clock was created.
pub trait Clock {
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);

    /// Called once per completed fast tick.
    fn tick(&mut self, _period: Duration) {}
}

#[derive(Clone, Debug)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated time: advances exactly one period per tick, never blocks.
#[derive(Clone, Debug, Default)]
pub struct StepClock {
    now: Duration,
}

impl StepClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += duration;
    }

    fn tick(&mut self, period: Duration) {
        self.now += period;
    }
}

/// Time left to sleep in this period, `None` when already behind.
///
/// Missed time is not carried over to later periods.
#[must_use]
pub fn pace(period: Duration, elapsed: Duration) -> Option<Duration> {
    period.checked_sub(elapsed).filter(|rest| !rest.is_zero())
}
