//! Sensor latency model for the IMU-derived observation blocks.

use std::collections::VecDeque;
use std::time::Duration;

/// `[x, y, z, w]` orientation, `[x, y, z]` angular velocity.
pub type ImuReading = ([f32; 4], [f32; 3]);

/// Returned while the delay has not elapsed yet.
pub const PLACEHOLDER: ImuReading = ([0.0; 4], [0.0; 3]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyPhase {
    Idle,
    Buffering,
}

/// FIFO that starts releasing samples once `delay` has passed since the very
/// first push, then hands them out one per pop in push order.
///
/// The buffer is unbounded: when pushes outpace pops it keeps growing.
#[derive(Clone, Debug)]
pub struct LatencySimulator {
    delay: Duration,
    first_push: Option<Duration>,
    samples: VecDeque<ImuReading>,
}

impl LatencySimulator {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            first_push: None,
            samples: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn phase(&self) -> LatencyPhase {
        if self.first_push.is_some() {
            LatencyPhase::Buffering
        } else {
            LatencyPhase::Idle
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, orientation: [f32; 4], angular_velocity: [f32; 3], timestamp: Duration) {
        self.samples.push_back((orientation, angular_velocity));
        self.first_push.get_or_insert(timestamp);
    }

    /// Oldest buffered sample, or [`PLACEHOLDER`] before the delay elapsed.
    ///
    /// An empty buffer past the delay also yields the placeholder.
    pub fn pop(&mut self, now: Duration) -> ImuReading {
        let Some(t0) = self.first_push else {
            return PLACEHOLDER;
        };
        if now.saturating_sub(t0) < self.delay {
            return PLACEHOLDER;
        }
        self.samples.pop_front().unwrap_or(PLACEHOLDER)
    }
}
