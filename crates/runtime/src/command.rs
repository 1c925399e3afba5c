//! Operator velocity command shared between an input thread and the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Forward velocity, lateral velocity and yaw rate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Command {
    pub forward: f32,
    pub lateral: f32,
    pub yaw: f32,
}

impl Command {
    pub const ZERO: Self = Self {
        forward: 0.0,
        lateral: 0.0,
        yaw: 0.0,
    };

    #[must_use]
    pub fn new(forward: f32, lateral: f32, yaw: f32) -> Self {
        Self {
            forward,
            lateral,
            yaw,
        }
    }

    #[must_use]
    pub fn to_array(self) -> [f32; 3] {
        [self.forward, self.lateral, self.yaw]
    }
}

impl From<[f32; 3]> for Command {
    fn from([forward, lateral, yaw]: [f32; 3]) -> Self {
        Self::new(forward, lateral, yaw)
    }
}

const MILLI: f32 = 1000.0;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode(v: f32) -> u64 {
    let milli = (v * MILLI)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
    u64::from(milli as u16)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn decode(bits: u64) -> f32 {
    f32::from((bits & 0xffff) as u16 as i16) / MILLI
}

fn pack(command: Command) -> u64 {
    encode(command.forward) | encode(command.lateral) << 16 | encode(command.yaw) << 32
}

fn unpack(bits: u64) -> Command {
    Command::new(decode(bits), decode(bits >> 16), decode(bits >> 32))
}

/// A [`Command`] stored in one atomic word.
///
/// Each component is kept as signed milli-units, so values are rounded to
/// 0.001 and saturate at ±32.767. Readers never see a half-written command.
#[derive(Clone, Debug, Default)]
pub struct SharedCommand {
    bits: Arc<AtomicU64>,
}

impl SharedCommand {
    #[must_use]
    pub fn new(initial: Command) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(pack(initial))),
        }
    }

    pub fn store(&self, command: Command) {
        self.bits.store(pack(command), Ordering::Release);
    }

    #[must_use]
    pub fn load(&self) -> Command {
        unpack(self.bits.load(Ordering::Acquire))
    }
}
