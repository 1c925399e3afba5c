//! Single-joint sine sweep for comparing a substrate's response to its
//! command, run once in simulation and once on hardware.

use crate::clock::{pace, Clock};
use crate::error::ControlError;
use crate::variant::RobotVariant;
use physics::{ActuatorCommand, Substrate};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProbeSample {
    /// Seconds since the probe started.
    pub time: f64,
    pub command: f32,
    pub measured: f32,
    pub velocity: f32,
}

/// Drives one joint at `neutral + amplitude * sin(frequency * t)` while every
/// other joint holds its neutral position.
#[derive(Clone, Debug)]
pub struct SineProbe {
    pub joint: usize,
    pub joint_name: String,
    pub neutral: Vec<f32>,
    pub amplitude: f32,
    /// Angular frequency in rad/s.
    pub frequency: f32,
    pub control_hz: f32,
    pub sampling_hz: f32,
    pub duration: Duration,
    pub timestep: f32,
    pub substeps: usize,
}

impl SineProbe {
    /// Probe for the physical joint called `name`, with default sweep
    /// parameters (amplitude 0.5, 10 rad/s, commands at 30 Hz, samples at
    /// 100 Hz, 5 s, 5 steps of 1 ms per iteration).
    ///
    /// # Errors
    ///
    /// `Config` for an unknown joint name.
    pub fn for_joint(variant: &RobotVariant, name: &str) -> Result<Self, ControlError> {
        let joint = variant
            .physical_joints
            .iter()
            .position(|j| j == name)
            .ok_or_else(|| ControlError::Config(format!("unknown joint '{name}'")))?;
        Ok(Self {
            joint,
            joint_name: name.to_string(),
            neutral: variant.neutral_pose.clone(),
            amplitude: 0.5,
            frequency: 10.0,
            control_hz: 30.0,
            sampling_hz: 100.0,
            duration: Duration::from_secs(5),
            timestep: 0.001,
            substeps: 5,
        })
    }

    fn period(&self) -> Result<Duration, ControlError> {
        Duration::try_from_secs_f64(f64::from(self.timestep) * self.substeps as f64)
            .ok()
            .filter(|period| !period.is_zero())
            .ok_or_else(|| {
                ControlError::Config(format!(
                    "probe step of {} s x {} substeps is not a positive duration",
                    self.timestep, self.substeps
                ))
            })
    }

    /// Run the sweep.
    ///
    /// The clock decides how time passes: a `StepClock` runs the sweep in
    /// simulated time, a `WallClock` paces it in real time.
    ///
    /// # Errors
    ///
    /// Substrate failures and a neutral pose that does not fit the substrate.
    pub fn run<S: Substrate>(
        &self,
        substrate: &mut S,
        clock: &mut dyn Clock,
    ) -> Result<Vec<ProbeSample>, ControlError> {
        ControlError::check_len("neutral pose", substrate.dof(), self.neutral.len())?;
        if self.joint >= self.neutral.len() {
            return Err(ControlError::Config(format!("joint index {} out of range", self.joint)));
        }
        let period = self.period()?;
        let control_every = interval("control", self.control_hz)?;
        let sample_every = interval("sampling", self.sampling_hz)?;

        info!(
            joint = %self.joint_name,
            amplitude = self.amplitude,
            frequency = self.frequency,
            seconds = self.duration.as_secs_f32(),
            "sine probe starting"
        );

        let start = clock.now();
        let mut target = self.neutral.clone();
        let mut last_control: Option<Duration> = None;
        let mut last_sample: Option<Duration> = None;
        let mut samples = Vec::new();

        loop {
            let now = clock.now().saturating_sub(start);
            if now > self.duration {
                break;
            }
            if last_control.map_or(true, |t| now.saturating_sub(t) > control_every) {
                last_control = Some(now);
                target[self.joint] =
                    self.neutral[self.joint] + (self.frequency * now.as_secs_f32()).sin() * self.amplitude;
                substrate.set_actuator_target(&ActuatorCommand::Position(target.clone()))?;
            }

            substrate.step(self.timestep, self.substeps)?;

            if last_sample.map_or(true, |t| now.saturating_sub(t) > sample_every) {
                last_sample = Some(now);
                let state = substrate.state()?;
                samples.push(ProbeSample {
                    time: now.as_secs_f64(),
                    command: target[self.joint],
                    measured: state.joint_positions[self.joint],
                    velocity: state.joint_velocities[self.joint],
                });
            }

            let before = clock.now();
            clock.tick(period);
            if let Some(rest) = pace(period, clock.now().saturating_sub(before)) {
                clock.sleep(rest);
            }
        }

        info!(samples = samples.len(), "sine probe finished");
        Ok(samples)
    }
}

fn interval(what: &str, hz: f32) -> Result<Duration, ControlError> {
    if hz.is_nan() || hz <= 0.0 {
        return Err(ControlError::Config(format!("{what} rate must be positive, got {hz}")));
    }
    Duration::try_from_secs_f32(1.0 / hz)
        .map_err(|err| ControlError::Config(format!("{what} rate {hz} Hz: {err}")))
}
