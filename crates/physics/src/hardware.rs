//! # Hardware Substrate
//!
//! Drives a real robot through the same [`Substrate`] contract as the
//! simulator. The servo bus, the IMU and the optional foot switches are
//! reached through traits so that a driver crate (or a test double) can be
//! plugged in.
//!
//! Servos are position controlled: torque commands are rejected. Stepping does
//! not move anything, the world advances on its own; a step refreshes the
//! cached telemetry that [`Substrate::state`] reports.

use crate::error::PhysicsError;
use crate::substrate::Substrate;
use crate::types::{ActuatorCommand, RobotState};
use glam::{Quat, Vec3};
use std::time::Instant;
use tracing::{debug, info};

/// Position/velocity servo bus.
pub trait MotorBus {
    fn enable_torque(&mut self) -> Result<(), PhysicsError>;
    fn disable_torque(&mut self) -> Result<(), PhysicsError>;
    fn set_pid(&mut self, kp: f32, ki: f32, kd: f32) -> Result<(), PhysicsError>;
    fn write_goal_positions(&mut self, positions: &[f32]) -> Result<(), PhysicsError>;
    fn read_positions(&mut self) -> Result<Vec<f32>, PhysicsError>;
    fn read_velocities(&mut self) -> Result<Vec<f32>, PhysicsError>;
}

/// One inertial reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuSample {
    pub orientation: Quat,
    pub angular_velocity: Vec3,
}

pub trait Imu {
    fn read(&mut self) -> Result<ImuSample, PhysicsError>;
}

/// Binary contact sensors under the feet.
pub trait FootSwitches {
    fn pressed(&mut self, foot: &str) -> Result<bool, PhysicsError>;
}

pub struct HardwareSubstrate<B: MotorBus, I: Imu> {
    bus: B,
    imu: I,
    feet: Option<Box<dyn FootSwitches>>,
    floor: String,
    dof: usize,
    telemetry: RobotState,
    started: Instant,
}

impl<B: MotorBus, I: Imu> HardwareSubstrate<B, I> {
    /// Enable the servos and take a first telemetry reading.
    ///
    /// # Errors
    ///
    /// Any bus or IMU failure, or a bus reporting a different joint count.
    pub fn new(mut bus: B, imu: I, dof: usize, floor: &str) -> Result<Self, PhysicsError> {
        bus.enable_torque()?;
        info!(dof, "servo torque enabled");

        let mut substrate = Self {
            bus,
            imu,
            feet: None,
            floor: floor.to_string(),
            dof,
            telemetry: RobotState::at_rest(vec![0.0; dof]),
            started: Instant::now(),
        };
        substrate.refresh()?;
        Ok(substrate)
    }

    #[must_use]
    pub fn with_foot_switches(mut self, feet: Box<dyn FootSwitches>) -> Self {
        self.feet = Some(feet);
        self
    }

    /// Push the same gains to every servo.
    ///
    /// # Errors
    ///
    /// Propagates the bus failure.
    pub fn set_pid_all(&mut self, kp: f32, ki: f32, kd: f32) -> Result<(), PhysicsError> {
        debug!(kp, ki, kd, "setting servo gains");
        self.bus.set_pid(kp, ki, kd)
    }

    /// Disable the servos and hand the bus back.
    ///
    /// # Errors
    ///
    /// Propagates the bus failure.
    pub fn release(mut self) -> Result<B, PhysicsError> {
        self.bus.disable_torque()?;
        info!("servo torque disabled");
        Ok(self.bus)
    }

    fn refresh(&mut self) -> Result<(), PhysicsError> {
        let positions = self.bus.read_positions()?;
        PhysicsError::check_len("bus positions", self.dof, positions.len())?;
        let velocities = self.bus.read_velocities()?;
        PhysicsError::check_len("bus velocities", self.dof, velocities.len())?;
        let imu = self.imu.read()?;

        self.telemetry = RobotState {
            base_orientation: imu.orientation,
            base_angular_velocity: imu.angular_velocity,
            base_linear_velocity: None,
            joint_positions: positions,
            joint_velocities: velocities,
            foot_contacts: Vec::new(),
            time: self.started.elapsed().as_secs_f64(),
        };
        Ok(())
    }
}

impl<B: MotorBus, I: Imu> Substrate for HardwareSubstrate<B, I> {
    fn dof(&self) -> usize {
        self.dof
    }

    fn step(&mut self, _dt: f32, _substeps: usize) -> Result<(), PhysicsError> {
        self.refresh()
    }

    fn state(&self) -> Result<RobotState, PhysicsError> {
        Ok(self.telemetry.clone())
    }

    fn set_actuator_target(&mut self, command: &ActuatorCommand) -> Result<(), PhysicsError> {
        PhysicsError::check_len("actuator command", self.dof, command.len())?;
        match command {
            ActuatorCommand::Position(targets) => self.bus.write_goal_positions(targets),
            ActuatorCommand::Torque(_) => Err(PhysicsError::Hardware(
                "servos accept position targets only".to_string(),
            )),
        }
    }

    fn query_contact(&mut self, geom_a: &str, geom_b: &str) -> Result<bool, PhysicsError> {
        let foot = if geom_a == self.floor {
            geom_b
        } else if geom_b == self.floor {
            geom_a
        } else {
            return Ok(false);
        };
        match self.feet.as_mut() {
            Some(feet) => feet.pressed(foot),
            None => Ok(false),
        }
    }
}
