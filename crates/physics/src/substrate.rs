//! # Substrate Contract
//!
//! The boundary between the control loop and whatever actually moves: a
//! simulator or a servo bus. Both implementations in this crate satisfy the
//! same trait so the loop can be exercised without hardware.

use crate::error::PhysicsError;
use crate::types::{ActuatorCommand, RobotState};

pub trait Substrate {
    /// Number of actuated joints.
    fn dof(&self) -> usize;

    /// Advance by `substeps` integration steps of `dt` seconds each.
    fn step(&mut self, dt: f32, substeps: usize) -> Result<(), PhysicsError>;

    /// Current robot state in physical joint order.
    fn state(&self) -> Result<RobotState, PhysicsError>;

    /// Replace the actuator input held until the next call.
    fn set_actuator_target(&mut self, command: &ActuatorCommand) -> Result<(), PhysicsError>;

    /// Whether the two named geometries are currently touching.
    fn query_contact(&mut self, geom_a: &str, geom_b: &str) -> Result<bool, PhysicsError>;
}

impl<S: Substrate + ?Sized> Substrate for Box<S> {
    fn dof(&self) -> usize {
        (**self).dof()
    }

    fn step(&mut self, dt: f32, substeps: usize) -> Result<(), PhysicsError> {
        (**self).step(dt, substeps)
    }

    fn state(&self) -> Result<RobotState, PhysicsError> {
        (**self).state()
    }

    fn set_actuator_target(&mut self, command: &ActuatorCommand) -> Result<(), PhysicsError> {
        (**self).set_actuator_target(command)
    }

    fn query_contact(&mut self, geom_a: &str, geom_b: &str) -> Result<bool, PhysicsError> {
        (**self).query_contact(geom_a, geom_b)
    }
}
