//! # Biped Simulation
//!
//! A small deterministic articulated model used as the simulated
//! [`Substrate`]. Each actuated joint is a rotor with inertia and viscous
//! damping, driven either by a torque or by an internal position servo, and
//! integrated with semi-implicit Euler. The floating base only rotates
//! (integrated from its angular velocity); foot contact comes from a planar
//! two-link model of each leg: the foot hanging lowest below the hips is the
//! one on the floor.

use crate::error::PhysicsError;
use crate::substrate::Substrate;
use crate::types::{ActuatorCommand, RobotState};
use glam::{Quat, Vec3};
use tracing::debug;

/// Floor geometry name used by [`SimConfig::uniform`].
pub const DEFAULT_FLOOR: &str = "floor";

/// Depth difference under which both feet count as touching the floor.
const DEFAULT_CONTACT_TOLERANCE: f32 = 0.005;

/// Dynamic parameters of one actuated joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointParams {
    /// Rotor inertia in kg·m².
    pub inertia: f32,
    /// Viscous friction in N·m·s/rad.
    pub damping: f32,
    /// Proportional gain of the built-in position servo.
    pub servo_kp: f32,
    /// Derivative gain of the built-in position servo.
    pub servo_kd: f32,
    /// Symmetric saturation applied to every actuator torque.
    pub torque_limit: f32,
}

impl Default for JointParams {
    fn default() -> Self {
        Self {
            inertia: 0.01,
            damping: 0.05,
            servo_kp: 10.0,
            servo_kd: 0.3,
            torque_limit: 3.35,
        }
    }
}

/// Planar leg used to decide which foot is on the floor.
#[derive(Clone, Debug, PartialEq)]
pub struct LegGeometry {
    /// Geometry name answered by [`Substrate::query_contact`].
    pub foot: String,
    /// Joint index of the hip pitch.
    pub hip_pitch: usize,
    /// Joint index of the knee.
    pub knee: usize,
    /// Thigh length in metres.
    pub thigh: f32,
    /// Shin length in metres.
    pub shin: f32,
}

impl LegGeometry {
    /// Vertical distance from hip to foot.
    fn foot_depth(&self, positions: &[f32]) -> f32 {
        let hip = positions[self.hip_pitch];
        let knee = positions[self.knee];
        self.thigh * hip.cos() + self.shin * (hip + knee).cos()
    }
}

/// Configuration for a [`BipedSim`].
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub joints: Vec<JointParams>,
    pub legs: Vec<LegGeometry>,
    pub floor: String,
    pub contact_tolerance: f32,
    pub initial_positions: Vec<f32>,
}

impl SimConfig {
    /// `dof` identical joints starting at zero, no legs.
    #[must_use]
    pub fn uniform(dof: usize) -> Self {
        Self {
            joints: vec![JointParams::default(); dof],
            legs: Vec::new(),
            floor: DEFAULT_FLOOR.to_string(),
            contact_tolerance: DEFAULT_CONTACT_TOLERANCE,
            initial_positions: vec![0.0; dof],
        }
    }
}

/// Simulated robot implementing [`Substrate`].
pub struct BipedSim {
    config: SimConfig,
    positions: Vec<f32>,
    velocities: Vec<f32>,
    command: ActuatorCommand,
    base_orientation: Quat,
    base_angular_velocity: Vec3,
    time: f64,
}

impl BipedSim {
    /// Build a simulation at rest in `config.initial_positions`.
    ///
    /// # Errors
    ///
    /// Fails when the per-joint tables disagree in length or a leg refers to
    /// a joint that does not exist.
    pub fn new(config: SimConfig) -> Result<Self, PhysicsError> {
        let dof = config.joints.len();
        PhysicsError::check_len("initial positions", dof, config.initial_positions.len())?;
        for leg in &config.legs {
            if leg.hip_pitch >= dof || leg.knee >= dof {
                return Err(PhysicsError::UnknownGeom(format!(
                    "{} (joint index out of range for {dof} joints)",
                    leg.foot
                )));
            }
        }

        debug!(dof, legs = config.legs.len(), "biped simulation created");
        Ok(Self {
            positions: config.initial_positions.clone(),
            velocities: vec![0.0; dof],
            command: ActuatorCommand::Torque(vec![0.0; dof]),
            base_orientation: Quat::IDENTITY,
            base_angular_velocity: Vec3::ZERO,
            time: 0.0,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn joint_positions(&self) -> &[f32] {
        &self.positions
    }

    #[must_use]
    pub fn joint_velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Teleport the joints and zero their velocities.
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch.
    pub fn set_joint_positions(&mut self, positions: &[f32]) -> Result<(), PhysicsError> {
        PhysicsError::check_len("joint positions", self.dof(), positions.len())?;
        self.positions.copy_from_slice(positions);
        self.velocities.iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    pub fn set_base_orientation(&mut self, orientation: Quat) {
        self.base_orientation = orientation.normalize();
    }

    pub fn set_base_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.base_angular_velocity = angular_velocity;
    }

    /// Torques the actuators would apply right now, after saturation.
    #[must_use]
    pub fn actuator_torques(&self) -> Vec<f32> {
        (0..self.dof()).map(|i| self.joint_torque(i)).collect()
    }

    fn joint_torque(&self, i: usize) -> f32 {
        let params = &self.config.joints[i];
        let raw = match &self.command {
            ActuatorCommand::Torque(torques) => torques[i],
            ActuatorCommand::Position(targets) => {
                params.servo_kp * (targets[i] - self.positions[i])
                    - params.servo_kd * self.velocities[i]
            }
        };
        raw.clamp(-params.torque_limit, params.torque_limit)
    }

    /// One semi-implicit Euler step.
    fn integrate(&mut self, dt: f32) {
        // 1. Joint accelerations from actuator torque and friction
        for i in 0..self.dof() {
            let params = self.config.joints[i];
            let torque = self.joint_torque(i);
            let acceleration = (torque - params.damping * self.velocities[i]) / params.inertia;
            self.velocities[i] += acceleration * dt;
            self.positions[i] += self.velocities[i] * dt;
        }

        // 2. Base orientation from its angular velocity
        let delta = Quat::from_scaled_axis(self.base_angular_velocity * dt);
        self.base_orientation = (delta * self.base_orientation).normalize();

        self.time += f64::from(dt);
    }

    fn check_finite(&self) -> Result<(), PhysicsError> {
        if !self.positions.iter().all(|p| p.is_finite()) {
            return Err(PhysicsError::NonFinite("joint position"));
        }
        if !self.velocities.iter().all(|v| v.is_finite()) {
            return Err(PhysicsError::NonFinite("joint velocity"));
        }
        if !self.base_orientation.is_finite() {
            return Err(PhysicsError::NonFinite("base orientation"));
        }
        Ok(())
    }

    fn leg(&self, foot: &str) -> Result<&LegGeometry, PhysicsError> {
        self.config
            .legs
            .iter()
            .find(|leg| leg.foot == foot)
            .ok_or_else(|| PhysicsError::UnknownGeom(foot.to_string()))
    }
}

impl Substrate for BipedSim {
    fn dof(&self) -> usize {
        self.config.joints.len()
    }

    fn step(&mut self, dt: f32, substeps: usize) -> Result<(), PhysicsError> {
        for _ in 0..substeps {
            self.integrate(dt);
        }
        self.check_finite()
    }

    fn state(&self) -> Result<RobotState, PhysicsError> {
        Ok(RobotState {
            base_orientation: self.base_orientation,
            base_angular_velocity: self.base_angular_velocity,
            base_linear_velocity: Some(Vec3::ZERO),
            joint_positions: self.positions.clone(),
            joint_velocities: self.velocities.clone(),
            foot_contacts: Vec::new(),
            time: self.time,
        })
    }

    fn set_actuator_target(&mut self, command: &ActuatorCommand) -> Result<(), PhysicsError> {
        PhysicsError::check_len("actuator command", self.dof(), command.len())?;
        if !command.values().iter().all(|v| v.is_finite()) {
            return Err(PhysicsError::NonFinite("actuator command"));
        }
        self.command = command.clone();
        Ok(())
    }

    fn query_contact(&mut self, geom_a: &str, geom_b: &str) -> Result<bool, PhysicsError> {
        let foot = if geom_a == self.config.floor {
            geom_b
        } else if geom_b == self.config.floor {
            geom_a
        } else {
            // Only foot/floor pairs are modelled; two feet never touch.
            self.leg(geom_a)?;
            self.leg(geom_b)?;
            return Ok(false);
        };

        let depth = self.leg(foot)?.foot_depth(&self.positions);
        let lowest = self
            .config
            .legs
            .iter()
            .map(|leg| leg.foot_depth(&self.positions))
            .fold(f32::NEG_INFINITY, f32::max);
        Ok(depth >= lowest - self.config.contact_tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leg_sim() -> BipedSim {
        let mut config = SimConfig::uniform(4);
        config.legs = vec![
            LegGeometry {
                foot: "left_foot".into(),
                hip_pitch: 0,
                knee: 1,
                thigh: 0.1,
                shin: 0.1,
            },
            LegGeometry {
                foot: "right_foot".into(),
                hip_pitch: 2,
                knee: 3,
                thigh: 0.1,
                shin: 0.1,
            },
        ];
        BipedSim::new(config).unwrap()
    }

    #[test]
    fn test_zero_torque_keeps_robot_still() {
        let mut sim = BipedSim::new(SimConfig::uniform(3)).unwrap();
        sim.step(0.01, 10).unwrap();
        assert_eq!(sim.joint_positions(), &[0.0, 0.0, 0.0]);
        assert!((sim.time() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_torque_is_saturated() {
        let mut sim = BipedSim::new(SimConfig::uniform(1)).unwrap();
        sim.set_actuator_target(&ActuatorCommand::Torque(vec![100.0]))
            .unwrap();
        assert_eq!(sim.actuator_torques(), vec![3.35]);
    }

    #[test]
    fn test_position_servo_reaches_target() {
        let mut sim = BipedSim::new(SimConfig::uniform(2)).unwrap();
        sim.set_actuator_target(&ActuatorCommand::Position(vec![0.3, -0.2]))
            .unwrap();
        sim.step(0.001, 5000).unwrap();
        assert!((sim.joint_positions()[0] - 0.3).abs() < 1e-3);
        assert!((sim.joint_positions()[1] + 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_command_length_is_checked() {
        let mut sim = BipedSim::new(SimConfig::uniform(2)).unwrap();
        let err = sim
            .set_actuator_target(&ActuatorCommand::Torque(vec![0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, PhysicsError::Shape { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn test_both_feet_touch_when_legs_match() {
        let mut sim = two_leg_sim();
        assert!(sim.query_contact("left_foot", "floor").unwrap());
        assert!(sim.query_contact("floor", "right_foot").unwrap());
    }

    #[test]
    fn test_bent_leg_lifts_its_foot() {
        let mut sim = two_leg_sim();
        sim.set_joint_positions(&[0.0, 1.2, 0.0, 0.0]).unwrap();
        assert!(!sim.query_contact("left_foot", "floor").unwrap());
        assert!(sim.query_contact("right_foot", "floor").unwrap());
    }

    #[test]
    fn test_unknown_geometry_is_an_error() {
        let mut sim = two_leg_sim();
        let err = sim.query_contact("tail", "floor").unwrap_err();
        assert!(matches!(err, PhysicsError::UnknownGeom(name) if name == "tail"));
    }

    #[test]
    fn test_base_rotates_with_angular_velocity() {
        let mut sim = BipedSim::new(SimConfig::uniform(1)).unwrap();
        sim.set_base_angular_velocity(Vec3::new(0.0, 0.0, 1.0));
        sim.step(0.01, 100).unwrap();
        let state = sim.state().unwrap();
        let expected = Quat::from_rotation_z(1.0);
        assert!(state.base_orientation.angle_between(expected) < 1e-4);
    }
}
