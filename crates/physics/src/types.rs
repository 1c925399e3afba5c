use glam::{Quat, Vec3};

/// Snapshot of the robot, produced after every substrate step.
///
/// Joint vectors are in the substrate's own (physical) joint order.
#[derive(Clone, Debug, PartialEq)]
pub struct RobotState {
    /// Base orientation. Component order is `[x, y, z, w]`.
    pub base_orientation: Quat,
    /// Base angular velocity in rad/s.
    pub base_angular_velocity: Vec3,
    /// Base linear velocity, when the substrate can measure it.
    pub base_linear_velocity: Option<Vec3>,
    pub joint_positions: Vec<f32>,
    pub joint_velocities: Vec<f32>,
    /// One flag per configured foot. Substrates leave this empty; the control
    /// loop fills it from [`crate::Substrate::query_contact`].
    pub foot_contacts: Vec<bool>,
    /// Substrate time in seconds.
    pub time: f64,
}

impl RobotState {
    /// Upright, motionless robot with every joint at `positions`.
    #[must_use]
    pub fn at_rest(positions: Vec<f32>) -> Self {
        let dof = positions.len();
        Self {
            base_orientation: Quat::IDENTITY,
            base_angular_velocity: Vec3::ZERO,
            base_linear_velocity: None,
            joint_positions: positions,
            joint_velocities: vec![0.0; dof],
            foot_contacts: Vec::new(),
            time: 0.0,
        }
    }

    #[must_use]
    pub fn dof(&self) -> usize {
        self.joint_positions.len()
    }
}

/// What the actuators are asked to do until the next command.
#[derive(Clone, Debug, PartialEq)]
pub enum ActuatorCommand {
    /// Joint torques in N·m, physical order.
    Torque(Vec<f32>),
    /// Joint position targets in rad, physical order.
    Position(Vec<f32>),
}

impl ActuatorCommand {
    #[must_use]
    pub fn values(&self) -> &[f32] {
        match self {
            Self::Torque(v) | Self::Position(v) => v,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}
