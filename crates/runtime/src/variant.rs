//! Per-robot configuration.
//!
//! A [`RobotVariant`] is built once at startup (from a preset or a JSON file),
//! validated, and then only read. Everything the control loop needs to know
//! about a robot lives here: joint orders, neutral pose, gains, observation
//! layout, action handling and timing.

use crate::error::ControlError;
use crate::joint_map::JointMap;
use crate::pd::PdGains;
use physics::{JointParams, LegGeometry, SimConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Names accepted by [`RobotVariant::preset`].
pub const PRESETS: [&str; 2] = ["bdx", "open_duck_mini_v2"];

/// Inclusive clamp bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub min: f32,
    pub max: f32,
}

impl ClipRange {
    #[must_use]
    pub fn symmetric(bound: f32) -> Self {
        Self {
            min: -bound,
            max: bound,
        }
    }

    #[must_use]
    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }

    pub fn clamp_all(&self, values: &mut [f32]) {
        for v in values {
            *v = self.clamp(*v);
        }
    }

    #[must_use]
    pub fn contains(&self, v: f32) -> bool {
        (self.min..=self.max).contains(&v)
    }
}

/// How the actuator target is applied each fast tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuation {
    /// The loop computes PD torques against the target pose.
    Torque,
    /// The target pose goes to position-controlled servos as is.
    Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationMode {
    Quaternion,
    YawStrippedQuaternion,
    ProjectedGravity,
}

/// One semantic block of the observation vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsBlock {
    Orientation,
    AngularVelocity,
    LinearVelocity,
    JointPositions,
    JointVelocities,
    FootContacts,
    PreviousAction,
    Command,
}

/// Concatenation order and scaling of the observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationLayout {
    pub blocks: Vec<ObsBlock>,
    pub orientation: OrientationMode,
    #[serde(default)]
    pub clip: Option<ClipRange>,
    #[serde(default = "one")]
    pub ang_vel_scale: f32,
    #[serde(default = "one")]
    pub lin_vel_scale: f32,
    #[serde(default = "one")]
    pub dof_pos_scale: f32,
    #[serde(default = "one")]
    pub dof_vel_scale: f32,
    #[serde(default = "one")]
    pub command_scale: f32,
    /// Joint positions are reported relative to the neutral pose.
    #[serde(default)]
    pub subtract_neutral: bool,
}

fn one() -> f32 {
    1.0
}

impl ObservationLayout {
    /// Number of scalars `block` contributes.
    #[must_use]
    pub fn block_width(&self, block: ObsBlock, dof: usize, feet: usize) -> usize {
        match block {
            ObsBlock::Orientation => match self.orientation {
                OrientationMode::ProjectedGravity => 3,
                OrientationMode::Quaternion | OrientationMode::YawStrippedQuaternion => 4,
            },
            ObsBlock::AngularVelocity | ObsBlock::LinearVelocity | ObsBlock::Command => 3,
            ObsBlock::JointPositions | ObsBlock::JointVelocities | ObsBlock::PreviousAction => dof,
            ObsBlock::FootContacts => feet,
        }
    }

    #[must_use]
    pub fn dim(&self, dof: usize, feet: usize) -> usize {
        self.blocks
            .iter()
            .map(|&b| self.block_width(b, dof, feet))
            .sum()
    }
}

/// Planar leg description used by the simulated substrate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegSpec {
    pub foot: String,
    pub hip_pitch: String,
    pub knee: String,
    pub thigh: f32,
    pub shin: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotVariant {
    pub name: String,
    /// Simulator / servo bus order.
    pub physical_joints: Vec<String>,
    /// Order the policy was trained with.
    pub policy_joints: Vec<String>,
    /// Physical order.
    pub neutral_pose: Vec<f32>,
    /// Physical order.
    pub kp: Vec<f32>,
    /// Physical order.
    pub kd: Vec<f32>,
    pub torque_limit: f32,
    pub actuation: Actuation,
    pub action_scale: f32,
    pub action_clip: ClipRange,
    pub observation: ObservationLayout,
    /// Substrate integration step, seconds.
    pub timestep: f32,
    pub substeps: usize,
    /// Fast ticks per inference.
    pub decimation: u64,
    #[serde(default)]
    pub warmup_secs: f32,
    #[serde(default)]
    pub imu_latency_ms: Option<f32>,
    /// Foot geometry names, in the order of the contact block.
    #[serde(default)]
    pub feet: Vec<String>,
    pub floor: String,
    #[serde(default)]
    pub initial_command: [f32; 3],
    #[serde(default)]
    pub legs: Vec<LegSpec>,
}

impl RobotVariant {
    #[must_use]
    pub fn dof(&self) -> usize {
        self.physical_joints.len()
    }

    #[must_use]
    pub fn observation_dim(&self) -> usize {
        self.observation.dim(self.dof(), self.feet.len())
    }

    /// # Errors
    ///
    /// Any inconsistency between the tables, see [`ControlError`].
    pub fn validate(&self) -> Result<(), ControlError> {
        let dof = self.dof();
        if dof == 0 {
            return Err(ControlError::Config(format!("{}: no joints", self.name)));
        }
        self.joint_map()?;
        ControlError::check_len("neutral pose", dof, self.neutral_pose.len())?;
        ControlError::check_len("kp gains", dof, self.kp.len())?;
        ControlError::check_len("kd gains", dof, self.kd.len())?;

        if self.decimation == 0 {
            return Err(ControlError::Config(format!("{}: decimation must be >= 1", self.name)));
        }
        if self.substeps == 0 {
            return Err(ControlError::Config(format!("{}: substeps must be >= 1", self.name)));
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ControlError::Config(format!(
                "{}: timestep must be positive, got {}",
                self.name, self.timestep
            )));
        }
        if self.warmup_secs.is_nan() || self.warmup_secs < 0.0 {
            return Err(ControlError::Config(format!("{}: negative warmup", self.name)));
        }
        if self.imu_latency_ms.is_some_and(|ms| ms.is_nan() || ms < 0.0) {
            return Err(ControlError::Config(format!("{}: negative IMU latency", self.name)));
        }
        let clips = std::iter::once(self.action_clip).chain(self.observation.clip);
        for clip in clips {
            if clip.min.is_nan() || clip.max.is_nan() || clip.min > clip.max {
                return Err(ControlError::Config(format!(
                    "{}: clip range [{}, {}] is not ordered",
                    self.name, clip.min, clip.max
                )));
            }
        }
        if self.observation.blocks.contains(&ObsBlock::FootContacts) && self.feet.is_empty() {
            return Err(ControlError::Config(format!(
                "{}: foot contacts observed but no feet named",
                self.name
            )));
        }
        for leg in &self.legs {
            self.joint_index(&leg.hip_pitch)?;
            self.joint_index(&leg.knee)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `InvalidPermutation` when the two name lists are not the same set.
    pub fn joint_map(&self) -> Result<JointMap, ControlError> {
        JointMap::from_names(&self.physical_joints, &self.policy_joints)
    }

    fn joint_index(&self, name: &str) -> Result<usize, ControlError> {
        self.physical_joints
            .iter()
            .position(|j| j == name)
            .ok_or_else(|| ControlError::Config(format!("{}: unknown joint '{name}'", self.name)))
    }

    #[must_use]
    pub fn gains(&self) -> PdGains {
        PdGains {
            kp: self.kp.clone(),
            kd: self.kd.clone(),
        }
    }

    /// Wall-clock length of one fast tick.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        seconds(f64::from(self.timestep) * self.substeps as f64)
    }

    #[must_use]
    pub fn warmup(&self) -> Duration {
        seconds(f64::from(self.warmup_secs))
    }

    #[must_use]
    pub fn imu_latency(&self) -> Option<Duration> {
        self.imu_latency_ms.map(|ms| seconds(f64::from(ms) / 1000.0))
    }

    /// Simulated substrate matching this robot, resting in the neutral pose.
    ///
    /// # Errors
    ///
    /// `Config` when a leg names an unknown joint.
    pub fn sim_config(&self) -> Result<SimConfig, ControlError> {
        let joints = self
            .kp
            .iter()
            .zip(&self.kd)
            .map(|(&kp, &kd)| JointParams {
                servo_kp: kp,
                servo_kd: kd,
                torque_limit: self.torque_limit,
                ..JointParams::default()
            })
            .collect();
        let legs = self
            .legs
            .iter()
            .map(|leg| {
                Ok(LegGeometry {
                    foot: leg.foot.clone(),
                    hip_pitch: self.joint_index(&leg.hip_pitch)?,
                    knee: self.joint_index(&leg.knee)?,
                    thigh: leg.thigh,
                    shin: leg.shin,
                })
            })
            .collect::<Result<Vec<_>, ControlError>>()?;
        let mut config = SimConfig::uniform(self.dof());
        config.joints = joints;
        config.legs = legs;
        config.floor.clone_from(&self.floor);
        config.initial_positions.clone_from(&self.neutral_pose);
        Ok(config)
    }

    /// # Errors
    ///
    /// Parse failures and validation failures.
    pub fn from_json_str(json: &str) -> Result<Self, ControlError> {
        let variant: Self = serde_json::from_str(json)?;
        variant.validate()?;
        Ok(variant)
    }

    /// # Errors
    ///
    /// I/O, parse and validation failures.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let variant = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), name = %variant.name, "loaded robot variant");
        Ok(variant)
    }

    /// # Errors
    ///
    /// `Config` for an unknown preset name.
    pub fn preset(name: &str) -> Result<Self, ControlError> {
        match name {
            "bdx" => Ok(Self::bdx()),
            "open_duck_mini_v2" | "v2" => Ok(Self::open_duck_mini_v2()),
            other => Err(ControlError::Config(format!(
                "unknown variant '{other}', expected one of {PRESETS:?}"
            ))),
        }
    }

    /// The 15-joint mini BDX: position servos, yaw-stripped IMU orientation
    /// delayed by 1 ms, inference at roughly 30 Hz over 5 ms ticks.
    #[must_use]
    pub fn bdx() -> Self {
        let physical = names(&[
            "right_hip_yaw",
            "right_hip_roll",
            "right_hip_pitch",
            "right_knee",
            "right_ankle",
            "left_hip_yaw",
            "left_hip_roll",
            "left_hip_pitch",
            "left_knee",
            "left_ankle",
            "neck_pitch",
            "head_pitch",
            "head_yaw",
            "left_antenna",
            "right_antenna",
        ]);
        let policy = names(&[
            "left_hip_yaw",
            "left_hip_roll",
            "left_hip_pitch",
            "left_knee",
            "left_ankle",
            "right_hip_yaw",
            "right_hip_roll",
            "right_hip_pitch",
            "right_knee",
            "right_ankle",
            "neck_pitch",
            "head_pitch",
            "head_yaw",
            "left_antenna",
            "right_antenna",
        ]);
        let dof = physical.len();
        Self {
            name: "bdx".into(),
            physical_joints: physical,
            policy_joints: policy,
            neutral_pose: vec![
                -0.036_249_765,
                -0.030_487_325,
                0.268_042_1,
                -0.859_752_3,
                0.592_366_96,
                -0.036_263_8,
                0.051_831_32,
                0.210_640_45,
                -0.704_633_84,
                0.494_650_7,
                -0.174_532_93,
                -0.174_532_93,
                0.0,
                0.0,
                0.0,
            ],
            kp: vec![12.0; dof],
            kd: vec![0.3; dof],
            torque_limit: 3.35,
            actuation: Actuation::Position,
            action_scale: 1.0,
            action_clip: ClipRange::symmetric(1.0),
            observation: ObservationLayout {
                blocks: vec![
                    ObsBlock::Orientation,
                    ObsBlock::AngularVelocity,
                    ObsBlock::JointPositions,
                    ObsBlock::JointVelocities,
                    ObsBlock::PreviousAction,
                    ObsBlock::Command,
                ],
                orientation: OrientationMode::YawStrippedQuaternion,
                clip: Some(ClipRange::symmetric(5.0)),
                ang_vel_scale: 0.25,
                lin_vel_scale: 2.0,
                dof_pos_scale: 1.0,
                dof_vel_scale: 0.05,
                command_scale: 1.0,
                subtract_neutral: true,
            },
            timestep: 0.000_1,
            substeps: 50,
            decimation: 7,
            warmup_secs: 0.0,
            imu_latency_ms: Some(1.0),
            feet: names(&["left_foot", "right_foot"]),
            floor: "floor".into(),
            initial_command: [0.0; 3],
            legs: vec![
                LegSpec {
                    foot: "left_foot".into(),
                    hip_pitch: "left_hip_pitch".into(),
                    knee: "left_knee".into(),
                    thigh: 0.083,
                    shin: 0.085,
                },
                LegSpec {
                    foot: "right_foot".into(),
                    hip_pitch: "right_hip_pitch".into(),
                    knee: "right_knee".into(),
                    thigh: 0.083,
                    shin: 0.085,
                },
            ],
        }
    }

    /// The 16-joint Open Duck Mini v2: torque PD at 100 Hz, one inference per
    /// tick after a 2 s warmup, projected gravity and foot contacts observed.
    #[must_use]
    pub fn open_duck_mini_v2() -> Self {
        let physical = names(&[
            "left_hip_yaw",
            "left_hip_roll",
            "left_hip_pitch",
            "left_knee",
            "left_ankle",
            "neck_pitch",
            "head_pitch",
            "head_yaw",
            "head_roll",
            "left_antenna",
            "right_antenna",
            "right_hip_yaw",
            "right_hip_roll",
            "right_hip_pitch",
            "right_knee",
            "right_ankle",
        ]);
        let policy = names(&[
            "left_hip_yaw",
            "left_hip_roll",
            "left_hip_pitch",
            "left_knee",
            "left_ankle",
            "right_hip_yaw",
            "right_hip_roll",
            "right_hip_pitch",
            "right_knee",
            "right_ankle",
            "neck_pitch",
            "head_pitch",
            "head_yaw",
            "head_roll",
            "left_antenna",
            "right_antenna",
        ]);
        let dof = physical.len();
        Self {
            name: "open_duck_mini_v2".into(),
            physical_joints: physical,
            policy_joints: policy,
            neutral_pose: vec![
                0.002, 0.053, -0.63, 1.368, -0.784, 0.002, 0.0, 0.0, 0.0, 0.0, 0.0, -0.003, -0.065,
                0.635, 1.379, -0.796,
            ],
            kp: vec![10.7; dof],
            kd: vec![0.6; dof],
            torque_limit: 3.35,
            actuation: Actuation::Torque,
            action_scale: 0.25,
            action_clip: ClipRange::symmetric(5.0),
            observation: ObservationLayout {
                blocks: vec![
                    ObsBlock::Orientation,
                    ObsBlock::JointPositions,
                    ObsBlock::JointVelocities,
                    ObsBlock::FootContacts,
                    ObsBlock::PreviousAction,
                    ObsBlock::Command,
                ],
                orientation: OrientationMode::ProjectedGravity,
                clip: None,
                ang_vel_scale: 1.0,
                lin_vel_scale: 1.0,
                dof_pos_scale: 1.0,
                dof_vel_scale: 1.0,
                command_scale: 1.0,
                subtract_neutral: false,
            },
            timestep: 0.01,
            substeps: 1,
            decimation: 1,
            warmup_secs: 2.0,
            imu_latency_ms: None,
            feet: names(&["foot_assembly", "foot_assembly_2"]),
            floor: "floor".into(),
            initial_command: [0.4, 0.0, 0.0],
            legs: vec![
                LegSpec {
                    foot: "foot_assembly".into(),
                    hip_pitch: "left_hip_pitch".into(),
                    knee: "left_knee".into(),
                    thigh: 0.07,
                    shin: 0.07,
                },
                LegSpec {
                    foot: "foot_assembly_2".into(),
                    hip_pitch: "right_hip_pitch".into(),
                    knee: "right_knee".into(),
                    thigh: 0.07,
                    shin: 0.07,
                },
            ],
        }
    }
}

/// Rounded to the nearest nanosecond so `0.0001 * 50` is exactly 5 ms.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds(secs: f64) -> Duration {
    Duration::from_nanos((secs.max(0.0) * 1e9).round() as u64)
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for name in PRESETS {
            let variant = RobotVariant::preset(name).unwrap();
            variant.validate().unwrap();
            assert_eq!(variant.neutral_pose.len(), variant.dof());
        }
        assert_eq!(RobotVariant::bdx().dof(), 15);
        assert_eq!(RobotVariant::open_duck_mini_v2().dof(), 16);
    }

    #[test]
    fn test_observation_dims() {
        assert_eq!(RobotVariant::bdx().observation_dim(), 4 + 3 + 15 * 3 + 3);
        assert_eq!(RobotVariant::open_duck_mini_v2().observation_dim(), 3 + 16 * 3 + 2 + 3);
    }

    #[test]
    fn test_tick_period() {
        assert_eq!(RobotVariant::bdx().tick_period(), Duration::from_millis(5));
        assert_eq!(RobotVariant::open_duck_mini_v2().tick_period(), Duration::from_millis(10));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(RobotVariant::preset("atlas"), Err(ControlError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_decimation() {
        let mut variant = RobotVariant::bdx();
        variant.decimation = 0;
        assert!(matches!(variant.validate(), Err(ControlError::Config(_))));
    }

    #[test]
    fn test_rejects_short_neutral_pose() {
        let mut variant = RobotVariant::open_duck_mini_v2();
        variant.neutral_pose.pop();
        assert!(matches!(variant.validate(), Err(ControlError::Shape { .. })));
    }

    #[test]
    fn test_rejects_inverted_clip() {
        let mut variant = RobotVariant::bdx();
        variant.action_clip = ClipRange { min: 1.0, max: -1.0 };
        assert!(variant.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_joint_names() {
        let mut variant = RobotVariant::bdx();
        variant.policy_joints[1] = variant.policy_joints[0].clone();
        assert!(matches!(variant.validate(), Err(ControlError::InvalidPermutation(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let variant = RobotVariant::open_duck_mini_v2();
        let json = serde_json::to_string(&variant).unwrap();
        assert_eq!(RobotVariant::from_json_str(&json).unwrap(), variant);
    }

    #[test]
    fn test_sim_config_rests_in_neutral_pose() {
        let variant = RobotVariant::open_duck_mini_v2();
        let config = variant.sim_config().unwrap();
        assert_eq!(config.initial_positions, variant.neutral_pose);
        assert_eq!(config.legs.len(), 2);
        assert_eq!(config.legs[1].hip_pitch, 13);
        assert!(config.joints.iter().all(|j| j.torque_limit == 3.35));
    }
}
