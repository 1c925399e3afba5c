//! # Observation assembly
//!
//! Turns a [`RobotState`] plus the previous action and the operator command
//! into the flat vector the policy was trained on. The concatenation order is
//! the variant's [`ObservationLayout`]; each block is transformed and scaled
//! on its own, then the whole vector is clamped to the layout's clip range.
//!
//! When a [`LatencySimulator`] is supplied the fresh orientation and angular
//! velocity are pushed into it and the delayed pair it releases is used
//! instead.

use crate::command::Command;
use crate::error::ControlError;
use crate::joint_map::JointMap;
use crate::latency::LatencySimulator;
use crate::variant::{ObsBlock, ObservationLayout, OrientationMode, RobotVariant};
use physics::transform::{projected_gravity, strip_yaw};
use physics::{Quat, RobotState, Vec3};
use std::ops::Range;
use std::time::Duration;

pub struct ObservationBuilder<'a> {
    layout: &'a ObservationLayout,
    joint_map: JointMap,
    /// Neutral pose in policy order.
    neutral: Vec<f32>,
    feet: usize,
}

impl<'a> ObservationBuilder<'a> {
    /// # Errors
    ///
    /// Fails when the variant's joint tables are inconsistent.
    pub fn new(variant: &'a RobotVariant) -> Result<Self, ControlError> {
        let joint_map = variant.joint_map()?;
        let neutral = joint_map.to_policy_order(&variant.neutral_pose)?;
        Ok(Self {
            layout: &variant.observation,
            joint_map,
            neutral,
            feet: variant.feet.len(),
        })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.layout.dim(self.joint_map.len(), self.feet)
    }

    #[must_use]
    pub fn joint_map(&self) -> &JointMap {
        &self.joint_map
    }

    /// Index range of `block` in the built vector, if the layout has it.
    #[must_use]
    pub fn block_range(&self, block: ObsBlock) -> Option<Range<usize>> {
        let dof = self.joint_map.len();
        let mut start = 0;
        for &b in &self.layout.blocks {
            let width = self.layout.block_width(b, dof, self.feet);
            if b == block {
                return Some(start..start + width);
            }
            start += width;
        }
        None
    }

    /// Build one observation.
    ///
    /// `state.foot_contacts` must hold one flag per configured foot when the
    /// layout has a contact block. `now` timestamps the latency push/pop.
    ///
    /// # Errors
    ///
    /// `Shape` when the state, the previous action or the contact flags do
    /// not match the variant.
    pub fn build(
        &self,
        state: &RobotState,
        prev_action: &[f32],
        command: Command,
        latency: Option<&mut LatencySimulator>,
        now: Duration,
    ) -> Result<Vec<f32>, ControlError> {
        let dof = self.joint_map.len();
        ControlError::check_len("previous action", dof, prev_action.len())?;

        let (orientation, angular_velocity) = match latency {
            Some(latency) => {
                latency.push(
                    state.base_orientation.to_array(),
                    state.base_angular_velocity.to_array(),
                    now,
                );
                let (q, w) = latency.pop(now);
                (Quat::from_array(q), Vec3::from_array(w))
            }
            None => (state.base_orientation, state.base_angular_velocity),
        };

        let mut obs = Vec::with_capacity(self.dim());
        for &block in &self.layout.blocks {
            match block {
                ObsBlock::Orientation => self.push_orientation(&mut obs, orientation),
                ObsBlock::AngularVelocity => {
                    obs.extend_from_slice(&(angular_velocity * self.layout.ang_vel_scale).to_array());
                }
                ObsBlock::LinearVelocity => {
                    let v = state.base_linear_velocity.unwrap_or(Vec3::ZERO);
                    obs.extend_from_slice(&(v * self.layout.lin_vel_scale).to_array());
                }
                ObsBlock::JointPositions => {
                    let positions = self.joint_map.to_policy_order(&state.joint_positions)?;
                    let scale = self.layout.dof_pos_scale;
                    if self.layout.subtract_neutral {
                        obs.extend(positions.iter().zip(&self.neutral).map(|(p, n)| (p - n) * scale));
                    } else {
                        obs.extend(positions.iter().map(|p| p * scale));
                    }
                }
                ObsBlock::JointVelocities => {
                    let velocities = self.joint_map.to_policy_order(&state.joint_velocities)?;
                    obs.extend(velocities.iter().map(|v| v * self.layout.dof_vel_scale));
                }
                ObsBlock::FootContacts => {
                    ControlError::check_len("foot contacts", self.feet, state.foot_contacts.len())?;
                    obs.extend(state.foot_contacts.iter().map(|&c| if c { 1.0 } else { 0.0 }));
                }
                ObsBlock::PreviousAction => obs.extend_from_slice(prev_action),
                ObsBlock::Command => {
                    obs.extend(command.to_array().iter().map(|c| c * self.layout.command_scale));
                }
            }
        }
        ControlError::check_len("observation", self.dim(), obs.len())?;

        if let Some(clip) = self.layout.clip {
            clip.clamp_all(&mut obs);
        }
        Ok(obs)
    }

    fn push_orientation(&self, obs: &mut Vec<f32>, q: Quat) {
        match self.layout.orientation {
            OrientationMode::ProjectedGravity => {
                obs.extend_from_slice(&projected_gravity(q).to_array());
            }
            // Latency placeholder: nothing to normalise, report zeros.
            _ if q.length_squared() < f32::EPSILON => obs.extend_from_slice(&[0.0; 4]),
            OrientationMode::Quaternion => obs.extend_from_slice(&q.to_array()),
            OrientationMode::YawStrippedQuaternion => {
                obs.extend_from_slice(&strip_yaw(q).to_array());
            }
        }
    }
}
