//! Orientation utilities for the observation pipeline
//!
//! Quaternions are handled as [`glam::Quat`] (`[x, y, z, w]` component
//! order). MuJoCo stores base orientation as `[w, x, y, z]`; the conversion
//! helpers here are the only place that order appears.

use glam::{EulerRot, Quat, Vec3};

/// World "down" used for the projected gravity observation.
pub const GRAVITY_DIRECTION: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Build a quaternion from MuJoCo `[w, x, y, z]` order.
#[must_use]
pub fn quat_from_wxyz(wxyz: [f32; 4]) -> Quat {
    Quat::from_xyzw(wxyz[1], wxyz[2], wxyz[3], wxyz[0])
}

/// Inverse of [`quat_from_wxyz`].
#[must_use]
pub fn quat_to_wxyz(q: Quat) -> [f32; 4] {
    [q.w, q.x, q.y, q.z]
}

/// Orientation from extrinsic roll/pitch/yaw (rotations about fixed x, y, z).
#[must_use]
pub fn quat_from_rpy(roll: f32, pitch: f32, yaw: f32) -> Quat {
    Quat::from_euler(EulerRot::ZYX, yaw, pitch, roll)
}

/// Extrinsic `(roll, pitch, yaw)` of `q`.
#[must_use]
pub fn quat_to_rpy(q: Quat) -> (f32, f32, f32) {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::ZYX);
    (roll, pitch, yaw)
}

/// Remove the heading component of an orientation, keeping roll and pitch.
#[must_use]
pub fn strip_yaw(q: Quat) -> Quat {
    let (roll, pitch, _yaw) = quat_to_rpy(q);
    quat_from_rpy(roll, pitch, 0.0)
}

/// Rotate `v` by the inverse of `q`.
///
/// Component-wise, without normalising `q`: the all-zero placeholder
/// quaternion maps `v` to `-v`.
#[must_use]
pub fn quat_rotate_inverse(q: Quat, v: Vec3) -> Vec3 {
    let q_w = q.w;
    let q_vec = Vec3::new(q.x, q.y, q.z);

    let a = v * (2.0 * q_w * q_w - 1.0);
    let b = q_vec.cross(v) * q_w * 2.0;
    let c = q_vec * q_vec.dot(v) * 2.0;

    a - b + c
}

/// Gravity direction expressed in the base frame.
#[must_use]
pub fn projected_gravity(q: Quat) -> Vec3 {
    quat_rotate_inverse(q, GRAVITY_DIRECTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_upright_gravity_points_down() {
        assert!(close(projected_gravity(Quat::IDENTITY), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_roll_quarter_turn_moves_gravity_sideways() {
        let q = quat_from_rpy(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        assert!(close(projected_gravity(q), Vec3::new(0.0, -1.0, 0.0)));
    }

    #[test]
    fn test_rotate_inverse_matches_glam_for_unit_quaternions() {
        let q = quat_from_rpy(0.3, -0.2, 1.1);
        let v = Vec3::new(0.4, -1.0, 2.0);
        assert!(close(quat_rotate_inverse(q, v), q.inverse() * v));
    }

    #[test]
    fn test_strip_yaw_removes_pure_heading() {
        let q = quat_from_rpy(0.0, 0.0, 0.7);
        let stripped = strip_yaw(q);
        assert!(stripped.angle_between(Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_strip_yaw_keeps_roll_and_pitch() {
        let q = quat_from_rpy(0.1, -0.25, 1.3);
        let (roll, pitch, yaw) = quat_to_rpy(strip_yaw(q));
        assert!((roll - 0.1).abs() < 1e-5);
        assert!((pitch + 0.25).abs() < 1e-5);
        assert!(yaw.abs() < 1e-5);
    }

    #[test]
    fn test_wxyz_round_trip() {
        let q = quat_from_wxyz([1.0, 0.0, 0.08, 0.0]);
        assert_eq!(q.w, 1.0);
        assert_eq!(q.y, 0.08);
        assert_eq!(quat_to_wxyz(q), [1.0, 0.0, 0.08, 0.0]);
    }
}
