//! Proportional-derivative joint control.

use crate::error::ControlError;

/// Elementwise `(target_pos - pos) * kp + (target_vel - vel) * kd`.
///
/// # Errors
///
/// `Shape` when any slice differs in length from `target_pos`.
pub fn compute_torque(
    target_pos: &[f32],
    pos: &[f32],
    kp: &[f32],
    target_vel: &[f32],
    vel: &[f32],
    kd: &[f32],
) -> Result<Vec<f32>, ControlError> {
    let n = target_pos.len();
    ControlError::check_len("joint positions", n, pos.len())?;
    ControlError::check_len("kp gains", n, kp.len())?;
    ControlError::check_len("target velocities", n, target_vel.len())?;
    ControlError::check_len("joint velocities", n, vel.len())?;
    ControlError::check_len("kd gains", n, kd.len())?;

    Ok((0..n)
        .map(|i| (target_pos[i] - pos[i]) * kp[i] + (target_vel[i] - vel[i]) * kd[i])
        .collect())
}

/// Per-joint gains in physical order.
#[derive(Clone, Debug, PartialEq)]
pub struct PdGains {
    pub kp: Vec<f32>,
    pub kd: Vec<f32>,
}

impl PdGains {
    #[must_use]
    pub fn uniform(dof: usize, kp: f32, kd: f32) -> Self {
        Self {
            kp: vec![kp; dof],
            kd: vec![kd; dof],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kp.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kp.is_empty()
    }
}

/// Torque-mode position tracking: zero target velocity, saturated output.
#[derive(Clone, Debug)]
pub struct PdController {
    gains: PdGains,
    torque_limit: f32,
    zero_velocity: Vec<f32>,
}

impl PdController {
    /// # Errors
    ///
    /// `Shape` when kp and kd disagree in length, `Config` for a
    /// non-positive torque limit.
    pub fn new(gains: PdGains, torque_limit: f32) -> Result<Self, ControlError> {
        ControlError::check_len("kd gains", gains.kp.len(), gains.kd.len())?;
        if torque_limit.is_nan() || torque_limit <= 0.0 {
            return Err(ControlError::Config(format!(
                "torque limit must be positive, got {torque_limit}"
            )));
        }
        let zero_velocity = vec![0.0; gains.len()];
        Ok(Self {
            gains,
            torque_limit,
            zero_velocity,
        })
    }

    #[must_use]
    pub fn gains(&self) -> &PdGains {
        &self.gains
    }

    #[must_use]
    pub fn torque_limit(&self) -> f32 {
        self.torque_limit
    }

    /// Torques driving `pos` towards `target`, clamped to the torque limit.
    ///
    /// # Errors
    ///
    /// `Shape` on any length mismatch.
    pub fn torque(&self, target: &[f32], pos: &[f32], vel: &[f32]) -> Result<Vec<f32>, ControlError> {
        let mut torque = compute_torque(
            target,
            pos,
            &self.gains.kp,
            &self.zero_velocity,
            vel,
            &self.gains.kd,
        )?;
        for t in &mut torque {
            *t = t.clamp(-self.torque_limit, self.torque_limit);
        }
        Ok(torque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_error_gives_zero_torque() {
        let pos = [0.3, -1.2, 0.0, 2.5];
        let vel = [0.1, 0.0, -4.0, 1.0];
        let kp = [10.7, 3.0, 100.0, 0.5];
        let kd = [0.6, 9.0, 0.01, 2.0];
        let torque = compute_torque(&pos, &pos, &kp, &vel, &vel, &kd).unwrap();
        assert!(torque.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_elementwise_formula() {
        let torque =
            compute_torque(&[1.0, 0.0], &[0.5, 1.0], &[2.0, 4.0], &[0.0, 1.0], &[1.0, 0.0], &[0.5, 0.25])
                .unwrap();
        assert_eq!(torque, vec![0.5, -3.75]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = compute_torque(&[0.0; 3], &[0.0; 3], &[1.0; 2], &[0.0; 3], &[0.0; 3], &[1.0; 3])
            .unwrap_err();
        assert!(matches!(err, ControlError::Shape { what: "kp gains", .. }));
    }

    #[test]
    fn test_controller_saturates() {
        let pd = PdController::new(PdGains::uniform(2, 10.7, 0.6), 3.35).unwrap();
        let torque = pd.torque(&[1.0, -1.0], &[0.0, 0.0], &[0.0, 0.0]).unwrap();
        assert_eq!(torque, vec![3.35, -3.35]);
    }

    #[test]
    fn test_controller_damps_velocity() {
        let pd = PdController::new(PdGains::uniform(1, 10.0, 0.5), 3.35).unwrap();
        let torque = pd.torque(&[0.0], &[0.0], &[2.0]).unwrap();
        assert!((torque[0] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_limit() {
        assert!(PdController::new(PdGains::uniform(1, 1.0, 1.0), 0.0).is_err());
    }
}
