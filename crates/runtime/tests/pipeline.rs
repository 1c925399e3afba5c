use physics::{RobotState, Vec3};
use runtime::{
    compute_torque, Command, JointMap, LatencySimulator, ObservationBuilder, RobotVariant,
    PRESETS,
};
use std::time::Duration;

#[test]
fn reverse_permutation_of_fifteen_joints() -> anyhow::Result<()> {
    let map = JointMap::new((0..15).rev().collect())?;
    let physical: Vec<f32> = (0..15).map(|i| i as f32).collect();
    let policy = map.to_policy_order(&physical)?;
    assert_eq!(policy, (0..15).rev().map(|i| i as f32).collect::<Vec<_>>());
    assert_eq!(map.to_physical_order(&policy)?, physical);
    Ok(())
}

#[test]
fn every_preset_neutral_pose_survives_both_reorderings() {
    for name in PRESETS {
        let variant = RobotVariant::preset(name).unwrap();
        let map = variant.joint_map().unwrap();
        assert_eq!(variant.neutral_pose.len(), map.len());

        let policy = map.to_policy_order(&variant.neutral_pose).unwrap();
        assert_eq!(map.to_physical_order(&policy).unwrap(), variant.neutral_pose);
        let physical = map.to_physical_order(&variant.neutral_pose).unwrap();
        assert_eq!(map.to_policy_order(&physical).unwrap(), variant.neutral_pose);
    }
}

#[test]
fn preset_joint_orders_differ_only_by_permutation() {
    let variant = RobotVariant::open_duck_mini_v2();
    let map = variant.joint_map().unwrap();
    let names: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let policy = map.to_policy_order(&names).unwrap();
    for (slot, &physical) in policy.iter().enumerate() {
        assert_eq!(
            variant.policy_joints[slot],
            variant.physical_joints[physical as usize]
        );
    }
}

#[test]
fn latency_releases_samples_strictly_in_push_order() {
    let delay = Duration::from_millis(3);
    let mut latency = LatencySimulator::new(delay);
    let mut released = Vec::new();
    // Push every millisecond, pop every millisecond.
    for t in 0..10u8 {
        let now = Duration::from_millis(u64::from(t));
        latency.push([f32::from(t), 0.0, 0.0, 1.0], [0.0; 3], now);
        let (q, _) = latency.pop(now);
        if now < delay {
            assert_eq!(q, [0.0; 4]);
        } else {
            released.push(q[0]);
        }
    }
    assert_eq!(released, (0u8..7).map(f32::from).collect::<Vec<_>>());
    assert_eq!(latency.len(), 3);
}

#[test]
fn observations_stay_inside_clip_bounds() {
    let variant = RobotVariant::bdx();
    let builder = ObservationBuilder::new(&variant).unwrap();
    for k in 0..50 {
        let s = (k as f32 - 25.0) * 3.7;
        let mut state = RobotState::at_rest(vec![s; 15]);
        state.joint_velocities = (0..15).map(|j| s * j as f32).collect();
        state.base_angular_velocity = Vec3::new(s, -s, s * 0.5);
        let obs = builder
            .build(&state, &[s; 15], Command::new(s, 0.0, -s), None, Duration::ZERO)
            .unwrap();
        assert_eq!(obs.len(), builder.dim());
        assert!(obs.iter().all(|v| (-5.0..=5.0).contains(v)), "k = {k}");
    }
}

#[test]
fn pd_torque_vanishes_at_the_target() {
    let q: Vec<f32> = (0..16).map(|i| (i as f32 * 0.3).sin()).collect();
    let dq: Vec<f32> = (0..16).map(|i| (i as f32 * 0.7).cos()).collect();
    let kp = vec![10.7; 16];
    let kd = vec![0.6; 16];
    let torque = compute_torque(&q, &q, &kp, &dq, &dq, &kd).unwrap();
    assert_eq!(torque, vec![0.0; 16]);
}
