use physics::transform::{projected_gravity, quat_from_rpy};
use physics::{ActuatorCommand, BipedSim, JointParams, PhysicsError, SimConfig, Substrate};

#[test]
fn free_joint_decays_under_damping() {
    let mut config = SimConfig::uniform(1);
    config.joints[0] = JointParams {
        damping: 0.1,
        ..JointParams::default()
    };
    let mut sim = BipedSim::new(config).unwrap();
    sim.set_actuator_target(&ActuatorCommand::Torque(vec![0.5]))
        .unwrap();
    sim.step(0.001, 100).unwrap();
    sim.set_actuator_target(&ActuatorCommand::Torque(vec![0.0]))
        .unwrap();
    let moving = sim.joint_velocities()[0];
    sim.step(0.001, 2000).unwrap();
    assert!(moving > 0.0);
    assert!(sim.joint_velocities()[0].abs() < moving * 1e-3);
}

#[test]
fn constant_torque_matches_analytic_start() {
    // Short horizon: damping barely matters, so q ≈ ½ (τ/I) t².
    let mut sim = BipedSim::new(SimConfig::uniform(1)).unwrap();
    sim.set_actuator_target(&ActuatorCommand::Torque(vec![0.01]))
        .unwrap();
    let dt = 0.0001_f32;
    let steps = 100_usize;
    sim.step(dt, steps).unwrap();
    let t = dt * steps as f32;
    let expected = 0.5 * (0.01 / 0.01) * t * t;
    let diff = (sim.joint_positions()[0] - expected).abs();
    assert!(diff < 1e-4, "diff={diff}");
}

#[test]
fn state_reports_tilt() {
    let mut sim = BipedSim::new(SimConfig::uniform(2)).unwrap();
    sim.set_base_orientation(quat_from_rpy(0.0, 0.2, 0.0));
    let state = sim.state().unwrap();
    let g = projected_gravity(state.base_orientation);
    assert!(g.x.abs() > 0.1);
    assert!(g.z < -0.9);
}

#[test]
fn non_finite_command_is_rejected() {
    let mut sim = BipedSim::new(SimConfig::uniform(1)).unwrap();
    let err = sim
        .set_actuator_target(&ActuatorCommand::Position(vec![f32::NAN]))
        .unwrap_err();
    assert!(matches!(err, PhysicsError::NonFinite(_)));
}

#[test]
fn mismatched_initial_pose_is_rejected() {
    let mut config = SimConfig::uniform(3);
    config.initial_positions.pop();
    assert!(matches!(
        BipedSim::new(config),
        Err(PhysicsError::Shape { expected: 3, actual: 2, .. })
    ));
}
