use ml::{ConstantPolicy, PolicyRunner};
use physics::{HardwareSubstrate, Imu, ImuSample, MotorBus, PhysicsError, Quat, Vec3};
use runtime::{ControlLoop, RobotVariant};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Servos that land exactly on their goal.
struct IdealBus {
    goals: Arc<Mutex<Vec<Vec<f32>>>>,
    positions: Vec<f32>,
    fail_reads_after: Option<usize>,
    reads: usize,
}

impl MotorBus for IdealBus {
    fn enable_torque(&mut self) -> Result<(), PhysicsError> {
        Ok(())
    }

    fn disable_torque(&mut self) -> Result<(), PhysicsError> {
        Ok(())
    }

    fn set_pid(&mut self, _kp: f32, _ki: f32, _kd: f32) -> Result<(), PhysicsError> {
        Ok(())
    }

    fn write_goal_positions(&mut self, positions: &[f32]) -> Result<(), PhysicsError> {
        self.goals.lock().unwrap().push(positions.to_vec());
        self.positions = positions.to_vec();
        Ok(())
    }

    fn read_positions(&mut self) -> Result<Vec<f32>, PhysicsError> {
        self.reads += 1;
        if self.fail_reads_after.is_some_and(|n| self.reads > n) {
            return Err(PhysicsError::Hardware("bus timeout".into()));
        }
        Ok(self.positions.clone())
    }

    fn read_velocities(&mut self) -> Result<Vec<f32>, PhysicsError> {
        Ok(vec![0.0; self.positions.len()])
    }
}

struct LevelImu;

impl Imu for LevelImu {
    fn read(&mut self) -> Result<ImuSample, PhysicsError> {
        Ok(ImuSample {
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
        })
    }
}

fn bus(variant: &RobotVariant, fail_reads_after: Option<usize>) -> (IdealBus, Arc<Mutex<Vec<Vec<f32>>>>) {
    let goals = Arc::new(Mutex::new(Vec::new()));
    let bus = IdealBus {
        goals: Arc::clone(&goals),
        positions: variant.neutral_pose.clone(),
        fail_reads_after,
        reads: 0,
    };
    (bus, goals)
}

#[test]
fn position_variant_drives_servo_bus() {
    let variant = RobotVariant::bdx();
    let (bus, goals) = bus(&variant, None);
    let hardware = HardwareSubstrate::new(bus, LevelImu, variant.dof(), &variant.floor).unwrap();
    let policy = PolicyRunner::new(Box::new(ConstantPolicy::new(
        variant.observation_dim(),
        vec![0.1; variant.dof()],
    )));

    let summary = ControlLoop::new(&variant, hardware, policy)
        .unwrap()
        .with_max_ticks(8)
        .run()
        .unwrap();
    assert_eq!(summary.inferences, 1);

    let goals = goals.lock().unwrap();
    assert_eq!(goals.len(), 8);
    assert_eq!(goals[0], variant.neutral_pose);
    let expected: Vec<f32> = variant.neutral_pose.iter().map(|n| n + 0.1).collect();
    assert_eq!(goals[7], expected);
}

#[test]
fn torque_variant_is_refused_by_position_servos() {
    let variant = RobotVariant::open_duck_mini_v2();
    let (bus, goals) = bus(&variant, None);
    let hardware = HardwareSubstrate::new(bus, LevelImu, variant.dof(), &variant.floor).unwrap();
    let policy = PolicyRunner::new(Box::new(ConstantPolicy::zeros(variant.observation_dim(), 16)));

    let failure = ControlLoop::new(&variant, hardware, policy)
        .unwrap()
        .with_warmup(Duration::ZERO)
        .run()
        .unwrap_err();
    assert_eq!(failure.tick, 1);
    assert_eq!(failure.error.kind(), "SubstrateError");
    assert!(goals.lock().unwrap().is_empty());
}

#[test]
fn bus_failure_halts_the_loop() {
    let variant = RobotVariant::bdx();
    // One read at construction, then one per tick.
    let (bus, _goals) = bus(&variant, Some(4));
    let hardware = HardwareSubstrate::new(bus, LevelImu, variant.dof(), &variant.floor).unwrap();
    let policy = PolicyRunner::new(Box::new(ConstantPolicy::zeros(variant.observation_dim(), 15)));

    let failure = ControlLoop::new(&variant, hardware, policy)
        .unwrap()
        .run()
        .unwrap_err();
    assert_eq!(failure.tick, 4);
    assert!(matches!(
        failure.error,
        runtime::ControlError::Substrate(PhysicsError::Hardware(_))
    ));
}
