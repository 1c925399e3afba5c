use criterion::{criterion_group, criterion_main, Criterion};
use physics::{ActuatorCommand, BipedSim, LegGeometry, SimConfig, Substrate};

fn biped(dof: usize) -> BipedSim {
    let mut config = SimConfig::uniform(dof);
    config.legs = vec![
        LegGeometry {
            foot: "left_foot".into(),
            hip_pitch: 2,
            knee: 3,
            thigh: 0.07,
            shin: 0.07,
        },
        LegGeometry {
            foot: "right_foot".into(),
            hip_pitch: 7,
            knee: 8,
            thigh: 0.07,
            shin: 0.07,
        },
    ];
    BipedSim::new(config).unwrap()
}

fn bench_sim_step(c: &mut Criterion) {
    let mut sim = biped(16);
    sim.set_actuator_target(&ActuatorCommand::Position(vec![0.3; 16]))
        .unwrap();
    c.bench_function("biped_step_50_substeps", |b| {
        b.iter(|| sim.step(0.000_1, 50).unwrap());
    });
}

fn bench_contact_query(c: &mut Criterion) {
    let mut sim = biped(16);
    c.bench_function("biped_contact_query", |b| {
        b.iter(|| sim.query_contact("left_foot", "floor").unwrap());
    });
}

criterion_group!(benches, bench_sim_step, bench_contact_query);
criterion_main!(benches);
