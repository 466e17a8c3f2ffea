use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glam::Vec2;
use gridflow::{Flow, FlowConfig, ParticleSystem, Relaxation};

fn stirred_flow(width: usize, height: usize) -> Flow {
    let mut flow = Flow::new(FlowConfig::with_size(width, height));
    flow.add_force(width / 2, height / 2, Vec2::new(5.0, -3.0), 4.0);
    for _ in 0..5 {
        flow.step(1.0 / 30.0);
    }
    flow
}

fn benchmark_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flow_step");

    for size in [32, 64, 128].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut flow = stirred_flow(size, size);
            b.iter(|| {
                flow.add_force(size / 2, size / 2, Vec2::new(0.0, -2.0), 2.0);
                flow.step(black_box(1.0 / 30.0));
            });
        });
    }
    group.finish();
}

fn benchmark_relaxation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pressure_relaxation");
    let base = stirred_flow(64, 48);

    for relaxation in [Relaxation::InPlace, Relaxation::Jacobi] {
        group.bench_function(format!("{relaxation:?}"), |b| {
            let mut flow = base.clone();
            flow.set_relaxation(relaxation);
            b.iter(|| flow.pressure());
        });
    }
    group.finish();
}

fn benchmark_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("operations");
    let base = stirred_flow(64, 48);

    group.bench_function("advect", |b| {
        let mut flow = base.clone();
        b.iter(|| flow.advect(black_box(1.0 / 30.0)));
    });

    group.bench_function("viscosity", |b| {
        let mut flow = base.clone();
        b.iter(|| flow.viscosity(0.01, black_box(1.0 / 30.0), -1.0));
    });

    group.bench_function("viscosity_masked", |b| {
        let mut flow = base.clone();
        for y in 10..20 {
            flow.set_obstacle(30, y, true);
        }
        b.iter(|| flow.viscosity_masked(0.01, black_box(1.0 / 30.0), -1.0, -1.0));
    });

    group.bench_function("update_particles_2048", |b| {
        let mut flow = base.clone();
        let mut particles = ParticleSystem::with_capacity(2048);
        for i in 0..2048 {
            let pos = Vec2::new((i % 64) as f32 * 7.5, (i / 64) as f32 * 10.0);
            particles.emit(pos, Vec2::ZERO, 100, 1.0, 0.0, [1.0; 4]);
        }
        b.iter(|| flow.update_particles(&mut particles, 0.1, 1.0));
    });

    group.finish();
}

criterion_group!(benches, benchmark_step, benchmark_relaxation, benchmark_operations);
criterion_main!(benches);
