use criterion::{criterion_group, Criterion};

use pbf3d::pbf::{lattice_rest_density, Aabb, FluidParticleWorld, PbfSolver, SimulationParameters};
use pbf3d::units::*;

fn bench_simulation_step(c: &mut Criterion) {
    let smoothing_length = 0.25;
    let particle_spacing = smoothing_length * 0.5;
    let domain = Aabb::new(Point::new(-2.0, 0.0, -2.0), Point::new(2.0, 4.0, 2.0));

    let parameters = SimulationParameters {
        rest_density: lattice_rest_density(smoothing_length, particle_spacing),
        ..Default::default()
    };
    let mut fluid_world = FluidParticleWorld::new(8192, domain, smoothing_length, parameters);
    fluid_world.add_fluid_box(
        &Aabb::new(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 2.0, 1.0)),
        particle_spacing,
        0.05,
    );

    let solver = PbfSolver::new(smoothing_length);
    // Let the column collapse first so the benchmark measures a typical dense state.
    for _ in 0..60 {
        solver.simulation_step(&mut fluid_world, 1.0 / 60.0);
    }

    c.bench_function(
        &format!("simulation_step, {} particles", fluid_world.num_particles()),
        |b| b.iter(|| solver.simulation_step(&mut fluid_world, 1.0 / 60.0)),
    );
}

criterion_group!(simulation_step, bench_simulation_step);
