use cgmath::prelude::*;
use criterion::{black_box, criterion_group, Criterion};
use rand::prelude::*;

use pbf3d::pbf::{Aabb, NeighborhoodGrid, ScratchBufferStore};
use pbf3d::units::*;

fn bench_neighborhood_grid(c: &mut Criterion) {
    const NUM_POSITIONS: usize = 20000;
    let radius = black_box(0.25);
    let domain = Aabb::new(Point::new(-2.0, 0.0, -2.0), Point::new(2.0, 4.0, 2.0));

    let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(123456789);
    let extent = domain.extent();
    let mut positions: Vec<Point> = std::iter::repeat_with(|| {
        let unit = rng.gen::<Vector>();
        domain.min + Vector::new(unit.x * extent.x, unit.y * extent.y, unit.z * extent.z)
    })
    .take(NUM_POSITIONS)
    .collect();

    let mut scratch_buffer_store = ScratchBufferStore::new();
    let mut grid = NeighborhoodGrid::new(&domain, radius);
    grid.update(&mut scratch_buffer_store, &mut positions, &mut [], &mut []);

    c.bench_function(
        &format!("neighborhood_grid.update (warm), {} positions, {} radius", NUM_POSITIONS, radius),
        |b| b.iter(|| grid.update(&mut scratch_buffer_store, &mut positions, &mut [], &mut [])),
    );

    c.bench_function(
        &format!("neighborhood_grid.foreach_neighbor, {} positions, {} radius", NUM_POSITIONS, radius),
        |b| {
            let mut pindex = 0; // cycle through positions for a more balanced result
            b.iter(|| {
                let mut accum: Vector = Zero::zero();
                grid.foreach_neighbor(pindex, &positions, |i| {
                    accum += positions[i as usize].to_vec();
                });
                pindex = (pindex + 1) % NUM_POSITIONS as u32;
                accum
            })
        },
    );
}

fn config() -> Criterion {
    Criterion::default().warm_up_time(core::time::Duration::new(0, 1000))
}

criterion_group!(
    name = neighborhood_grid;
    config = config();
    targets = bench_neighborhood_grid
);
