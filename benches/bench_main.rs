use criterion::criterion_main;
mod benchmarks;

criterion_main! {
    benchmarks::neighborhood_grid::neighborhood_grid,
    benchmarks::simulation_step::simulation_step,
}
