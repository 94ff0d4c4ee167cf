pub mod neighborhood_grid;
pub mod simulation_step;
