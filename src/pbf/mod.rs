pub use self::appendbuffer::AppendBuffer;
pub use self::collision::{Aabb, ObstacleVolume, PortalRegion};
pub use self::fluidparticleworld::{FluidParticleWorld, Particles};
pub use self::neighborhood_grid::{NeighborhoodGrid, ParticleIndex};
pub use self::parameters::{lattice_rest_density, SimulationParameters};
pub use self::scratch_buffer::{ScratchBuffer, ScratchBufferStore};
pub use self::solver::PbfSolver;

pub mod smoothing_kernel;

mod appendbuffer;
mod collision;
mod fluidparticleworld;
mod neighborhood_grid;
mod parameters;
mod scratch_buffer;
mod solver;
