use cgmath::prelude::*;

use super::appendbuffer::AppendBuffer;
use super::collision::Aabb;
use super::neighborhood_grid::NeighborhoodGrid;
use super::parameters::SimulationParameters;
use super::scratch_buffer::ScratchBufferStore;
use crate::units::*;

#[derive(Copy, Clone)]
struct ParticleSpawn {
    position: Point,
    velocity: Vector,
}

/// Per particle buffers in SoA layout.
///
/// All buffers share the same length and are preallocated to the particle capacity.
/// Note that the buffers are re-sorted into cell order on every step, so an index identifies
/// a particular particle only within a single step.
pub struct Particles {
    pub positions: Vec<Point>,
    pub velocities: Vec<Vector>,
    /// Working positions during a step; becomes `positions` when the step commits.
    pub predicted_positions: Vec<Point>,
    /// Local densities ρ, recomputed every step.
    pub densities: Vec<Real>,
    /// Constraint multipliers λ, recomputed every step.
    pub lambdas: Vec<Real>,
}

pub struct FluidParticleWorld {
    pub particles: Particles,
    pub parameters: SimulationParameters,
    pub neighborhood_grid: NeighborhoodGrid,
    pub scratch_buffers: ScratchBufferStore,

    domain: Aabb,
    smoothing_length: Real,
    max_particles: usize,
    spawn_requests: AppendBuffer<ParticleSpawn>,
}

impl FluidParticleWorld {
    pub fn new(max_particles: usize, domain: Aabb, smoothing_length: Real, parameters: SimulationParameters) -> FluidParticleWorld {
        assert!(smoothing_length > 0.0);
        FluidParticleWorld {
            particles: Particles {
                positions: Vec::with_capacity(max_particles),
                velocities: Vec::with_capacity(max_particles),
                predicted_positions: Vec::with_capacity(max_particles),
                densities: Vec::with_capacity(max_particles),
                lambdas: Vec::with_capacity(max_particles),
            },
            parameters,
            neighborhood_grid: NeighborhoodGrid::new(&domain, smoothing_length),
            scratch_buffers: ScratchBufferStore::new(),

            domain,
            smoothing_length,
            max_particles,
            spawn_requests: AppendBuffer::with_capacity(max_particles),
        }
    }

    pub fn domain(&self) -> &Aabb {
        &self.domain
    }

    pub fn smoothing_length(&self) -> Real {
        self.smoothing_length
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Number of simulated particles, including spawns that still wait for the next step.
    pub fn num_particles(&self) -> usize {
        self.particles.positions.len() + self.spawn_requests.len()
    }

    /// Committed positions of the last completed step, for consumption by a renderer.
    pub fn positions(&self) -> &[Point] {
        &self.particles.positions
    }

    pub fn velocities(&self) -> &[Vector] {
        &self.particles.velocities
    }

    /// Queues a new particle. Returns false and changes nothing once the capacity is
    /// exhausted; running full is a normal condition, not an error.
    /// Queued spawns enter the simulation at the start of the next step.
    pub fn try_add_particle(&self, position: Point, velocity: Vector) -> bool {
        if self.num_particles() >= self.max_particles {
            return false;
        }
        self.spawn_requests.push(ParticleSpawn { position, velocity })
    }

    /// Fills an axis aligned box with a jittered particle lattice.
    /// - `spacing`: Lattice distance between particles, typically half the smoothing length.
    /// - `jitter_amount`: 0 for a perfect lattice. >1 and particles are no longer in a strict lattice.
    ///
    /// Returns the number of particles actually queued; stops early at the capacity limit.
    pub fn add_fluid_box(&self, fluid_box: &Aabb, spacing: Real, jitter_amount: Real) -> usize {
        let extent = fluid_box.extent();
        let num_particles_x = std::cmp::max(1, (extent.x / spacing) as usize);
        let num_particles_y = std::cmp::max(1, (extent.y / spacing) as usize);
        let num_particles_z = std::cmp::max(1, (extent.z / spacing) as usize);

        let jitter_factor = spacing * jitter_amount;
        let mut num_queued = 0;
        for z in 0..num_particles_z {
            for y in 0..num_particles_y {
                for x in 0..num_particles_x {
                    let jitter = rand::random::<Vector>() * jitter_factor;
                    let lattice_position = Vector::new(
                        spacing * (x as Real + 0.5),
                        spacing * (y as Real + 0.5),
                        spacing * (z as Real + 0.5),
                    );
                    if !self.try_add_particle(fluid_box.min + lattice_position + jitter, Vector::zero()) {
                        return num_queued;
                    }
                    num_queued += 1;
                }
            }
        }
        num_queued
    }

    /// Moves queued spawns into the particle buffers. Runs at the start of a step, never
    /// while any stage is in flight.
    pub(super) fn drain_spawn_requests(&mut self) {
        let particles = &mut self.particles;
        for spawn in self.spawn_requests.as_slice() {
            particles.positions.push(spawn.position);
            particles.velocities.push(spawn.velocity);
            particles.predicted_positions.push(spawn.position);
            particles.densities.push(0.0);
            particles.lambdas.push(0.0);
        }
        self.spawn_requests.clear();
        debug_assert!(self.particles.positions.len() <= self.max_particles);
    }

    /// Rebuilds the neighborhood grid over the predicted positions and sorts all particle
    /// buffers into the new cell order. Densities and lambdas are recomputed afterwards
    /// anyway, so they stay out of the permutation.
    pub(super) fn update_neighborhood_datastructure(&mut self) {
        let particles = &mut self.particles;
        self.neighborhood_grid.update(
            &mut self.scratch_buffers,
            &mut particles.predicted_positions,
            &mut [&mut particles.positions],
            &mut [&mut particles.velocities],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world(max_particles: usize) -> FluidParticleWorld {
        FluidParticleWorld::new(
            max_particles,
            Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0)),
            0.2,
            SimulationParameters::default(),
        )
    }

    #[test]
    fn try_add_stops_at_capacity() {
        let max_particles = 16;
        let world = test_world(max_particles);

        let mut num_rejected = 0;
        for i in 0..max_particles + 5 {
            let position = Point::new(0.0, i as Real * 0.01, 0.0);
            if !world.try_add_particle(position, Vector::zero()) {
                num_rejected += 1;
            }
        }
        assert_eq!(num_rejected, 5);
        assert_eq!(world.num_particles(), max_particles);
    }

    #[test]
    fn capacity_holds_across_spawn_drains() {
        let max_particles = 8;
        let mut world = test_world(max_particles);

        for _ in 0..max_particles {
            assert!(world.try_add_particle(Point::new(0.0, 0.0, 0.0), Vector::zero()));
        }
        world.drain_spawn_requests();
        assert_eq!(world.positions().len(), max_particles);
        assert!(!world.try_add_particle(Point::new(0.0, 0.0, 0.0), Vector::zero()));
        assert_eq!(world.num_particles(), max_particles);
    }

    #[test]
    fn add_fluid_box_respects_capacity() {
        let world = test_world(10);
        let num_queued = world.add_fluid_box(
            &Aabb::new(Point::new(-0.5, -0.5, -0.5), Point::new(0.5, 0.5, 0.5)),
            0.1,
            0.0,
        );
        assert_eq!(num_queued, 10);
        assert_eq!(world.num_particles(), 10);
    }

    #[test]
    fn spawned_particles_enter_with_requested_state() {
        let mut world = test_world(4);
        let velocity = Vector::new(0.5, -1.0, 0.25);
        assert!(world.try_add_particle(Point::new(0.1, 0.2, 0.3), velocity));
        world.drain_spawn_requests();
        assert_eq!(world.positions(), &[Point::new(0.1, 0.2, 0.3)]);
        assert_eq!(world.velocities(), &[velocity]);
    }
}
