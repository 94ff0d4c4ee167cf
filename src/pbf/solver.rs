use cgmath::prelude::*;
use rayon::prelude::*;

use super::fluidparticleworld::FluidParticleWorld;
use super::smoothing_kernel;
use super::smoothing_kernel::Kernel;
use crate::units::*;

// Position based fluids solver as described in
// "Position Based Fluids", Macklin & Müller 2013
// https://mmacklin.com/pbf_sig_preprint.pdf
//
// Each stage is a data parallel map over all particles: it reads only buffers finished by
// earlier stages and writes a distinct output buffer, so particle processing order within a
// stage never changes the result. A stage begins only after the previous one completed for
// all particles.
pub struct PbfSolver {
    density_kernel: smoothing_kernel::Poly6,
    gradient_kernel: smoothing_kernel::Spiky,
    smoothing_length: Real,
}

impl PbfSolver {
    pub fn new(smoothing_length: Real) -> PbfSolver {
        PbfSolver {
            density_kernel: smoothing_kernel::Poly6::new(smoothing_length),
            gradient_kernel: smoothing_kernel::Spiky::new(smoothing_length),
            smoothing_length,
        }
    }

    fn apply_external_forces(&self, fluid_world: &mut FluidParticleWorld, dt: Real) {
        let gravity = fluid_world.parameters.gravity;
        let particles = &mut fluid_world.particles;
        particles
            .velocities
            .par_iter_mut()
            .zip(particles.positions.par_iter())
            .zip(particles.predicted_positions.par_iter_mut())
            .for_each(|((velocity, &position), predicted)| {
                *velocity += gravity * dt;
                *predicted = position + *velocity * dt;
            });
    }

    // One Jacobi sweep of the density constraint: estimate densities, derive the constraint
    // multipliers and displace the predicted positions towards rest density.
    fn project_density_constraint(&self, fluid_world: &mut FluidParticleWorld) {
        let num_particles = fluid_world.particles.positions.len();
        let rest_density_inv = 1.0 / fluid_world.parameters.rest_density;
        let pressure_epsilon = fluid_world.parameters.pressure_epsilon;
        let tension_k = fluid_world.parameters.tension_k;
        let tension_power = fluid_world.parameters.tension_power;
        let density_kernel = self.density_kernel;
        let gradient_kernel = self.gradient_kernel;
        let grid = &fluid_world.neighborhood_grid;

        // Densities and multipliers in one pass: the squared gradient sum needed for λ uses
        // the same neighbor offsets as the density estimate. The self gradient accumulates
        // alongside and contributes its squared norm once at the end.
        {
            let particles = &mut fluid_world.particles;
            let predicted = &particles.predicted_positions;
            particles
                .densities
                .par_iter_mut()
                .zip(particles.lambdas.par_iter_mut())
                .enumerate()
                .for_each(|(i, (density, lambda))| {
                    let ri = predicted[i];
                    let mut density_sum = density_kernel.evaluate(0.0, 0.0); // self-contribution
                    let mut gradient_sq_sum = 0.0;
                    let mut self_gradient = Vector::zero();
                    grid.foreach_neighbor(i as u32, predicted, |j| {
                        let ri_sub_rj = ri - predicted[j as usize];
                        let r_sq = ri_sub_rj.magnitude2();
                        let r = r_sq.sqrt();
                        density_sum += density_kernel.evaluate(r_sq, r);

                        let gradient = gradient_kernel.gradient(ri_sub_rj, r_sq, r) * rest_density_inv;
                        gradient_sq_sum += gradient.magnitude2();
                        self_gradient += gradient;
                    });
                    gradient_sq_sum += self_gradient.magnitude2();

                    *density = density_sum;
                    let constraint = density_sum * rest_density_inv - 1.0;
                    // ε keeps lone particles (near empty gradient sum) from blowing up.
                    *lambda = -constraint / (gradient_sq_sum + pressure_epsilon);
                });
        }

        // Position corrections, double buffered against the λ pass.
        {
            // scorr suppresses clumping by pretending slight extra pressure between very
            // close pairs; normalized against the kernel at the reference distance Δq.
            let delta_q = fluid_world.parameters.tension_delta_q * self.smoothing_length;
            let w_delta_q = density_kernel.evaluate(delta_q * delta_q, delta_q);
            let w_delta_q_inv = if w_delta_q > 0.0 { 1.0 / w_delta_q } else { 0.0 };

            let mut delta_positions = fluid_world.scratch_buffers.get_buffer_vector(num_particles);
            let particles = &mut fluid_world.particles;
            let predicted = &particles.predicted_positions;
            let lambdas = &particles.lambdas;
            delta_positions
                .buffer
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, delta_position)| {
                    let ri = predicted[i];
                    let lambda_i = lambdas[i];
                    let mut correction = Vector::zero();
                    grid.foreach_neighbor(i as u32, predicted, |j| {
                        let ri_sub_rj = ri - predicted[j as usize];
                        let r_sq = ri_sub_rj.magnitude2();
                        let r = r_sq.sqrt();
                        let scorr = -tension_k * (density_kernel.evaluate(r_sq, r) * w_delta_q_inv).powi(tension_power);
                        correction += (lambda_i + lambdas[j as usize] + scorr) * gradient_kernel.gradient(ri_sub_rj, r_sq, r);
                    });
                    *delta_position = correction * rest_density_inv;
                });

            particles
                .predicted_positions
                .par_iter_mut()
                .zip(delta_positions.buffer.par_iter())
                .for_each(|(predicted, &delta_position)| {
                    *predicted += delta_position;
                });
        }
    }

    // Clamps predicted positions against the domain, static obstacles and portal regions.
    // `teleported` records which portal (index + 1) moved a particle, 0 if none did.
    fn resolve_collisions(&self, fluid_world: &mut FluidParticleWorld, teleported: &mut [u32]) {
        let domain = *fluid_world.domain();
        let parameters = &fluid_world.parameters;
        let restitution = parameters.restitution;
        let particles = &mut fluid_world.particles;

        particles
            .predicted_positions
            .par_iter_mut()
            .zip(particles.positions.par_iter())
            .zip(teleported.par_iter_mut())
            .for_each(|((predicted, &previous), teleported)| {
                let mut resolved = domain.resolve_containment(*predicted, previous, restitution);
                for obstacle in parameters.obstacles.iter() {
                    if let Some(ejected) = obstacle.resolve_penetration(resolved, previous, restitution) {
                        resolved = ejected;
                    }
                }
                *teleported = 0;
                for (portal_idx, portal) in parameters.portals.iter().enumerate() {
                    if let Some(translated) = portal.resolve_teleport(resolved) {
                        resolved = translated;
                        *teleported = portal_idx as u32 + 1;
                        break;
                    }
                }
                *predicted = resolved;
            });
    }

    fn reconstruct_velocities(&self, fluid_world: &mut FluidParticleWorld, dt: Real, teleported: &[u32]) {
        let inv_dt = 1.0 / dt;
        let portals = &fluid_world.parameters.portals;
        let particles = &mut fluid_world.particles;
        particles
            .velocities
            .par_iter_mut()
            .zip(
                (&particles.positions, &particles.predicted_positions, teleported)
                    .into_par_iter(),
            )
            .for_each(|(velocity, (&position, &predicted, &teleported))| {
                *velocity = if teleported > 0 {
                    // Teleports would otherwise reconstruct an absurd velocity from the jump.
                    portals[teleported as usize - 1].exit_velocity
                } else {
                    (predicted - position) * inv_dt
                };
            });
    }

    // XSPH velocity smoothing over the corrected positions.
    // "Ghost SPH for Animating Water", Schechter et al.
    fn apply_viscosity(&self, fluid_world: &mut FluidParticleWorld) {
        let num_particles = fluid_world.particles.positions.len();
        let viscosity = fluid_world.parameters.viscosity;
        let density_kernel = self.density_kernel;
        let grid = &fluid_world.neighborhood_grid;

        let mut smoothed_velocities = fluid_world.scratch_buffers.get_buffer_vector(num_particles);
        let particles = &mut fluid_world.particles;
        let predicted = &particles.predicted_positions;
        let velocities = &particles.velocities;
        smoothed_velocities
            .buffer
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, smoothed)| {
                let ri = predicted[i];
                let vi = velocities[i];
                let mut correction = Vector::zero();
                grid.foreach_neighbor(i as u32, predicted, |j| {
                    let r_sq = (predicted[j as usize] - ri).magnitude2();
                    correction += (velocities[j as usize] - vi) * density_kernel.evaluate(r_sq, r_sq.sqrt());
                });
                *smoothed = vi + viscosity * correction;
            });
        std::mem::swap(&mut particles.velocities, &mut smoothed_velocities.buffer);
    }

    // Vorticity confinement re-adds the small scale rotation that XSPH smoothed away.
    fn apply_vorticity_confinement(&self, fluid_world: &mut FluidParticleWorld, dt: Real) {
        let num_particles = fluid_world.particles.positions.len();
        let vorticity_epsilon = fluid_world.parameters.vorticity_epsilon;
        let gradient_kernel = self.gradient_kernel;
        let grid = &fluid_world.neighborhood_grid;

        let mut vorticities = fluid_world.scratch_buffers.get_buffer_vector(num_particles);
        let particles = &mut fluid_world.particles;
        let predicted = &particles.predicted_positions;

        // First pass: curl estimate ω per particle.
        {
            let velocities = &particles.velocities;
            vorticities.buffer.par_iter_mut().enumerate().for_each(|(i, vorticity)| {
                let ri = predicted[i];
                let vi = velocities[i];
                let mut curl = Vector::zero();
                grid.foreach_neighbor(i as u32, predicted, |j| {
                    let ri_sub_rj = ri - predicted[j as usize];
                    let r_sq = ri_sub_rj.magnitude2();
                    curl += (velocities[j as usize] - vi).cross(gradient_kernel.gradient(ri_sub_rj, r_sq, r_sq.sqrt()));
                });
                *vorticity = curl;
            });
        }

        // Second pass: corrective force along the gradient of |ω|, skipped where that
        // gradient vanishes (uniform or symmetric neighborhoods must receive no force).
        {
            let vorticities = &vorticities.buffer;
            particles
                .velocities
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, velocity)| {
                    let ri = predicted[i];
                    let mut location_vector = Vector::zero();
                    grid.foreach_neighbor(i as u32, predicted, |j| {
                        let ri_sub_rj = ri - predicted[j as usize];
                        let r_sq = ri_sub_rj.magnitude2();
                        location_vector +=
                            vorticities[j as usize].magnitude() * gradient_kernel.gradient(ri_sub_rj, r_sq, r_sq.sqrt());
                    });
                    if location_vector.magnitude2() > 0.0 {
                        *velocity += vorticity_epsilon * location_vector.normalize().cross(vorticities[i]) * dt;
                    }
                });
        }
    }

    /// Advances the simulation by `dt` seconds. `dt` is expected to be a small, externally
    /// clamped timestep (e.g. 1/60); the solver itself never subdivides it.
    pub fn simulation_step(&self, fluid_world: &mut FluidParticleWorld, dt: Real) {
        assert!(dt > 0.0);

        fluid_world.drain_spawn_requests();
        let num_particles = fluid_world.particles.positions.len();
        if num_particles == 0 {
            return;
        }

        self.apply_external_forces(fluid_world, dt);
        fluid_world.update_neighborhood_datastructure();

        // The reference setup runs a single sweep per step and lets the error anneal over
        // frames instead of iterating to convergence.
        for _ in 0..fluid_world.parameters.solver_iterations {
            self.project_density_constraint(fluid_world);
        }

        let mut teleported = fluid_world.scratch_buffers.get_buffer_index(num_particles);
        self.resolve_collisions(fluid_world, &mut teleported.buffer);
        self.reconstruct_velocities(fluid_world, dt, &teleported.buffer);

        self.apply_viscosity(fluid_world);
        self.apply_vorticity_confinement(fluid_world, dt);

        // Commit.
        let particles = &mut fluid_world.particles;
        particles
            .positions
            .par_iter_mut()
            .zip(particles.predicted_positions.par_iter())
            .for_each(|(position, &predicted)| {
                *position = predicted;
            });
    }
}
