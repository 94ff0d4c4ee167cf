use crate::units::*;

use super::collision::{ObstacleVolume, PortalRegion};
use super::smoothing_kernel::{Kernel, Poly6};

/// Tuning knobs of the simulation. Immutable during a step.
///
/// Particle mass is implicitly 1, so `rest_density` lives on the scale of raw kernel sums.
/// Use [`lattice_rest_density`] to derive a matching value for a given seeding spacing.
#[derive(Clone, Debug)]
pub struct SimulationParameters {
    /// Global gravity acceleration in m/s².
    pub gravity: Vector,
    /// Rest density ρ₀ the constraint solver pushes towards.
    pub rest_density: Real,
    /// Relaxation ε added to the λ denominator. Keeps particles without close
    /// neighbors from dividing by (almost) zero.
    pub pressure_epsilon: Real,
    /// Tensile instability correction: reference distance Δq as a fraction of the kernel radius.
    pub tension_delta_q: Real,
    /// Tensile instability correction strength k.
    pub tension_k: Real,
    /// Tensile instability correction exponent n.
    pub tension_power: i32,
    /// XSPH velocity smoothing coefficient c.
    pub viscosity: Real,
    /// Vorticity confinement strength ε_vort.
    pub vorticity_epsilon: Real,
    /// How strongly boundary contacts preserve incoming motion. 0 kills it entirely.
    pub restitution: Real,
    /// Jacobi sweeps of the density constraint per step.
    /// The reference implementation runs a single sweep per frame and relies on temporal
    /// convergence; more sweeps buy incompressibility accuracy for per-step cost.
    pub solver_iterations: usize,
    /// Static scene obstacles.
    pub obstacles: Vec<ObstacleVolume>,
    /// Optional region teleport rules, applied after collision resolution.
    pub portals: Vec<PortalRegion>,
}

impl Default for SimulationParameters {
    fn default() -> SimulationParameters {
        SimulationParameters {
            gravity: Vector::new(0.0, -9.81, 0.0),
            rest_density: 1000.0,
            pressure_epsilon: 1.0e-6,
            tension_delta_q: 0.2,
            tension_k: 0.001,
            tension_power: 4,
            viscosity: 0.05,
            vorticity_epsilon: 0.01,
            restitution: 0.0,
            solver_iterations: 1,
            obstacles: Vec::new(),
            portals: Vec::new(),
        }
    }
}

/// Density of an infinite cubic lattice with the given spacing, as seen by the poly6 kernel
/// with implicit unit particle mass. Seeding a fluid block at `spacing` and setting ρ₀ to this
/// value yields a block that is initially at rest density.
pub fn lattice_rest_density(smoothing_length: Real, spacing: Real) -> Real {
    let kernel = Poly6::new(smoothing_length);
    let reach = (smoothing_length / spacing).ceil() as i32;
    let mut density = 0.0;
    for x in -reach..=reach {
        for y in -reach..=reach {
            for z in -reach..=reach {
                let r_sq = (x * x + y * y + z * z) as Real * spacing * spacing;
                density += kernel.evaluate(r_sq, r_sq.sqrt());
            }
        }
    }
    density
}
