use super::kernel::Kernel;
use crate::units::{Real, Vector};
use cgmath::prelude::*;

/// Debrun's "Spiky" smoothing kernel.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Well suited for pressure-like terms since its gradient doesn't vanish at the center.
#[derive(Copy, Clone)]
pub struct Spiky {
    h: Real,
    hsq: Real,
    normalizer: Real,
    normalizer_grad: Real,
}

impl Spiky {
    pub fn new(smoothing_length: Real) -> Spiky {
        Spiky {
            h: smoothing_length,
            hsq: smoothing_length * smoothing_length,
            // 3D normalization factor, W(r) = 15/(π h⁶) (h - r)³
            normalizer: 15.0 / (std::f64::consts::PI as Real * smoothing_length.powi(6)),
            normalizer_grad: -45.0 / (std::f64::consts::PI as Real * smoothing_length.powi(6)),
        }
    }
}

impl Kernel for Spiky {
    #[inline]
    fn evaluate(&self, r_sq: Real, r: Real) -> Real {
        if r_sq < self.hsq {
            let hsubr = self.h - r;
            self.normalizer * hsubr * hsubr * hsubr
        } else {
            0.0
        }
    }

    // ∇W(ri - rj) = -45/(π h⁶) (h - r)² (ri - rj)/r
    // Zero at the center itself, the gradient direction is undefined there.
    #[inline]
    fn gradient(&self, ri_sub_rj: Vector, r_sq: Real, r: Real) -> Vector {
        if r_sq < self.hsq && r > Self::DIVISION_EPSILON {
            let hsubr = self.h - r;
            (self.normalizer_grad * hsubr * hsubr / r) * ri_sub_rj
        } else {
            Vector::zero()
        }
    }
}

generate_kernel_tests!(Spiky);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::*;
    use cgmath::prelude::*;
    use more_asserts::*;

    #[test]
    fn gradient_points_from_neighbor_to_particle() {
        let kernel = Spiky::new(1.0);
        // ri - rj along +x: the repulsive pressure direction is -x scaled by a negative λ,
        // so the raw gradient itself points towards -x.
        let offset = Vector::new(0.5, 0.0, 0.0);
        let grad = kernel.gradient(offset, 0.25, 0.5);
        assert_lt!(grad.x, 0.0);
        assert_eq!(grad.y, 0.0);
        assert_eq!(grad.z, 0.0);
    }

    #[test]
    fn gradient_is_zero_at_center() {
        let kernel = Spiky::new(1.0);
        assert_eq!(kernel.gradient(Vector::zero(), 0.0, 0.0), Vector::zero());
    }
}
