use super::kernel::Kernel;
use crate::units::{Real, Vector};
use cgmath::prelude::*;

/// Poly6 smoothing kernel.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Used for density estimation and velocity smoothing.
/// Not well suited for pressure-like terms since its derivative approaches zero towards the center.
#[derive(Copy, Clone)]
pub struct Poly6 {
    hsq: Real,
    normalizer: Real,
    normalizer_grad: Real,
}

impl Poly6 {
    pub fn new(smoothing_length: Real) -> Poly6 {
        Poly6 {
            hsq: smoothing_length * smoothing_length,
            // 3D normalization factor, W(r) = 315/(64 π h⁹) (h² - r²)³
            normalizer: 315.0 / (64.0 * std::f64::consts::PI as Real * smoothing_length.powi(9)),
            normalizer_grad: -945.0 / (32.0 * std::f64::consts::PI as Real * smoothing_length.powi(9)),
        }
    }
}

impl Kernel for Poly6 {
    #[inline]
    fn evaluate(&self, r_sq: Real, _r: Real) -> Real {
        if r_sq < self.hsq {
            let dsq = self.hsq - r_sq;
            self.normalizer * dsq * dsq * dsq
        } else {
            0.0
        }
    }

    #[inline]
    fn gradient(&self, ri_sub_rj: Vector, r_sq: Real, _r: Real) -> Vector {
        if r_sq < self.hsq {
            let dsq = self.hsq - r_sq;
            self.normalizer_grad * dsq * dsq * ri_sub_rj
        } else {
            Vector::zero()
        }
    }
}

generate_kernel_tests!(Poly6);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::*;
    use more_asserts::*;

    #[test]
    fn matches_closed_form_value() {
        // W((0.5,0,0), h=1) = 315/(64π) · (1 - 0.25)³
        let kernel = Poly6::new(1.0);
        let expected = 315.0 / (64.0 * std::f64::consts::PI as Real) * 0.75_f32.powi(3);
        let computed = kernel.evaluate(0.25, 0.5);
        assert_le!((computed - expected).abs(), 1.0e-4);
        assert_le!((expected - 0.66093).abs(), 1.0e-4);
    }

    #[test]
    fn self_contribution_is_maximum() {
        let kernel = Poly6::new(0.5);
        let w0 = kernel.evaluate(0.0, 0.0);
        for i in 1..10 {
            let r = 0.5 * i as Real / 10.0;
            assert_lt!(kernel.evaluate(r * r, r), w0);
        }
    }
}
