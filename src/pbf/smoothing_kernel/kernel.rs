use crate::units::{Real, Vector};

/// SPH smoothing kernel
///
/// Only radially symmetric kernels are supported.
/// Support is limited to the smoothing length, i.e. for |r|>=h the result is zero.
pub trait Kernel {
    const DIVISION_EPSILON: Real = 1.0e-10;

    /// Evaluates the kernel function for a given square of distance r_sq
    /// `r_sq`:     Squared length of the offset between two particles
    /// `r`:        Length of the offset
    fn evaluate(&self, r_sq: Real, r: Real) -> Real;

    /// Evaluates the gradient of the kernel at the offset `ri_sub_rj`, i.e. ∇W for a particle i
    /// interacting with a particle j.
    /// `ri_sub_rj`: Offset from position j to position i, so ri - rj. Not normalized!
    /// `r_sq`:      Squared length of ri_sub_rj
    /// `r`:         Length of ri_sub_rj
    fn gradient(&self, ri_sub_rj: Vector, r_sq: Real, r: Real) -> Vector;
}

macro_rules! generate_kernel_tests {
    ($kernel_type:ident) => {
    };
}
