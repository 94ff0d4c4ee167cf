/// Smoothing Kernels.
pub use self::kernel::Kernel;
pub use self::poly6::Poly6;
pub use self::spiky::Spiky;

#[macro_use]
mod kernel;
mod poly6;
mod spiky;
