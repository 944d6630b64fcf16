use nalgebra::ComplexField;
use num::Complex;

pub use nalgebra;
pub use num;

/// The scalar type threaded through every weak-form and constitutive evaluation.
///
/// All physics code is written once, generically over `DiffScalar`, and instantiated either with
/// `f64` for plain evaluation (derivatives verified by central differences) or with
/// `Complex<f64>` for complex-step differentiation, where a perturbation of size $h$ along the
/// imaginary axis yields derivatives free of truncation and cancellation error.
///
/// Real-valued quantities that never carry a derivative (steps, tolerances, parametric
/// coordinates) are plain `f64`.
pub trait DiffScalar: ComplexField<RealField = f64> + Copy + Send + Sync {
    /// Finite difference step that balances truncation and round-off error for this type.
    const DEFAULT_STEP: f64;
    /// Relative tolerance appropriate for derivatives computed with [`Self::DEFAULT_STEP`].
    const DEFAULT_RTOL: f64;
    /// Absolute tolerance appropriate for derivatives computed with [`Self::DEFAULT_STEP`].
    const DEFAULT_ATOL: f64;

    /// The increment added to an input in order to perturb it by a step of size `h`.
    fn perturbation(h: f64) -> Self;

    /// Recovers the derivative from function values at $x + $ `perturbation(h)` and
    /// $x - $ `perturbation(h)`.
    fn difference_quotient(f_plus: Self, f_minus: Self, h: f64) -> f64;
}

impl DiffScalar for f64 {
    const DEFAULT_STEP: f64 = 1e-6;
    const DEFAULT_RTOL: f64 = 1e-5;
    const DEFAULT_ATOL: f64 = 1e-6;

    fn perturbation(h: f64) -> Self {
        h
    }

    fn difference_quotient(f_plus: Self, f_minus: Self, h: f64) -> f64 {
        (f_plus - f_minus) / (2.0 * h)
    }
}

impl DiffScalar for Complex<f64> {
    const DEFAULT_STEP: f64 = 1e-30;
    const DEFAULT_RTOL: f64 = 1e-10;
    const DEFAULT_ATOL: f64 = 1e-12;

    fn perturbation(h: f64) -> Self {
        Complex::new(0.0, h)
    }

    fn difference_quotient(f_plus: Self, f_minus: Self, h: f64) -> f64 {
        // f(x - ih) is the conjugate of f(x + ih) for real-analytic f, so this is Im f(x + ih) / h
        (f_plus.im - f_minus.im) / (2.0 * h)
    }
}
