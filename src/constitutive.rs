//! The constitutive (material law) contract.
use crate::point::QuadraturePoint;
use weakform_traits::DiffScalar;

/// A material law mapping strains (or field gradients) to stresses (or fluxes).
///
/// Implementations are shared between many elements and evaluated concurrently. Apart from the
/// design variables, which are only modified through [`Constitutive::set_design_vars`], they hold
/// no mutable state.
///
/// Symmetric tangents are exchanged in packed form: the upper triangle of the matrix stored row by
/// row, so that a law with $N$ stresses has $N(N+1)/2$ tangent entries. See
/// [`packed_symmetric_mult`].
///
/// The default implementations describe a law without design variables.
pub trait Constitutive<T: DiffScalar>: Send + Sync {
    /// Number of stress (and strain) components.
    fn num_stresses(&self) -> usize;

    /// Global design variable numbers owned by this law. See [`crate::design::design_var_nums`].
    fn design_var_nums(&self, elem_index: usize, dv_nums: Option<&mut [usize]>) -> usize {
        let _ = (elem_index, dv_nums);
        0
    }

    fn set_design_vars(&self, elem_index: usize, dvs: &[T]) {
        let _ = (elem_index, dvs);
    }

    fn get_design_vars(&self, elem_index: usize, dvs: &mut [T]) {
        let _ = (elem_index, dvs);
    }

    fn design_var_range(&self, elem_index: usize, lower: &mut [T], upper: &mut [T]) {
        let _ = (elem_index, lower, upper);
    }

    /// Mass per unit volume.
    fn eval_density(&self, point: &QuadraturePoint<T>) -> T;

    /// Adds `scale` times the design derivative of the density to `dfdx`.
    fn add_density_dv_sens(&self, point: &QuadraturePoint<T>, scale: T, dfdx: &mut [T]) {
        let _ = (point, scale, dfdx);
    }

    fn eval_specific_heat(&self, point: &QuadraturePoint<T>) -> T;

    /// Adds `scale` times the design derivative of the specific heat to `dfdx`.
    fn add_specific_heat_dv_sens(&self, point: &QuadraturePoint<T>, scale: T, dfdx: &mut [T]) {
        let _ = (point, scale, dfdx);
    }

    fn eval_stress(&self, point: &QuadraturePoint<T>, strain: &[T], stress: &mut [T]);

    /// Packed tangent stiffness, such that `stress = packed_symmetric_mult(tangent, strain)`.
    fn eval_tangent_stiffness(&self, point: &QuadraturePoint<T>, tangent: &mut [T]);

    /// Adds `scale` times the design derivative of `psi · stress(strain)` to `dfdx`.
    fn add_stress_dv_sens(&self, point: &QuadraturePoint<T>, strain: &[T], scale: T, psi: &[T], dfdx: &mut [T]) {
        let _ = (point, strain, scale, psi, dfdx);
    }

    /// Strain caused by the temperature rise `theta`.
    fn eval_thermal_strain(&self, point: &QuadraturePoint<T>, theta: T, strain: &mut [T]);

    /// Heat flux for the given temperature gradient.
    fn eval_heat_flux(&self, point: &QuadraturePoint<T>, grad: &[T], flux: &mut [T]);

    /// Packed conductivity tensor, such that `flux = packed_symmetric_mult(tangent, grad)`.
    fn eval_tangent_heat_flux(&self, point: &QuadraturePoint<T>, tangent: &mut [T]);

    /// Adds `scale` times the design derivative of `psi · flux(grad)` to `dfdx`.
    fn add_heat_flux_dv_sens(&self, point: &QuadraturePoint<T>, grad: &[T], scale: T, psi: &[T], dfdx: &mut [T]) {
        let _ = (point, grad, scale, psi, dfdx);
    }

    /// Failure index; values above one indicate failure.
    fn eval_failure(&self, point: &QuadraturePoint<T>, strain: &[T]) -> T;

    /// Failure index and its derivative with respect to the strain.
    fn eval_failure_strain_sens(&self, point: &QuadraturePoint<T>, strain: &[T], dfde: &mut [T]) -> T;

    /// Adds `scale` times the design derivative of the failure index to `dfdx`.
    fn add_failure_dv_sens(&self, point: &QuadraturePoint<T>, strain: &[T], scale: T, dfdx: &mut [T]) {
        let _ = (point, strain, scale, dfdx);
    }
}

/// Number of entries in the packed upper triangle of an `n x n` symmetric matrix.
pub const fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Index of entry `(i, j)` of an `n x n` symmetric matrix in packed storage.
pub fn packed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i <= j { (i, j) } else { (j, i) };
    // Rows 0..i contribute n + (n - 1) + ... + (n - i + 1) entries
    i * n - i * (i.saturating_sub(1)) / 2 + (j - i)
}

/// Computes `y = C x` for the symmetric matrix `C` stored in packed form.
///
/// # Panics
/// Panics if `c` holds fewer than `packed_len(x.len())` entries or if `y` is shorter than `x`.
pub fn packed_symmetric_mult<T: DiffScalar>(c: &[T], x: &[T], y: &mut [T]) {
    let n = x.len();
    assert!(c.len() >= packed_len(n), "Packed matrix too short");
    assert!(y.len() >= n, "Output too short");
    for i in 0..n {
        let mut y_i = T::zero();
        for j in 0..n {
            y_i += c[packed_index(n, i, j)] * x[j];
        }
        y[i] = y_i;
    }
}
