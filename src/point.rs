//! Data describing a single quadrature point and the state evaluated there.
use crate::nalgebra::Point3;
use itertools::izip;
use weakform_traits::DiffScalar;

/// Number of temporal coefficients stored per variable: value, first and second time derivative.
pub const NUM_TIME_DERIVATIVES: usize = 3;

/// Location and identity of a quadrature point.
///
/// The parametric coordinates and index are passed through to the models untouched; they only
/// matter to models whose properties vary over the element.
#[derive(Debug, Clone, Copy)]
pub struct QuadraturePoint<'a, T: DiffScalar> {
    pub elem_index: usize,
    pub time: f64,
    /// Index of the quadrature point within the element.
    pub index: usize,
    pub parametric: &'a [f64],
    pub position: &'a Point3<T>,
}

impl<'a, T: DiffScalar> QuadraturePoint<'a, T> {
    pub fn new(position: &'a Point3<T>) -> Self {
        Self {
            elem_index: 0,
            time: 0.0,
            index: 0,
            parametric: &[],
            position,
        }
    }

    pub fn with_elem_index(self, elem_index: usize) -> Self {
        Self { elem_index, ..self }
    }

    pub fn with_time(self, time: f64) -> Self {
        Self { time, ..self }
    }

    pub fn with_index(self, index: usize, parametric: &'a [f64]) -> Self {
        Self {
            index,
            parametric,
            ..self
        }
    }

    /// The same point at a different physical position.
    pub fn at_position(self, position: &'a Point3<T>) -> Self {
        Self { position, ..self }
    }
}

/// The state at a quadrature point.
///
/// `ut` is a `vars_per_node x 3` row-major matrix holding, for each variable, its value and
/// its first and second time derivatives. `ux` is a `vars_per_node x spatial_dim` row-major
/// matrix of spatial derivatives. The weak form is assumed to be separable: coefficients of
/// time derivatives never depend on spatial derivatives, and vice versa for time derivatives of
/// order one and two.
#[derive(Debug, Clone, Copy)]
pub struct PointState<'a, T> {
    pub ut: &'a [T],
    pub ux: &'a [T],
}

impl<'a, T: DiffScalar> PointState<'a, T> {
    pub fn new(ut: &'a [T], ux: &'a [T]) -> Self {
        Self { ut, ux }
    }

    /// Value of variable `var`.
    pub fn value(&self, var: usize) -> T {
        self.ut[NUM_TIME_DERIVATIVES * var]
    }

    pub fn first_time_derivative(&self, var: usize) -> T {
        self.ut[NUM_TIME_DERIVATIVES * var + 1]
    }

    pub fn second_time_derivative(&self, var: usize) -> T {
        self.ut[NUM_TIME_DERIVATIVES * var + 2]
    }

    /// Spatial gradient of variable `var`.
    pub fn gradient(&self, var: usize, spatial_dim: usize) -> &'a [T] {
        &self.ux[spatial_dim * var..spatial_dim * (var + 1)]
    }
}

/// Adjoint variables at a quadrature point.
///
/// `psi` holds one value per variable and `psix` its `vars_per_node x spatial_dim` spatial
/// derivatives, laid out like [`PointState::ux`].
#[derive(Debug, Clone, Copy)]
pub struct AdjointState<'a, T> {
    pub psi: &'a [T],
    pub psix: &'a [T],
}

impl<'a, T: DiffScalar> AdjointState<'a, T> {
    pub fn new(psi: &'a [T], psix: &'a [T]) -> Self {
        Self { psi, psix }
    }
}

/// Contracts the weak-form coefficients at a point with an adjoint field.
///
/// All three temporal coefficients of a variable multiply the variation of that variable, so
/// $$
/// \psi \cdot R = \sum_k \psi_k (DU_t[3k] + DU_t[3k+1] + DU_t[3k+2])
///     + \sum_{k,c} \psi_{k,c} \\, DU_x[k d + c].
/// $$
/// This is the point-wise quantity whose design derivative
/// [`ElementModel::add_weak_adj_product`](crate::model::ElementModel::add_weak_adj_product)
/// accumulates.
pub fn adjoint_residual_product<T: DiffScalar>(dut: &[T], dux: &[T], adjoint: &AdjointState<T>) -> T {
    let mut product = T::zero();
    for (psi_k, dut_k) in adjoint.psi.iter().zip(dut.chunks_exact(NUM_TIME_DERIVATIVES)) {
        product += *psi_k * (dut_k[0] + dut_k[1] + dut_k[2]);
    }
    for (psix, dux) in izip!(adjoint.psix, dux) {
        product += *psix * *dux;
    }
    product
}
