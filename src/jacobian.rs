//! Storage layouts for the point-wise weak-form Jacobian.
//!
//! The Jacobian of the coefficients `(dut, dux)` with respect to the state `(ut, ux)` is a square
//! matrix of dimension $n = (3 + d) \cdot v$, for spatial dimension $d$ and $v$ variables per
//! node. Rows and columns are ordered first by variable, then by derivative: for the 2D
//! variables $(u, v)$,
//!
//! ```text
//! index:  0    1     2      3     4     5    6     7      8     9
//!         u   u,t  u,tt   u,x   u,y    v   v,t  v,tt   v,x   v,y
//! ```
//!
//! The Jacobian is usually structurally sparse. A model may therefore report a fixed list of
//! non-zero `(row, col)` pairs and write one value per pair, letting the caller decide whether to
//! scatter into dense or sparse storage.
use crate::nalgebra::{DMatrix, DMatrixViewMut};
use crate::nalgebra_sparse::CooMatrix;
use crate::point::NUM_TIME_DERIVATIVES;
use weakform_traits::DiffScalar;

/// Row or column of the Jacobian associated with `component` of variable `var`.
///
/// Components `0..3` are the value and its time derivatives, components `3..3 + spatial_dim` the
/// spatial derivatives.
pub fn jacobian_index(spatial_dim: usize, var: usize, component: usize) -> usize {
    (NUM_TIME_DERIVATIVES + spatial_dim) * var + component
}

/// Dimension of the point Jacobian.
pub fn jacobian_dim(spatial_dim: usize, vars_per_node: usize) -> usize {
    (NUM_TIME_DERIVATIVES + spatial_dim) * vars_per_node
}

/// Describes how Jacobian values are laid out in the buffer filled by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JacobianLayout<'a> {
    /// The buffer holds the full `n x n` matrix in row-major order.
    Dense,
    /// The buffer holds one value per `(row, col)` pair, in pair order. Entries not listed are
    /// structurally zero.
    Sparse(&'a [(usize, usize)]),
}

impl<'a> JacobianLayout<'a> {
    /// Number of values a model writes for a Jacobian of dimension `n`.
    pub fn num_values(&self, n: usize) -> usize {
        match self {
            JacobianLayout::Dense => n * n,
            JacobianLayout::Sparse(pairs) => pairs.len(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, JacobianLayout::Sparse(_))
    }

    /// Calls `f` with the `(row, col, value)` triplet of every stored value.
    pub fn for_each_entry<T: Copy>(&self, n: usize, values: &[T], mut f: impl FnMut(usize, usize, T)) {
        match self {
            JacobianLayout::Dense => {
                for (idx, value) in values.iter().take(n * n).enumerate() {
                    f(idx / n, idx % n, *value);
                }
            }
            JacobianLayout::Sparse(pairs) => {
                for (&(row, col), value) in pairs.iter().zip(values) {
                    f(row, col, *value);
                }
            }
        }
    }

    /// Overwrites `output` with the dense matrix represented by `values`.
    pub fn scatter_into<T: DiffScalar>(&self, values: &[T], mut output: DMatrixViewMut<T>) {
        let n = output.nrows();
        assert_eq!(n, output.ncols(), "Jacobian must be square");
        output.fill(T::zero());
        self.for_each_entry(n, values, |row, col, value| output[(row, col)] += value);
    }

    pub fn to_dense<T: DiffScalar>(&self, n: usize, values: &[T]) -> DMatrix<T> {
        let mut dense = DMatrix::zeros(n, n);
        self.scatter_into(values, DMatrixViewMut::from(&mut dense));
        dense
    }

    /// Sparse COO representation. Structural zeros of a dense layout are stored explicitly.
    pub fn to_coo<T: DiffScalar>(&self, n: usize, values: &[T]) -> CooMatrix<T> {
        let mut coo = CooMatrix::new(n, n);
        self.for_each_entry(n, values, |row, col, value| coo.push(row, col, value));
        coo
    }
}
