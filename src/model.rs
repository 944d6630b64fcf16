//! The physics model contract.
use crate::jacobian::{jacobian_dim, JacobianLayout};
use crate::nalgebra::{DMatrixViewMut, Matrix3, Vector3};
use crate::output::{ElementType, OutputFlags};
use crate::point::{AdjointState, PointState, QuadraturePoint};
use serde::{Deserialize, Serialize};
use weakform_traits::DiffScalar;

/// Point-wise quantities of interest.
///
/// A model evaluates the quantities that make sense for its physics and reports length zero for
/// all others.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityType {
    FailureIndex,
    StrainEnergyDensity,
    Density,
    /// Density times position, the integrand of the first moment of mass.
    DensityMoment,
    Displacement,
    Temperature,
    HeatFlux,
    Concentration,
    ReactionRate,
}

/// Output buffers for the derivatives of a weighted quantity `dfdq · q`.
///
/// `dfdx` and `dfdxd` hold the derivative with respect to the physical position and its
/// derivative with respect to the parametric coordinates, `dfdut` and `dfdux` the derivatives
/// with respect to the state, laid out like [`PointState`].
pub struct QuantitySensMut<'a, T: DiffScalar> {
    pub dfdx: &'a mut Vector3<T>,
    pub dfdxd: &'a mut Matrix3<T>,
    pub dfdut: &'a mut [T],
    pub dfdux: &'a mut [T],
}

impl<'a, T: DiffScalar> QuantitySensMut<'a, T> {
    pub fn fill_zero(&mut self) {
        self.dfdx.fill(T::zero());
        self.dfdxd.fill(T::zero());
        self.dfdut.fill(T::zero());
        self.dfdux.fill(T::zero());
    }
}

/// A physical model independent of the finite element basis.
///
/// The model defines the governing equations through the coefficients of their weak form at a
/// single point,
/// $$
/// \int_\Omega \sum_k \Big( DU_t[3k] \\, \delta u_k + DU_t[3k+1] \\, \delta \dot u_k
///     + DU_t[3k+2] \\, \delta \ddot u_k + \sum_c DU_x[k d + c] \\, \delta u_{k,c} \Big)
///     \\, \mathrm{d}\Omega = 0,
/// $$
/// and provides exact derivatives of everything it evaluates. Every evaluation is a pure
/// function of its arguments and the current design variables, so that a single model can be
/// shared by all elements and evaluated from many threads at once. Output buffers are always
/// supplied by the caller.
///
/// Every derivative entry point must be the exact derivative of the corresponding value entry
/// point; [`crate::verification::ModelVerifier`] checks this.
pub trait ElementModel<T: DiffScalar>: Send + Sync {
    /// Spatial dimension: 1, 2 or 3.
    fn spatial_dim(&self) -> usize;

    fn vars_per_node(&self) -> usize;

    /// Dimension of the point Jacobian, `(3 + spatial_dim) * vars_per_node`.
    fn jacobian_dim(&self) -> usize {
        jacobian_dim(self.spatial_dim(), self.vars_per_node())
    }

    /// Global design variable numbers owned by the model for element `elem_index`.
    ///
    /// Returns the number of design variables. When `dv_nums` is `None` or too short, nothing is
    /// written.
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

    /// Evaluates the weak-form coefficients `dut` and `dux`, shaped like `state.ut` and `state.ux`.
    fn eval_weak_integrand(&self, point: &QuadraturePoint<T>, state: &PointState<T>, dut: &mut [T], dux: &mut [T]);

    /// The layout of the values written by [`ElementModel::eval_weak_jacobian`].
    fn weak_jacobian_layout(&self) -> JacobianLayout<'_> {
        JacobianLayout::Dense
    }

    /// Evaluates the weak-form coefficients, identical to
    /// [`ElementModel::eval_weak_integrand`], and their Jacobian with respect to the state.
    ///
    /// `jac` must hold at least `self.weak_jacobian_layout().num_values(self.jacobian_dim())`
    /// entries. The returned layout describes its contents.
    fn eval_weak_jacobian(
        &self,
        point: &QuadraturePoint<T>,
        state: &PointState<T>,
        dut: &mut [T],
        dux: &mut [T],
        jac: &mut [T],
    ) -> JacobianLayout<'_>;

    /// Evaluates the Jacobian into a dense matrix, independently of the layout of the model.
    ///
    /// `scratch` must be large enough to hold the values of [`ElementModel::weak_jacobian_layout`].
    fn eval_weak_jacobian_dense(
        &self,
        point: &QuadraturePoint<T>,
        state: &PointState<T>,
        dut: &mut [T],
        dux: &mut [T],
        scratch: &mut [T],
        jac: DMatrixViewMut<T>,
    ) {
        let layout = self.eval_weak_jacobian(point, state, dut, dux, scratch);
        layout.scatter_into(scratch, jac);
    }

    /// Adds `scale` times the design derivative of the adjoint-weighted residual
    /// ([`crate::point::adjoint_residual_product`]) to `fdv_sens`.
    ///
    /// `fdv_sens` is the element-local sensitivity array, ordered like
    /// [`ElementModel::design_var_nums`]. Contributions are accumulated, never overwritten.
    fn add_weak_adj_product(
        &self,
        point: &QuadraturePoint<T>,
        state: &PointState<T>,
        adjoint: &AdjointState<T>,
        scale: T,
        fdv_sens: &mut [T],
    ) {
        let _ = (point, state, adjoint, scale, fdv_sens);
    }

    /// Evaluates a point-wise quantity of interest into `quantity`.
    ///
    /// Returns the length of the quantity, or zero if the model does not support it. If
    /// `quantity` is too short, the length is returned and nothing is written.
    fn eval_point_quantity(
        &self,
        quantity_type: QuantityType,
        point: &QuadraturePoint<T>,
        xd: &Matrix3<T>,
        state: &PointState<T>,
        quantity: &mut [T],
    ) -> usize {
        let _ = (quantity_type, point, xd, state, quantity);
        0
    }

    /// Adds `scale` times the design derivative of `dfdq · q` to `dfdx`.
    fn add_point_quantity_dv_sens(
        &self,
        quantity_type: QuantityType,
        scale: T,
        point: &QuadraturePoint<T>,
        xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        dfdx: &mut [T],
    ) {
        let _ = (quantity_type, scale, point, xd, state, dfdq, dfdx);
    }

    /// Evaluates the derivatives of `dfdq · q` with respect to position and state.
    ///
    /// All outputs are overwritten; derivatives of unsupported quantities are zero.
    fn eval_point_quantity_sens(
        &self,
        quantity_type: QuantityType,
        point: &QuadraturePoint<T>,
        xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        sens: &mut QuantitySensMut<T>,
    ) {
        let _ = (quantity_type, point, xd, state, dfdq);
        sens.fill_zero();
    }

    /// Writes one row of visualization data and returns its length.
    ///
    /// Nothing is written, and zero returned, if `element_type` is not the type of this model. If
    /// `data` is shorter than the row, the row length is returned and nothing is written.
    fn output_data(
        &self,
        point: &QuadraturePoint<T>,
        element_type: ElementType,
        write_flag: OutputFlags,
        state: &PointState<T>,
        data: &mut [T],
    ) -> usize;
}
