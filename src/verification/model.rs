use super::{added_sensitivity, compare_values, real_parts, synthetic_values, VerificationConfig, VerificationReport};
use crate::jacobian::JacobianLayout;
use crate::model::{ElementModel, QuantitySensMut, QuantityType};
use crate::nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Matrix3, Point3, Vector3};
use crate::optimize::calculus::{
    approximate_directional_derivative_fd, approximate_gradient_fd, approximate_jacobian_column_fd,
    approximate_jacobian_fd,
};
use crate::point::{adjoint_residual_product, AdjointState, PointState, QuadraturePoint, NUM_TIME_DERIVATIVES};
use itertools::Itertools;
use log::{debug, warn};
use weakform_traits::DiffScalar;

/// Verifies the derivatives of an [`ElementModel`] at a single point.
///
/// The verifier owns the point data, state and adjoint it evaluates the model at. Unless set
/// explicitly, these are deterministic synthetic values. Design variable tests temporarily
/// perturb the design variables of the model and restore them before returning, so the model
/// must not be evaluated elsewhere while a verifier runs.
pub struct ModelVerifier<'a, T: DiffScalar, M: ?Sized> {
    model: &'a M,
    config: VerificationConfig,
    elem_index: usize,
    time: f64,
    position: Point3<T>,
    xd: Matrix3<T>,
    ut: Vec<T>,
    ux: Vec<T>,
    psi: Vec<T>,
    psix: Vec<T>,
}

impl<'a, T, M> ModelVerifier<'a, T, M>
where
    T: DiffScalar,
    M: ElementModel<T> + ?Sized,
{
    pub fn new(model: &'a M) -> Self {
        let d = model.spatial_dim();
        let vars = model.vars_per_node();
        let x = synthetic_values::<T>(3, 0);
        let xd = Matrix3::identity() + Matrix3::from_column_slice(&synthetic_values::<T>(9, 1)) * T::from_real(0.2);
        Self {
            model,
            config: VerificationConfig::for_scalar::<T>(),
            elem_index: 0,
            time: 0.0,
            position: Point3::new(x[0], x[1], x[2]),
            xd,
            ut: synthetic_values(NUM_TIME_DERIVATIVES * vars, 2),
            ux: synthetic_values(d * vars, 3),
            psi: synthetic_values(vars, 4),
            psix: synthetic_values(d * vars, 5),
        }
    }

    pub fn with_config(self, config: VerificationConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_elem_index(self, elem_index: usize) -> Self {
        Self { elem_index, ..self }
    }

    pub fn with_time(self, time: f64) -> Self {
        Self { time, ..self }
    }

    pub fn with_position(self, position: Point3<T>) -> Self {
        Self { position, ..self }
    }

    /// Sets the derivative of the physical position with respect to the parametric coordinates.
    pub fn with_xd(self, xd: Matrix3<T>) -> Self {
        Self { xd, ..self }
    }

    /// # Panics
    /// Panics if the slices are not shaped as described by [`PointState`].
    pub fn with_state(self, ut: &[T], ux: &[T]) -> Self {
        assert_eq!(ut.len(), self.ut.len(), "ut has wrong length");
        assert_eq!(ux.len(), self.ux.len(), "ux has wrong length");
        Self {
            ut: ut.to_vec(),
            ux: ux.to_vec(),
            ..self
        }
    }

    /// # Panics
    /// Panics if the slices are not shaped as described by [`AdjointState`].
    pub fn with_adjoint(self, psi: &[T], psix: &[T]) -> Self {
        assert_eq!(psi.len(), self.psi.len(), "psi has wrong length");
        assert_eq!(psix.len(), self.psix.len(), "psix has wrong length");
        Self {
            psi: psi.to_vec(),
            psix: psix.to_vec(),
            ..self
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    fn point(&self) -> QuadraturePoint<'_, T> {
        QuadraturePoint::new(&self.position)
            .with_elem_index(self.elem_index)
            .with_time(self.time)
    }

    fn state(&self) -> PointState<'_, T> {
        PointState::new(&self.ut, &self.ux)
    }

    /// Arranges `ut`-shaped and `ux`-shaped data in Jacobian row/column order.
    fn to_jacobian_order(&self, ut: &[T], ux: &[T]) -> DVector<T> {
        let d = self.model.spatial_dim();
        let block = NUM_TIME_DERIVATIVES + d;
        DVector::from_fn(self.model.jacobian_dim(), |i, _| {
            let (var, c) = (i / block, i % block);
            if c < NUM_TIME_DERIVATIVES {
                ut[NUM_TIME_DERIVATIVES * var + c]
            } else {
                ux[d * var + c - NUM_TIME_DERIVATIVES]
            }
        })
    }

    fn from_jacobian_order(&self, x: DVectorView<T>) -> (Vec<T>, Vec<T>) {
        let d = self.model.spatial_dim();
        let block = NUM_TIME_DERIVATIVES + d;
        let mut ut = vec![T::zero(); self.ut.len()];
        let mut ux = vec![T::zero(); self.ux.len()];
        for (i, x_i) in x.iter().enumerate() {
            let (var, c) = (i / block, i % block);
            if c < NUM_TIME_DERIVATIVES {
                ut[NUM_TIME_DERIVATIVES * var + c] = *x_i;
            } else {
                ux[d * var + c - NUM_TIME_DERIVATIVES] = *x_i;
            }
        }
        (ut, ux)
    }

    /// Weak-form coefficients for a state given in Jacobian order, also in Jacobian order.
    fn eval_ordered_coefficients(&self, x: DVectorView<T>, mut coefficients: DVectorViewMut<T>) {
        let (ut, ux) = self.from_jacobian_order(x);
        let mut dut = vec![T::zero(); ut.len()];
        let mut dux = vec![T::zero(); ux.len()];
        self.model.eval_weak_integrand(&self.point(), &PointState::new(&ut, &ux), &mut dut, &mut dux);
        coefficients.copy_from(&self.to_jacobian_order(&dut, &dux));
    }

    fn quantity_len(&self, quantity_type: QuantityType) -> usize {
        self.model.eval_point_quantity(quantity_type, &self.point(), &self.xd, &self.state(), &mut [])
    }

    /// The scalar `dfdq · q` for the given position and state.
    fn weighted_quantity(
        &self,
        quantity_type: QuantityType,
        position: &Point3<T>,
        xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
    ) -> T {
        let mut quantity = vec![T::zero(); dfdq.len()];
        let point = self.point().at_position(position);
        self.model.eval_point_quantity(quantity_type, &point, xd, state, &mut quantity);
        quantity
            .iter()
            .zip(dfdq)
            .fold(T::zero(), |sum, (q, w)| sum + *q * *w)
    }

    /// Derivative of `g` along `direction` in design space. The design variables of the model are
    /// restored afterwards.
    fn design_directional_derivative(&self, direction: &[f64], mut g: impl FnMut() -> T) -> f64 {
        let mut dvs = DVector::zeros(direction.len());
        self.model.get_design_vars(self.elem_index, dvs.as_mut_slice());
        let original = dvs.clone();
        let direction = DVector::from_column_slice(direction);

        let derivative = approximate_directional_derivative_fd(
            |dv| {
                let dv: Vec<T> = dv.iter().copied().collect();
                self.model.set_design_vars(self.elem_index, &dv);
                g()
            },
            &mut dvs,
            DVectorView::from(&direction),
            self.config.step,
        );

        self.model.set_design_vars(self.elem_index, original.as_slice());
        derivative
    }

    fn check_design_direction(&self, test: &'static str, direction: &[f64]) -> Option<VerificationReport> {
        let num_dvs = self.model.design_var_nums(self.elem_index, None);
        if direction.len() != num_dvs {
            if self.config.print_level >= 1 {
                warn!(
                    "{test}: design direction has {} entries, but the model owns {} design variables",
                    direction.len(),
                    num_dvs
                );
            }
            Some(VerificationReport::failure(test))
        } else {
            None
        }
    }

    /// Checks that the coefficients computed along with the Jacobian are identical to those of
    /// the value path, and that a sparse layout lists every entry once and within bounds.
    pub fn test_residual(&self) -> VerificationReport {
        const TEST: &str = "residual";
        let model = self.model;
        let n = model.jacobian_dim();
        let (point, state) = (self.point(), self.state());

        let mut dut = vec![T::zero(); self.ut.len()];
        let mut dux = vec![T::zero(); self.ux.len()];
        model.eval_weak_integrand(&point, &state, &mut dut, &mut dux);

        let expected_layout = model.weak_jacobian_layout();
        let mut dut_jac = vec![T::zero(); dut.len()];
        let mut dux_jac = vec![T::zero(); dux.len()];
        let mut jac = vec![T::zero(); expected_layout.num_values(n)];
        let layout = model.eval_weak_jacobian(&point, &state, &mut dut_jac, &mut dux_jac, &mut jac);

        if layout != expected_layout {
            if self.config.print_level >= 1 {
                warn!("{TEST}: layout returned with the Jacobian differs from the declared layout");
            }
            return VerificationReport::failure(TEST);
        }

        if let JacobianLayout::Sparse(pairs) = layout {
            let out_of_bounds = pairs.iter().find(|(row, col)| *row >= n || *col >= n);
            let duplicate = pairs.iter().duplicates().next();
            if let Some(pair) = out_of_bounds.or(duplicate) {
                if self.config.print_level >= 1 {
                    warn!("{TEST}: invalid Jacobian pair {pair:?} for dimension {n}");
                }
                return VerificationReport::failure(TEST);
            }
        }

        // Both paths run the same arithmetic, so the comparison is exact
        let exact = self.config.with_tolerances(0.0, 0.0);
        let parts = |values: Vec<T>| -> Vec<f64> {
            values
                .iter()
                .flat_map(|v| [v.real(), v.imaginary()])
                .collect()
        };
        let value_path = parts([dut, dux].concat());
        let jacobian_path = parts([dut_jac, dux_jac].concat());
        compare_values(TEST, &value_path, &jacobian_path, &exact)
    }

    /// Compares one column (or, if `column` is `None`, all columns) of the analytic Jacobian with
    /// a numerical approximation.
    ///
    /// For a full Jacobian, the reported worst index is the column-major index `row + n * col`.
    pub fn test_jacobian(&self, column: Option<usize>) -> VerificationReport {
        const TEST: &str = "jacobian";
        let model = self.model;
        let n = model.jacobian_dim();
        if let Some(col) = column.filter(|col| *col >= n) {
            if self.config.print_level >= 1 {
                warn!("{TEST}: column {col} out of bounds for Jacobian dimension {n}");
            }
            return VerificationReport::failure(TEST);
        }

        let mut dut = vec![T::zero(); self.ut.len()];
        let mut dux = vec![T::zero(); self.ux.len()];
        let mut scratch = vec![T::zero(); model.weak_jacobian_layout().num_values(n)];
        let mut analytic = DMatrix::zeros(n, n);
        model.eval_weak_jacobian_dense(
            &self.point(),
            &self.state(),
            &mut dut,
            &mut dux,
            &mut scratch,
            DMatrixViewMut::from(&mut analytic),
        );

        let mut x = self.to_jacobian_order(&self.ut, &self.ux);
        let h = self.config.step;
        let (analytic, approximate) = match column {
            Some(col) => {
                debug!("{TEST}: checking column {col}");
                let approximate = approximate_jacobian_column_fd(
                    n,
                    |x, coefficients| self.eval_ordered_coefficients(x, coefficients),
                    &mut x,
                    col,
                    h,
                );
                (analytic.column(col).iter().map(|v| v.real()).collect(), approximate.as_slice().to_vec())
            }
            None => {
                let approximate = approximate_jacobian_fd(
                    n,
                    |x, coefficients| self.eval_ordered_coefficients(x, coefficients),
                    &mut x,
                    h,
                );
                (real_parts(analytic.as_slice()), approximate.as_slice().to_vec())
            }
        };
        compare_values(TEST, &analytic, &approximate, &self.config)
    }

    /// Compares the design derivative of the adjoint-weighted residual along `direction` with a
    /// numerical approximation.
    ///
    /// `direction` must have one entry per design variable of the model.
    pub fn test_adj_res_product(&self, direction: &[f64]) -> VerificationReport {
        const TEST: &str = "adjoint residual product";
        if let Some(report) = self.check_design_direction(TEST, direction) {
            return report;
        }
        let model = self.model;
        let (point, state) = (self.point(), self.state());
        let adjoint = AdjointState::new(&self.psi, &self.psix);

        let fdv_sens = added_sensitivity(direction.len(), |fdv_sens| {
            model.add_weak_adj_product(&point, &state, &adjoint, T::one(), fdv_sens)
        });
        let analytic: f64 = real_parts(&fdv_sens)
            .iter()
            .zip(direction)
            .map(|(s, d)| s * d)
            .sum();

        let approximate = self.design_directional_derivative(direction, || {
            let mut dut = vec![T::zero(); self.ut.len()];
            let mut dux = vec![T::zero(); self.ux.len()];
            model.eval_weak_integrand(&point, &state, &mut dut, &mut dux);
            adjoint_residual_product(&dut, &dux, &adjoint)
        });
        compare_values(TEST, &[analytic], &[approximate], &self.config)
    }

    /// Compares the derivative of a quantity with respect to the state with a numerical
    /// approximation. The result is reported in Jacobian order.
    ///
    /// Quantities the model does not support pass trivially.
    pub fn test_strain_sv_sens(&self, quantity_type: QuantityType) -> VerificationReport {
        const TEST: &str = "quantity state sensitivity";
        let len = self.quantity_len(quantity_type);
        if len == 0 {
            debug!("{TEST}: {quantity_type:?} is not supported by the model");
            return VerificationReport::empty(TEST);
        }
        let dfdq = synthetic_values::<T>(len, 6);

        let mut dfdx = Vector3::zeros();
        let mut dfdxd = Matrix3::zeros();
        let mut dfdut = vec![T::zero(); self.ut.len()];
        let mut dfdux = vec![T::zero(); self.ux.len()];
        self.model.eval_point_quantity_sens(
            quantity_type,
            &self.point(),
            &self.xd,
            &self.state(),
            &dfdq,
            &mut QuantitySensMut {
                dfdx: &mut dfdx,
                dfdxd: &mut dfdxd,
                dfdut: &mut dfdut,
                dfdux: &mut dfdux,
            },
        );
        let analytic = real_parts(self.to_jacobian_order(&dfdut, &dfdux).as_slice());

        let mut x = self.to_jacobian_order(&self.ut, &self.ux);
        let approximate = approximate_gradient_fd(
            |x| {
                let (ut, ux) = self.from_jacobian_order(x);
                let state = PointState::new(&ut, &ux);
                self.weighted_quantity(quantity_type, &self.position, &self.xd, &state, &dfdq)
            },
            &mut x,
            self.config.step,
        );
        compare_values(TEST, &analytic, approximate.as_slice(), &self.config)
    }

    /// Compares the derivative of a quantity with respect to the physical position `X` and its
    /// parametric derivative `Xd` with a numerical approximation.
    ///
    /// Entries are ordered as `X` followed by `Xd` in column-major order.
    pub fn test_jacobian_xpt_sens(&self, quantity_type: QuantityType) -> VerificationReport {
        const TEST: &str = "quantity position sensitivity";
        let len = self.quantity_len(quantity_type);
        if len == 0 {
            debug!("{TEST}: {quantity_type:?} is not supported by the model");
            return VerificationReport::empty(TEST);
        }
        let dfdq = synthetic_values::<T>(len, 7);
        let state = self.state();

        let mut dfdx = Vector3::zeros();
        let mut dfdxd = Matrix3::zeros();
        let mut dfdut = vec![T::zero(); self.ut.len()];
        let mut dfdux = vec![T::zero(); self.ux.len()];
        self.model.eval_point_quantity_sens(
            quantity_type,
            &self.point(),
            &self.xd,
            &state,
            &dfdq,
            &mut QuantitySensMut {
                dfdx: &mut dfdx,
                dfdxd: &mut dfdxd,
                dfdut: &mut dfdut,
                dfdux: &mut dfdux,
            },
        );
        let analytic = real_parts(&[dfdx.as_slice(), dfdxd.as_slice()].concat());

        let mut y: DVector<T> = DVector::from_iterator(12, self.position.coords.iter().chain(self.xd.iter()).copied());
        let approximate = approximate_gradient_fd(
            |y| {
                let position = Point3::new(y[0], y[1], y[2]);
                let xd = Matrix3::from_iterator(y.iter().skip(3).copied());
                self.weighted_quantity(quantity_type, &position, &xd, &state, &dfdq)
            },
            &mut y,
            self.config.step,
        );
        compare_values(TEST, &analytic, approximate.as_slice(), &self.config)
    }

    /// Compares the design derivative of a quantity along `direction` with a numerical
    /// approximation.
    pub fn test_point_quantity_dv_sens(&self, quantity_type: QuantityType, direction: &[f64]) -> VerificationReport {
        const TEST: &str = "quantity design sensitivity";
        if let Some(report) = self.check_design_direction(TEST, direction) {
            return report;
        }
        let len = self.quantity_len(quantity_type);
        if len == 0 {
            debug!("{TEST}: {quantity_type:?} is not supported by the model");
            return VerificationReport::empty(TEST);
        }
        let dfdq = synthetic_values::<T>(len, 8);
        let (point, state) = (self.point(), self.state());

        let dfdx = added_sensitivity(direction.len(), |dfdx| {
            self.model.add_point_quantity_dv_sens(quantity_type, T::one(), &point, &self.xd, &state, &dfdq, dfdx)
        });
        let analytic: f64 = real_parts(&dfdx)
            .iter()
            .zip(direction)
            .map(|(s, d)| s * d)
            .sum();

        let approximate = self.design_directional_derivative(direction, || {
            self.weighted_quantity(quantity_type, &self.position, &self.xd, &state, &dfdq)
        });
        compare_values(TEST, &[analytic], &[approximate], &self.config)
    }

    /// Runs every test of the verifier, using a synthetic design direction and the given
    /// quantities.
    pub fn test_all(&self, quantities: &[QuantityType]) -> VerificationReport {
        let num_dvs = self.model.design_var_nums(self.elem_index, None);
        let direction = synthetic_values::<f64>(num_dvs, 9);

        let mut report = self
            .test_residual()
            .merge(self.test_jacobian(None))
            .merge(self.test_adj_res_product(&direction));
        for &quantity_type in quantities {
            report = report
                .merge(self.test_strain_sv_sens(quantity_type))
                .merge(self.test_jacobian_xpt_sens(quantity_type))
                .merge(self.test_point_quantity_dv_sens(quantity_type, &direction));
        }
        report
    }
}
