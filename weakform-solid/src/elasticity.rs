use crate::NUM_STRESSES;
use numeric_literals::replace_float_literals;
use std::marker::PhantomData;
use std::sync::Arc;
use weakform::constitutive::{packed_index, packed_len, Constitutive};
use weakform::jacobian::{jacobian_index, JacobianLayout};
use weakform::model::{ElementModel, QuantitySensMut, QuantityType};
use weakform::nalgebra::Matrix3;
use weakform::output::{ElementType, OutputFlags, OutputLayout, OutputRow};
use weakform::point::{AdjointState, PointState, QuadraturePoint};
use weakform::DiffScalar;

const DIM: usize = 3;
const NUM_GRADIENTS: usize = DIM * DIM;

/// Voigt index of the strain component each displacement gradient entry contributes to.
///
/// The gradient is stored row-major, entry `3 k + c` being the derivative of displacement
/// component `k` with respect to coordinate `c`.
const VOIGT_INDEX: [usize; NUM_GRADIENTS] = [0, 5, 4, 5, 1, 3, 4, 3, 2];

const OUTPUT_LAYOUT: OutputLayout = OutputLayout {
    nodes: 3,
    displacements: 3,
    strains: NUM_STRESSES,
    stresses: NUM_STRESSES,
    extras: 2,
};

/// Infinitesimal strain in Voigt order with engineering shear strains.
pub fn strain_from_gradient<T: DiffScalar>(ux: &[T]) -> [T; NUM_STRESSES] {
    let mut strain = [T::zero(); NUM_STRESSES];
    for (du, voigt) in ux[..NUM_GRADIENTS].iter().zip(VOIGT_INDEX) {
        strain[voigt] += *du;
    }
    strain
}

/// Applies the transpose of the strain-displacement map: the coefficient of gradient entry `i`
/// in `v · strain`.
fn gradient_from_voigt<T: DiffScalar>(v: &[T], out: &mut [T]) {
    for (out_i, voigt) in out[..NUM_GRADIENTS].iter_mut().zip(VOIGT_INDEX) {
        *out_i = v[voigt];
    }
}

/// Linear elasticity for small displacements in three dimensions.
///
/// The variables are the displacements $(u, v, w)$. With density $\rho$ and stress
/// $\vec \sigma(\vec \epsilon)$ from the constitutive law, the weak form is
/// $$
/// \int_\Omega \rho \\, \ddot{\vec u} \cdot \delta \vec u
///     + \vec \sigma(\vec \epsilon(\vec u)) : \vec \epsilon(\delta \vec u) \\, \mathrm{d}\Omega = 0.
/// $$
/// Design variables are those of the constitutive law.
#[derive(Debug)]
pub struct LinearElasticity3D<T, C> {
    con: Arc<C>,
    jacobian_pairs: Vec<(usize, usize)>,
    marker: PhantomData<T>,
}

impl<T, C> LinearElasticity3D<T, C>
where
    T: DiffScalar,
    C: Constitutive<T>,
{
    pub fn new(con: Arc<C>) -> Self {
        let mut jacobian_pairs: Vec<_> = (0..DIM)
            .map(|k| {
                let index = jacobian_index(DIM, k, 2);
                (index, index)
            })
            .collect();
        let gradient_index = |i: usize| jacobian_index(DIM, i / DIM, 3 + i % DIM);
        for i in 0..NUM_GRADIENTS {
            for j in 0..NUM_GRADIENTS {
                jacobian_pairs.push((gradient_index(i), gradient_index(j)));
            }
        }
        Self {
            con,
            jacobian_pairs,
            marker: PhantomData,
        }
    }

    pub fn constitutive(&self) -> &Arc<C> {
        &self.con
    }

    fn stress(&self, point: &QuadraturePoint<T>, strain: &[T]) -> [T; NUM_STRESSES] {
        let mut stress = [T::zero(); NUM_STRESSES];
        self.con.eval_stress(point, strain, &mut stress);
        stress
    }

    fn eval_coefficients(&self, point: &QuadraturePoint<T>, state: &PointState<T>, dut: &mut [T], dux: &mut [T]) {
        let rho = self.con.eval_density(point);
        for k in 0..DIM {
            dut[3 * k] = T::zero();
            dut[3 * k + 1] = T::zero();
            dut[3 * k + 2] = rho * state.second_time_derivative(k);
        }

        let strain = strain_from_gradient(state.ux);
        gradient_from_voigt(&self.stress(point, &strain), dux);
    }

    fn quantity_len(quantity_type: QuantityType) -> usize {
        match quantity_type {
            QuantityType::FailureIndex | QuantityType::StrainEnergyDensity | QuantityType::Density => 1,
            QuantityType::DensityMoment | QuantityType::Displacement => DIM,
            _ => 0,
        }
    }
}

#[replace_float_literals(T::from_real(literal))]
impl<T, C> ElementModel<T> for LinearElasticity3D<T, C>
where
    T: DiffScalar,
    C: Constitutive<T>,
{
    fn spatial_dim(&self) -> usize {
        DIM
    }

    fn vars_per_node(&self) -> usize {
        DIM
    }

    fn design_var_nums(&self, elem_index: usize, dv_nums: Option<&mut [usize]>) -> usize {
        self.con.design_var_nums(elem_index, dv_nums)
    }

    fn set_design_vars(&self, elem_index: usize, dvs: &[T]) {
        self.con.set_design_vars(elem_index, dvs)
    }

    fn get_design_vars(&self, elem_index: usize, dvs: &mut [T]) {
        self.con.get_design_vars(elem_index, dvs)
    }

    fn design_var_range(&self, elem_index: usize, lower: &mut [T], upper: &mut [T]) {
        self.con.design_var_range(elem_index, lower, upper)
    }

    fn eval_weak_integrand(&self, point: &QuadraturePoint<T>, state: &PointState<T>, dut: &mut [T], dux: &mut [T]) {
        self.eval_coefficients(point, state, dut, dux);
    }

    fn weak_jacobian_layout(&self) -> JacobianLayout<'_> {
        JacobianLayout::Sparse(&self.jacobian_pairs)
    }

    fn eval_weak_jacobian(
        &self,
        point: &QuadraturePoint<T>,
        state: &PointState<T>,
        dut: &mut [T],
        dux: &mut [T],
        jac: &mut [T],
    ) -> JacobianLayout<'_> {
        assert!(jac.len() >= self.jacobian_pairs.len(), "Jacobian buffer too short");
        self.eval_coefficients(point, state, dut, dux);

        let rho = self.con.eval_density(point);
        jac[..DIM].fill(rho);

        let mut c = [0.0; packed_len(NUM_STRESSES)];
        self.con.eval_tangent_stiffness(point, &mut c);
        for i in 0..NUM_GRADIENTS {
            for j in 0..NUM_GRADIENTS {
                jac[DIM + NUM_GRADIENTS * i + j] = c[packed_index(NUM_STRESSES, VOIGT_INDEX[i], VOIGT_INDEX[j])];
            }
        }
        self.weak_jacobian_layout()
    }

    fn add_weak_adj_product(
        &self,
        point: &QuadraturePoint<T>,
        state: &PointState<T>,
        adjoint: &AdjointState<T>,
        scale: T,
        fdv_sens: &mut [T],
    ) {
        let psi_accel = (0..DIM).fold(0.0, |sum, k| sum + adjoint.psi[k] * state.second_time_derivative(k));
        self.con.add_density_dv_sens(point, scale * psi_accel, fdv_sens);

        // psix . B^T sigma = (B psix) . sigma
        let psi_strain = strain_from_gradient(adjoint.psix);
        let strain = strain_from_gradient(state.ux);
        self.con.add_stress_dv_sens(point, &strain, scale, &psi_strain, fdv_sens);
    }

    fn eval_point_quantity(
        &self,
        quantity_type: QuantityType,
        point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        quantity: &mut [T],
    ) -> usize {
        let len = Self::quantity_len(quantity_type);
        if len == 0 || quantity.len() < len {
            return len;
        }

        let strain = strain_from_gradient(state.ux);
        match quantity_type {
            QuantityType::FailureIndex => quantity[0] = self.con.eval_failure(point, &strain),
            QuantityType::StrainEnergyDensity => {
                let stress = self.stress(point, &strain);
                quantity[0] = 0.5 * strain.iter().zip(&stress).fold(0.0, |sum, (e, s)| sum + *e * *s);
            }
            QuantityType::Density => quantity[0] = self.con.eval_density(point),
            QuantityType::DensityMoment => {
                let rho = self.con.eval_density(point);
                for (q, x) in quantity.iter_mut().zip(point.position.coords.iter()) {
                    *q = rho * *x;
                }
            }
            QuantityType::Displacement => {
                for (k, q) in quantity[..DIM].iter_mut().enumerate() {
                    *q = state.value(k);
                }
            }
            _ => {}
        }
        len
    }

    fn add_point_quantity_dv_sens(
        &self,
        quantity_type: QuantityType,
        scale: T,
        point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        dfdx: &mut [T],
    ) {
        let strain = strain_from_gradient(state.ux);
        match quantity_type {
            QuantityType::FailureIndex => {
                self.con.add_failure_dv_sens(point, &strain, scale * dfdq[0], dfdx)
            }
            QuantityType::StrainEnergyDensity => {
                self.con.add_stress_dv_sens(point, &strain, 0.5 * scale * dfdq[0], &strain, dfdx)
            }
            QuantityType::Density => self.con.add_density_dv_sens(point, scale * dfdq[0], dfdx),
            QuantityType::DensityMoment => {
                let weight = dfdq
                    .iter()
                    .zip(point.position.coords.iter())
                    .fold(0.0, |sum, (w, x)| sum + *w * *x);
                self.con.add_density_dv_sens(point, scale * weight, dfdx)
            }
            _ => {}
        }
    }

    fn eval_point_quantity_sens(
        &self,
        quantity_type: QuantityType,
        point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        sens: &mut QuantitySensMut<T>,
    ) {
        sens.fill_zero();
        let strain = strain_from_gradient(state.ux);
        match quantity_type {
            QuantityType::FailureIndex => {
                let mut dfde = [0.0; NUM_STRESSES];
                self.con.eval_failure_strain_sens(point, &strain, &mut dfde);
                let dfde = dfde.map(|d| dfdq[0] * d);
                gradient_from_voigt(&dfde, sens.dfdux);
            }
            QuantityType::StrainEnergyDensity => {
                // d(e . C e / 2)/de = C e
                let stress = self.stress(point, &strain).map(|s| dfdq[0] * s);
                gradient_from_voigt(&stress, sens.dfdux);
            }
            QuantityType::DensityMoment => {
                let rho = self.con.eval_density(point);
                for (dfdx, w) in sens.dfdx.iter_mut().zip(dfdq) {
                    *dfdx = rho * *w;
                }
            }
            QuantityType::Displacement => {
                for k in 0..DIM {
                    sens.dfdut[3 * k] = dfdq[k];
                }
            }
            _ => {}
        }
    }

    fn output_data(
        &self,
        point: &QuadraturePoint<T>,
        element_type: ElementType,
        write_flag: OutputFlags,
        state: &PointState<T>,
        data: &mut [T],
    ) -> usize {
        if element_type != ElementType::Solid {
            return 0;
        }
        let len = OUTPUT_LAYOUT.row_len(write_flag);
        if data.len() < len {
            return len;
        }

        let strain = strain_from_gradient(state.ux);
        let mut row = OutputRow::new(data, write_flag);
        row.push(OutputFlags::NODES, point.position.coords.iter().copied());
        row.push(OutputFlags::DISPLACEMENTS, (0..DIM).map(|k| state.value(k)));
        row.push(OutputFlags::STRAINS, strain);
        row.push(OutputFlags::STRESSES, self.stress(point, &strain));
        row.push(
            OutputFlags::EXTRAS,
            [self.con.eval_failure(point, &strain), self.con.eval_density(point)],
        );
        row.len()
    }
}
