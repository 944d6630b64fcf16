use crate::constitutive::{packed_index, packed_len, packed_symmetric_mult, Constitutive};
use crate::jacobian::{jacobian_index, JacobianLayout};
use crate::model::{ElementModel, QuantitySensMut, QuantityType};
use crate::nalgebra::Matrix3;
use crate::output::{ElementType, OutputFlags, OutputLayout, OutputRow};
use crate::point::{AdjointState, PointState, QuadraturePoint};
use std::marker::PhantomData;
use std::sync::Arc;
use weakform_traits::DiffScalar;

const DIM: usize = 3;

const OUTPUT_LAYOUT: OutputLayout = OutputLayout {
    nodes: 3,
    displacements: 1,
    strains: 3,
    stresses: 3,
    extras: 1,
};

/// Transient heat conduction in three dimensions.
///
/// The single variable is the temperature $T$. With density $\rho$, specific heat $c$ and
/// conductivity $\vec K$ supplied by the constitutive law, the weak form is
/// $$
/// \int_\Omega \rho c \dot T \\, \delta T + (\vec K \nabla T) \cdot \nabla \delta T \\, \mathrm{d}\Omega = 0.
/// $$
/// Design variables are those of the constitutive law.
#[derive(Debug)]
pub struct HeatConduction3D<T, C> {
    con: Arc<C>,
    jacobian_pairs: Vec<(usize, usize)>,
    marker: PhantomData<T>,
}

impl<T, C> HeatConduction3D<T, C>
where
    T: DiffScalar,
    C: Constitutive<T>,
{
    pub fn new(con: Arc<C>) -> Self {
        let mut jacobian_pairs = vec![(1, 1)];
        for i in 0..DIM {
            for j in 0..DIM {
                jacobian_pairs.push((jacobian_index(DIM, 0, 3 + i), jacobian_index(DIM, 0, 3 + j)));
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

    /// Volumetric heat capacity $\rho c$.
    fn heat_capacity(&self, point: &QuadraturePoint<T>) -> T {
        self.con.eval_density(point) * self.con.eval_specific_heat(point)
    }

    fn eval_coefficients(&self, point: &QuadraturePoint<T>, state: &PointState<T>, dut: &mut [T], dux: &mut [T]) {
        dut[..3].fill(T::zero());
        dut[1] = self.heat_capacity(point) * state.first_time_derivative(0);
        self.con.eval_heat_flux(point, state.gradient(0, DIM), &mut dux[..DIM]);
    }

    fn quantity_len(quantity_type: QuantityType) -> usize {
        match quantity_type {
            QuantityType::Temperature | QuantityType::Density => 1,
            QuantityType::HeatFlux => DIM,
            _ => 0,
        }
    }
}

impl<T, C> ElementModel<T> for HeatConduction3D<T, C>
where
    T: DiffScalar,
    C: Constitutive<T>,
{
    fn spatial_dim(&self) -> usize {
        DIM
    }

    fn vars_per_node(&self) -> usize {
        1
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

        let mut conductivity = [T::zero(); packed_len(DIM)];
        self.con.eval_tangent_heat_flux(point, &mut conductivity);

        jac[0] = self.heat_capacity(point);
        for i in 0..DIM {
            for j in 0..DIM {
                jac[1 + DIM * i + j] = conductivity[packed_index(DIM, i, j)];
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
        let rho = self.con.eval_density(point);
        let c = self.con.eval_specific_heat(point);
        let psi_t_dot = adjoint.psi[0] * state.first_time_derivative(0);

        // d(rho c)/dx = c drho/dx + rho dc/dx
        self.con.add_density_dv_sens(point, scale * psi_t_dot * c, fdv_sens);
        self.con.add_specific_heat_dv_sens(point, scale * psi_t_dot * rho, fdv_sens);
        self.con.add_heat_flux_dv_sens(point, state.gradient(0, DIM), scale, &adjoint.psix[..DIM], fdv_sens);
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

        match quantity_type {
            QuantityType::Temperature => quantity[0] = state.value(0),
            QuantityType::Density => quantity[0] = self.con.eval_density(point),
            QuantityType::HeatFlux => {
                self.con.eval_heat_flux(point, state.gradient(0, DIM), &mut quantity[..DIM])
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
        match quantity_type {
            QuantityType::Density => self.con.add_density_dv_sens(point, scale * dfdq[0], dfdx),
            QuantityType::HeatFlux => {
                self.con.add_heat_flux_dv_sens(point, state.gradient(0, DIM), scale, &dfdq[..DIM], dfdx)
            }
            _ => {}
        }
    }

    fn eval_point_quantity_sens(
        &self,
        quantity_type: QuantityType,
        point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        _state: &PointState<T>,
        dfdq: &[T],
        sens: &mut QuantitySensMut<T>,
    ) {
        sens.fill_zero();
        match quantity_type {
            QuantityType::Temperature => sens.dfdut[0] = dfdq[0],
            QuantityType::HeatFlux => {
                // The conductivity is symmetric, so K^T dfdq = K dfdq
                let mut conductivity = [T::zero(); packed_len(DIM)];
                self.con.eval_tangent_heat_flux(point, &mut conductivity);
                packed_symmetric_mult(&conductivity, &dfdq[..DIM], &mut sens.dfdux[..DIM]);
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
        if element_type != ElementType::HeatConduction {
            return 0;
        }
        let len = OUTPUT_LAYOUT.row_len(write_flag);
        if data.len() < len {
            return len;
        }

        let grad = state.gradient(0, DIM);
        let mut flux = [T::zero(); DIM];
        self.con.eval_heat_flux(point, grad, &mut flux);

        let mut row = OutputRow::new(data, write_flag);
        row.push(OutputFlags::NODES, point.position.coords.iter().copied());
        row.push(OutputFlags::DISPLACEMENTS, [state.value(0)]);
        row.push(OutputFlags::STRAINS, grad.iter().copied());
        row.push(OutputFlags::STRESSES, flux);
        row.push(OutputFlags::EXTRAS, [self.con.eval_density(point)]);
        row.len()
    }
}
