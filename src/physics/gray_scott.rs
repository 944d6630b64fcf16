use crate::design::{self, DesignParameter};
use crate::jacobian::{jacobian_index, JacobianLayout};
use crate::model::{ElementModel, QuantitySensMut, QuantityType};
use crate::nalgebra::Matrix3;
use crate::output::{ElementType, OutputFlags, OutputLayout, OutputRow};
use crate::point::{AdjointState, PointState, QuadraturePoint};
use eyre::eyre;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use weakform_traits::DiffScalar;

const U: usize = 0;
const V: usize = 1;

const OUTPUT_LAYOUT: OutputLayout = OutputLayout {
    nodes: 3,
    displacements: 2,
    strains: 6,
    stresses: 6,
    extras: 1,
};

/// Material parameters of the Gray-Scott model.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrayScottParameters {
    pub diffusivity_u: f64,
    pub diffusivity_v: f64,
    /// Feed rate $F$.
    pub feed: f64,
    /// Kill rate $k$.
    pub kill: f64,
}

impl Default for GrayScottParameters {
    fn default() -> Self {
        Self {
            diffusivity_u: 2e-5,
            diffusivity_v: 1e-5,
            feed: 0.04,
            kill: 0.06,
        }
    }
}

/// The Gray-Scott reaction-diffusion system for two species $u$ and $v$,
/// $$
/// \begin{aligned}
/// \dot u &= D_u \Delta u - u v^2 + F (1 - u), \\\\
/// \dot v &= D_v \Delta v + u v^2 - (F + k) v,
/// \end{aligned}
/// $$
/// in one, two or three spatial dimensions. The feed rate $F$ and kill rate $k$ may be design
/// variables.
///
/// The reaction terms couple the two species non-linearly, which makes this a useful test bed
/// for Jacobian verification of multi-variable weak forms.
#[derive(Debug, Clone)]
pub struct GrayScott<T> {
    spatial_dim: usize,
    diffusivity_u: T,
    diffusivity_v: T,
    feed: DesignParameter<T>,
    kill: DesignParameter<T>,
    jacobian_pairs: Vec<(usize, usize)>,
}

impl<T: DiffScalar> GrayScott<T> {
    pub fn new(spatial_dim: usize, parameters: GrayScottParameters) -> eyre::Result<Self> {
        if !(1..=3).contains(&spatial_dim) {
            return Err(eyre!("spatial dimension must be 1, 2 or 3, got {}", spatial_dim));
        }
        if parameters.diffusivity_u < 0.0 || parameters.diffusivity_v < 0.0 {
            return Err(eyre!("diffusivities must be non-negative"));
        }

        let d = spatial_dim;
        let (u0, v0) = (jacobian_index(d, U, 0), jacobian_index(d, V, 0));
        let mut jacobian_pairs = vec![(u0, u0), (u0, v0), (u0 + 1, u0 + 1), (v0, u0), (v0, v0), (v0 + 1, v0 + 1)];
        for c in 0..d {
            jacobian_pairs.push((u0 + 3 + c, u0 + 3 + c));
        }
        for c in 0..d {
            jacobian_pairs.push((v0 + 3 + c, v0 + 3 + c));
        }

        Ok(Self {
            spatial_dim,
            diffusivity_u: T::from_real(parameters.diffusivity_u),
            diffusivity_v: T::from_real(parameters.diffusivity_v),
            feed: DesignParameter::fixed(T::from_real(parameters.feed)),
            kill: DesignParameter::fixed(T::from_real(parameters.kill)),
            jacobian_pairs,
        })
    }

    /// Makes the feed rate global design variable `num`.
    pub fn with_feed_design_var(mut self, num: usize, lower: f64, upper: f64) -> Self {
        self.feed = DesignParameter::variable(self.feed.value(), num, T::from_real(lower), T::from_real(upper));
        self
    }

    /// Makes the kill rate global design variable `num`.
    pub fn with_kill_design_var(mut self, num: usize, lower: f64, upper: f64) -> Self {
        self.kill = DesignParameter::variable(self.kill.value(), num, T::from_real(lower), T::from_real(upper));
        self
    }

    fn design_parameters(&self) -> [&DesignParameter<T>; 2] {
        [&self.feed, &self.kill]
    }

    /// Net rate at which $u$ is consumed, $u v^2 - F(1 - u)$.
    #[replace_float_literals(T::from_real(literal))]
    fn reaction_rate(&self, u: T, v: T) -> T {
        u * v * v - self.feed.value() * (1.0 - u)
    }

    #[replace_float_literals(T::from_real(literal))]
    fn eval_coefficients(&self, state: &PointState<T>, dut: &mut [T], dux: &mut [T]) {
        let d = self.spatial_dim;
        let (u, v) = (state.value(U), state.value(V));
        let f = self.feed.value();
        let k = self.kill.value();

        dut[..6].fill(0.0);
        dut[0] = self.reaction_rate(u, v);
        dut[1] = state.first_time_derivative(U);
        dut[3] = -u * v * v + (f + k) * v;
        dut[4] = state.first_time_derivative(V);

        for c in 0..d {
            dux[c] = self.diffusivity_u * state.ux[c];
            dux[d + c] = self.diffusivity_v * state.ux[d + c];
        }
    }

    fn quantity_len(quantity_type: QuantityType) -> usize {
        match quantity_type {
            QuantityType::Concentration => 2,
            QuantityType::ReactionRate => 1,
            _ => 0,
        }
    }
}

#[replace_float_literals(T::from_real(literal))]
impl<T: DiffScalar> ElementModel<T> for GrayScott<T> {
    fn spatial_dim(&self) -> usize {
        self.spatial_dim
    }

    fn vars_per_node(&self) -> usize {
        2
    }

    fn design_var_nums(&self, _elem_index: usize, dv_nums: Option<&mut [usize]>) -> usize {
        design::design_var_nums(&self.design_parameters(), dv_nums)
    }

    fn set_design_vars(&self, _elem_index: usize, dvs: &[T]) {
        design::set_design_vars(&self.design_parameters(), dvs)
    }

    fn get_design_vars(&self, _elem_index: usize, dvs: &mut [T]) {
        design::get_design_vars(&self.design_parameters(), dvs)
    }

    fn design_var_range(&self, _elem_index: usize, lower: &mut [T], upper: &mut [T]) {
        design::design_var_range(&self.design_parameters(), lower, upper)
    }

    fn eval_weak_integrand(&self, _point: &QuadraturePoint<T>, state: &PointState<T>, dut: &mut [T], dux: &mut [T]) {
        self.eval_coefficients(state, dut, dux);
    }

    fn weak_jacobian_layout(&self) -> JacobianLayout<'_> {
        JacobianLayout::Sparse(&self.jacobian_pairs)
    }

    fn eval_weak_jacobian(
        &self,
        _point: &QuadraturePoint<T>,
        state: &PointState<T>,
        dut: &mut [T],
        dux: &mut [T],
        jac: &mut [T],
    ) -> JacobianLayout<'_> {
        assert!(jac.len() >= self.jacobian_pairs.len(), "Jacobian buffer too short");
        self.eval_coefficients(state, dut, dux);

        let d = self.spatial_dim;
        let (u, v) = (state.value(U), state.value(V));
        let f = self.feed.value();
        let k = self.kill.value();

        // Same order as the pairs assembled in the constructor
        jac[0] = v * v + f;
        jac[1] = 2.0 * u * v;
        jac[2] = 1.0;
        jac[3] = -v * v;
        jac[4] = -2.0 * u * v + f + k;
        jac[5] = 1.0;
        jac[6..6 + d].fill(self.diffusivity_u);
        jac[6 + d..6 + 2 * d].fill(self.diffusivity_v);
        self.weak_jacobian_layout()
    }

    fn add_weak_adj_product(
        &self,
        _point: &QuadraturePoint<T>,
        state: &PointState<T>,
        adjoint: &AdjointState<T>,
        scale: T,
        fdv_sens: &mut [T],
    ) {
        let params = self.design_parameters();
        let (u, v) = (state.value(U), state.value(V));
        let (psi_u, psi_v) = (adjoint.psi[U], adjoint.psi[V]);

        design::add_design_sens(&params, &self.feed, scale * (psi_v * v - psi_u * (1.0 - u)), fdv_sens);
        design::add_design_sens(&params, &self.kill, scale * psi_v * v, fdv_sens);
    }

    fn eval_point_quantity(
        &self,
        quantity_type: QuantityType,
        _point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        quantity: &mut [T],
    ) -> usize {
        let len = Self::quantity_len(quantity_type);
        if len == 0 || quantity.len() < len {
            return len;
        }

        let (u, v) = (state.value(U), state.value(V));
        match quantity_type {
            QuantityType::Concentration => {
                quantity[0] = u;
                quantity[1] = v;
            }
            QuantityType::ReactionRate => quantity[0] = self.reaction_rate(u, v),
            _ => {}
        }
        len
    }

    fn add_point_quantity_dv_sens(
        &self,
        quantity_type: QuantityType,
        scale: T,
        _point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        dfdx: &mut [T],
    ) {
        if quantity_type == QuantityType::ReactionRate {
            let params = self.design_parameters();
            design::add_design_sens(&params, &self.feed, scale * dfdq[0] * (state.value(U) - 1.0), dfdx);
        }
    }

    fn eval_point_quantity_sens(
        &self,
        quantity_type: QuantityType,
        _point: &QuadraturePoint<T>,
        _xd: &Matrix3<T>,
        state: &PointState<T>,
        dfdq: &[T],
        sens: &mut QuantitySensMut<T>,
    ) {
        sens.fill_zero();
        let (u, v) = (state.value(U), state.value(V));
        let u0 = 3 * U;
        let v0 = 3 * V;
        match quantity_type {
            QuantityType::Concentration => {
                sens.dfdut[u0] = dfdq[0];
                sens.dfdut[v0] = dfdq[1];
            }
            QuantityType::ReactionRate => {
                sens.dfdut[u0] = dfdq[0] * (v * v + self.feed.value());
                sens.dfdut[v0] = dfdq[0] * 2.0 * u * v;
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
        if element_type != ElementType::ReactionDiffusion {
            return 0;
        }
        let len = OUTPUT_LAYOUT.row_len(write_flag);
        if data.len() < len {
            return len;
        }

        // Gradients and fluxes are padded to three components regardless of dimension
        let d = self.spatial_dim;
        let mut gradients = [T::zero(); 6];
        let mut fluxes = [T::zero(); 6];
        for var in [U, V] {
            let diffusivity = if var == U { self.diffusivity_u } else { self.diffusivity_v };
            for (c, du) in state.gradient(var, d).iter().enumerate() {
                gradients[3 * var + c] = *du;
                fluxes[3 * var + c] = diffusivity * *du;
            }
        }

        let (u, v) = (state.value(U), state.value(V));
        let mut row = OutputRow::new(data, write_flag);
        row.push(OutputFlags::NODES, point.position.coords.iter().copied());
        row.push(OutputFlags::DISPLACEMENTS, [u, v]);
        row.push(OutputFlags::STRAINS, gradients);
        row.push(OutputFlags::STRESSES, fluxes);
        row.push(OutputFlags::EXTRAS, [self.reaction_rate(u, v)]);
        row.len()
    }
}
