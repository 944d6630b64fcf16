use crate::materials::MaterialProperties;
use crate::NUM_STRESSES;
use std::sync::Arc;
use weakform::constitutive::{packed_len, packed_symmetric_mult, Constitutive};
use weakform::design::{self, DesignParameter};
use weakform::point::QuadraturePoint;
use weakform::DiffScalar;

/// The constitutive law of a linear elastic, heat conducting 3D solid.
///
/// Stiffness, density and specific heat are scaled by a thickness parameter $t$, which may be a
/// design variable. Stresses are computed from the scaled stiffness, so that the stress always
/// equals the tangent stiffness applied to the strain. Conductivity and the failure index are
/// independent of $t$.
///
/// A law without material properties is degraded: every evaluation returns zero.
#[derive(Debug, Clone)]
pub struct SolidConstitutive<T> {
    properties: Option<Arc<MaterialProperties>>,
    thickness: DesignParameter<T>,
}

impl<T: DiffScalar> SolidConstitutive<T> {
    pub fn new(properties: Arc<MaterialProperties>) -> Self {
        Self {
            properties: Some(properties),
            thickness: DesignParameter::fixed(T::one()),
        }
    }

    /// A law without material properties.
    pub fn degraded() -> Self {
        Self {
            properties: None,
            thickness: DesignParameter::fixed(T::one()),
        }
    }

    pub fn with_thickness(self, thickness: f64) -> Self {
        Self {
            thickness: DesignParameter::fixed(T::from_real(thickness)),
            ..self
        }
    }

    /// Makes the thickness global design variable `num` with the given bounds.
    pub fn with_thickness_design_var(self, thickness: f64, num: usize, lower: f64, upper: f64) -> Self {
        Self {
            thickness: DesignParameter::variable(
                T::from_real(thickness),
                num,
                T::from_real(lower),
                T::from_real(upper),
            ),
            ..self
        }
    }

    pub fn properties(&self) -> Option<&Arc<MaterialProperties>> {
        self.properties.as_ref()
    }

    pub fn thickness(&self) -> T {
        self.thickness.value()
    }

    fn design_parameters(&self) -> [&DesignParameter<T>; 1] {
        [&self.thickness]
    }

    /// Stress computed with the material stiffness, before thickness scaling.
    fn material_stress(props: &MaterialProperties, strain: &[T], stress: &mut [T]) {
        let c = props.tangent_stiffness_3d::<T>();
        packed_symmetric_mult(&c, &strain[..NUM_STRESSES], stress);
    }
}

impl<T: DiffScalar> Constitutive<T> for SolidConstitutive<T> {
    fn num_stresses(&self) -> usize {
        NUM_STRESSES
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

    fn eval_density(&self, _point: &QuadraturePoint<T>) -> T {
        self.properties
            .as_ref()
            .map(|props| self.thickness() * T::from_real(props.density()))
            .unwrap_or_else(T::zero)
    }

    fn add_density_dv_sens(&self, _point: &QuadraturePoint<T>, scale: T, dfdx: &mut [T]) {
        if let Some(props) = &self.properties {
            let sens = scale * T::from_real(props.density());
            design::add_design_sens(&self.design_parameters(), &self.thickness, sens, dfdx);
        }
    }

    fn eval_specific_heat(&self, _point: &QuadraturePoint<T>) -> T {
        self.properties
            .as_ref()
            .map(|props| self.thickness() * T::from_real(props.specific_heat()))
            .unwrap_or_else(T::zero)
    }

    fn add_specific_heat_dv_sens(&self, _point: &QuadraturePoint<T>, scale: T, dfdx: &mut [T]) {
        if let Some(props) = &self.properties {
            let sens = scale * T::from_real(props.specific_heat());
            design::add_design_sens(&self.design_parameters(), &self.thickness, sens, dfdx);
        }
    }

    fn eval_stress(&self, point: &QuadraturePoint<T>, strain: &[T], stress: &mut [T]) {
        if self.properties.is_none() {
            // Zero regardless of the strain, even a non-finite one
            stress[..NUM_STRESSES].fill(T::zero());
            return;
        }
        let mut c = [T::zero(); packed_len(NUM_STRESSES)];
        self.eval_tangent_stiffness(point, &mut c);
        packed_symmetric_mult(&c, &strain[..NUM_STRESSES], stress);
    }

    fn eval_tangent_stiffness(&self, _point: &QuadraturePoint<T>, tangent: &mut [T]) {
        let tangent = &mut tangent[..packed_len(NUM_STRESSES)];
        match &self.properties {
            Some(props) => {
                let t = self.thickness();
                for (c_ij, material_c_ij) in tangent.iter_mut().zip(props.tangent_stiffness_3d::<T>()) {
                    *c_ij = t * material_c_ij;
                }
            }
            None => tangent.fill(T::zero()),
        }
    }

    fn add_stress_dv_sens(&self, _point: &QuadraturePoint<T>, strain: &[T], scale: T, psi: &[T], dfdx: &mut [T]) {
        if let Some(props) = &self.properties {
            // d(psi . t C e)/dt = psi . C e
            let mut stress = [T::zero(); NUM_STRESSES];
            Self::material_stress(props, strain, &mut stress);
            let sens = stress
                .iter()
                .zip(psi)
                .fold(T::zero(), |sum, (s, p)| sum + *s * *p);
            design::add_design_sens(&self.design_parameters(), &self.thickness, scale * sens, dfdx);
        }
    }

    fn eval_thermal_strain(&self, _point: &QuadraturePoint<T>, theta: T, strain: &mut [T]) {
        let strain = &mut strain[..NUM_STRESSES];
        match &self.properties {
            Some(props) => {
                for (e, alpha) in strain.iter_mut().zip(props.thermal_strain_3d::<T>()) {
                    *e = theta * alpha;
                }
            }
            None => strain.fill(T::zero()),
        }
    }

    fn eval_heat_flux(&self, point: &QuadraturePoint<T>, grad: &[T], flux: &mut [T]) {
        if self.properties.is_none() {
            flux[..3].fill(T::zero());
            return;
        }
        let mut kappa = [T::zero(); packed_len(3)];
        self.eval_tangent_heat_flux(point, &mut kappa);
        packed_symmetric_mult(&kappa, &grad[..3], flux);
    }

    fn eval_tangent_heat_flux(&self, _point: &QuadraturePoint<T>, tangent: &mut [T]) {
        let tangent = &mut tangent[..packed_len(3)];
        match &self.properties {
            Some(props) => tangent.copy_from_slice(&props.tangent_heat_flux_3d::<T>()),
            None => tangent.fill(T::zero()),
        }
    }

    fn eval_failure(&self, _point: &QuadraturePoint<T>, strain: &[T]) -> T {
        match &self.properties {
            Some(props) => {
                let mut stress = [T::zero(); NUM_STRESSES];
                Self::material_stress(props, strain, &mut stress);
                props.von_mises_failure_3d(&stress)
            }
            None => T::zero(),
        }
    }

    fn eval_failure_strain_sens(&self, _point: &QuadraturePoint<T>, strain: &[T], dfde: &mut [T]) -> T {
        match &self.properties {
            Some(props) => {
                let mut stress = [T::zero(); NUM_STRESSES];
                Self::material_stress(props, strain, &mut stress);
                let mut dfds = [T::zero(); NUM_STRESSES];
                let failure = props.von_mises_failure_3d_stress_sens(&stress, &mut dfds);
                // df/de = C df/ds, since C is symmetric
                packed_symmetric_mult(&props.tangent_stiffness_3d::<T>(), &dfds, dfde);
                failure
            }
            None => {
                dfde[..NUM_STRESSES].fill(T::zero());
                T::zero()
            }
        }
    }
}
