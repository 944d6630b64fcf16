use super::{added_sensitivity, compare_values, real_parts, synthetic_values, VerificationConfig, VerificationReport};
use crate::constitutive::{packed_len, packed_symmetric_mult, Constitutive};
use crate::nalgebra::{DVector, DVectorView, Point3};
use crate::optimize::calculus::{approximate_directional_derivative_fd, approximate_gradient_fd};
use crate::point::QuadraturePoint;
use log::warn;
use weakform_traits::DiffScalar;

/// Verifies the consistency and derivatives of a [`Constitutive`] law at a single point.
///
/// Strains default to synthetic values of order one, so that the default steps are small
/// relative to the strain even for non-linear failure criteria. As with
/// [`ModelVerifier`](super::ModelVerifier), design variable tests perturb and then restore the
/// design variables of the law.
pub struct ConstitutiveVerifier<'a, T: DiffScalar, C: ?Sized> {
    con: &'a C,
    config: VerificationConfig,
    elem_index: usize,
    position: Point3<T>,
    strain: Vec<T>,
    psi: Vec<T>,
}

impl<'a, T, C> ConstitutiveVerifier<'a, T, C>
where
    T: DiffScalar,
    C: Constitutive<T> + ?Sized,
{
    pub fn new(con: &'a C) -> Self {
        let n = con.num_stresses();
        let x = synthetic_values::<T>(3, 10);
        Self {
            con,
            config: VerificationConfig::for_scalar::<T>(),
            elem_index: 0,
            position: Point3::new(x[0], x[1], x[2]),
            strain: synthetic_values(n, 11),
            psi: synthetic_values(n, 12),
        }
    }

    pub fn with_config(self, config: VerificationConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_elem_index(self, elem_index: usize) -> Self {
        Self { elem_index, ..self }
    }

    /// # Panics
    /// Panics if `strain` does not have one entry per stress component.
    pub fn with_strain(self, strain: &[T]) -> Self {
        assert_eq!(strain.len(), self.strain.len(), "strain has wrong length");
        Self {
            strain: strain.to_vec(),
            ..self
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    fn point(&self) -> QuadraturePoint<'_, T> {
        QuadraturePoint::new(&self.position).with_elem_index(self.elem_index)
    }

    fn stress(&self, strain: &[T]) -> Vec<T> {
        let mut stress = vec![T::zero(); strain.len()];
        self.con.eval_stress(&self.point(), strain, &mut stress);
        stress
    }

    fn design_directional_derivative(&self, direction: &[f64], mut g: impl FnMut() -> T) -> f64 {
        let mut dvs = DVector::zeros(direction.len());
        self.con.get_design_vars(self.elem_index, dvs.as_mut_slice());
        let original = dvs.clone();
        let direction = DVector::from_column_slice(direction);

        let derivative = approximate_directional_derivative_fd(
            |dv| {
                let dv: Vec<T> = dv.iter().copied().collect();
                self.con.set_design_vars(self.elem_index, &dv);
                g()
            },
            &mut dvs,
            DVectorView::from(&direction),
            self.config.step,
        );

        self.con.set_design_vars(self.elem_index, original.as_slice());
        derivative
    }

    fn check_design_direction(&self, test: &'static str, direction: &[f64]) -> Option<VerificationReport> {
        let num_dvs = self.con.design_var_nums(self.elem_index, None);
        if direction.len() != num_dvs {
            if self.config.print_level >= 1 {
                warn!(
                    "{test}: design direction has {} entries, but the law owns {} design variables",
                    direction.len(),
                    num_dvs
                );
            }
            Some(VerificationReport::failure(test))
        } else {
            None
        }
    }

    /// Checks that the stress equals the packed tangent stiffness applied to the strain.
    pub fn test_stress_consistency(&self) -> VerificationReport {
        let n = self.con.num_stresses();
        let mut tangent = vec![T::zero(); packed_len(n)];
        self.con.eval_tangent_stiffness(&self.point(), &mut tangent);
        let mut expected = vec![T::zero(); n];
        packed_symmetric_mult(&tangent, &self.strain, &mut expected);

        compare_values(
            "stress consistency",
            &real_parts(&self.stress(&self.strain)),
            &real_parts(&expected),
            &self.config,
        )
    }

    /// Compares the strain derivative of the failure index with a numerical approximation.
    pub fn test_failure_strain_sens(&self) -> VerificationReport {
        let point = self.point();
        let mut dfde = vec![T::zero(); self.strain.len()];
        self.con.eval_failure_strain_sens(&point, &self.strain, &mut dfde);

        let mut strain = DVector::from_column_slice(&self.strain);
        let approximate = approximate_gradient_fd(
            |e| {
                let e: Vec<T> = e.iter().copied().collect();
                self.con.eval_failure(&point, &e)
            },
            &mut strain,
            self.config.step,
        );
        compare_values(
            "failure strain sensitivity",
            &real_parts(&dfde),
            approximate.as_slice(),
            &self.config,
        )
    }

    /// Compares the design derivative of `psi · stress` along `direction` with a numerical
    /// approximation.
    pub fn test_stress_dv_sens(&self, direction: &[f64]) -> VerificationReport {
        const TEST: &str = "stress design sensitivity";
        if let Some(report) = self.check_design_direction(TEST, direction) {
            return report;
        }
        let dfdx = added_sensitivity(direction.len(), |dfdx| {
            self.con.add_stress_dv_sens(&self.point(), &self.strain, T::one(), &self.psi, dfdx)
        });
        let analytic: f64 = real_parts(&dfdx)
            .iter()
            .zip(direction)
            .map(|(s, d)| s * d)
            .sum();

        let approximate = self.design_directional_derivative(direction, || {
            self.stress(&self.strain)
                .iter()
                .zip(&self.psi)
                .fold(T::zero(), |sum, (s, psi)| sum + *s * *psi)
        });
        compare_values(TEST, &[analytic], &[approximate], &self.config)
    }

    /// Compares the design derivative of the density along `direction` with a numerical
    /// approximation.
    pub fn test_density_dv_sens(&self, direction: &[f64]) -> VerificationReport {
        const TEST: &str = "density design sensitivity";
        if let Some(report) = self.check_design_direction(TEST, direction) {
            return report;
        }
        let point = self.point();
        let dfdx = added_sensitivity(direction.len(), |dfdx| self.con.add_density_dv_sens(&point, T::one(), dfdx));
        let analytic: f64 = real_parts(&dfdx)
            .iter()
            .zip(direction)
            .map(|(s, d)| s * d)
            .sum();

        let approximate = self.design_directional_derivative(direction, || self.con.eval_density(&point));
        compare_values(TEST, &[analytic], &[approximate], &self.config)
    }

    /// Compares the design derivative of the failure index along `direction` with a numerical
    /// approximation.
    pub fn test_failure_dv_sens(&self, direction: &[f64]) -> VerificationReport {
        const TEST: &str = "failure design sensitivity";
        if let Some(report) = self.check_design_direction(TEST, direction) {
            return report;
        }
        let point = self.point();
        let dfdx = added_sensitivity(direction.len(), |dfdx| {
            self.con.add_failure_dv_sens(&point, &self.strain, T::one(), dfdx)
        });
        let analytic: f64 = real_parts(&dfdx)
            .iter()
            .zip(direction)
            .map(|(s, d)| s * d)
            .sum();

        let approximate =
            self.design_directional_derivative(direction, || self.con.eval_failure(&point, &self.strain));
        compare_values(TEST, &[analytic], &[approximate], &self.config)
    }

    /// Runs every test of the verifier along a synthetic design direction.
    pub fn test_all(&self) -> VerificationReport {
        let num_dvs = self.con.design_var_nums(self.elem_index, None);
        let direction = synthetic_values::<f64>(num_dvs, 13);
        self.test_stress_consistency()
            .merge(self.test_failure_strain_sens())
            .merge(self.test_stress_dv_sens(&direction))
            .merge(self.test_density_dv_sens(&direction))
            .merge(self.test_failure_dv_sens(&direction))
    }
}
