//! Material properties of linear elastic, thermally conducting solids.
//!
//! Stresses and strains use Voigt notation in the order `xx, yy, zz, yz, xz, xy` with
//! engineering shear strains. Symmetric 6x6 and 3x3 matrices are returned in the packed
//! upper-triangular form of [`weakform::constitutive::packed_index`].
use eyre::eyre;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use weakform::constitutive::{packed_index, packed_len};
use weakform::nalgebra::{Matrix3, Vector3};
use weakform::DiffScalar;

use crate::NUM_STRESSES;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl From<YoungPoisson<f64>> for LameParameters<f64> {
    fn from(params: YoungPoisson<f64>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

/// Elastic constants of an orthotropic material in its principal axes.
///
/// Poisson ratios follow the convention $\nu_{ij} = -\epsilon_j / \epsilon_i$ under uniaxial
/// stress in direction $i$; the remaining ratios follow from the symmetry
/// $\nu_{ij} / E_i = \nu_{ji} / E_j$.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrthotropicConstants {
    pub young: [f64; 3],
    /// $\nu_{12}$, $\nu_{13}$, $\nu_{23}$.
    pub poisson: [f64; 3],
    /// $G_{12}$, $G_{13}$, $G_{23}$.
    pub shear: [f64; 3],
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ElasticConstants {
    Isotropic(YoungPoisson<f64>),
    Orthotropic(OrthotropicConstants),
}

/// Unvalidated material parameters, as read from input files.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialParameters {
    pub density: f64,
    pub specific_heat: f64,
    pub elasticity: ElasticConstants,
    /// Thermal expansion coefficients along the principal axes.
    pub thermal_expansion: [f64; 3],
    /// Thermal conductivities along the principal axes.
    pub conductivity: [f64; 3],
    pub yield_stress: f64,
}

impl MaterialParameters {
    /// Parameters of an isotropic material without thermal properties.
    pub fn isotropic(density: f64, young: f64, poisson: f64, yield_stress: f64) -> Self {
        Self {
            density,
            specific_heat: 0.0,
            elasticity: ElasticConstants::Isotropic(YoungPoisson { young, poisson }),
            thermal_expansion: [0.0; 3],
            conductivity: [0.0; 3],
            yield_stress,
        }
    }

    /// Parameters of an orthotropic material without thermal properties.
    pub fn orthotropic(density: f64, constants: OrthotropicConstants, yield_stress: f64) -> Self {
        Self {
            elasticity: ElasticConstants::Orthotropic(constants),
            ..Self::isotropic(density, 1.0, 0.0, yield_stress)
        }
    }

    pub fn with_specific_heat(self, specific_heat: f64) -> Self {
        Self { specific_heat, ..self }
    }

    /// Sets the same thermal expansion coefficient in all directions.
    pub fn with_thermal_expansion(self, alpha: f64) -> Self {
        Self {
            thermal_expansion: [alpha; 3],
            ..self
        }
    }

    /// Sets the same conductivity in all directions.
    pub fn with_conductivity(self, kappa: f64) -> Self {
        Self {
            conductivity: [kappa; 3],
            ..self
        }
    }

    pub fn with_orthotropic_thermal(self, thermal_expansion: [f64; 3], conductivity: [f64; 3]) -> Self {
        Self {
            thermal_expansion,
            conductivity,
            ..self
        }
    }
}

/// Validated material properties shared by constitutive laws.
///
/// Construction validates the parameters and precomputes the elastic stiffness, so evaluation
/// never fails. Serializes as [`MaterialParameters`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MaterialParameters", into = "MaterialParameters")]
pub struct MaterialProperties {
    parameters: MaterialParameters,
    stiffness: [f64; packed_len(NUM_STRESSES)],
}

impl TryFrom<MaterialParameters> for MaterialProperties {
    type Error = eyre::Report;

    fn try_from(parameters: MaterialParameters) -> eyre::Result<Self> {
        Self::new(parameters)
    }
}

impl From<MaterialProperties> for MaterialParameters {
    fn from(properties: MaterialProperties) -> Self {
        properties.parameters
    }
}

fn check_non_negative(name: &str, values: &[f64]) -> eyre::Result<()> {
    if values.iter().all(|v| *v >= 0.0 && v.is_finite()) {
        Ok(())
    } else {
        Err(eyre!("{name} must be non-negative and finite, got {values:?}"))
    }
}

fn check_positive(name: &str, values: &[f64]) -> eyre::Result<()> {
    if values.iter().all(|v| *v > 0.0 && v.is_finite()) {
        Ok(())
    } else {
        Err(eyre!("{name} must be positive and finite, got {values:?}"))
    }
}

fn isotropic_stiffness(params: YoungPoisson<f64>) -> eyre::Result<[f64; packed_len(NUM_STRESSES)]> {
    let YoungPoisson { young, poisson } = params;
    check_positive("Young's modulus", &[young])?;
    if !(poisson > -1.0 && poisson < 0.5) {
        return Err(eyre!("Poisson's ratio must lie in (-1, 0.5), got {poisson}"));
    }

    let LameParameters { mu, lambda } = LameParameters::from(params);
    let mut c = [0.0; packed_len(NUM_STRESSES)];
    for i in 0..3 {
        for j in i..3 {
            c[packed_index(NUM_STRESSES, i, j)] = if i == j { lambda + 2.0 * mu } else { lambda };
        }
        c[packed_index(NUM_STRESSES, 3 + i, 3 + i)] = mu;
    }
    Ok(c)
}

fn orthotropic_stiffness(constants: OrthotropicConstants) -> eyre::Result<[f64; packed_len(NUM_STRESSES)]> {
    let OrthotropicConstants { young, poisson, shear } = constants;
    check_positive("Young's moduli", &young)?;
    check_positive("shear moduli", &shear)?;

    let [e1, e2, e3] = young;
    let [nu12, nu13, nu23] = poisson;
    let compliance = Matrix3::new(
        1.0 / e1, -nu12 / e1, -nu13 / e1,
        -nu12 / e1, 1.0 / e2, -nu23 / e2,
        -nu13 / e1, -nu23 / e2, 1.0 / e3,
    );
    let normal_stiffness = compliance
        .cholesky()
        .ok_or_else(|| eyre!("orthotropic compliance is not positive definite, check the Poisson ratios"))?
        .inverse();

    let mut c = [0.0; packed_len(NUM_STRESSES)];
    for i in 0..3 {
        for j in i..3 {
            c[packed_index(NUM_STRESSES, i, j)] = normal_stiffness[(i, j)];
        }
    }
    let [g12, g13, g23] = shear;
    c[packed_index(NUM_STRESSES, 3, 3)] = g23;
    c[packed_index(NUM_STRESSES, 4, 4)] = g13;
    c[packed_index(NUM_STRESSES, 5, 5)] = g12;
    Ok(c)
}

impl MaterialProperties {
    pub fn new(parameters: MaterialParameters) -> eyre::Result<Self> {
        check_non_negative("density", &[parameters.density])?;
        check_non_negative("specific heat", &[parameters.specific_heat])?;
        check_non_negative("conductivity", &parameters.conductivity)?;
        check_positive("yield stress", &[parameters.yield_stress])?;
        if !parameters.thermal_expansion.iter().all(|a| a.is_finite()) {
            return Err(eyre!("thermal expansion coefficients must be finite"));
        }

        let stiffness = match parameters.elasticity {
            ElasticConstants::Isotropic(young_poisson) => isotropic_stiffness(young_poisson)?,
            ElasticConstants::Orthotropic(constants) => orthotropic_stiffness(constants)?,
        };
        Ok(Self { parameters, stiffness })
    }

    /// Isotropic material without thermal properties.
    pub fn isotropic(density: f64, young: f64, poisson: f64, yield_stress: f64) -> eyre::Result<Self> {
        Self::new(MaterialParameters::isotropic(density, young, poisson, yield_stress))
    }

    pub fn parameters(&self) -> &MaterialParameters {
        &self.parameters
    }

    pub fn density(&self) -> f64 {
        self.parameters.density
    }

    pub fn specific_heat(&self) -> f64 {
        self.parameters.specific_heat
    }

    pub fn yield_stress(&self) -> f64 {
        self.parameters.yield_stress
    }

    /// Packed 6x6 elastic stiffness.
    pub fn tangent_stiffness_3d<T: DiffScalar>(&self) -> [T; packed_len(NUM_STRESSES)] {
        self.stiffness.map(T::from_real)
    }

    /// Strain per unit temperature rise.
    pub fn thermal_strain_3d<T: DiffScalar>(&self) -> [T; NUM_STRESSES] {
        let [a1, a2, a3] = self.parameters.thermal_expansion.map(T::from_real);
        [a1, a2, a3, T::zero(), T::zero(), T::zero()]
    }

    /// Packed 3x3 conductivity tensor.
    pub fn tangent_heat_flux_3d<T: DiffScalar>(&self) -> [T; packed_len(3)] {
        let mut kappa = [T::zero(); packed_len(3)];
        for (i, k_i) in self.parameters.conductivity.iter().enumerate() {
            kappa[packed_index(3, i, i)] = T::from_real(*k_i);
        }
        kappa
    }

    /// Von Mises failure index $\sigma_{vm} / \sigma_y$ for a stress in Voigt order.
    pub fn von_mises_failure_3d<T: DiffScalar>(&self, stress: &[T]) -> T {
        von_mises_stress(stress) / T::from_real(self.parameters.yield_stress)
    }

    /// Von Mises failure index and its derivative with respect to the stress.
    ///
    /// The derivative is taken to be zero at zero stress, where the von Mises stress is not
    /// differentiable.
    #[replace_float_literals(T::from_real(literal))]
    pub fn von_mises_failure_3d_stress_sens<T: DiffScalar>(&self, stress: &[T], sens: &mut [T]) -> T {
        let s = stress;
        let vm = von_mises_stress(s);
        let ys = T::from_real(self.parameters.yield_stress);

        if vm.is_zero() {
            sens[..NUM_STRESSES].fill(0.0);
        } else {
            let denom = vm * ys;
            sens[0] = (2.0 * s[0] - s[1] - s[2]) / (2.0 * denom);
            sens[1] = (2.0 * s[1] - s[0] - s[2]) / (2.0 * denom);
            sens[2] = (2.0 * s[2] - s[0] - s[1]) / (2.0 * denom);
            for i in 3..NUM_STRESSES {
                sens[i] = 3.0 * s[i] / denom;
            }
        }
        vm / ys
    }
}

#[replace_float_literals(T::from_real(literal))]
fn von_mises_stress<T: DiffScalar>(s: &[T]) -> T {
    let normal = Vector3::new(s[0] - s[1], s[0] - s[2], s[1] - s[2]);
    let shear = Vector3::new(s[3], s[4], s[5]);
    (0.5 * normal.dot(&normal) + 3.0 * shear.dot(&shear)).sqrt()
}
