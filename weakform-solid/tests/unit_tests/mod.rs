use matrixcompare::assert_scalar_eq;
use std::sync::Arc;
use weakform::nalgebra::Point3;
use weakform::num::Complex;
use weakform_solid::materials::{MaterialParameters, MaterialProperties, OrthotropicConstants};

mod constitutive;
mod elasticity;

/// Aluminium-like isotropic material with thermal properties.
fn aluminium() -> Arc<MaterialProperties> {
    let params = MaterialParameters::isotropic(2700.0, 70e9, 0.3, 270e6)
        .with_specific_heat(900.0)
        .with_thermal_expansion(23e-6)
        .with_conductivity(237.0);
    Arc::new(MaterialProperties::new(params).unwrap())
}

/// A transversely isotropic, fibre-like orthotropic material.
fn composite() -> Arc<MaterialProperties> {
    let constants = OrthotropicConstants {
        young: [150e9, 10e9, 10e9],
        poisson: [0.3, 0.3, 0.45],
        shear: [5e9, 5e9, 3.5e9],
    };
    let params = MaterialParameters::orthotropic(1600.0, constants, 1.5e9)
        .with_specific_heat(1000.0)
        .with_orthotropic_thermal([-0.5e-6, 30e-6, 30e-6], [10.0, 1.0, 1.0]);
    Arc::new(MaterialProperties::new(params).unwrap())
}

fn origin<T: weakform::DiffScalar>() -> Point3<T> {
    Point3::origin()
}

fn to_complex(values: &[f64]) -> Vec<Complex<f64>> {
    values.iter().map(|v| Complex::new(*v, 0.0)).collect()
}

/// Checks that `add` adds to a sensitivity buffer of length `len` rather than overwriting it.
fn assert_accumulates(len: usize, add: impl Fn(&mut [f64])) {
    let mut fresh = vec![0.0; len];
    add(&mut fresh);
    let initial: Vec<f64> = (0..len).map(|i| 1.0 - 2.0 * i as f64).collect();
    let mut accumulated = initial.clone();
    add(&mut accumulated);
    for ((a, a0), s) in accumulated.iter().zip(&initial).zip(&fresh) {
        assert_scalar_eq!(*a, *a0 + *s, comp = abs, tol = 1e-12 * (1.0 + s.abs()));
    }
}
