use super::{aluminium, composite, origin};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use proptest::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;
use weakform::constitutive::{packed_len, packed_symmetric_mult, Constitutive};
use weakform::nalgebra::{DVector, Point3};
use weakform::num::Complex;
use weakform::point::QuadraturePoint;
use weakform::verification::{ConstitutiveVerifier, VerificationConfig};
use weakform_solid::materials::MaterialProperties;
use weakform_solid::SolidConstitutive;

#[test]
fn isotropic_uniaxial_strain_stress() {
    let (young, poisson) = (70e9, 0.3);
    let props = Arc::new(MaterialProperties::isotropic(1.0, young, poisson, 1.0).unwrap());
    let con = SolidConstitutive::<f64>::new(props);
    let x = origin();
    let point = QuadraturePoint::new(&x);

    let strain = [1e-4, 0.0, 0.0, 0.0, 0.0, 0.0];
    let mut stress = [0.0; 6];
    con.eval_stress(&point, &strain, &mut stress);

    let expected = young / ((1.0 + poisson) * (1.0 - 2.0 * poisson)) * ((1.0 - poisson) * 1e-4);
    let rel_err = (stress[0] - expected).abs() / expected.abs();
    assert!(rel_err < 1e-6, "stress {} differs from {expected}", stress[0]);
}

#[test]
fn thickness_scales_stiffness_density_and_specific_heat() {
    let props = aluminium();
    let con = SolidConstitutive::<f64>::new(props.clone()).with_thickness(0.25);
    let x = origin();
    let point = QuadraturePoint::new(&x);

    let mut tangent = [0.0; packed_len(6)];
    con.eval_tangent_stiffness(&point, &mut tangent);
    let expected = props.tangent_stiffness_3d::<f64>().map(|c| 0.25 * c);
    assert_matrix_eq!(
        DVector::from_column_slice(&tangent),
        DVector::from_column_slice(&expected),
        comp = float
    );

    assert_scalar_eq!(con.eval_density(&point), 0.25 * 2700.0, comp = float);
    assert_scalar_eq!(con.eval_specific_heat(&point), 0.25 * 900.0, comp = float);

    // Stress is always the tangent applied to the strain
    let strain = [1e-3, -2e-3, 0.5e-3, 1e-4, -3e-4, 2e-4];
    let mut stress = [0.0; 6];
    let mut expected_stress = [0.0; 6];
    con.eval_stress(&point, &strain, &mut stress);
    packed_symmetric_mult(&tangent, &strain, &mut expected_stress);
    assert_eq!(stress, expected_stress);
}

#[test]
fn failure_is_independent_of_thickness() {
    let x = origin();
    let point = QuadraturePoint::new(&x);
    let strain = [1e-3, -2e-3, 0.5e-3, 1e-4, -3e-4, 2e-4];

    let thick = SolidConstitutive::<f64>::new(aluminium()).with_thickness(2.0);
    let thin = SolidConstitutive::<f64>::new(aluminium()).with_thickness(0.1);
    assert_eq!(thick.eval_failure(&point, &strain), thin.eval_failure(&point, &strain));
}

#[test]
fn thermal_strain_and_heat_flux() {
    let con = SolidConstitutive::<f64>::new(composite());
    let x = origin();
    let point = QuadraturePoint::new(&x);

    let mut strain = [1.0; 6];
    con.eval_thermal_strain(&point, 10.0, &mut strain);
    assert_matrix_eq!(
        DVector::from_column_slice(&strain),
        DVector::from_column_slice(&[-5e-6, 300e-6, 300e-6, 0.0, 0.0, 0.0]),
        comp = abs,
        tol = 1e-15
    );

    let mut flux = [0.0; 3];
    con.eval_heat_flux(&point, &[1.0, 2.0, 3.0], &mut flux);
    assert_eq!(flux, [10.0, 2.0, 3.0]);
}

#[test]
fn degraded_law_evaluates_to_zero() {
    let con = SolidConstitutive::<f64>::degraded().with_thickness_design_var(1.0, 0, 0.0, 1.0);
    let x = origin();
    let point = QuadraturePoint::new(&x);
    let strain = [1e-3, -2e-3, 0.5e-3, 1e-4, -3e-4, 2e-4];

    let mut stress = [1.0; 6];
    con.eval_stress(&point, &strain, &mut stress);
    assert_eq!(stress, [0.0; 6]);

    let mut tangent = [1.0; packed_len(6)];
    con.eval_tangent_stiffness(&point, &mut tangent);
    assert_eq!(tangent, [0.0; packed_len(6)]);

    let mut thermal = [1.0; 6];
    con.eval_thermal_strain(&point, 10.0, &mut thermal);
    assert_eq!(thermal, [0.0; 6]);

    let mut flux = [1.0; 3];
    con.eval_heat_flux(&point, &[1.0, 2.0, 3.0], &mut flux);
    assert_eq!(flux, [0.0; 3]);

    let mut dfde = [1.0; 6];
    assert_eq!(con.eval_failure_strain_sens(&point, &strain, &mut dfde), 0.0);
    assert_eq!(dfde, [0.0; 6]);
    assert_eq!(con.eval_failure(&point, &strain), 0.0);
    assert_eq!(con.eval_density(&point), 0.0);
    assert_eq!(con.eval_specific_heat(&point), 0.0);

    // Sensitivities vanish as well, but are still accumulated into the right slot
    let mut dfdx = [0.5];
    con.add_density_dv_sens(&point, 1.0, &mut dfdx);
    con.add_stress_dv_sens(&point, &strain, 1.0, &[1.0; 6], &mut dfdx);
    assert_eq!(dfdx, [0.5]);
}

#[test]
fn degraded_law_ignores_non_finite_input() {
    let con = SolidConstitutive::<f64>::degraded();
    let x = origin();
    let point = QuadraturePoint::new(&x);

    let mut stress = [1.0; 6];
    con.eval_stress(&point, &[f64::INFINITY, 0.0, 0.0, 0.0, 0.0, f64::NAN], &mut stress);
    assert_eq!(stress, [0.0; 6]);

    let mut flux = [1.0; 3];
    con.eval_heat_flux(&point, &[f64::INFINITY, f64::NAN, 0.0], &mut flux);
    assert_eq!(flux, [0.0; 3]);
}

#[test]
fn design_variable_size_query_writes_nothing() {
    let con = SolidConstitutive::<f64>::new(aluminium()).with_thickness_design_var(0.5, 7, 0.1, 2.0);

    assert_eq!(con.design_var_nums(0, None), 1);
    assert_eq!(con.design_var_nums(0, Some(&mut [][..])), 1);

    let mut nums = [usize::MAX; 2];
    assert_eq!(con.design_var_nums(0, Some(&mut nums[..])), 1);
    assert_eq!(nums, [7, usize::MAX]);

    let fixed = SolidConstitutive::<f64>::new(aluminium());
    let mut nums = [usize::MAX];
    assert_eq!(fixed.design_var_nums(0, Some(&mut nums[..])), 0);
    assert_eq!(nums, [usize::MAX]);
}

#[test]
fn design_variable_round_trip() {
    let con = SolidConstitutive::<f64>::new(aluminium()).with_thickness_design_var(0.5, 7, 0.1, 2.0);
    let x = origin();
    let point = QuadraturePoint::new(&x);

    con.set_design_vars(0, &[0.75]);
    let mut dvs = [0.0];
    con.get_design_vars(0, &mut dvs);
    assert_eq!(dvs, [0.75]);
    assert_scalar_eq!(con.eval_density(&point), 0.75 * 2700.0, comp = float);

    let (mut lower, mut upper) = ([0.0], [0.0]);
    con.design_var_range(0, &mut lower, &mut upper);
    assert_eq!((lower, upper), ([0.1], [2.0]));

    // Sensitivities accumulate
    let mut dfdx = [1.0];
    con.add_density_dv_sens(&point, 2.0, &mut dfdx);
    assert_scalar_eq!(dfdx[0], 1.0 + 2.0 * 2700.0, comp = float);

    // A law without design variables ignores updates
    let fixed = SolidConstitutive::<f64>::new(aluminium()).with_thickness(0.5);
    fixed.set_design_vars(0, &[0.75]);
    assert_eq!(fixed.thickness(), 0.5);
}

#[test]
fn isotropic_law_passes_verification() {
    let con = SolidConstitutive::<f64>::new(aluminium()).with_thickness_design_var(0.5, 3, 0.1, 1.0);
    let report = ConstitutiveVerifier::new(&con).test_all();
    assert!(report.passed, "{report:?}");
    assert!(report.num_compared > 0);
}

#[test]
fn orthotropic_law_passes_verification() {
    let con = SolidConstitutive::<f64>::new(composite()).with_thickness_design_var(2.0, 0, 0.1, 5.0);
    let report = ConstitutiveVerifier::new(&con).test_all();
    assert!(report.passed, "{report:?}");
}

#[test]
fn law_passes_complex_step_verification() {
    for props in [aluminium(), composite()] {
        let con = SolidConstitutive::<Complex<f64>>::new(props).with_thickness_design_var(0.5, 0, 0.1, 1.0);
        let verifier = ConstitutiveVerifier::new(&con);
        assert_eq!(verifier.config(), &VerificationConfig::for_scalar::<Complex<f64>>());
        let report = verifier.test_all();
        assert!(report.passed, "{report:?}");
    }
}

#[test]
fn verification_detects_wrong_direction_length() {
    let con = SolidConstitutive::<f64>::new(aluminium()).with_thickness_design_var(0.5, 3, 0.1, 1.0);
    let report = ConstitutiveVerifier::new(&con).test_stress_dv_sens(&[1.0, 1.0]);
    assert!(!report.passed);
}

#[test]
fn concurrent_evaluation_matches_sequential() {
    let con = Arc::new(SolidConstitutive::<f64>::new(aluminium()).with_thickness(0.5));
    let strains: Vec<[f64; 6]> = (0..1000)
        .map(|i| {
            let x = 1e-6 * i as f64;
            [x, -x, 0.5 * x, x, 0.0, 2.0 * x]
        })
        .collect();

    let evaluate = |strain: &[f64; 6]| {
        let x = Point3::origin();
        let point = QuadraturePoint::new(&x);
        let mut stress = [0.0; 6];
        con.eval_stress(&point, strain, &mut stress);
        (stress, con.eval_failure(&point, strain))
    };

    let sequential: Vec<_> = strains.iter().map(evaluate).collect();
    let parallel: Vec<_> = strains.par_iter().map(evaluate).collect();
    assert_eq!(sequential, parallel);
}

proptest! {
    #[test]
    fn stress_is_linear_in_strain(e1 in weakform::proptest::strain(6), e2 in weakform::proptest::strain(6)) {
        let con = SolidConstitutive::<f64>::new(composite());
        let x = origin();
        let point = QuadraturePoint::new(&x);

        let sum: Vec<f64> = e1.iter().zip(&e2).map(|(a, b)| a + b).collect();
        let (mut s1, mut s2, mut s_sum) = ([0.0; 6], [0.0; 6], [0.0; 6]);
        con.eval_stress(&point, &e1, &mut s1);
        con.eval_stress(&point, &e2, &mut s2);
        con.eval_stress(&point, &sum, &mut s_sum);

        let expected: Vec<f64> = s1.iter().zip(&s2).map(|(a, b)| a + b).collect();
        assert_matrix_eq!(DVector::from_column_slice(&s_sum), DVector::from_vec(expected), comp = abs, tol = 1e-3);
    }

    #[test]
    fn failure_is_positively_homogeneous(e in weakform::proptest::strain(6), scale in 0.0..10.0f64) {
        let con = SolidConstitutive::<f64>::new(aluminium());
        let x = origin();
        let point = QuadraturePoint::new(&x);

        let scaled: Vec<f64> = e.iter().map(|e_i| scale * e_i).collect();
        let failure = con.eval_failure(&point, &e);
        prop_assert!(failure >= 0.0);
        let scaled_failure = con.eval_failure(&point, &scaled);
        prop_assert!((scaled_failure - scale * failure).abs() <= 1e-9 * (1.0 + scale * failure));
    }
}
