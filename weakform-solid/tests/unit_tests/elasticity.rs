use super::{aluminium, assert_accumulates, composite, origin, to_complex};
use std::sync::Arc;
use weakform::jacobian::{jacobian_index, JacobianLayout};
use weakform::model::{ElementModel, QuantityType};
use weakform::nalgebra::{Matrix3, Point3};
use weakform::num::Complex;
use weakform::output::{ElementType, OutputFlags};
use weakform::point::{AdjointState, PointState, QuadraturePoint};
use weakform::verification::ModelVerifier;
use weakform_solid::{strain_from_gradient, LinearElasticity3D, SolidConstitutive};

const QUANTITIES: [QuantityType; 5] = [
    QuantityType::FailureIndex,
    QuantityType::StrainEnergyDensity,
    QuantityType::Density,
    QuantityType::DensityMoment,
    QuantityType::Displacement,
];

fn elasticity_model<T: weakform::DiffScalar>(
    props: Arc<weakform_solid::materials::MaterialProperties>,
) -> LinearElasticity3D<T, SolidConstitutive<T>> {
    let con = SolidConstitutive::new(props).with_thickness_design_var(0.8, 2, 0.1, 1.0);
    LinearElasticity3D::new(Arc::new(con))
}

#[test]
fn strain_from_displacement_gradient() {
    let ux = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
    assert_eq!(strain_from_gradient(&ux), [1.0, 5.0, 9.0, 14.0, 10.0, 6.0]);
}

#[test]
fn jacobian_layout_lists_inertia_and_gradient_block() {
    let model = elasticity_model::<f64>(aluminium());
    assert_eq!(model.jacobian_dim(), 18);

    let JacobianLayout::Sparse(pairs) = model.weak_jacobian_layout() else {
        panic!("elasticity must use a sparse layout");
    };
    assert_eq!(pairs.len(), 3 + 81);
    assert_eq!(&pairs[..3], &[(2, 2), (8, 8), (14, 14)]);
    assert_eq!(pairs[3], (jacobian_index(3, 0, 3), jacobian_index(3, 0, 3)));
    assert_eq!(pairs[3 + 80], (jacobian_index(3, 2, 5), jacobian_index(3, 2, 5)));
}

#[test]
fn weak_form_coefficients() {
    let props = aluminium();
    let model = elasticity_model::<f64>(props.clone());
    let x = origin();
    let point = QuadraturePoint::new(&x);

    let ut = [0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0];
    let ux = [1e-4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let (mut dut, mut dux) = ([1.0; 9], [1.0; 9]);
    model.eval_weak_integrand(&point, &PointState::new(&ut, &ux), &mut dut, &mut dux);

    let rho = 0.8 * 2700.0;
    assert_eq!(dut, [0.0, 0.0, rho, 0.0, 0.0, 2.0 * rho, 0.0, 0.0, 3.0 * rho]);

    // Uniaxial strain: only normal stresses, entering the diagonal of the gradient coefficients
    let c = props.tangent_stiffness_3d::<f64>();
    assert_eq!(dux[0], 0.8 * c[0] * 1e-4);
    assert_eq!(dux[4], 0.8 * c[1] * 1e-4);
    assert_eq!(dux[8], 0.8 * c[2] * 1e-4);
    for i in [1, 2, 3, 5, 6, 7] {
        assert_eq!(dux[i], 0.0);
    }
}

#[test]
fn elasticity_passes_verification() {
    for props in [aluminium(), composite()] {
        let model = elasticity_model::<f64>(props);
        let report = ModelVerifier::new(&model).test_all(&QUANTITIES);
        assert!(report.passed, "{report:?}");
    }
}

#[test]
fn elasticity_passes_complex_step_verification() {
    for props in [aluminium(), composite()] {
        let model = elasticity_model::<Complex<f64>>(props);
        let report = ModelVerifier::new(&model).test_all(&QUANTITIES);
        assert!(report.passed, "{report:?}");
    }
}

#[test]
fn verification_with_explicit_state() {
    let model = elasticity_model::<Complex<f64>>(composite());
    let ut = to_complex(&[0.1, 0.2, 0.3, -0.1, 0.4, -0.2, 0.05, 0.0, 1.0]);
    let ux = to_complex(&[1e-3, -2e-3, 0.5e-3, 0.0, 1e-4, -3e-4, 2e-4, 0.0, 1e-3]);
    let verifier = ModelVerifier::new(&model)
        .with_state(&ut, &ux)
        .with_position(Point3::new(Complex::new(1.0, 0.0), Complex::new(2.0, 0.0), Complex::new(-1.0, 0.0)));

    for column in 0..model.jacobian_dim() {
        assert!(verifier.test_jacobian(Some(column)).passed);
    }
    assert!(verifier.test_strain_sv_sens(QuantityType::FailureIndex).passed);
    assert!(verifier.test_jacobian_xpt_sens(QuantityType::DensityMoment).passed);
}

#[test]
fn verification_restores_design_variables() {
    let model = elasticity_model::<f64>(aluminium());
    let report = ModelVerifier::new(&model).test_adj_res_product(&[1.0]);
    assert!(report.passed);

    let mut dvs = [0.0];
    model.get_design_vars(0, &mut dvs);
    assert_eq!(dvs, [0.8]);
}

#[test]
fn unsupported_quantities_have_zero_length() {
    let model = elasticity_model::<f64>(aluminium());
    let x = origin();
    let point = QuadraturePoint::new(&x);
    let (ut, ux) = ([0.0; 9], [0.0; 9]);
    let state = PointState::new(&ut, &ux);

    let mut quantity = [1.0; 3];
    for quantity_type in [QuantityType::Temperature, QuantityType::HeatFlux, QuantityType::Concentration] {
        assert_eq!(
            model.eval_point_quantity(quantity_type, &point, &Matrix3::identity(), &state, &mut quantity),
            0
        );
    }
    assert_eq!(quantity, [1.0; 3]);

    // A too short buffer is a size query
    assert_eq!(
        model.eval_point_quantity(QuantityType::Displacement, &point, &Matrix3::identity(), &state, &mut quantity[..1]),
        3
    );
    assert_eq!(quantity, [1.0; 3]);
}

#[test]
fn output_rows() {
    let model = elasticity_model::<f64>(aluminium());
    let x = Point3::new(1.0, 2.0, 3.0);
    let point = QuadraturePoint::new(&x);
    let ut = [0.1, 0.0, 0.0, 0.2, 0.0, 0.0, 0.3, 0.0, 0.0];
    let ux = [1e-4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let state = PointState::new(&ut, &ux);

    let mut data = [0.0; 32];
    let len = model.output_data(&point, ElementType::Solid, OutputFlags::ALL, &state, &mut data);
    assert_eq!(len, 20);
    assert_eq!(&data[..6], &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3]);
    assert_eq!(&data[6..12], &[1e-4, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(data[19], 0.8 * 2700.0);

    let flags = OutputFlags::DISPLACEMENTS | OutputFlags::EXTRAS;
    let mut data = [0.0; 5];
    assert_eq!(model.output_data(&point, ElementType::Solid, flags, &state, &mut data), 5);
    assert_eq!(&data[..3], &[0.1, 0.2, 0.3]);

    // Other element types are not written, too short buffers report the row length
    let mut data = [-1.0; 4];
    assert_eq!(
        model.output_data(&point, ElementType::HeatConduction, OutputFlags::ALL, &state, &mut data),
        0
    );
    assert_eq!(model.output_data(&point, ElementType::Solid, flags, &state, &mut data), 5);
    assert_eq!(data, [-1.0; 4]);
}

#[test]
fn design_sensitivities_accumulate() {
    let model = elasticity_model::<f64>(aluminium());
    let x = Point3::new(1.0, -2.0, 0.5);
    let point = QuadraturePoint::new(&x);
    let ut = [0.0, 0.0, 1.0, 0.0, 0.0, -2.0, 0.0, 0.0, 3.0];
    let ux = [1e-4, 2e-4, 0.0, -1e-4, 3e-4, 0.5e-4, 0.0, 1e-4, -2e-4];
    let state = PointState::new(&ut, &ux);
    let psix = [0.1, -0.2, 0.3, 0.4, -0.5, 0.6, -0.7, 0.8, 0.9];
    let adjoint = AdjointState::new(&[0.5, 0.25, -1.0], &psix);

    assert_accumulates(1, |fdv_sens| model.add_weak_adj_product(&point, &state, &adjoint, 1.0, fdv_sens));
    let xd = Matrix3::identity();
    for quantity_type in [QuantityType::StrainEnergyDensity, QuantityType::Density, QuantityType::DensityMoment] {
        let dfdq = [0.3, -0.6, 0.9];
        let len = model.eval_point_quantity(quantity_type, &point, &xd, &state, &mut []);
        assert_accumulates(1, |dfdx| {
            model.add_point_quantity_dv_sens(quantity_type, 1.0, &point, &xd, &state, &dfdq[..len], dfdx)
        });
    }
}
