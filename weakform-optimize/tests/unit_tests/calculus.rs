use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use num::Complex;
use weakform_optimize::calculus::*;

fn simple_polynomial<T: weakform_traits::DiffScalar>(x: DVectorView<T>, mut f: DVectorViewMut<T>) {
    assert_eq!(x.len(), 2);
    let three = T::from_real(3.0);
    let five = T::from_real(5.0);
    let x1 = x[0];
    let x2 = x[1];
    f[0] = x1 * x2 + three;
    f[1] = x1 * x1 + x2 * x2 + x1 + five;
}

#[test]
fn approximate_jacobian_simple_function() {
    let mut x = DVector::from_column_slice(&[3.0, 4.0]);
    let j = approximate_jacobian_fd(2, simple_polynomial::<f64>, &mut x, 1e-6);

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 2,
                                           &[4.0, 3.0,
                                             7.0, 8.0]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
    // The input must be restored
    assert_eq!(x, DVector::from_column_slice(&[3.0, 4.0]));
}

#[test]
fn approximate_jacobian_complex_step_is_exact() {
    let mut x = DVector::from_column_slice(&[Complex::new(3.0, 0.0), Complex::new(4.0, 0.0)]);
    let j = approximate_jacobian_fd(2, simple_polynomial::<Complex<f64>>, &mut x, 1e-30);

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 2,
                                           &[4.0, 3.0,
                                             7.0, 8.0]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-14);
}

#[test]
fn approximate_jacobian_column_matches_full_jacobian() {
    let mut x = DVector::from_column_slice(&[-1.5, 2.0]);
    let full = approximate_jacobian_fd(2, simple_polynomial::<f64>, &mut x, 1e-6);
    let column = approximate_jacobian_column_fd(2, simple_polynomial::<f64>, &mut x, 1, 1e-6);

    assert_matrix_eq!(column, full.column(1), comp = abs, tol = 1e-12);
}

#[test]
fn test_approximate_gradient_fd() {
    // Define some function f and its gradient
    let f = |x: DVectorView<f64>| {
        let (x, y, z) = (x[0], x[1], x[2]);
        3.0 * x * x * x + 3.0 * x * y - 5.0 * z * z + 2.0
    };
    let f_grad = |x: DVectorView<f64>| {
        let (x, y, z) = (x[0], x[1], x[2]);
        DVector::from_column_slice(&[9.0 * x * x + 3.0 * y, 3.0 * x, -10.0 * z])
    };

    let mut x = DVector::from_column_slice(&[3.0, 4.0, 5.0]);
    let f_grad_fd = approximate_gradient_fd(f, &mut x, 1e-6);

    assert_matrix_eq!(f_grad_fd, f_grad(DVectorView::from(&x)), comp = abs, tol = 1e-6);
}

#[test]
fn directional_derivative_of_quadratic() {
    let f = |x: DVectorView<Complex<f64>>| x[0] * x[0] * x[1] + x[1];
    let mut x = DVector::from_column_slice(&[Complex::new(2.0, 0.0), Complex::new(-1.0, 0.0)]);
    let direction = DVector::from_column_slice(&[0.5, 2.0]);

    // grad f = [2 x0 x1, x0^2 + 1] = [-4, 5], so grad f . d = -2 + 10
    let df = approximate_directional_derivative_fd(f, &mut x, DVectorView::from(&direction), 1e-30);
    assert_scalar_eq!(df, 8.0, comp = abs, tol = 1e-14);
    assert_eq!(x[0], Complex::new(2.0, 0.0));
}
