use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use weakform_traits::DiffScalar;

/// Approximates the derivative of the function `f: R^n -> R` with finite differences.
///
/// The parameter `h` determines the step size of the finite difference approximation. Depending
/// on the scalar type, the input is perturbed along the real axis (central differences) or the
/// imaginary axis (complex step), see [`DiffScalar`].
///
/// The vector `x` is mutable in order to contain intermediate computations, but upon returning,
/// its content remains unchanged.
pub fn approximate_gradient_fd<'a, T>(
    f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: f64,
) -> DVector<f64>
where
    T: DiffScalar,
{
    let x = x.into();
    let mut df = DVector::zeros(x.len());
    approximate_gradient_fd_into_(DVectorViewMut::from(&mut df), f, x, h);
    df
}

/// Approximates the derivative of the function `f: R^n -> R` with finite differences.
///
/// Analogous to [`approximate_gradient_fd`], but stores the result in the provided
/// output vector.
pub fn approximate_gradient_fd_into<'a, T>(
    df: DVectorViewMut<f64>,
    f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: f64,
) where
    T: DiffScalar,
{
    approximate_gradient_fd_into_(df, f, x.into(), h);
}

fn approximate_gradient_fd_into_<T>(
    mut df: DVectorViewMut<f64>,
    mut f: impl FnMut(DVectorView<T>) -> T,
    mut x: DVectorViewMut<T>,
    h: f64,
) where
    T: DiffScalar,
{
    assert_eq!(df.len(), x.len(), "Output dimension must match input dimension");
    let n = x.len();
    let dx = T::perturbation(h);
    for i in 0..n {
        let x_i = x[i];
        x[i] = x_i + dx;
        let f_plus = f(DVectorView::from(&x));
        x[i] = x_i - dx;
        let f_minus = f(DVectorView::from(&x));
        df[i] = T::difference_quotient(f_plus, f_minus, h);
        x[i] = x_i;
    }
}

/// Approximates the derivative of `f: R^n -> R` along the direction `direction`,
///
/// $$ \lim_{h \rightarrow 0} \frac{f(\vec x + h \vec d) - f(\vec x - h \vec d)}{2h}. $$
///
/// Upon returning, `x` holds its original content.
pub fn approximate_directional_derivative_fd<'a, T>(
    mut f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    direction: DVectorView<f64>,
    h: f64,
) -> f64
where
    T: DiffScalar,
{
    let mut x = x.into();
    assert_eq!(x.len(), direction.len(), "Direction must have the same dimension as x");
    let x0 = x.clone_owned();
    let dx = T::perturbation(h);

    for (x_i, (x0_i, d_i)) in x.iter_mut().zip(x0.iter().zip(direction.iter())) {
        *x_i = *x0_i + dx * T::from_real(*d_i);
    }
    let f_plus = f(DVectorView::from(&x));

    for (x_i, (x0_i, d_i)) in x.iter_mut().zip(x0.iter().zip(direction.iter())) {
        *x_i = *x0_i - dx * T::from_real(*d_i);
    }
    let f_minus = f(DVectorView::from(&x));

    x.copy_from(&x0);
    T::difference_quotient(f_plus, f_minus, h)
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with finite differences.
///
/// The Jacobian matrix is the $m \times n$ matrix whose entries are given by
/// $$ J_{ij} := \pd{f_i}{x_j}.$$
///
/// The parameter `h` determines the step size of the finite difference approximation.
pub fn approximate_jacobian_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: f64,
) -> DMatrix<f64>
where
    T: DiffScalar,
{
    let x = x.into();
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);
    approximate_jacobian_fd_into_(DMatrixViewMut::from(&mut jacobian), f, x, 0..n, h);
    jacobian
}

/// Approximates a single column of the Jacobian of $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$.
///
/// Same as [`approximate_jacobian_fd`], but only perturbs the input with index `column`.
pub fn approximate_jacobian_column_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    column: usize,
    h: f64,
) -> DVector<f64>
where
    T: DiffScalar,
{
    let x = x.into();
    assert!(column < x.len(), "Column index out of bounds");
    let mut result = DMatrix::zeros(m, x.len());
    approximate_jacobian_fd_into_(DMatrixViewMut::from(&mut result), f, x, column..column + 1, h);
    result.column(column).clone_owned()
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with finite differences.
///
/// Same as [`approximate_jacobian_fd`], but stores the result in the provided output matrix.
pub fn approximate_jacobian_fd_into<'a, T>(
    jacobian: impl Into<DMatrixViewMut<'a, f64>>,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: f64,
) where
    T: DiffScalar,
{
    let x = x.into();
    let n = x.len();
    approximate_jacobian_fd_into_(jacobian.into(), f, x, 0..n, h);
}

fn approximate_jacobian_fd_into_<T>(
    mut j: DMatrixViewMut<f64>,
    mut f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    mut x: DVectorViewMut<T>,
    columns: std::ops::Range<usize>,
    h: f64,
) where
    T: DiffScalar,
{
    let m = j.nrows();
    let n = x.len();
    assert_eq!(n, j.ncols());

    // Buffers to hold f(x + e_i h) and f(x - e_i h)
    let mut f_plus = DVector::<T>::zeros(m);
    let mut f_minus = DVector::<T>::zeros(m);
    let dx = T::perturbation(h);

    for i in columns {
        // df_dxi ~ (f(x + h e_i) - f(x - h e_i)) / (2 h)
        let xi = x[i];
        x[i] = xi + dx;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_plus));
        x[i] = xi - dx;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_minus));
        x[i] = xi;

        for (df_dxi, (fp, fm)) in j
            .column_mut(i)
            .iter_mut()
            .zip(f_plus.iter().zip(f_minus.iter()))
        {
            *df_dxi = T::difference_quotient(*fp, *fm, h);
        }
    }
}
