use matrixcompare::assert_matrix_eq;
use nalgebra::DMatrix;
use weakform::jacobian::{jacobian_dim, jacobian_index, JacobianLayout};

#[test]
fn jacobian_indices_group_by_variable() {
    assert_eq!(jacobian_dim(2, 2), 10);
    assert_eq!(jacobian_index(2, 0, 0), 0);
    assert_eq!(jacobian_index(2, 0, 4), 4);
    assert_eq!(jacobian_index(2, 1, 0), 5);
    assert_eq!(jacobian_index(2, 1, 3), 8);
    assert_eq!(jacobian_dim(3, 3), 18);
    assert_eq!(jacobian_index(1, 1, 3), 7);
}

#[test]
fn sparse_layout_to_dense_and_coo() {
    let pairs = [(0, 0), (0, 2), (2, 1)];
    let layout = JacobianLayout::Sparse(&pairs);
    let values = [1.0, 2.0, 3.0];
    assert!(layout.is_sparse());
    assert_eq!(layout.num_values(3), 3);

    let dense = layout.to_dense(3, &values);
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, 0.0, 2.0,
        0.0, 0.0, 0.0,
        0.0, 3.0, 0.0,
    ]);
    assert_matrix_eq!(dense, expected);

    let coo = layout.to_coo(3, &values);
    assert_eq!(coo.nnz(), 3);
    let triplets: Vec<_> = coo.triplet_iter().map(|(i, j, v)| (i, j, *v)).collect();
    assert_eq!(triplets, vec![(0, 0, 1.0), (0, 2, 2.0), (2, 1, 3.0)]);
}

#[test]
fn dense_layout_is_row_major() {
    let layout = JacobianLayout::Dense;
    assert!(!layout.is_sparse());
    assert_eq!(layout.num_values(2), 4);

    let dense = layout.to_dense(2, &[1.0, 2.0, 3.0, 4.0]);
    assert_matrix_eq!(dense, DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn scatter_overwrites_output() {
    let pairs = [(1, 1)];
    let mut output = DMatrix::repeat(2, 2, 7.0);
    JacobianLayout::Sparse(&pairs).scatter_into(&[5.0], (&mut output).into());
    assert_matrix_eq!(output, DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 5.0]));
}
