use approx::assert_abs_diff_eq;
use matrix_util::dmatrix_pca::sorted_symmetric_eigen;
use matrix_util::graph::*;
use nalgebra::DMatrix;

#[test]
fn path_graph_spectrum() -> anyhow::Result<()> {
    let n = 4;
    let adj = DMatrix::<f64>::from_fn(n, n, |i, j| if i.abs_diff(j) == 1 { 1.0 } else { 0.0 });
    let lap = graph_laplacian(&adj)?;
    let (lambda, vectors) = sorted_symmetric_eigen(lap.clone(), true);

    for (k, &l) in lambda.iter().enumerate() {
        let expected = 2.0 - 2.0 * (k as f64 * std::f64::consts::PI / n as f64).cos();
        assert_abs_diff_eq!(l, expected, epsilon = 1e-9);
    }

    // L v = lambda v, column by column
    for k in 0..n {
        let v = vectors.column(k).into_owned();
        let lv = &lap * &v;
        for i in 0..n {
            assert_abs_diff_eq!(lv[i], lambda[k] * v[i], epsilon = 1e-9);
        }
    }
    Ok(())
}

#[test]
fn components_follow_thresholded_weights() {
    let w = DMatrix::<f64>::from_row_slice(
        5,
        5,
        &[
            0.0, 0.9, 0.1, 0.0, 0.0, //
            0.9, 0.0, 0.2, 0.0, 0.0, //
            0.1, 0.2, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, 0.6, //
            0.0, 0.0, 0.0, 0.6, 0.0,
        ],
    );
    assert_eq!(edges_above(&w, 0.5), vec![(0, 1), (3, 4)]);
    assert_eq!(
        connected_components(5, &edges_above(&w, 0.5)),
        vec![vec![0, 1], vec![2], vec![3, 4]]
    );
    assert_eq!(
        connected_components(5, &edges_above(&w, 0.05)),
        vec![vec![0, 1, 2], vec![3, 4]]
    );
}

#[test]
fn non_square_adjacency_is_rejected() {
    let adj = DMatrix::<f64>::zeros(2, 3);
    assert!(graph_laplacian(&adj).is_err());
}
