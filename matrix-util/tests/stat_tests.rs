use approx::assert_abs_diff_eq;
use matrix_util::common_io::*;
use matrix_util::dmatrix_stat::*;
use matrix_util::traits::{PrincipalOps, RowStatOps};
use nalgebra::{DMatrix, DVector};

#[test]
fn zscore_then_correlate() {
    let xx = DMatrix::<f64>::from_fn(3, 8, |i, j| (i + 1) as f64 * j as f64 + (j % 3) as f64);
    let zz = xx.zscore_rows();
    let var = zz.row_variances();
    for i in 0..3 {
        assert_abs_diff_eq!(zz.row(i).mean(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(var[i], 1.0, epsilon = 1e-9);
    }

    // correlation is invariant to standardisation
    let v = DVector::<f64>::from_fn(8, |j, _| (j * j) as f64);
    for i in 0..3 {
        let x = xx.row(i).transpose();
        let z = zz.row(i).transpose();
        assert_abs_diff_eq!(pearson(&x, &v), pearson(&z, &v), epsilon = 1e-9);
    }

    // unit rows turn dot products into correlations
    let unit = xx.unit_rows();
    let r01 = unit.row(0).dot(&unit.row(1));
    let x0 = xx.row(0).transpose();
    let x1 = xx.row(1).transpose();
    assert_abs_diff_eq!(r01, pearson(&x0, &x1), epsilon = 1e-9);
}

#[test]
fn leading_component_of_two_groups() -> anyhow::Result<()> {
    // six variables, the first three go up with the columns, the rest down
    let xx = DMatrix::<f64>::from_fn(6, 10, |i, j| {
        let t = j as f64;
        if i < 3 {
            t + 0.1 * i as f64
        } else {
            -t + 0.05 * ((i * j) % 3) as f64
        }
    });
    let (scores, variances) = xx.principal_scores(2)?;
    assert!(variances[0] > 0.0);
    let r = pearson(
        &scores.column(0).into_owned(),
        &DVector::<f64>::from_fn(10, |j, _| j as f64),
    );
    assert_abs_diff_eq!(r.abs(), 1.0, epsilon = 1e-3);

    let unit = xx.unit_rows();
    assert!(mean_pairwise_correlation(&unit, &[0, 1, 2]) > 0.99);
    assert!(mean_pairwise_correlation(&unit, &[0, 3]) < -0.99);
    Ok(())
}

#[test]
fn read_matrix_lines_with_row_names() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("expr.tsv.gz");
    let file = file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec![
        "s1\ts2\ts3".into(),
        "g1\t1\t2\t3".into(),
        "g2\t4\t5\t6".into(),
    ];
    write_lines(&lines, file)?;

    let ReadLinesOut { lines, header } = read_lines_of_words_delim(file, detect_delimiter(file), 0)?;
    assert_eq!(header.len(), 3);
    assert_eq!(lines.len(), 2);

    let values: Vec<f64> = lines[1][1..].iter().map(|w| w.parse().unwrap()).collect();
    assert_eq!(median(&values), Some(5.0));
    assert_eq!(percentile(&values, 100.0), Some(6.0));
    Ok(())
}
