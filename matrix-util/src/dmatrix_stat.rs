use crate::traits::RowStatOps;
use nalgebra::{DMatrix, DVector};

type Mat = DMatrix<f64>;
type DVec = DVector<f64>;

const VAR_EPS: f64 = 1e-12;

impl RowStatOps for Mat {
    type Mat = Mat;
    type DVec = DVec;
    type Scalar = f64;

    fn zscore_rows(&self) -> Mat {
        let mut ret = self.clone();
        let nc = self.ncols();
        for mut x_i in ret.row_iter_mut() {
            let mu = x_i.mean();
            let ss: f64 = x_i.iter().map(|x| (x - mu) * (x - mu)).sum();
            let sd = if nc > 1 {
                (ss / (nc - 1) as f64).sqrt()
            } else {
                0.0
            };
            if sd > VAR_EPS.sqrt() && sd.is_finite() {
                x_i.apply(|x| *x = (*x - mu) / sd);
            } else {
                x_i.fill(0.0);
            }
        }
        ret
    }

    fn centre_rows(&self) -> Mat {
        let mut ret = self.clone();
        for mut x_i in ret.row_iter_mut() {
            let mu = x_i.mean();
            x_i.add_scalar_mut(-mu);
        }
        ret
    }

    fn unit_rows(&self) -> Mat {
        let mut ret = self.centre_rows();
        for mut x_i in ret.row_iter_mut() {
            let norm = x_i.norm();
            if norm > VAR_EPS.sqrt() && norm.is_finite() {
                x_i /= norm;
            } else {
                x_i.fill(0.0);
            }
        }
        ret
    }

    fn row_variances(&self) -> DVec {
        let nc = self.ncols();
        DVec::from_iterator(
            self.nrows(),
            self.row_iter().map(|x_i| {
                if nc < 2 {
                    return 0.0;
                }
                let mu = x_i.mean();
                x_i.iter().map(|x| (x - mu) * (x - mu)).sum::<f64>() / (nc - 1) as f64
            }),
        )
    }
}

/// Centre `v` and scale it to unit norm; `None` if it has no variance
pub fn unit_vector(v: &DVec) -> Option<DVec> {
    let mu = v.mean();
    let c = v.add_scalar(-mu);
    let norm = c.norm();
    if norm > VAR_EPS.sqrt() && norm.is_finite() {
        Some(c / norm)
    } else {
        None
    }
}

/// Pearson correlation; 0 when either side has no variance
pub fn pearson(x: &DVec, y: &DVec) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    match (unit_vector(x), unit_vector(y)) {
        (Some(ux), Some(uy)) => {
            let r = ux.dot(&uy);
            if r.is_finite() {
                r.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Percentile `q` in [0, 100] with linear interpolation between order
/// statistics. Non-finite values are ignored; `None` for no data.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_sorted(&sorted, q))
}

/// Same as [`percentile`] on data already sorted ascending
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lb = pos.floor() as usize;
    let ub = pos.ceil() as usize;
    let frac = pos - lb as f64;
    sorted[lb] + (sorted[ub] - sorted[lb]) * frac
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Mean Pearson correlation over all distinct pairs of `rows`, where
/// `unit` comes from [`RowStatOps::unit_rows`].
///
/// With unit rows `u_i`, `|Σ u_i|² = Σ_i Σ_j r_ij`, so the average over
/// pairs costs one pass over the selected rows.
pub fn mean_pairwise_correlation(unit: &Mat, rows: &[usize]) -> f64 {
    let g = rows.len();
    if g < 2 {
        return 0.0;
    }
    let mut acc = DVec::zeros(unit.ncols());
    let mut n_informative = 0_usize;
    for &i in rows {
        let u_i = unit.row(i);
        if u_i.norm() > 0.0 {
            n_informative += 1;
        }
        acc += u_i.transpose();
    }
    let total = acc.norm_squared() - n_informative as f64;
    let ret = total / (g * (g - 1)) as f64;
    if ret.is_finite() {
        ret
    } else {
        0.0
    }
}
