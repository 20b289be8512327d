use crate::traits::{PrincipalOps, RowStatOps};
use nalgebra::{DMatrix, DVector};

type Mat = DMatrix<f64>;
type DVec = DVector<f64>;

/// relative cutoff below which an eigenvalue counts as zero
const RANK_TOL: f64 = 1e-10;

impl PrincipalOps for Mat {
    type Mat = Mat;
    type DVec = DVec;

    /// Exact PCA through the smaller of the two Gram matrices, so a
    /// (genes x samples) matrix with many genes costs one
    /// (samples x samples) eigen-decomposition. No random
    /// initialization is involved: repeated calls return the same
    /// components.
    fn principal_scores(&self, max_rank: usize) -> anyhow::Result<(Mat, DVec)> {
        let (nvar, nobs) = (self.nrows(), self.ncols());
        if nvar == 0 || nobs < 2 {
            anyhow::bail!("need at least one row and two columns, got {} x {}", nvar, nobs);
        }

        let xc = self.centre_rows();

        let (eigenvalues, scores) = if nobs <= nvar {
            let gram = xc.transpose() * &xc;
            let (lambda, vv) = sorted_symmetric_eigen(gram, false);
            let scores = Mat::from_fn(nobs, lambda.len(), |i, k| {
                vv[(i, k)] * lambda[k].max(0.0).sqrt()
            });
            (lambda, scores)
        } else {
            let cov = &xc * xc.transpose();
            let (lambda, ww) = sorted_symmetric_eigen(cov, false);
            (lambda, xc.transpose() * ww)
        };

        let lambda_max = eigenvalues.iter().copied().fold(0.0_f64, f64::max);
        let rank = eigenvalues
            .iter()
            .take(max_rank)
            .take_while(|&&l| lambda_max > 0.0 && l > RANK_TOL * lambda_max)
            .count();

        let mut out = scores.columns(0, rank).into_owned();
        for mut s_k in out.column_iter_mut() {
            // fix the sign: the largest loading is positive
            let imax = s_k.iamax();
            if s_k[imax] < 0.0 {
                s_k.neg_mut();
            }
        }

        let variances = DVec::from_iterator(
            rank,
            eigenvalues.iter().take(rank).map(|l| l / (nobs - 1) as f64),
        );
        Ok((out, variances))
    }
}

/// Symmetric eigen-decomposition with eigenvalues sorted ascending
/// (`ascending = true`) or descending, eigenvectors permuted to match.
pub fn sorted_symmetric_eigen(mat: Mat, ascending: bool) -> (DVec, Mat) {
    let n = mat.nrows();
    let eig = mat.symmetric_eigen();
    let idx = argsort(&eig.eigenvalues, ascending);
    let values = DVec::from_iterator(n, idx.iter().map(|&i| eig.eigenvalues[i]));
    let vectors = Mat::from_fn(n, n, |r, c| eig.eigenvectors[(r, idx[c])]);
    (values, vectors)
}

/// Indices that sort `vals`; ties keep the original order
pub fn argsort(vals: &DVec, ascending: bool) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..vals.len()).collect();
    idx.sort_by(|&a, &b| {
        if ascending {
            vals[a].total_cmp(&vals[b])
        } else {
            vals[b].total_cmp(&vals[a])
        }
    });
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmatrix_stat::pearson;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rank_one_matrix() -> anyhow::Result<()> {
        // every row is a multiple of the same profile
        let profile = [1.0, -2.0, 0.5, 3.0, -1.0];
        let xx = Mat::from_fn(6, 5, |i, j| (i as f64 + 1.0) * profile[j]);

        let (scores, variances) = xx.principal_scores(3)?;
        assert_eq!(scores.ncols(), 1);
        assert_eq!(variances.len(), 1);

        let pc1 = scores.column(0).into_owned();
        let r = pearson(&pc1, &DVec::from_row_slice(&profile));
        assert_abs_diff_eq!(r.abs(), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_wide_and_tall_agree() -> anyhow::Result<()> {
        let xx = Mat::from_fn(4, 7, |i, j| ((i * 7 + j * 3) % 5) as f64 + 0.1 * j as f64);
        let (s_tall, _) = xx.principal_scores(1)?;

        // duplicate the rows so that the other Gram branch is taken
        let xx2 = Mat::from_fn(8, 7, |i, j| xx[(i % 4, j)]);
        let (s_wide, _) = xx2.principal_scores(1)?;

        let r = pearson(
            &s_tall.column(0).into_owned(),
            &s_wide.column(0).into_owned(),
        );
        assert_abs_diff_eq!(r.abs(), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_argsort() {
        let v = DVec::from_vec(vec![3.0, 1.0, 2.0]);
        assert_eq!(argsort(&v, true), vec![1, 2, 0]);
        assert_eq!(argsort(&v, false), vec![0, 2, 1]);
    }
}
