//! One-dimensional summaries of gene clusters across samples.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use matrix_util::dmatrix_stat::{median, pearson};
use matrix_util::traits::PrincipalOps;
use rayon::prelude::*;

/// Clusters x samples matrix of per-cluster summaries, rows in
/// ascending cluster index
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMatrix {
    pub clusters: Vec<usize>,
    pub samples: Vec<SampleId>,
    pub mat: Mat,
}

/// First principal component score vector of each cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAxes {
    samples: Vec<SampleId>,
    axes: BTreeMap<usize, DVec>,
}

impl ClusterAxes {
    pub fn get(&self, cluster: usize) -> Option<&DVec> {
        self.axes.get(&cluster)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &DVec)> {
        self.axes.iter()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn to_cluster_matrix(&self) -> ClusterMatrix {
        let clusters: Vec<usize> = self.axes.keys().copied().collect();
        let mat = Mat::from_fn(clusters.len(), self.samples.len(), |k, j| {
            self.axes[&clusters[k]][j]
        });
        ClusterMatrix {
            clusters,
            samples: self.samples.clone(),
            mat,
        }
    }
}

/// Column means of a genes x samples block
fn mean_profile(sub: &Mat) -> DVec {
    DVec::from_iterator(sub.ncols(), sub.column_iter().map(|c| c.mean()))
}

/// PC1 scores of a genes x samples block, pointing the same way as the
/// block's mean profile. `None` if the block has no variance.
pub fn first_principal_axis(sub: &Mat) -> Option<DVec> {
    let (scores, _) = sub.principal_scores(1).ok()?;
    if scores.ncols() == 0 {
        return None;
    }
    let mut axis = scores.column(0).into_owned();
    if pearson(&axis, &mean_profile(sub)) < 0.0 {
        axis.neg_mut();
    }
    Some(axis)
}

/// First principal axis of every cluster with at least
/// `min_number_genes` measured genes. Clusters without a usable axis
/// are left out.
pub fn principal_axes(
    clusters: &ClusterDict,
    expr: &ExpressionMatrix,
    min_number_genes: usize,
) -> Result<ClusterAxes> {
    let jobs: Vec<(&usize, &GeneSet)> = clusters.iter().collect();

    let axes: BTreeMap<usize, DVec> = jobs
        .par_iter()
        .filter_map(|&(&k, genes)| {
            let rows = expr.gene_rows(genes);
            if rows.len() < min_number_genes.max(1) {
                debug!("cluster {}: {} measured genes, no axis", k, rows.len());
                return None;
            }
            match first_principal_axis(&expr.rows(&rows)) {
                Some(axis) => Some((k, axis)),
                None => {
                    warn!("cluster {}: degenerate expression, no axis", k);
                    None
                }
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    info!("principal axes for {} of {} clusters", axes.len(), clusters.len());

    Ok(ClusterAxes {
        samples: expr.samples().to_vec(),
        axes,
    })
}

/// Median expression of each cluster in each sample; clusters without
/// measured genes are left out
pub fn cluster_median_matrix(expr: &ExpressionMatrix, clusters: &ClusterDict) -> ClusterMatrix {
    let rows_of: Vec<(usize, Vec<usize>)> = clusters
        .iter()
        .map(|(&k, genes)| (k, expr.gene_rows(genes)))
        .filter(|(_, rows)| !rows.is_empty())
        .collect();

    let ns = expr.num_samples();
    let medians: Vec<Vec<f64>> = rows_of
        .par_iter()
        .map(|(_, rows)| {
            (0..ns)
                .map(|j| {
                    let col: Vec<f64> = rows.iter().map(|&i| expr.mat()[(i, j)]).collect();
                    median(&col).unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    ClusterMatrix {
        clusters: rows_of.iter().map(|(k, _)| *k).collect(),
        samples: expr.samples().to_vec(),
        mat: Mat::from_fn(medians.len(), ns, |k, j| medians[k][j]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn block() -> ExpressionMatrix {
        let genes = (0..4).map(|i| format!("g{}", i).into_boxed_str()).collect();
        let samples = (0..5).map(|j| format!("s{}", j).into_boxed_str()).collect();
        let base = [1.0, 3.0, 2.0, 5.0, 4.0];
        let mat = Mat::from_fn(4, 5, |i, j| {
            if i < 3 {
                (i + 1) as f64 * base[j]
            } else {
                7.0
            }
        });
        ExpressionMatrix::new(genes, samples, mat).unwrap()
    }

    #[test]
    fn test_axis_follows_mean_profile() -> Result<()> {
        let expr = block();
        let mut clusters = ClusterDict::new();
        clusters.insert(0, ["g0", "g1", "g2"].iter().map(|&g| g.into()).collect());
        clusters.insert(1, ["g3"].iter().map(|&g| g.into()).collect());

        let axes = principal_axes(&clusters, &expr, 2)?;
        assert_eq!(axes.len(), 1);
        let axis = axes.get(0).unwrap();
        let base = DVec::from_vec(vec![1.0, 3.0, 2.0, 5.0, 4.0]);
        assert_abs_diff_eq!(pearson(axis, &base), 1.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_cluster_medians() {
        let expr = block();
        let mut clusters = ClusterDict::new();
        clusters.insert(3, ["g0", "g1", "g2"].iter().map(|&g| g.into()).collect());
        clusters.insert(5, ["nope"].iter().map(|&g| g.into()).collect());
        let med = cluster_median_matrix(&expr, &clusters);
        assert_eq!(med.clusters, vec![3]);
        // median of 1x, 2x, 3x the base profile is 2x
        assert_abs_diff_eq!(med.mat[(0, 3)], 10.0);
    }
}
