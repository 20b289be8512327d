//! Merge redundant clusters and drop those that are not more coherent
//! than random gene sets.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use crate::principal::first_principal_axis;
use indicatif::ParallelProgressIterator;
use matrix_util::dmatrix_stat::{mean_pairwise_correlation, pearson};
use matrix_util::graph::UnionFind;
use matrix_util::traits::RowStatOps;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionArgs {
    pub min_number_genes: usize,
    /// clusters whose principal axes correlate at least this much merge
    pub correlation_threshold: f64,
    /// merge rounds
    pub max_iter: usize,
    /// permutation p-value cut for internal coherence
    pub p_value: f64,
    /// random gene sets per cluster; 0 skips the coherence test
    pub num_permutations: usize,
    pub seed: u64,
}

impl Default for RevisionArgs {
    fn default() -> Self {
        Self {
            min_number_genes: 6,
            correlation_threshold: 0.925,
            max_iter: 5,
            p_value: 0.05,
            num_permutations: 200,
            seed: 42,
        }
    }
}

impl RevisionArgs {
    pub fn validate(&self) -> Result<()> {
        if self.min_number_genes == 0 {
            return Err(MinerError::invalid("min_number_genes must be positive"));
        }
        if !(-1.0..=1.0).contains(&self.correlation_threshold) {
            return Err(MinerError::invalid(format!(
                "correlation_threshold must be in [-1, 1], got {}",
                self.correlation_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.p_value) {
            return Err(MinerError::invalid(format!(
                "p_value must be in [0, 1], got {}",
                self.p_value
            )));
        }
        Ok(())
    }
}

/// One round of merging. Returns the merged clusters, each group
/// listed under its lowest input index.
fn merge_round(
    clusters: &[Vec<usize>],
    expr: &ExpressionMatrix,
    correlation_threshold: f64,
) -> Vec<Vec<usize>> {
    let n = clusters.len();

    let axes: Vec<Option<DVec>> = clusters
        .par_iter()
        .map(|rows| first_principal_axis(&expr.rows(rows)))
        .collect();

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let linked: Vec<bool> = pairs
        .par_iter()
        .map(|&(i, j)| {
            if clusters[i] == clusters[j] {
                return true;
            }
            match (&axes[i], &axes[j]) {
                (Some(a), Some(b)) => pearson(a, b) >= correlation_threshold,
                _ => false,
            }
        })
        .collect();

    let mut uf = UnionFind::new(n);
    for (k, &(i, j)) in pairs.iter().enumerate() {
        if linked[k] {
            uf.union(i, j);
        }
    }

    uf.groups()
        .into_iter()
        .map(|group| {
            let mut rows: Vec<usize> = group
                .iter()
                .flat_map(|&k| clusters[k].iter().copied())
                .collect();
            rows.sort_unstable();
            rows.dedup();
            rows
        })
        .collect()
}

/// Permutation p-value of the mean pairwise correlation of `rows`
/// against random gene sets of the same size
fn coherence_p_value(unit: &Mat, rows: &[usize], num_permutations: usize, seed: u64) -> f64 {
    let observed = mean_pairwise_correlation(unit, rows);
    let mut rng = StdRng::seed_from_u64(seed);
    let ngenes = unit.nrows();
    let mut num_extreme = 0_usize;
    for _ in 0..num_permutations {
        let null_rows = rand::seq::index::sample(&mut rng, ngenes, rows.len()).into_vec();
        if mean_pairwise_correlation(unit, &null_rows) >= observed {
            num_extreme += 1;
        }
    }
    (1 + num_extreme) as f64 / (1 + num_permutations) as f64
}

/// Merge clusters with near-identical principal axes, then keep the
/// coherent ones.
///
/// Only measured genes are considered. The output is keyed `0..n` by
/// size, largest first; equal sizes keep their merged order.
pub fn revise(
    clusters: &[GeneSet],
    expr: &ExpressionMatrix,
    args: &RevisionArgs,
) -> Result<ClusterDict> {
    args.validate()?;

    let mut current: Vec<Vec<usize>> = clusters
        .iter()
        .map(|genes| {
            let mut rows = expr.gene_rows(genes);
            rows.sort_unstable();
            rows
        })
        .filter(|rows| !rows.is_empty())
        .collect();

    for iter in 0..args.max_iter {
        let before = current.len();
        current = merge_round(&current, expr, args.correlation_threshold);
        debug!("merge round {}: {} -> {} clusters", iter, before, current.len());
        if current.len() == before {
            break;
        }
    }

    let candidates: Vec<(usize, Vec<usize>)> = current
        .into_iter()
        .filter(|rows| rows.len() >= args.min_number_genes)
        .enumerate()
        .collect();

    let mut kept: Vec<Vec<usize>> = if args.num_permutations > 0 {
        let unit = expr.mat().unit_rows();
        let ntot = candidates.len() as u64;
        let p_values: Vec<f64> = candidates
            .par_iter()
            .progress_count(ntot)
            .map(|(idx, rows)| {
                coherence_p_value(
                    &unit,
                    rows,
                    args.num_permutations,
                    args.seed.wrapping_add(*idx as u64),
                )
            })
            .collect();

        candidates
            .into_iter()
            .zip(p_values)
            .filter_map(|((idx, rows), pv)| {
                if pv <= args.p_value {
                    Some(rows)
                } else {
                    debug!("cluster {} dropped, permutation p = {:.4}", idx, pv);
                    None
                }
            })
            .collect()
    } else {
        candidates.into_iter().map(|(_, rows)| rows).collect()
    };

    kept.sort_by(|a, b| b.len().cmp(&a.len()));

    let revised: ClusterDict = kept
        .into_iter()
        .enumerate()
        .map(|(k, rows)| (k, rows.iter().map(|&i| expr.genes()[i].clone()).collect()))
        .collect();

    if revised.is_empty() {
        warn!("no cluster survived revision");
    }
    info!(
        "{} clusters after revision (from {} candidates)",
        revised.len(),
        clusters.len()
    );
    Ok(revised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, StandardNormal};

    /// 10 genes following one profile plus 10 independent noise genes
    fn block_and_noise() -> ExpressionMatrix {
        let ns = 16;
        let mut rng = StdRng::seed_from_u64(7);
        let profile: Vec<f64> = (0..ns).map(|_| StandardNormal.sample(&mut rng)).collect();
        let mut rows = vec![];
        for _ in 0..10 {
            rows.push(
                profile
                    .iter()
                    .map(|&p| {
                        let e: f64 = StandardNormal.sample(&mut rng);
                        p + 0.1 * e
                    })
                    .collect::<Vec<f64>>(),
            );
        }
        for _ in 0..10 {
            rows.push((0..ns).map(|_| StandardNormal.sample(&mut rng)).collect());
        }
        let genes = (0..20).map(|i| format!("g{:02}", i).into_boxed_str()).collect();
        let samples = (0..ns).map(|j| format!("s{}", j).into_boxed_str()).collect();
        ExpressionMatrix::from_rows(genes, samples, &rows).unwrap()
    }

    #[test]
    fn test_identical_clusters_merge() -> Result<()> {
        let expr = block_and_noise();
        let a: GeneSet = expr.genes()[..10].iter().cloned().collect();
        let args = RevisionArgs {
            min_number_genes: 5,
            ..Default::default()
        };
        let revised = revise(&[a.clone(), a.clone()], &expr, &args)?;
        assert_eq!(revised.len(), 1);
        assert_eq!(revised[&0], a);
        Ok(())
    }

    #[test]
    fn test_noise_cluster_is_dropped() -> Result<()> {
        let expr = block_and_noise();
        let a: GeneSet = expr.genes()[..10].iter().cloned().collect();
        let noise: GeneSet = expr.genes()[10..].iter().cloned().collect();
        let args = RevisionArgs {
            min_number_genes: 5,
            ..Default::default()
        };
        let revised = revise(&[noise, a.clone()], &expr, &args)?;
        assert_eq!(revised.len(), 1);
        assert_eq!(revised[&0], a);
        Ok(())
    }

    #[test]
    fn test_revision_is_deterministic() -> Result<()> {
        let expr = block_and_noise();
        let a: GeneSet = expr.genes()[..6].iter().cloned().collect();
        let b: GeneSet = expr.genes()[4..10].iter().cloned().collect();
        let args = RevisionArgs {
            min_number_genes: 5,
            ..Default::default()
        };
        let first = revise(&[a.clone(), b.clone()], &expr, &args)?;
        let second = revise(&[a, b], &expr, &args)?;
        assert_eq!(first, second);
        Ok(())
    }
}
