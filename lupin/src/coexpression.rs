//! Seed-and-grow clustering of co-expressed genes.
//!
//! Each round decomposes the residual (genes not yet clustered) x
//! (samples still active) submatrix into its leading principal
//! components. The genes most correlated with a component, at either
//! tail, seed a cluster that then grows around its own centroid. Samples
//! that drove the accepted clusters are set aside so the next round can
//! pick up weaker structure in the remaining samples.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use matrix_util::dmatrix_stat::{percentile, unit_vector};
use matrix_util::traits::{PrincipalOps, RowStatOps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoexpressionArgs {
    /// smallest cluster worth keeping
    pub min_number_genes: usize,
    /// percentile (0-100) of all values that counts as over-expressed
    pub over_expression_threshold: f64,
    /// controls the number of rounds: `round(10 * max_samples_excluded)`
    pub max_samples_excluded: f64,
    /// principal components examined per round
    pub num_components: usize,
    /// correlation with the centroid needed to join a cluster
    pub acceptance_correlation: f64,
    pub max_grow_iter: usize,
    /// share of the active samples a cluster must be over-expressed in
    /// (at least one sample)
    pub min_over_expressed_fraction: f64,
    /// share of the active samples set aside after each round
    pub sample_exclusion_fraction: f64,
}

impl Default for CoexpressionArgs {
    fn default() -> Self {
        Self {
            min_number_genes: 6,
            over_expression_threshold: 80.0,
            max_samples_excluded: 0.5,
            num_components: 10,
            acceptance_correlation: 0.5,
            max_grow_iter: 20,
            min_over_expressed_fraction: 0.05,
            sample_exclusion_fraction: 0.1,
        }
    }
}

impl CoexpressionArgs {
    pub fn validate(&self) -> Result<()> {
        if self.min_number_genes == 0 {
            return Err(MinerError::invalid("min_number_genes must be positive"));
        }
        if !(0.0..=100.0).contains(&self.over_expression_threshold) {
            return Err(MinerError::invalid(format!(
                "over_expression_threshold must be a percentile in [0, 100], got {}",
                self.over_expression_threshold
            )));
        }
        if !(self.acceptance_correlation > 0.0 && self.acceptance_correlation <= 1.0) {
            return Err(MinerError::invalid(format!(
                "acceptance_correlation must be in (0, 1], got {}",
                self.acceptance_correlation
            )));
        }
        if !(0.0..=1.0).contains(&self.min_over_expressed_fraction) {
            return Err(MinerError::invalid(format!(
                "min_over_expressed_fraction must be in [0, 1], got {}",
                self.min_over_expressed_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.sample_exclusion_fraction) {
            return Err(MinerError::invalid(format!(
                "sample_exclusion_fraction must be in [0, 1), got {}",
                self.sample_exclusion_fraction
            )));
        }
        Ok(())
    }

    pub fn max_steps(&self) -> usize {
        ((10.0 * self.max_samples_excluded).round() as usize).max(1)
    }

    /// Over-expressed samples needed among `num_active`
    pub fn min_over_expressed_samples(&self, num_active: usize) -> usize {
        ((self.min_over_expressed_fraction * num_active as f64).ceil() as usize).max(1)
    }
}

/// Residual submatrix of one round, with unit-norm centred rows so a
/// matrix-vector product gives Pearson correlations
struct RoundData {
    genes: Vec<usize>,
    samples: Vec<usize>,
    sub: Mat,
    unit: Mat,
}

impl RoundData {
    fn new(expr: &ExpressionMatrix, genes: Vec<usize>, samples: Vec<usize>) -> Self {
        let sub = expr.mat().select_rows(genes.iter()).select_columns(samples.iter());
        let unit = sub.unit_rows();
        Self {
            genes,
            samples,
            sub,
            unit,
        }
    }

    /// Correlation of every residual gene with `profile`
    fn correlate(&self, profile: &DVec) -> Option<DVec> {
        unit_vector(profile).map(|u| &self.unit * u)
    }

    /// Mean profile of `members` (local indices) over the active samples
    fn centroid(&self, members: &[usize]) -> DVec {
        let mut acc = DVec::zeros(self.samples.len());
        for &i in members {
            acc += self.sub.row(i).transpose();
        }
        acc / members.len().max(1) as f64
    }

    /// Grow a cluster from `seed` until membership stops changing.
    /// Genes flagged in `taken` are never recruited.
    fn grow(&self, seed: Vec<usize>, taken: &[bool], args: &CoexpressionArgs) -> Vec<usize> {
        let mut members = seed;
        for _ in 0..args.max_grow_iter {
            if members.is_empty() {
                break;
            }
            let Some(r) = self.correlate(&self.centroid(&members)) else {
                break;
            };
            let next: Vec<usize> = (0..self.genes.len())
                .filter(|&i| !taken[i] && r[i] >= args.acceptance_correlation)
                .collect();
            if next == members {
                break;
            }
            members = next;
        }
        members
    }

    /// Active samples (local indices) where more than a third of
    /// `members` exceed `threshold`
    fn over_expressed_samples(&self, members: &[usize], threshold: f64) -> Vec<usize> {
        let need = members.len() as f64 / 3.0;
        (0..self.samples.len())
            .filter(|&j| {
                let above = members
                    .iter()
                    .filter(|&&i| self.sub[(i, j)] > threshold)
                    .count();
                above as f64 > need
            })
            .collect()
    }
}

/// Seed genes of one component: both tails of the correlation
/// distribution, each tail its own seed
fn component_seeds(r: &DVec, taken: &[bool]) -> Vec<Vec<usize>> {
    let rr: Vec<f64> = r.iter().copied().collect();
    let (Some(p95), Some(p05)) = (percentile(&rr, 95.0), percentile(&rr, 5.0)) else {
        return vec![];
    };
    let hi = p95.max(0.1);
    let lo = p05.min(-0.1);

    let pos: Vec<usize> = (0..rr.len()).filter(|&i| !taken[i] && rr[i] >= hi).collect();
    let neg: Vec<usize> = (0..rr.len()).filter(|&i| !taken[i] && rr[i] <= lo).collect();
    [pos, neg].into_iter().filter(|s| !s.is_empty()).collect()
}

/// Cluster co-expressed genes of `expr`.
///
/// Deterministic for a fixed matrix and arguments. The result is sorted
/// by size, largest first, ties broken by the first gene ID.
pub fn cluster(expr: &ExpressionMatrix, args: &CoexpressionArgs) -> Result<Vec<GeneSet>> {
    args.validate()?;

    let all_values: Vec<f64> = expr.mat().iter().copied().collect();
    let expression_threshold = percentile(&all_values, args.over_expression_threshold)
        .ok_or_else(|| MinerError::invalid("expression matrix has no finite values"))?;

    info!(
        "Clustering {} genes x {} samples; over-expression cut {:.3} ({}th percentile)",
        expr.num_genes(),
        expr.num_samples(),
        expression_threshold,
        args.over_expression_threshold
    );

    let mut residual: Vec<usize> = (0..expr.num_genes()).collect();
    let mut active: Vec<usize> = (0..expr.num_samples()).collect();
    let mut clusters: Vec<GeneSet> = vec![];

    for step in 0..args.max_steps() {
        if residual.len() < args.min_number_genes || active.len() < 3 {
            debug!("step {}: nothing left to cluster", step);
            break;
        }

        let round = RoundData::new(expr, residual.clone(), active.clone());
        let scores = match round.sub.principal_scores(args.num_components) {
            Ok((scores, _)) => scores,
            Err(err) => {
                debug!("step {}: no principal components: {}", step, err);
                break;
            }
        };

        let min_hits = args.min_over_expressed_samples(round.samples.len());
        let mut taken = vec![false; round.genes.len()];
        let mut sample_hits = vec![0_usize; round.samples.len()];
        let mut num_mapped = 0;

        for score in scores.column_iter() {
            let Some(r) = round.correlate(&score.into_owned()) else {
                continue;
            };
            for seed in component_seeds(&r, &taken) {
                let members = round.grow(seed, &taken, args);
                if members.len() < args.min_number_genes {
                    continue;
                }
                let hits = round.over_expressed_samples(&members, expression_threshold);
                if hits.len() < min_hits {
                    debug!(
                        "step {}: {} genes rejected, over-expressed in {} samples",
                        step,
                        members.len(),
                        hits.len()
                    );
                    continue;
                }
                for &j in hits.iter() {
                    sample_hits[j] += 1;
                }
                for &i in members.iter() {
                    taken[i] = true;
                }
                clusters.push(
                    members
                        .iter()
                        .map(|&i| expr.genes()[round.genes[i]].clone())
                        .collect(),
                );
                num_mapped += 1;
            }
        }

        if num_mapped == 0 {
            debug!("step {}: no cluster mapped", step);
            break;
        }

        residual = (0..round.genes.len())
            .filter(|&i| !taken[i])
            .map(|i| round.genes[i])
            .collect();

        let num_drop =
            (args.sample_exclusion_fraction * round.samples.len() as f64).ceil() as usize;
        let mut order: Vec<usize> = (0..round.samples.len())
            .filter(|&j| sample_hits[j] > 0)
            .collect();
        order.sort_by(|&a, &b| sample_hits[b].cmp(&sample_hits[a]).then(a.cmp(&b)));
        let mut keep = vec![true; round.samples.len()];
        for &j in order.iter().take(num_drop) {
            keep[j] = false;
        }
        active = (0..round.samples.len())
            .filter(|&j| keep[j])
            .map(|j| round.samples[j])
            .collect();

        info!(
            "step {}: {} clusters mapped, {} genes and {} samples remain",
            step,
            num_mapped,
            residual.len(),
            active.len()
        );
    }

    clusters.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.iter().next().cmp(&b.iter().next()))
    });

    info!("{} co-expression clusters", clusters.len());
    Ok(clusters)
}
