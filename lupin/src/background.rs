//! Null model for "is this sample extreme for this gene".
//!
//! Each gene's values across samples are cut at their 1/3 and 2/3
//! empirical quantiles; every (gene, sample) cell gets a level
//! 0 (low), 1 (middle) or 2 (high). Under the null a sample lands in
//! any level with probability 1/3, which is what the membership tests
//! compare against.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use fnv::FnvHashMap as HashMap;
use matrix_util::dmatrix_stat::percentile_sorted;
use matrix_util::traits::RowStatOps;
use nalgebra::DMatrix;
use rayon::prelude::*;

pub const NUM_LEVELS: usize = 3;
pub const LEVEL_LOW: u8 = 0;
pub const LEVEL_MID: u8 = 1;
pub const LEVEL_HIGH: u8 = 2;

const VAR_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundModel {
    genes: Vec<GeneId>,
    samples: Vec<SampleId>,
    levels: DMatrix<u8>,
    informative: Vec<bool>,
    gene_index: HashMap<GeneId, usize>,
}

/// Level codes of one gene, or `None` for a gene without variance
fn gene_levels(row: &[f64], var: f64) -> Option<Vec<u8>> {
    if row.len() < 2 || !(var > VAR_EPS) {
        return None;
    }

    let mut sorted = row.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let low = percentile_sorted(&sorted, 100.0 / 3.0);
    let high = percentile_sorted(&sorted, 200.0 / 3.0);

    Some(
        row.iter()
            .map(|&x| {
                if x <= low {
                    LEVEL_LOW
                } else if x <= high {
                    LEVEL_MID
                } else {
                    LEVEL_HIGH
                }
            })
            .collect(),
    )
}

impl BackgroundModel {
    /// Discretise every gene of `expr` into tercile levels
    pub fn build(expr: &ExpressionMatrix) -> Result<Self> {
        let (ng, ns) = (expr.num_genes(), expr.num_samples());
        if ng == 0 || ns == 0 {
            return Err(MinerError::invalid("cannot build a background on an empty matrix"));
        }

        let mat = expr.mat();
        let variances = mat.row_variances();
        let per_gene: Vec<Option<Vec<u8>>> = (0..ng)
            .into_par_iter()
            .map(|i| {
                let row: Vec<f64> = mat.row(i).iter().copied().collect();
                gene_levels(&row, variances[i])
            })
            .collect();

        let informative: Vec<bool> = per_gene.iter().map(|x| x.is_some()).collect();
        let levels = DMatrix::<u8>::from_fn(ng, ns, |i, j| match &per_gene[i] {
            Some(codes) => codes[j],
            None => LEVEL_MID,
        });

        let n_flat = informative.iter().filter(|&&b| !b).count();
        if n_flat > 0 {
            debug!("{} of {} genes have no variance", n_flat, ng);
        }

        Ok(Self {
            genes: expr.genes().to_vec(),
            samples: expr.samples().to_vec(),
            levels,
            informative,
            gene_index: expr.genes().iter().cloned().zip(0..ng).collect(),
        })
    }

    pub fn genes(&self) -> &[GeneId] {
        &self.genes
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn level(&self, gene_row: usize, sample: usize) -> u8 {
        self.levels[(gene_row, sample)]
    }

    pub fn is_informative(&self, gene_row: usize) -> bool {
        self.informative[gene_row]
    }

    /// Rows of the informative genes of `genes`, in set order
    pub fn informative_rows(&self, genes: &GeneSet) -> Vec<usize> {
        genes
            .iter()
            .filter_map(|g| self.gene_index.get(g).copied())
            .filter(|&i| self.informative[i])
            .collect()
    }

    /// How many of `rows` sit at each level in `sample`
    pub fn level_counts(&self, rows: &[usize], sample: usize) -> [usize; NUM_LEVELS] {
        let mut counts = [0; NUM_LEVELS];
        for &i in rows {
            counts[self.levels[(i, sample)] as usize] += 1;
        }
        counts
    }
}
