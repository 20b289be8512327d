//! Bicluster membership: which samples show coherent activity of a
//! gene cluster, and in which direction.

use crate::background::{BackgroundModel, LEVEL_HIGH, LEVEL_LOW, NUM_LEVELS};
use crate::common::*;
use crate::expression::ExpressionMatrix;
use crate::hypothesis_tests::binomial_upper_tail;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum MembershipLabel {
    /// coherent activity at the high level
    OverExpressed,
    /// coherent activity at the low level
    UnderExpressed,
    /// no coherent activity
    Excluded,
    /// coherent activity at any level
    Included,
}

impl MembershipLabel {
    pub const ALL: [MembershipLabel; 4] = [
        MembershipLabel::OverExpressed,
        MembershipLabel::UnderExpressed,
        MembershipLabel::Excluded,
        MembershipLabel::Included,
    ];

    pub fn accepts(&self, call: &ActivityCall) -> bool {
        match self {
            MembershipLabel::OverExpressed => call.significant && call.level == LEVEL_HIGH,
            MembershipLabel::UnderExpressed => call.significant && call.level == LEVEL_LOW,
            MembershipLabel::Excluded => !call.significant,
            MembershipLabel::Included => call.significant,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MembershipLabel::OverExpressed => "overexpressed",
            MembershipLabel::UnderExpressed => "underexpressed",
            MembershipLabel::Excluded => "dysregulated",
            MembershipLabel::Included => "coherent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipArgs {
    /// binomial tail probability at or below which a majority level is
    /// called significant
    pub p_value: f64,
}

impl Default for MembershipArgs {
    fn default() -> Self {
        Self { p_value: 0.05 }
    }
}

/// Activity of one cluster in one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityCall {
    /// majority background level among the informative genes
    pub level: u8,
    /// genes at that level
    pub count: usize,
    /// informative genes
    pub total: usize,
    pub significant: bool,
}

/// Smallest `k` with `P(X >= k) <= p_value`, `X ~ Binomial(n, 1/3)`
fn min_significant_count(n: usize, p_value: f64) -> Result<Option<usize>> {
    let null_pr = 1.0 / NUM_LEVELS as f64;
    for k in 1..=n {
        if binomial_upper_tail(k, n, null_pr)? <= p_value {
            return Ok(Some(k));
        }
    }
    Ok(None)
}

/// Per-sample activity of one gene set
pub fn activity_calls(
    genes: &GeneSet,
    background: &BackgroundModel,
    args: &MembershipArgs,
) -> Result<Vec<ActivityCall>> {
    let rows = background.informative_rows(genes);
    let ns = background.num_samples();

    if rows.len() < 2 {
        return Ok(vec![
            ActivityCall {
                level: 0,
                count: 0,
                total: rows.len(),
                significant: false,
            };
            ns
        ]);
    }

    let kmin = min_significant_count(rows.len(), args.p_value)?;

    Ok((0..ns)
        .map(|j| {
            let counts = background.level_counts(&rows, j);
            let mut level = 0;
            for l in 1..NUM_LEVELS {
                if counts[l] > counts[level] {
                    level = l;
                }
            }
            let count = counts[level];
            ActivityCall {
                level: level as u8,
                count,
                total: rows.len(),
                significant: kmin.is_some_and(|k| count >= k),
            }
        })
        .collect())
}

/// Samples carrying `label` for each cluster.
///
/// Every cluster gets an entry, possibly empty.
pub fn membership(
    clusters: &ClusterDict,
    background: &BackgroundModel,
    label: MembershipLabel,
    args: &MembershipArgs,
) -> Result<MembershipDictionary> {
    if !(0.0..=1.0).contains(&args.p_value) {
        return Err(MinerError::invalid(format!(
            "p_value must be in [0, 1], got {}",
            args.p_value
        )));
    }

    let jobs: Vec<(&usize, &GeneSet)> = clusters.iter().collect();
    let samples = background.samples();

    let members: Vec<(usize, SampleSet)> = jobs
        .par_iter()
        .map(|&(&k, genes)| {
            let calls = match activity_calls(genes, background, args) {
                Ok(calls) => calls,
                Err(err) => {
                    warn!("cluster {}: {}", k, err);
                    return (k, SampleSet::new());
                }
            };
            let set = calls
                .iter()
                .zip(samples.iter())
                .filter(|(call, _)| label.accepts(call))
                .map(|(_, s)| s.clone())
                .collect();
            (k, set)
        })
        .collect();

    let total: usize = members.iter().map(|(_, s)| s.len()).sum();
    info!(
        "{} membership: {} cluster-sample pairs over {} clusters",
        label.name(),
        total,
        members.len()
    );

    Ok(members.into_iter().collect())
}

/// All four label dictionaries of one set of clusters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MembershipSet {
    pub over_expressed: MembershipDictionary,
    pub under_expressed: MembershipDictionary,
    pub excluded: MembershipDictionary,
    pub included: MembershipDictionary,
}

impl MembershipSet {
    pub fn score(
        clusters: &ClusterDict,
        background: &BackgroundModel,
        args: &MembershipArgs,
    ) -> Result<Self> {
        Ok(Self {
            over_expressed: membership(clusters, background, MembershipLabel::OverExpressed, args)?,
            under_expressed: membership(clusters, background, MembershipLabel::UnderExpressed, args)?,
            excluded: membership(clusters, background, MembershipLabel::Excluded, args)?,
            included: membership(clusters, background, MembershipLabel::Included, args)?,
        })
    }

    pub fn get(&self, label: MembershipLabel) -> &MembershipDictionary {
        match label {
            MembershipLabel::OverExpressed => &self.over_expressed,
            MembershipLabel::UnderExpressed => &self.under_expressed,
            MembershipLabel::Excluded => &self.excluded,
            MembershipLabel::Included => &self.included,
        }
    }
}

/// Clusters x samples 0/1 matrix; rows in ascending cluster index,
/// columns in expression-matrix sample order
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceMatrix {
    pub clusters: Vec<usize>,
    pub samples: Vec<SampleId>,
    pub mat: Mat,
}

impl IncidenceMatrix {
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_member(&self, row: usize, sample: usize) -> bool {
        self.mat[(row, sample)] > 0.5
    }

    /// Back to one sample set per cluster
    pub fn to_membership(&self) -> MembershipDictionary {
        self.clusters
            .iter()
            .enumerate()
            .map(|(r, &k)| {
                let set = (0..self.num_samples())
                    .filter(|&j| self.is_member(r, j))
                    .map(|j| self.samples[j].clone())
                    .collect();
                (k, set)
            })
            .collect()
    }
}

pub fn membership_to_incidence(
    dict: &MembershipDictionary,
    expr: &ExpressionMatrix,
) -> Result<IncidenceMatrix> {
    let clusters: Vec<usize> = dict.keys().copied().collect();
    let mut mat = Mat::zeros(clusters.len(), expr.num_samples());
    for (r, set) in dict.values().enumerate() {
        for s in set {
            let j = expr.sample_index(s).ok_or_else(|| {
                MinerError::invalid(format!("sample {} is not in the expression matrix", s))
            })?;
            mat[(r, j)] = 1.0;
        }
    }
    Ok(IncidenceMatrix {
        clusters,
        samples: expr.samples().to_vec(),
        mat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_with_flat_cluster() -> ExpressionMatrix {
        // g0..g5 move together, f0..f2 are flat
        let ns = 12;
        let mut genes: Vec<GeneId> = (0..6).map(|i| format!("g{}", i).into_boxed_str()).collect();
        genes.extend((0..3).map(|i| format!("f{}", i).into_boxed_str()));
        let samples = (0..ns).map(|j| format!("s{:02}", j).into_boxed_str()).collect();
        let mat = Mat::from_fn(9, ns, |i, j| if i < 6 { (j + i) as f64 * 0.1 + j as f64 } else { 2.0 });
        ExpressionMatrix::new(genes, samples, mat).unwrap()
    }

    fn gene_set(names: &[&str]) -> GeneSet {
        names.iter().map(|&g| g.into()).collect()
    }

    #[test]
    fn test_binomial_cut() -> Result<()> {
        // P(X >= 6 | n = 6, p = 1/3) = 1/729, P(X >= 5) = 13/729
        assert_eq!(min_significant_count(6, 0.05)?, Some(5));
        assert_eq!(min_significant_count(2, 0.05)?, None);
        Ok(())
    }

    #[test]
    fn test_flat_cluster_is_excluded_everywhere() -> Result<()> {
        let expr = expr_with_flat_cluster();
        let bg = BackgroundModel::build(&expr)?;
        let mut clusters = ClusterDict::new();
        clusters.insert(0, gene_set(&["f0", "f1", "f2"]));

        let args = MembershipArgs::default();
        let excluded = membership(&clusters, &bg, MembershipLabel::Excluded, &args)?;
        assert_eq!(excluded[&0].len(), expr.num_samples());
        let included = membership(&clusters, &bg, MembershipLabel::Included, &args)?;
        assert!(included[&0].is_empty());
        Ok(())
    }

    #[test]
    fn test_coherent_cluster_labels() -> Result<()> {
        let expr = expr_with_flat_cluster();
        let bg = BackgroundModel::build(&expr)?;
        let mut clusters = ClusterDict::new();
        clusters.insert(4, gene_set(&["g0", "g1", "g2", "g3", "g4", "g5"]));
        let args = MembershipArgs::default();

        let over = membership(&clusters, &bg, MembershipLabel::OverExpressed, &args)?;
        let under = membership(&clusters, &bg, MembershipLabel::UnderExpressed, &args)?;
        let included = membership(&clusters, &bg, MembershipLabel::Included, &args)?;
        let excluded = membership(&clusters, &bg, MembershipLabel::Excluded, &args)?;

        // every gene increases with the sample index
        assert!(over[&4].contains("s11"));
        assert!(under[&4].contains("s00"));
        assert!(over[&4].is_subset(&included[&4]));
        assert!(under[&4].is_subset(&included[&4]));
        assert!(included[&4].is_disjoint(&excluded[&4]));
        assert_eq!(included[&4].len() + excluded[&4].len(), expr.num_samples());
        Ok(())
    }

    #[test]
    fn test_incidence_round_trip() -> Result<()> {
        let expr = expr_with_flat_cluster();
        let mut dict = MembershipDictionary::new();
        dict.insert(2, ["s03", "s01"].iter().map(|&s| s.into()).collect());
        dict.insert(0, SampleSet::new());
        let inc = membership_to_incidence(&dict, &expr)?;
        assert_eq!(inc.clusters, vec![0, 2]);
        assert!(inc.is_member(1, 1));
        assert_eq!(inc.to_membership(), dict);

        dict.insert(9, ["ghost"].iter().map(|&s| s.into()).collect());
        assert!(membership_to_incidence(&dict, &expr).is_err());
        Ok(())
    }
}
