//! Regulator enrichment of gene clusters.
//!
//! For every cluster the regulator reference proposes candidate
//! regulators; each is tested for over-representation of its targets
//! among the cluster's genes (hypergeometric, universe = measured
//! genes), corrected within the cluster (Benjamini-Hochberg), and, when
//! the regulator itself is measured, required to track the cluster's
//! principal axis.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use crate::hypothesis_tests::{benjamini_hochberg, OverlapCounts};
use crate::principal::ClusterAxes;
use crate::reference::RegulatorReference;
use indicatif::ParallelProgressIterator;
use matrix_util::dmatrix_stat::pearson;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanisticArgs {
    /// clusters with fewer measured genes get no principal axis
    pub min_number_genes: usize,
    /// cut on the adjusted p-value
    pub p_value: f64,
    /// minimum number of cluster genes among the regulator's targets
    pub min_overlap: usize,
    /// minimum |r| between a measured regulator and the cluster axis
    pub correlation_threshold: f64,
}

impl Default for MechanisticArgs {
    fn default() -> Self {
        Self {
            min_number_genes: 6,
            p_value: 0.05,
            min_overlap: 3,
            correlation_threshold: 0.2,
        }
    }
}

impl MechanisticArgs {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.p_value) {
            return Err(MinerError::invalid(format!(
                "p_value must be in [0, 1], got {}",
                self.p_value
            )));
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(MinerError::invalid(format!(
                "correlation_threshold must be in [0, 1], got {}",
                self.correlation_threshold
            )));
        }
        if self.min_overlap == 0 {
            return Err(MinerError::invalid("min_overlap must be positive"));
        }
        Ok(())
    }
}

/// One enriched regulator of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatorHit {
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub odds_ratio: f64,
    /// correlation of the regulator's expression with the cluster axis
    pub correlation: Option<f64>,
    /// cluster genes that are targets of the regulator
    pub genes: GeneSet,
}

/// regulator -> hit, for one cluster
pub type MechanisticRecord = BTreeMap<Box<str>, RegulatorHit>;

/// regulator -> cluster -> genes
pub type CoregulationModules = BTreeMap<Box<str>, BTreeMap<usize, GeneSet>>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MechanisticOutput {
    pub records: BTreeMap<usize, MechanisticRecord>,
}

impl MechanisticOutput {
    pub fn num_hits(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }
}

struct Candidate {
    regulator: Box<str>,
    counts: OverlapCounts,
    p_value: f64,
    genes: GeneSet,
}

fn infer_cluster<R>(
    cluster: usize,
    genes: &GeneSet,
    axis: Option<&DVec>,
    expr: &ExpressionMatrix,
    reference: &R,
    args: &MechanisticArgs,
) -> MechanisticRecord
where
    R: RegulatorReference + ?Sized,
{
    let measured: GeneSet = genes
        .iter()
        .filter(|g| expr.gene_index(g).is_some())
        .cloned()
        .collect();
    if measured.is_empty() {
        return MechanisticRecord::new();
    }

    let regulators = match reference.lookup(&measured) {
        Ok(x) => x,
        Err(err) => {
            warn!("cluster {}: {}", cluster, err);
            return MechanisticRecord::new();
        }
    };

    let candidates: Vec<Candidate> = regulators
        .into_iter()
        .filter_map(|(regulator, targets)| {
            let successes = targets.iter().filter(|g| expr.gene_index(g).is_some()).count();
            let overlap: GeneSet = measured.intersection(&targets).cloned().collect();
            let counts = OverlapCounts {
                population: expr.num_genes(),
                successes,
                draws: measured.len(),
                overlap: overlap.len(),
            };
            match counts.pvalue_greater() {
                Ok(p_value) => Some(Candidate {
                    regulator,
                    counts,
                    p_value,
                    genes: overlap,
                }),
                Err(err) => {
                    debug!("cluster {} regulator {}: {}", cluster, regulator, err);
                    None
                }
            }
        })
        .collect();

    let p_values: Vec<f64> = candidates.iter().map(|c| c.p_value).collect();
    let adjusted = benjamini_hochberg(&p_values);

    let mut record = MechanisticRecord::new();
    for (cand, adj) in candidates.into_iter().zip(adjusted) {
        if adj > args.p_value || cand.counts.overlap < args.min_overlap {
            continue;
        }
        let correlation = match (expr.gene_profile(&cand.regulator), axis) {
            (Some(profile), Some(axis)) => Some(pearson(&profile, axis)),
            _ => None,
        };
        if correlation.is_some_and(|r| r.abs() < args.correlation_threshold) {
            debug!(
                "cluster {} regulator {}: enriched but uncorrelated",
                cluster, cand.regulator
            );
            continue;
        }
        record.insert(
            cand.regulator,
            RegulatorHit {
                p_value: cand.p_value,
                adjusted_p_value: adj,
                odds_ratio: cand.counts.odds_ratio(),
                correlation,
                genes: cand.genes,
            },
        );
    }
    record
}

/// Enriched regulators of every cluster.
///
/// Clusters are tested independently; a failed reference lookup leaves
/// that cluster with an empty record.
pub fn infer<R>(
    axes: &ClusterAxes,
    clusters: &ClusterDict,
    expr: &ExpressionMatrix,
    reference: &R,
    args: &MechanisticArgs,
) -> Result<MechanisticOutput>
where
    R: RegulatorReference + ?Sized,
{
    args.validate()?;
    expr.ensure_same_samples(axes.samples(), "cluster axes")?;

    let jobs: Vec<(&usize, &GeneSet)> = clusters.iter().collect();
    let njobs = jobs.len() as u64;

    let records: BTreeMap<usize, MechanisticRecord> = jobs
        .par_iter()
        .progress_count(njobs)
        .map(|&(&k, genes)| (k, infer_cluster(k, genes, axes.get(k), expr, reference, args)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    let output = MechanisticOutput { records };
    info!(
        "{} regulator-cluster associations over {} clusters",
        output.num_hits(),
        output.records.values().filter(|r| !r.is_empty()).count()
    );
    Ok(output)
}

/// Regulator -> cluster -> target genes in the cluster
pub fn get_coregulation_modules(output: &MechanisticOutput) -> CoregulationModules {
    let mut modules = CoregulationModules::new();
    for (&k, record) in output.records.iter() {
        for (regulator, hit) in record.iter() {
            modules
                .entry(regulator.clone())
                .or_default()
                .insert(k, hit.genes.clone());
        }
    }
    modules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::principal_axes;
    use crate::reference::RegulatorTable;

    /// 30 genes x 12 samples; t0..t7 follow TF1, the rest are patterned
    /// noise
    fn fixture() -> (ExpressionMatrix, ClusterDict, RegulatorTable) {
        let ns = 12;
        let profile: Vec<f64> = (0..ns).map(|j| ((j * 5) % 12) as f64).collect();
        let mut genes: Vec<GeneId> = vec!["TF1".into()];
        let mut rows = vec![profile.clone()];
        for i in 0..8 {
            genes.push(format!("t{}", i).into());
            rows.push(
                profile
                    .iter()
                    .enumerate()
                    .map(|(j, &p)| p + 0.1 * ((i + j) % 3) as f64)
                    .collect(),
            );
        }
        for i in 0..21 {
            genes.push(format!("n{}", i).into());
            rows.push((0..ns).map(|j| ((i * 7 + j * (i % 5 + 1)) % 13) as f64).collect());
        }
        let samples = (0..ns).map(|j| format!("s{}", j).into_boxed_str()).collect();
        let expr = ExpressionMatrix::from_rows(genes, samples, &rows).unwrap();

        let mut clusters = ClusterDict::new();
        clusters.insert(0, (0..8).map(|i| format!("t{}", i).into_boxed_str()).collect());
        clusters.insert(1, (0..8).map(|i| format!("n{}", i).into_boxed_str()).collect());

        let mut pairs: Vec<(Box<str>, GeneId)> = (0..8)
            .map(|i| ("TF1".into(), format!("t{}", i).into_boxed_str()))
            .collect();
        pairs.push(("TF1".into(), "n0".into()));
        pairs.push(("TF2".into(), "n1".into()));
        pairs.push(("TF2".into(), "n9".into()));
        (expr, clusters, RegulatorTable::from_pairs(pairs))
    }

    #[test]
    fn test_enriched_regulator_is_found() -> Result<()> {
        let (expr, clusters, table) = fixture();
        let args = MechanisticArgs::default();
        let axes = principal_axes(&clusters, &expr, args.min_number_genes)?;
        let out = infer(&axes, &clusters, &expr, &table, &args)?;

        let hit = &out.records[&0]["TF1"];
        assert_eq!(hit.genes.len(), 8);
        assert!(hit.adjusted_p_value <= 0.05);
        assert!(hit.correlation.unwrap() > 0.9);
        // one shared gene is not enough
        assert!(out.records[&1].is_empty());
        Ok(())
    }

    #[test]
    fn test_inference_is_deterministic() -> Result<()> {
        let (expr, clusters, table) = fixture();
        let args = MechanisticArgs::default();
        let axes = principal_axes(&clusters, &expr, args.min_number_genes)?;
        let first = infer(&axes, &clusters, &expr, &table, &args)?;
        let second = infer(&axes, &clusters, &expr, &table, &args)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_failed_lookup_gives_empty_records() -> Result<()> {
        let (expr, clusters, _) = fixture();
        let args = MechanisticArgs::default();
        let axes = principal_axes(&clusters, &expr, args.min_number_genes)?;
        let out = infer(&axes, &clusters, &expr, &RegulatorTable::default(), &args)?;
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.num_hits(), 0);
        Ok(())
    }

    #[test]
    fn test_coregulation_modules_reshape() {
        fn hit(genes: &[&str]) -> RegulatorHit {
            RegulatorHit {
                p_value: 0.001,
                adjusted_p_value: 0.01,
                odds_ratio: 5.0,
                correlation: None,
                genes: genes.iter().map(|&g| g.into()).collect(),
            }
        }
        let mut out = MechanisticOutput::default();
        out.records.insert(0, [("TF1".into(), hit(&["a", "b"]))].into_iter().collect());
        out.records.insert(3, [("TF1".into(), hit(&["c"]))].into_iter().collect());

        let modules = get_coregulation_modules(&out);
        assert_eq!(modules["TF1"].len(), 2);
        assert!(modules["TF1"][&3].contains("c"));
    }
}
