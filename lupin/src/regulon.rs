//! Regulons and co-expression modules assembled from enrichment results.

use crate::common::*;
use crate::mechanistic::{CoregulationModules, MechanisticOutput};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulonArgs {
    pub min_number_genes: usize,
    /// share of a regulator's clusters a gene must appear in
    pub freq_threshold: f64,
}

impl Default for RegulonArgs {
    fn default() -> Self {
        Self {
            min_number_genes: 5,
            freq_threshold: 0.333,
        }
    }
}

/// Genes of one cluster attributed to regulators, with those regulators
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoexpressionModule {
    pub genes: GeneSet,
    pub regulators: BTreeSet<Box<str>>,
}

/// Per regulator, the genes found in at least `freq_threshold` of the
/// regulator's clusters; regulons smaller than `min_number_genes` are
/// dropped
pub fn get_regulons(
    modules: &CoregulationModules,
    min_number_genes: usize,
    freq_threshold: f64,
) -> Result<RegulonDict> {
    if !(0.0..=1.0).contains(&freq_threshold) {
        return Err(MinerError::invalid(format!(
            "freq_threshold must be in [0, 1], got {}",
            freq_threshold
        )));
    }

    let mut regulons = RegulonDict::new();
    for (regulator, clusters) in modules.iter() {
        if clusters.is_empty() {
            continue;
        }
        let mut counts: BTreeMap<&GeneId, usize> = BTreeMap::new();
        for genes in clusters.values() {
            for g in genes {
                *counts.entry(g).or_default() += 1;
            }
        }
        let nclusters = clusters.len() as f64;
        let kept: GeneSet = counts
            .into_iter()
            .filter(|&(_, c)| c as f64 / nclusters >= freq_threshold)
            .map(|(g, _)| g.clone())
            .collect();
        if kept.len() >= min_number_genes {
            regulons.insert(regulator.clone(), kept);
        } else {
            debug!("regulon {} too small ({} genes)", regulator, kept.len());
        }
    }

    info!(
        "{} regulons from {} regulators",
        regulons.len(),
        modules.len()
    );
    Ok(regulons)
}

/// Cluster -> union of the target genes of its enriched regulators.
/// Clusters without any regulator are left out.
pub fn get_coexpression_modules(
    output: &MechanisticOutput,
) -> BTreeMap<usize, CoexpressionModule> {
    output
        .records
        .iter()
        .filter(|(_, record)| !record.is_empty())
        .map(|(&k, record)| {
            let mut module = CoexpressionModule::default();
            for (regulator, hit) in record.iter() {
                module.regulators.insert(regulator.clone());
                module.genes.extend(hit.genes.iter().cloned());
            }
            (k, module)
        })
        .collect()
}

/// Co-expression modules as clusters under their original cluster keys
pub fn modules_as_clusters(modules: &BTreeMap<usize, CoexpressionModule>) -> ClusterDict {
    modules
        .iter()
        .map(|(&k, module)| (k, module.genes.clone()))
        .collect()
}

/// Regulons keyed `0..n` in regulator order, so they can be scored as
/// clusters; the second value names the regulator of each key
pub fn regulons_as_clusters(regulons: &RegulonDict) -> (ClusterDict, Vec<Box<str>>) {
    let names: Vec<Box<str>> = regulons.keys().cloned().collect();
    let clusters: ClusterDict = regulons.values().cloned().enumerate().collect();
    (clusters, names)
}
