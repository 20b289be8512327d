//! Sample similarity from shared cluster memberships, and clustering of
//! that similarity at two resolutions.

use crate::common::*;
use matrix_util::graph::{connected_components, edges_above};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratifyArgs {
    pub freq_threshold: f64,
    pub similarity_threshold: f64,
    pub high_resolution: bool,
    pub f1_threshold: f64,
    /// minimum F1 for mapping samples to the network
    pub mapping_threshold: f64,
}

impl Default for StratifyArgs {
    fn default() -> Self {
        Self {
            freq_threshold: 0.333,
            similarity_threshold: 0.15,
            high_resolution: true,
            f1_threshold: 0.3,
            mapping_threshold: 0.0,
        }
    }
}

impl StratifyArgs {
    pub fn validate(&self) -> Result<()> {
        check_fraction(self.freq_threshold, "freq_threshold")?;
        check_fraction(self.similarity_threshold, "similarity_threshold")?;
        check_fraction(self.f1_threshold, "f1_threshold")?;
        check_fraction(self.mapping_threshold, "mapping_threshold")
    }
}

/// Samples x samples matrix over the samples of a membership dictionary,
/// in sorted order
#[derive(Debug, Clone, PartialEq)]
pub struct CoincidenceMatrix {
    pub samples: Vec<SampleId>,
    pub mat: Mat,
}

/// Sorted samples and the clusters x samples 0/1 matrix over them
fn membership_table(dict: &MembershipDictionary) -> (Vec<SampleId>, Mat) {
    let samples: Vec<SampleId> = dict
        .values()
        .flatten()
        .cloned()
        .collect::<SampleSet>()
        .into_iter()
        .collect();
    let index: BTreeMap<&SampleId, usize> = samples.iter().zip(0..).collect();

    let mut table = Mat::zeros(dict.len(), samples.len());
    for (r, set) in dict.values().enumerate() {
        for s in set {
            table[(r, index[s])] = 1.0;
        }
    }
    (samples, table)
}

fn check_fraction(x: f64, what: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&x) {
        return Err(MinerError::invalid(format!(
            "{} must be in [0, 1], got {}",
            what, x
        )));
    }
    Ok(())
}

/// `F[i, j]` = share of the clusters containing sample `i` that also
/// contain sample `j`.
///
/// With `frequencies == false` the matrix is binarised: 1 where
/// `F[i, j] >= freq_threshold`.
pub fn sample_coincidence_matrix(
    dict: &MembershipDictionary,
    freq_threshold: f64,
    frequencies: bool,
) -> Result<CoincidenceMatrix> {
    check_fraction(freq_threshold, "freq_threshold")?;

    let (samples, table) = membership_table(dict);
    let co = table.transpose() * &table;
    let n = samples.len();

    let mut mat = Mat::zeros(n, n);
    for i in 0..n {
        let count_i = co[(i, i)];
        if count_i <= 0.0 {
            continue;
        }
        for j in 0..n {
            let f = co[(i, j)] / count_i;
            mat[(i, j)] = if frequencies {
                f
            } else if f >= freq_threshold {
                1.0
            } else {
                0.0
            };
        }
    }
    Ok(CoincidenceMatrix { samples, mat })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityGraph {
    pub samples: Vec<SampleId>,
    /// symmetric, every weight in [0, 1]
    pub weights: Mat,
}

impl SimilarityGraph {
    /// Coincidence frequencies below `freq_threshold` are zeroed; the
    /// similarity of `i` and `j` is `F[i, j] * F[j, i]`
    pub fn from_membership(dict: &MembershipDictionary, freq_threshold: f64) -> Result<Self> {
        let CoincidenceMatrix { samples, mat } =
            sample_coincidence_matrix(dict, freq_threshold, true)?;
        let ff = mat.map(|f| if f >= freq_threshold { f } else { 0.0 });
        let weights = ff.component_mul(&ff.transpose());
        Ok(Self { samples, weights })
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn names(&self, idx: &[usize]) -> SampleSet {
        idx.iter().map(|&i| self.samples[i].clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityClusters {
    /// largest first
    pub clusters: Vec<SampleSet>,
    pub unclustered: SampleSet,
}

impl SimilarityClusters {
    /// Mark every sample of `samples` that is in no cluster as
    /// unclustered
    pub fn cover(&mut self, samples: &[SampleId]) {
        for s in samples {
            if !self.clusters.iter().any(|c| c.contains(s)) {
                self.unclustered.insert(s.clone());
            }
        }
    }

    pub fn num_samples(&self) -> usize {
        self.clusters.iter().map(|c| c.len()).sum::<usize>() + self.unclustered.len()
    }
}

/// Connected components of the thresholded graph; singletons are
/// unclustered
fn coarse_clusters(graph: &SimilarityGraph, threshold: f64) -> SimilarityClusters {
    let edges = edges_above(&graph.weights, threshold);
    let mut ret = SimilarityClusters::default();
    for comp in connected_components(graph.num_samples(), &edges) {
        if comp.len() >= 2 {
            ret.clusters.push(graph.names(&comp));
        } else {
            ret.unclustered.extend(graph.names(&comp));
        }
    }
    ret
}

/// Mean similarity of `m` to the other members of `group`
fn mean_similarity(graph: &SimilarityGraph, group: &[usize], m: usize) -> f64 {
    let others = group.len().saturating_sub(1);
    if others == 0 {
        return 0.0;
    }
    let total: f64 = group
        .iter()
        .filter(|&&o| o != m)
        .map(|&o| graph.weights[(m, o)])
        .sum();
    total / others as f64
}

/// Repeatedly take the best-connected remaining sample with its
/// neighbours, then prune members that do not fit the group well
fn high_resolution_clusters(graph: &SimilarityGraph, threshold: f64) -> SimilarityClusters {
    let n = graph.num_samples();
    let mut remaining = vec![true; n];
    let mut ret = SimilarityClusters::default();

    let neighbours = |i: usize, remaining: &[bool]| -> Vec<usize> {
        (0..n)
            .filter(|&j| j != i && remaining[j] && graph.weights[(i, j)] > threshold)
            .collect()
    };

    loop {
        let mut seed = None;
        let mut best_degree = 0;
        for i in (0..n).filter(|&i| remaining[i]) {
            let degree = neighbours(i, &remaining).len();
            if degree > best_degree {
                best_degree = degree;
                seed = Some(i);
            }
        }
        let Some(seed) = seed else {
            break;
        };

        let mut group = vec![seed];
        group.extend(neighbours(seed, &remaining));

        // drop the weakest non-seed member until everyone fits
        loop {
            let worst = group
                .iter()
                .copied()
                .filter(|&m| m != seed)
                .map(|m| (m, mean_similarity(graph, &group, m)))
                .filter(|&(_, s)| s <= threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            match worst {
                Some((m, _)) => group.retain(|&x| x != m),
                None => break,
            }
        }

        if group.len() < 2 {
            remaining[seed] = false;
            ret.unclustered.insert(graph.samples[seed].clone());
            continue;
        }
        for &m in group.iter() {
            remaining[m] = false;
        }
        ret.clusters.push(graph.names(&group));
    }

    for i in (0..n).filter(|&i| remaining[i]) {
        ret.unclustered.insert(graph.samples[i].clone());
    }
    ret
}

/// Group samples whose similarity exceeds `similarity_threshold`.
///
/// The coarse rule takes connected components; the high-resolution rule
/// grows groups greedily around well-connected samples and may leave
/// more samples unclustered. Only samples listed in `dict` are seen
/// here; see [`SimilarityClusters::cover`] for the rest.
pub fn similarity_clusters(
    dict: &MembershipDictionary,
    freq_threshold: f64,
    similarity_threshold: f64,
    high_resolution: bool,
) -> Result<SimilarityClusters> {
    check_fraction(similarity_threshold, "similarity_threshold")?;
    let graph = SimilarityGraph::from_membership(dict, freq_threshold)?;

    let mut ret = if high_resolution {
        high_resolution_clusters(&graph, similarity_threshold)
    } else {
        coarse_clusters(&graph, similarity_threshold)
    };
    ret.clusters.sort_by(|a, b| b.len().cmp(&a.len()));

    info!(
        "{} similarity clusters, {} of {} samples unclustered{}",
        ret.clusters.len(),
        ret.unclustered.len(),
        graph.num_samples(),
        if high_resolution { " (high resolution)" } else { "" }
    );
    Ok(ret)
}

/// Initial class partition: each sample stays in the first class that
/// lists it; empty classes are dropped; largest first
pub fn classes_from_clusters(clusters: &[SampleSet]) -> Vec<SampleSet> {
    let mut seen = SampleSet::new();
    let mut classes: Vec<SampleSet> = vec![];
    for c in clusters {
        let fresh: SampleSet = c.difference(&seen).cloned().collect();
        seen.extend(fresh.iter().cloned());
        if !fresh.is_empty() {
            classes.push(fresh);
        }
    }
    classes.sort_by(|a, b| b.len().cmp(&a.len()));
    classes
}
