//! Class centroids over cluster incidence vectors, and nearest-centroid
//! mapping of samples.
//!
//! A centroid is a 0/1 vector over the rows of an incidence matrix.
//! Samples are compared with centroids by the F1 score of their own
//! incidence column against the centroid.

use crate::common::*;
use crate::membership::IncidenceMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const CANDIDATE_CUTS: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// F1 score between a centroid and a sample's incidence column, both
/// 0/1. Zero when either is empty.
pub fn f1(centroid: &[bool], sample: &[bool]) -> f64 {
    debug_assert_eq!(centroid.len(), sample.len());
    let mut tp = 0_usize;
    let mut nc = 0_usize;
    let mut ns = 0_usize;
    for (&c, &s) in centroid.iter().zip(sample.iter()) {
        tp += (c && s) as usize;
        nc += c as usize;
        ns += s as usize;
    }
    if nc == 0 || ns == 0 {
        return 0.0;
    }
    2.0 * tp as f64 / (nc + ns) as f64
}

/// Incidence rows x centroids, 0/1
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidMatrix {
    /// incidence rows (cluster indices)
    pub clusters: Vec<usize>,
    pub mat: Mat,
}

impl CentroidMatrix {
    pub fn num_centroids(&self) -> usize {
        self.mat.ncols()
    }

    fn column(&self, k: usize) -> Vec<bool> {
        self.mat.column(k).iter().map(|&x| x > 0.5).collect()
    }

    /// Best centroid for one sample column and its F1; ties go to the
    /// lower centroid index
    fn best_match(&self, sample: &[bool]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for k in 0..self.num_centroids() {
            let score = f1(&self.column(k), sample);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((k, score));
            }
        }
        best
    }

    fn ensure_rows_match(&self, incidence: &IncidenceMatrix) -> Result<()> {
        if self.clusters != incidence.clusters {
            return Err(MinerError::invalid(format!(
                "centroids span {} clusters but the incidence matrix has {}",
                self.clusters.len(),
                incidence.num_clusters()
            )));
        }
        Ok(())
    }
}

fn sample_column(incidence: &IncidenceMatrix, j: usize) -> Vec<bool> {
    (0..incidence.num_clusters())
        .map(|r| incidence.is_member(r, j))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CentroidResult {
    /// samples assigned to each centroid, in centroid order
    pub classes: Vec<SampleSet>,
    pub centroids: CentroidMatrix,
    pub unmapped: SampleSet,
}

impl CentroidResult {
    pub fn num_mapped(&self) -> usize {
        self.classes.iter().map(|c| c.len()).sum()
    }
}

/// Centroid of one class: the member-frequency cut with the best mean
/// member F1. `None` when every cut is empty.
fn class_centroid(members: &[usize], incidence: &IncidenceMatrix) -> Option<Vec<bool>> {
    let columns: Vec<Vec<bool>> = members.iter().map(|&j| sample_column(incidence, j)).collect();
    let nrows = incidence.num_clusters();
    let freq: Vec<f64> = (0..nrows)
        .map(|r| columns.iter().filter(|c| c[r]).count() as f64 / columns.len() as f64)
        .collect();

    let mut best: Option<(Vec<bool>, f64)> = None;
    for &cut in CANDIDATE_CUTS.iter() {
        let centroid: Vec<bool> = freq.iter().map(|&f| f > cut).collect();
        if !centroid.iter().any(|&c| c) {
            continue;
        }
        let score = columns.iter().map(|c| f1(&centroid, c)).sum::<f64>() / columns.len() as f64;
        if best.as_ref().map_or(true, |(_, b)| score > *b) {
            best = Some((centroid, score));
        }
    }
    best.map(|(c, _)| c)
}

/// Derive one centroid per class, then assign every sample to its best
/// centroid. Samples whose best F1 is zero or below `f1_threshold` stay
/// unmapped.
pub fn centroids(
    classes: &[SampleSet],
    incidence: &IncidenceMatrix,
    f1_threshold: f64,
) -> Result<CentroidResult> {
    if !(0.0..=1.0).contains(&f1_threshold) {
        return Err(MinerError::invalid(format!(
            "f1_threshold must be in [0, 1], got {}",
            f1_threshold
        )));
    }

    let sample_index: BTreeMap<&SampleId, usize> = incidence.samples.iter().zip(0..).collect();
    let mut member_cols: Vec<Vec<usize>> = vec![];
    for class in classes {
        let mut cols = vec![];
        for s in class {
            let j = sample_index.get(s).copied().ok_or_else(|| {
                MinerError::invalid(format!("sample {} is not in the incidence matrix", s))
            })?;
            cols.push(j);
        }
        member_cols.push(cols);
    }

    let found: Vec<Option<Vec<bool>>> = member_cols
        .par_iter()
        .map(|cols| {
            if cols.is_empty() {
                None
            } else {
                class_centroid(cols, incidence)
            }
        })
        .collect();

    let kept: Vec<Vec<bool>> = found.into_iter().flatten().collect();
    if kept.len() < classes.len() {
        debug!("{} classes without a centroid", classes.len() - kept.len());
    }

    let nrows = incidence.num_clusters();
    let centroids = CentroidMatrix {
        clusters: incidence.clusters.clone(),
        mat: Mat::from_fn(nrows, kept.len(), |r, k| if kept[k][r] { 1.0 } else { 0.0 }),
    };

    let mut assigned = vec![SampleSet::new(); kept.len()];
    let mut unmapped = SampleSet::new();
    for (j, s) in incidence.samples.iter().enumerate() {
        match centroids.best_match(&sample_column(incidence, j)) {
            Some((k, score)) if score > 0.0 && score >= f1_threshold => {
                assigned[k].insert(s.clone());
            }
            _ => {
                unmapped.insert(s.clone());
            }
        }
    }

    let ret = CentroidResult {
        classes: assigned,
        centroids,
        unmapped,
    };
    info!(
        "{} centroids; {} samples mapped, {} unmapped",
        ret.centroids.num_centroids(),
        ret.num_mapped(),
        ret.unmapped.len()
    );
    Ok(ret)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMapping {
    /// centroid index -> samples
    pub classes: BTreeMap<usize, SampleSet>,
    pub unmapped: SampleSet,
    /// best F1 of every sample, in incidence column order
    pub scores: Vec<f64>,
}

/// Assign every sample of `incidence` to the centroid with the highest
/// F1 above `threshold`
pub fn map_expression_to_network(
    centroids: &CentroidMatrix,
    incidence: &IncidenceMatrix,
    threshold: f64,
) -> Result<NetworkMapping> {
    centroids.ensure_rows_match(incidence)?;

    let best: Vec<Option<(usize, f64)>> = (0..incidence.num_samples())
        .into_par_iter()
        .map(|j| centroids.best_match(&sample_column(incidence, j)))
        .collect();

    let mut classes: BTreeMap<usize, SampleSet> =
        (0..centroids.num_centroids()).map(|k| (k, SampleSet::new())).collect();
    let mut unmapped = SampleSet::new();
    let mut scores = Vec::with_capacity(best.len());

    for (s, hit) in incidence.samples.iter().zip(best) {
        match hit {
            Some((k, score)) if score > threshold => {
                if let Some(set) = classes.get_mut(&k) {
                    set.insert(s.clone());
                }
                scores.push(score);
            }
            Some((_, score)) => {
                unmapped.insert(s.clone());
                scores.push(score);
            }
            None => {
                unmapped.insert(s.clone());
                scores.push(0.0);
            }
        }
    }

    info!(
        "mapped {} of {} samples onto {} centroids",
        incidence.num_samples() - unmapped.len(),
        incidence.num_samples(),
        centroids.num_centroids()
    );
    Ok(NetworkMapping {
        classes,
        unmapped,
        scores,
    })
}

/// Display order of samples and clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipOrder {
    pub samples: Vec<SampleId>,
    pub clusters: Vec<usize>,
}

/// Samples grouped by class (best F1 first within a class, unmapped
/// last); clusters grouped by the first centroid that uses them
pub fn order_membership(
    centroids: &CentroidMatrix,
    incidence: &IncidenceMatrix,
    mapping: &NetworkMapping,
) -> Result<MembershipOrder> {
    centroids.ensure_rows_match(incidence)?;
    if mapping.scores.len() != incidence.num_samples() {
        return Err(MinerError::invalid(
            "network mapping does not match the incidence matrix",
        ));
    }

    let score_of: BTreeMap<&SampleId, f64> = incidence
        .samples
        .iter()
        .zip(mapping.scores.iter().copied())
        .collect();
    let score = |s: &SampleId| score_of.get(s).copied().unwrap_or(0.0);

    let mut samples = vec![];
    for set in mapping.classes.values() {
        let mut members: Vec<&SampleId> = set.iter().collect();
        members.sort_by(|a, b| score(*b).total_cmp(&score(*a)).then(a.cmp(b)));
        samples.extend(members.into_iter().cloned());
    }
    samples.extend(mapping.unmapped.iter().cloned());

    let nrows = centroids.clusters.len();
    let mut listed = vec![false; nrows];
    let mut clusters = vec![];
    for k in 0..centroids.num_centroids() {
        for r in 0..nrows {
            if !listed[r] && centroids.mat[(r, k)] > 0.5 {
                listed[r] = true;
                clusters.push(centroids.clusters[r]);
            }
        }
    }
    for r in 0..nrows {
        if !listed[r] {
            clusters.push(centroids.clusters[r]);
        }
    }

    Ok(MembershipOrder { samples, clusters })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 6 clusters x 8 samples: s0..s3 use clusters 0-2, s4..s6 use
    /// clusters 3-5, s7 uses nothing
    fn incidence() -> IncidenceMatrix {
        let samples: Vec<SampleId> = (0..8).map(|j| format!("s{}", j).into_boxed_str()).collect();
        let mat = Mat::from_fn(6, 8, |r, j| {
            let on = (j < 4 && r < 3) || ((4..7).contains(&j) && r >= 3);
            // s3 misses cluster 2
            if on && !(j == 3 && r == 2) {
                1.0
            } else {
                0.0
            }
        });
        IncidenceMatrix {
            clusters: (0..6).collect(),
            samples,
            mat,
        }
    }

    fn set(names: &[&str]) -> SampleSet {
        names.iter().map(|&s| s.into()).collect()
    }

    #[test]
    fn test_f1() {
        assert_eq!(f1(&[true, true, false], &[true, true, false]), 1.0);
        assert_eq!(f1(&[true, false], &[false, true]), 0.0);
        assert_eq!(f1(&[true], &[false]), 0.0);
        assert!((f1(&[true, true], &[true, false]) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroids_and_mapping() -> Result<()> {
        let inc = incidence();
        let classes = vec![set(&["s0", "s1", "s2", "s3"]), set(&["s4", "s5"])];
        let res = centroids(&classes, &inc, 0.3)?;
        assert_eq!(res.centroids.num_centroids(), 2);
        assert_eq!(res.classes[0], set(&["s0", "s1", "s2", "s3"]));
        assert_eq!(res.classes[1], set(&["s4", "s5", "s6"]));
        assert_eq!(res.unmapped, set(&["s7"]));

        let mapping = map_expression_to_network(&res.centroids, &inc, 0.5)?;
        assert_eq!(mapping.classes[&1], set(&["s4", "s5", "s6"]));
        assert!(mapping.unmapped.contains("s7"));

        let order = order_membership(&res.centroids, &inc, &mapping)?;
        assert_eq!(order.samples.len(), 8);
        assert_eq!(order.samples.last().map(|s| s.as_ref()), Some("s7"));
        // s3 fits its centroid worst
        assert_eq!(order.samples[3].as_ref(), "s3");
        assert_eq!(order.clusters, vec![0, 1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_f1_threshold_is_monotone() -> Result<()> {
        let inc = incidence();
        let classes = vec![set(&["s0", "s1", "s2", "s3"]), set(&["s4", "s5", "s6"])];
        let mut last = usize::MAX;
        for t in [0.0, 0.5, 0.8, 0.85, 0.95, 1.0] {
            let mapped = centroids(&classes, &inc, t)?.num_mapped();
            assert!(mapped <= last);
            last = mapped;
        }
        Ok(())
    }

    #[test]
    fn test_mismatched_rows_fail() -> Result<()> {
        let inc = incidence();
        let res = centroids(&[set(&["s0"])], &inc, 0.0)?;
        let mut other = inc.clone();
        other.clusters = vec![9; 6];
        assert!(map_expression_to_network(&res.centroids, &other, 0.0).is_err());
        assert!(centroids(&[set(&["ghost"])], &inc, 0.0).is_err());
        Ok(())
    }
}
