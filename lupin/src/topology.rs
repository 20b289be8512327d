//! Spectrum of the gene graph induced by regulons.

use crate::common::*;
use matrix_util::dmatrix_pca::sorted_symmetric_eigen;
use matrix_util::graph::{connected_components, edges_above, graph_laplacian};

/// Zero tolerance for Laplacian eigenvalues
pub const EIGEN_TOL: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct RegulonSpectrum {
    /// graph nodes, sorted
    pub genes: Vec<GeneId>,
    /// `L = D - A`
    pub laplacian: Mat,
    /// ascending
    pub eigenvalues: DVec,
    /// one column per eigenvalue
    pub eigenvectors: Mat,
    pub num_components: usize,
}

impl RegulonSpectrum {
    /// Number of eigenvalues within [`EIGEN_TOL`] of zero
    pub fn zero_multiplicity(&self) -> usize {
        self.eigenvalues.iter().filter(|l| l.abs() < EIGEN_TOL).count()
    }
}

/// Laplacian eigen-decomposition of the graph joining every two genes
/// that share a regulon
pub fn laplacian(regulons: &RegulonDict) -> Result<RegulonSpectrum> {
    let genes: Vec<GeneId> = regulons
        .values()
        .flatten()
        .cloned()
        .collect::<GeneSet>()
        .into_iter()
        .collect();
    if genes.is_empty() {
        return Err(MinerError::InsufficientData(
            "no regulon genes to build a network".to_string(),
        ));
    }

    let index: BTreeMap<&GeneId, usize> = genes.iter().zip(0..).collect();
    let n = genes.len();
    let mut adjacency = Mat::zeros(n, n);
    for targets in regulons.values() {
        let idx: Vec<usize> = targets.iter().map(|g| index[g]).collect();
        for &i in idx.iter() {
            for &j in idx.iter() {
                if i != j {
                    adjacency[(i, j)] = 1.0;
                }
            }
        }
    }

    let lap = graph_laplacian(&adjacency).map_err(|e| MinerError::invalid(e.to_string()))?;
    let (eigenvalues, eigenvectors) = sorted_symmetric_eigen(lap.clone(), true);
    let num_components = connected_components(n, &edges_above(&adjacency, 0.5)).len();

    info!(
        "regulon network: {} genes, {} edges, {} connected components",
        n,
        adjacency.iter().filter(|&&a| a > 0.0).count() / 2,
        num_components
    );

    Ok(RegulonSpectrum {
        genes,
        laplacian: lap,
        eigenvalues,
        eigenvectors,
        num_components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn regulons(raw: &[(&str, &[&str])]) -> RegulonDict {
        raw.iter()
            .map(|&(r, genes)| (r.into(), genes.iter().map(|&g| g.into()).collect()))
            .collect()
    }

    #[test]
    fn test_complete_graph_spectrum() -> Result<()> {
        let spec = laplacian(&regulons(&[("TF1", &["a", "b", "c", "d", "e"][..])]))?;
        let expected = [0.0, 5.0, 5.0, 5.0, 5.0];
        for (l, e) in spec.eigenvalues.iter().zip(expected) {
            assert_abs_diff_eq!(*l, e, epsilon = 1e-8);
        }
        assert_eq!(spec.num_components, 1);
        Ok(())
    }

    #[test]
    fn test_disconnected_regulons() -> Result<()> {
        let spec = laplacian(&regulons(&[
            ("TF1", &["a", "b", "c"][..]),
            ("TF2", &["x", "y"][..]),
            ("TF3", &["c", "d"][..]),
        ]))?;
        assert_eq!(spec.genes.len(), 6);
        assert!(spec.eigenvalues[0].abs() < EIGEN_TOL);
        assert_eq!(spec.num_components, 2);
        assert_eq!(spec.zero_multiplicity(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_regulons() {
        assert!(matches!(
            laplacian(&RegulonDict::new()),
            Err(MinerError::InsufficientData(_))
        ));
    }
}
