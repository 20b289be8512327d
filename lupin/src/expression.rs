//! Gene x sample expression matrix with named axes.
//!
//! Rows are genes and columns are samples, always. Anything derived from
//! the matrix along the sample axis (background levels, incidence
//! matrices, centroids) carries the sample names with it and is checked
//! against [`ExpressionMatrix::ensure_same_samples`] when the two meet.

use crate::common::*;
use fnv::FnvHashMap as HashMap;
use matrix_util::traits::RowStatOps;

#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    genes: Vec<GeneId>,
    samples: Vec<SampleId>,
    mat: Mat,
    gene_index: HashMap<GeneId, usize>,
    sample_index: HashMap<SampleId, usize>,
}

impl PartialEq for ExpressionMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes && self.samples == other.samples && self.mat == other.mat
    }
}

fn index_names(names: &[Box<str>], axis: &str) -> Result<HashMap<Box<str>, usize>> {
    let mut index = HashMap::default();
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(MinerError::invalid(format!("empty {} name at {}", axis, i)));
        }
        if index.insert(name.clone(), i).is_some() {
            return Err(MinerError::invalid(format!("duplicate {} ID: {}", axis, name)));
        }
    }
    Ok(index)
}

impl ExpressionMatrix {
    /// * `genes` - row names
    /// * `samples` - column names
    /// * `mat` - genes x samples values, all finite
    pub fn new(genes: Vec<GeneId>, samples: Vec<SampleId>, mat: Mat) -> Result<Self> {
        if genes.is_empty() || samples.is_empty() {
            return Err(MinerError::invalid(format!(
                "empty expression matrix: {} genes x {} samples",
                genes.len(),
                samples.len()
            )));
        }
        if mat.nrows() != genes.len() || mat.ncols() != samples.len() {
            return Err(MinerError::invalid(format!(
                "matrix is {} x {} but {} gene and {} sample names were given",
                mat.nrows(),
                mat.ncols(),
                genes.len(),
                samples.len()
            )));
        }
        if let Some(k) = mat.iter().position(|x| !x.is_finite()) {
            let (i, j) = (k % mat.nrows(), k / mat.nrows());
            return Err(MinerError::invalid(format!(
                "non-finite value at gene {} sample {}",
                genes[i], samples[j]
            )));
        }

        let gene_index = index_names(&genes, "gene")?;
        let sample_index = index_names(&samples, "sample")?;

        Ok(Self {
            genes,
            samples,
            mat,
            gene_index,
            sample_index,
        })
    }

    /// Build from row vectors, one per gene
    pub fn from_rows(genes: Vec<GeneId>, samples: Vec<SampleId>, rows: &[Vec<f64>]) -> Result<Self> {
        let ncols = samples.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(MinerError::invalid(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                ncols
            )));
        }
        let mat = Mat::from_row_iterator(rows.len(), ncols, rows.iter().flatten().copied());
        Self::new(genes, samples, mat)
    }

    pub fn genes(&self) -> &[GeneId] {
        &self.genes
    }

    pub fn samples(&self) -> &[SampleId] {
        &self.samples
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.sample_index.get(sample).copied()
    }

    /// Row indices of the measured genes among `genes`; unknown genes
    /// are skipped
    pub fn gene_rows<'a>(&self, genes: impl IntoIterator<Item = &'a GeneId>) -> Vec<usize> {
        genes
            .into_iter()
            .filter_map(|g| self.gene_index(g))
            .collect()
    }

    /// Expression profile of one gene across all samples
    pub fn gene_profile(&self, gene: &str) -> Option<DVec> {
        self.gene_index(gene)
            .map(|i| self.mat.row(i).transpose().into_owned())
    }

    /// Selected rows, all samples
    pub fn rows(&self, rows: &[usize]) -> Mat {
        self.mat.select_rows(rows.iter())
    }

    /// Keep the selected rows under new names
    pub fn with_rows(&self, rows: &[usize], names: Vec<GeneId>) -> Result<Self> {
        Self::new(names, self.samples.clone(), self.rows(rows))
    }

    /// Per-gene standardisation: `(x - mean) / sd` with the sample
    /// standard deviation; genes without variance become zeros.
    pub fn zscore(&self) -> Self {
        Self {
            genes: self.genes.clone(),
            samples: self.samples.clone(),
            mat: self.mat.zscore_rows(),
            gene_index: self.gene_index.clone(),
            sample_index: self.sample_index.clone(),
        }
    }

    /// Check that an artifact built along the sample axis lines up with
    /// this matrix
    pub fn ensure_same_samples(&self, samples: &[SampleId], what: &str) -> Result<()> {
        if samples != self.samples.as_slice() {
            return Err(MinerError::invalid(format!(
                "{} has {} samples that do not match the expression matrix ({} samples)",
                what,
                samples.len(),
                self.samples.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<Box<str>> {
        (0..n).map(|i| format!("{}{}", prefix, i).into_boxed_str()).collect()
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let mat = Mat::zeros(2, 2);
        let dup = vec!["g".into(), "g".into()];
        assert!(matches!(
            ExpressionMatrix::new(dup, names("s", 2), mat.clone()),
            Err(MinerError::InvalidInput(_))
        ));
        assert!(ExpressionMatrix::new(vec![], vec![], Mat::zeros(0, 0)).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut mat = Mat::zeros(2, 2);
        mat[(1, 0)] = f64::NAN;
        assert!(ExpressionMatrix::new(names("g", 2), names("s", 2), mat).is_err());
    }

    #[test]
    fn test_zscore_and_lookup() -> Result<()> {
        let expr = ExpressionMatrix::from_rows(
            names("g", 2),
            names("s", 3),
            &[vec![1.0, 2.0, 3.0], vec![7.0, 7.0, 7.0]],
        )?;
        let z = expr.zscore();
        assert_eq!(z.gene_index("g1"), Some(1));
        assert_eq!(z.mat()[(0, 0)], -1.0);
        assert!(z.gene_profile("g1").unwrap().iter().all(|&x| x == 0.0));
        let query: Vec<GeneId> = vec!["g1".into(), "zzz".into()];
        assert_eq!(z.gene_rows(&query), vec![1]);
        Ok(())
    }
}
