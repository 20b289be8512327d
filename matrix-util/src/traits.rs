/// Row-wise statistics where rows are variables (genes) and columns
/// are observations (samples)
pub trait RowStatOps {
    type Mat;
    type DVec;
    type Scalar;

    /// `(x - mean) / sd` per row with the sample standard deviation
    /// (n - 1). Zero-variance rows become zeros.
    fn zscore_rows(&self) -> Self::Mat;

    /// Subtract each row's mean
    fn centre_rows(&self) -> Self::Mat;

    /// Centre each row and scale it to unit Euclidean norm, so that
    /// the dot product of two rows is their Pearson correlation.
    /// Zero-variance rows become zeros.
    fn unit_rows(&self) -> Self::Mat;

    /// Sample variance (n - 1) of each row
    fn row_variances(&self) -> Self::DVec;
}

/// Leading principal components of a (variables x observations) matrix
pub trait PrincipalOps {
    type Mat;
    type DVec;

    /// Observation scores of up to `max_rank` leading components,
    /// one column per component, ordered by decreasing variance.
    /// Components with numerically zero variance are dropped.
    fn principal_scores(&self, max_rank: usize) -> anyhow::Result<(Self::Mat, Self::DVec)>;
}
