use crate::common::*;
use statrs::distribution::{Binomial, DiscreteCDF, Hypergeometric};

/// P(X >= k), X ~ Binomial(n, p)
pub fn binomial_upper_tail(k: usize, n: usize, p: f64) -> Result<f64> {
    if k == 0 {
        return Ok(1.0);
    }
    let distrib = Binomial::new(p, n as u64).map_err(MinerError::degenerate)?;
    // P(X >= k) = P(X > k-1) = sf(k-1)
    Ok(distrib.sf((k - 1) as u64))
}

/// Overlap between a gene set and a target set within a universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapCounts {
    /// genes in the universe
    pub population: usize,
    /// targets in the universe
    pub successes: usize,
    /// size of the tested gene set
    pub draws: usize,
    /// targets among the tested genes
    pub overlap: usize,
}

impl OverlapCounts {
    /// P(X >= overlap) under random draws without replacement
    pub fn pvalue_greater(&self) -> Result<f64> {
        if self.overlap == 0 {
            return Ok(1.0);
        }
        let hyper = Hypergeometric::new(
            self.population as u64,
            self.successes as u64,
            self.draws as u64,
        )
        .map_err(MinerError::degenerate)?;
        Ok(hyper.sf((self.overlap - 1) as u64))
    }

    /// Odds ratio of the 2x2 table with 0.5 added to every cell
    pub fn odds_ratio(&self) -> f64 {
        let a = self.overlap as f64;
        let b = (self.draws - self.overlap) as f64;
        let c = (self.successes - self.overlap) as f64;
        let d = (self.population + self.overlap) as f64 - (self.draws + self.successes) as f64;
        ((a + 0.5) * (d + 0.5)) / ((b + 0.5) * (c + 0.5))
    }
}

/// Benjamini-Hochberg adjusted p-values, in input order. Non-finite
/// p-values are treated as 1.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let pv: Vec<f64> = p_values
        .iter()
        .map(|&p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 })
        .collect();

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| pv[a].total_cmp(&pv[b]).then(a.cmp(&b)));

    let mut adjusted = vec![1.0; n];
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let adj = (pv[indices[i]] * n as f64 / (i + 1) as f64).min(1.0).min(prev);
        adjusted[indices[i]] = adj;
        prev = adj;
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_binomial_tail() -> Result<()> {
        assert_abs_diff_eq!(binomial_upper_tail(6, 6, 1.0 / 3.0)?, 1.0 / 729.0, epsilon = 1e-12);
        assert_abs_diff_eq!(binomial_upper_tail(0, 6, 1.0 / 3.0)?, 1.0);
        Ok(())
    }

    #[test]
    fn test_hypergeometric_tail() -> Result<()> {
        // all 3 targets drawn in 3 draws out of 10: 1 / C(10, 3)
        let counts = OverlapCounts {
            population: 10,
            successes: 3,
            draws: 3,
            overlap: 3,
        };
        assert_abs_diff_eq!(counts.pvalue_greater()?, 1.0 / 120.0, epsilon = 1e-12);
        assert!(counts.odds_ratio() > 1.0);
        Ok(())
    }

    #[test]
    fn test_bh() {
        let adj = benjamini_hochberg(&[0.01, 0.04, 0.03, f64::NAN]);
        assert_abs_diff_eq!(adj[0], 0.04, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[1], 0.16 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[2], 0.16 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[3], 1.0);
    }
}
